use std::fs;
use std::path::{Path, PathBuf};

use renderstate::{RenderStateOptions, RenderThreadOptions, Viewport, DEFAULT_TEXTURE_UNITS};
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Highest texture-unit count the texture state will track.
pub const MAX_TEXTURE_UNITS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    pub version: u32,
    #[serde(default)]
    pub render_thread: RenderThreadSection,
    #[serde(default)]
    pub caches: CachesSection,
    #[serde(default)]
    pub probe: ProbeSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderThreadSection {
    pub name: String,
}

impl Default for RenderThreadSection {
    fn default() -> Self {
        Self {
            name: RenderThreadOptions::default().name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CachesSection {
    pub debug_overdraw: bool,
    pub texture_units: usize,
}

impl Default for CachesSection {
    fn default() -> Self {
        Self {
            debug_overdraw: false,
            texture_units: DEFAULT_TEXTURE_UNITS,
        }
    }
}

/// Scenario the probe binary drives through the coordinator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    /// Context create/destroy cycles to run.
    pub cycles: u32,
    #[serde(deserialize_with = "deserialize_viewport")]
    pub viewport: Viewport,
    /// Framebuffer bound before functors run; `0` is the default target.
    pub framebuffer: u32,
    /// Functor invocations per cycle.
    pub functor_calls: u32,
    /// Layers registered per cycle; each must hear about the context loss.
    pub layers: u32,
    /// Objects released from the probe's main thread per cycle.
    pub releases: u32,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            cycles: 1,
            viewport: Viewport::new(800, 600),
            framebuffer: 0,
            functor_calls: 1,
            layers: 2,
            releases: 4,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            version: 1,
            render_thread: RenderThreadSection::default(),
            caches: CachesSection::default(),
            probe: ProbeSection::default(),
        }
    }
}

fn deserialize_viewport<'de, D>(deserializer: D) -> Result<Viewport, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Pair([u32; 2]),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_viewport(&raw).map_err(de::Error::custom),
        Helper::Pair([width, height]) => Ok(Viewport::new(width, height)),
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `800x600`.
pub fn parse_viewport(raw: &str) -> Result<Viewport, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    let (width, height) = normalized
        .split_once('x')
        .ok_or_else(|| format!("invalid viewport '{raw}'; expected WIDTHxHEIGHT"))?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid viewport width in '{raw}': {err}"))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid viewport height in '{raw}': {err}"))?;
    Ok(Viewport::new(width, height))
}

impl RenderConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RenderConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let name = &self.render_thread.name;
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "render_thread.name may not be empty".into(),
            ));
        }
        if name.contains('\0') {
            return Err(ConfigError::Invalid(
                "render_thread.name may not contain NUL bytes".into(),
            ));
        }

        let units = self.caches.texture_units;
        if units == 0 || units > MAX_TEXTURE_UNITS {
            return Err(ConfigError::Invalid(format!(
                "caches.texture_units must be between 1 and {MAX_TEXTURE_UNITS}, got {units}"
            )));
        }

        if self.probe.cycles == 0 {
            return Err(ConfigError::Invalid("probe.cycles must be > 0".into()));
        }

        let viewport = self.probe.viewport;
        if viewport.width == 0 || viewport.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "probe.viewport must be non-empty, got {}x{}",
                viewport.width, viewport.height
            )));
        }

        Ok(())
    }

    pub fn render_state_options(&self) -> RenderStateOptions {
        RenderStateOptions {
            debug_overdraw: self.caches.debug_overdraw,
            texture_units: self.caches.texture_units,
        }
    }

    pub fn render_thread_options(&self) -> RenderThreadOptions {
        RenderThreadOptions {
            name: self.render_thread.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_document() {
        let config = RenderConfig::from_toml_str(
            r#"
version = 1

[render_thread]
name = "hwui-render"

[caches]
debug_overdraw = true
texture_units = 8

[probe]
cycles = 3
viewport = "1280x720"
framebuffer = 5
functor_calls = 2
layers = 0
releases = 9
"#,
        )
        .unwrap();

        assert_eq!(config.render_thread.name, "hwui-render");
        assert_eq!(
            config.render_state_options(),
            RenderStateOptions {
                debug_overdraw: true,
                texture_units: 8,
            }
        );
        assert_eq!(config.render_thread_options().name, "hwui-render");
        assert_eq!(config.probe.cycles, 3);
        assert_eq!(config.probe.viewport, Viewport::new(1280, 720));
        assert_eq!(config.probe.framebuffer, 5);
        assert_eq!(config.probe.functor_calls, 2);
        assert_eq!(config.probe.layers, 0);
        assert_eq!(config.probe.releases, 9);
    }

    #[test]
    fn sections_default_when_missing() {
        let config = RenderConfig::from_toml_str("version = 1\n").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.render_state_options(), RenderStateOptions::default());
    }

    #[test]
    fn viewport_accepts_pair_form() {
        let config = RenderConfig::from_toml_str(
            r#"
version = 1
[probe]
viewport = [640, 480]
"#,
        )
        .unwrap();
        assert_eq!(config.probe.viewport, Viewport::new(640, 480));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = RenderConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(err.to_string().contains("version 2"), "{err}");
    }

    #[test]
    fn rejects_malformed_viewport() {
        let err = RenderConfig::from_toml_str(
            r#"
version = 1
[probe]
viewport = "wide"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn rejects_empty_viewport() {
        let err = RenderConfig::from_toml_str(
            r#"
version = 1
[probe]
viewport = "0x600"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-empty"), "{err}");
    }

    #[test]
    fn rejects_out_of_range_texture_units() {
        for units in [0, MAX_TEXTURE_UNITS + 1] {
            let input = format!("version = 1\n[caches]\ntexture_units = {units}\n");
            let err = RenderConfig::from_toml_str(&input).unwrap_err();
            assert!(err.to_string().contains("texture_units"), "{err}");
        }
    }

    #[test]
    fn rejects_blank_thread_name() {
        let err = RenderConfig::from_toml_str(
            r#"
version = 1
[render_thread]
name = "  "
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("render_thread.name"), "{err}");
    }

    #[test]
    fn parse_viewport_trims_and_ignores_case() {
        assert_eq!(parse_viewport(" 320X240 ").unwrap(), Viewport::new(320, 240));
        assert!(parse_viewport("320").is_err());
        assert!(parse_viewport("x240").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "version = 1\n[probe]\ncycles = 7").unwrap();
        let config = RenderConfig::load(file.path()).unwrap();
        assert_eq!(config.probe.cycles, 7);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RenderConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.toml"), "{err}");
    }
}
