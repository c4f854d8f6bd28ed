use std::path::PathBuf;

use clap::Parser;
use renderstate::Viewport;

#[derive(Parser, Debug)]
#[command(
    name = "renderprobe",
    author,
    version,
    about = "Drive the render-state coordinator on a render thread and report its GL traffic"
)]
pub struct Cli {
    /// Scenario/config TOML file; can also be supplied via `RENDERPROBE_CONFIG`.
    #[arg(long, value_name = "FILE", env = "RENDERPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of context create/destroy cycles.
    #[arg(long, value_name = "COUNT")]
    pub cycles: Option<u32>,

    /// Viewport applied each cycle (e.g. `800x600`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_viewport)]
    pub viewport: Option<Viewport>,

    /// Framebuffer bound before functors run (0 = default framebuffer).
    #[arg(long, value_name = "ID")]
    pub framebuffer: Option<u32>,

    /// Functor invocations per cycle.
    #[arg(long, value_name = "COUNT")]
    pub functor_calls: Option<u32>,

    /// Layers registered per cycle.
    #[arg(long, value_name = "COUNT")]
    pub layers: Option<u32>,

    /// Objects released from the main thread per cycle.
    #[arg(long, value_name = "COUNT")]
    pub releases: Option<u32>,

    /// Enable stencil overdraw debugging in the resource cache.
    #[arg(long)]
    pub debug_overdraw: bool,

    /// Name of the render thread.
    #[arg(long, value_name = "NAME")]
    pub thread_name: Option<String>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_viewport(value: &str) -> Result<Viewport, String> {
    if value.trim().is_empty() {
        return Err("viewport must not be empty".to_string());
    }
    stateconfig::parse_viewport(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_parse() {
        let cli = Cli::try_parse_from([
            "renderprobe",
            "--cycles",
            "3",
            "--viewport",
            "640x480",
            "--debug-overdraw",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.cycles, Some(3));
        assert_eq!(cli.viewport, Some(Viewport::new(640, 480)));
        assert!(cli.debug_overdraw);
        assert!(cli.json);
        assert!(cli.framebuffer.is_none());
    }

    #[test]
    fn bad_viewport_is_rejected() {
        assert!(Cli::try_parse_from(["renderprobe", "--viewport", "big"]).is_err());
        assert!(parse_viewport(" ").is_err());
    }
}
