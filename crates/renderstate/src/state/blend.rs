use crate::gl::{BlendFactor, Capability, GlApi};

/// Cache for `GL_BLEND` and `glBlendFunc`.
///
/// `None` means "unknown": the next request goes to the driver regardless of
/// what it asks for.
#[derive(Debug)]
pub struct Blend {
    enabled: Option<bool>,
    func: Option<(BlendFactor, BlendFactor)>,
}

impl Default for Blend {
    /// A fresh context starts with blending off and `(ONE, ZERO)`.
    fn default() -> Self {
        Self {
            enabled: Some(false),
            func: Some((BlendFactor::One, BlendFactor::Zero)),
        }
    }
}

impl Blend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, gl: &dyn GlApi, src: BlendFactor, dst: BlendFactor) {
        if self.enabled != Some(true) {
            gl.enable(Capability::Blend);
            self.enabled = Some(true);
        }
        if self.func != Some((src, dst)) {
            gl.blend_func(src, dst);
            self.func = Some((src, dst));
        }
    }

    pub fn disable(&mut self, gl: &dyn GlApi) {
        if self.enabled != Some(false) {
            gl.disable(Capability::Blend);
            self.enabled = Some(false);
        }
    }

    /// Drops the cached state without talking to the driver.
    pub fn invalidate(&mut self) {
        self.enabled = None;
        self.func = None;
    }

    pub fn is_synced(&self) -> bool {
        self.enabled.is_some() || self.func.is_some()
    }

    /// Last known `GL_BLEND` state, if still trusted.
    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingGl};

    #[test]
    fn repeated_enable_with_same_func_is_a_single_round_trip() {
        let gl = RecordingGl::new();
        let mut blend = Blend::new();
        blend.enable(&gl, BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
        blend.enable(&gl, BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

        assert_eq!(
            gl.calls(),
            vec![
                GlCall::Enable(Capability::Blend),
                GlCall::BlendFunc(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
            ]
        );
    }

    #[test]
    fn disable_on_fresh_context_is_free() {
        let gl = RecordingGl::new();
        let mut blend = Blend::new();
        blend.disable(&gl);
        assert!(gl.is_empty());
    }

    #[test]
    fn invalidate_forces_the_next_request_through() {
        let gl = RecordingGl::new();
        let mut blend = Blend::new();
        blend.invalidate();
        assert!(!blend.is_synced());

        blend.disable(&gl);
        assert_eq!(gl.calls(), vec![GlCall::Disable(Capability::Blend)]);
        assert!(blend.is_synced());
    }
}
