use crate::gl::{Capability, GlApi};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScissorRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Cache for `GL_SCISSOR_TEST` and the scissor box.
#[derive(Debug)]
pub struct Scissor {
    enabled: Option<bool>,
    rect: Option<ScissorRect>,
}

impl Default for Scissor {
    fn default() -> Self {
        Self {
            enabled: Some(false),
            rect: Some(ScissorRect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            }),
        }
    }
}

impl Scissor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles the scissor test. Returns whether a driver call was issued.
    pub fn set_enabled(&mut self, gl: &dyn GlApi, enabled: bool) -> bool {
        if self.enabled == Some(enabled) {
            return false;
        }
        if enabled {
            gl.enable(Capability::ScissorTest);
        } else {
            gl.disable(Capability::ScissorTest);
        }
        self.enabled = Some(enabled);
        true
    }

    /// Sets the scissor box. Negative origins are clipped into the target,
    /// shrinking the box accordingly. Returns whether a driver call was issued.
    pub fn set(&mut self, gl: &dyn GlApi, x: i32, y: i32, width: i32, height: i32) -> bool {
        let (x, width) = clip_origin(x, width);
        let (y, height) = clip_origin(y, height);
        let rect = ScissorRect {
            x,
            y,
            width,
            height,
        };
        if self.rect == Some(rect) {
            return false;
        }
        gl.scissor(x, y, width, height);
        self.rect = Some(rect);
        true
    }

    /// Forgets the cached box but keeps the enabled state.
    pub fn reset(&mut self) {
        self.rect = None;
    }

    pub fn invalidate(&mut self) {
        self.enabled = None;
        self.rect = None;
    }

    pub fn is_synced(&self) -> bool {
        self.enabled.is_some() || self.rect.is_some()
    }

    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }
}

fn clip_origin(origin: i32, extent: i32) -> (i32, i32) {
    if origin < 0 {
        (0, extent.saturating_add(origin).max(0))
    } else {
        (origin, extent.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCall, RecordingGl};

    #[test]
    fn same_box_twice_issues_one_call() {
        let gl = RecordingGl::new();
        let mut scissor = Scissor::new();
        assert!(scissor.set(&gl, 10, 20, 30, 40));
        assert!(!scissor.set(&gl, 10, 20, 30, 40));
        assert_eq!(gl.len(), 1);
    }

    #[test]
    fn negative_origin_is_clipped() {
        let gl = RecordingGl::new();
        let mut scissor = Scissor::new();
        scissor.set(&gl, -5, 4, 20, 10);
        assert_eq!(
            gl.calls(),
            vec![GlCall::Scissor {
                x: 0,
                y: 4,
                width: 15,
                height: 10
            }]
        );
    }

    #[test]
    fn invalidated_scissor_reissues_disable() {
        let gl = RecordingGl::new();
        let mut scissor = Scissor::new();
        assert!(!scissor.set_enabled(&gl, false));

        scissor.invalidate();
        assert!(!scissor.is_synced());
        assert!(scissor.set_enabled(&gl, false));
        assert_eq!(gl.calls(), vec![GlCall::Disable(Capability::ScissorTest)]);
    }

    #[test]
    fn reset_keeps_enable_state() {
        let gl = RecordingGl::new();
        let mut scissor = Scissor::new();
        scissor.set_enabled(&gl, true);
        scissor.reset();
        assert_eq!(scissor.enabled(), Some(true));
        assert!(scissor.set(&gl, 0, 0, 0, 0));
    }
}
