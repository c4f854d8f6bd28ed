use crate::gl::{Capability, ClearBuffer, GlApi, StencilFunc, StencilOp};

/// What the stencil buffer is currently being used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StencilMode {
    Disabled,
    Test,
    Write,
}

/// Cache for `GL_STENCIL_TEST` and the stencil configuration.
///
/// Only the mode is tracked; switching into a mode always reprograms the
/// stencil func/op for it.
#[derive(Debug)]
pub struct Stencil {
    mode: Option<StencilMode>,
}

impl Default for Stencil {
    fn default() -> Self {
        Self {
            mode: Some(StencilMode::Disabled),
        }
    }
}

impl Stencil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only draws where the stencil equals `increment_threshold` (or 1).
    pub fn enable_test(&mut self, gl: &dyn GlApi, increment_threshold: i32) {
        if self.mode == Some(StencilMode::Test) {
            return;
        }
        self.enable(gl);
        let reference = if increment_threshold > 0 {
            increment_threshold
        } else {
            0x1
        };
        gl.stencil_func(StencilFunc::Equal, reference, 0xff);
        gl.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
        gl.stencil_mask(0);
        self.mode = Some(StencilMode::Test);
    }

    /// Writes clip geometry into the stencil. A positive threshold counts
    /// overlapping writes instead of replacing.
    pub fn enable_write(&mut self, gl: &dyn GlApi, increment_threshold: i32) {
        if self.mode == Some(StencilMode::Write) {
            return;
        }
        self.enable(gl);
        if increment_threshold > 0 {
            gl.stencil_func(StencilFunc::Always, 0x1, 0xff);
            gl.stencil_op(StencilOp::Keep, StencilOp::Incr, StencilOp::Incr);
        } else {
            gl.stencil_func(StencilFunc::Always, 0x1, 0xff);
            gl.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace);
        }
        gl.stencil_mask(0xff);
        self.mode = Some(StencilMode::Write);
    }

    /// Overdraw visualisation: draw where the counter equals (or exceeds) `level`.
    pub fn enable_debug_test(&mut self, gl: &dyn GlApi, level: i32, greater: bool) {
        self.enable(gl);
        let func = if greater {
            StencilFunc::Less
        } else {
            StencilFunc::Equal
        };
        gl.stencil_func(func, level, 0xffff_ffff);
        gl.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
        gl.stencil_mask(0);
        self.mode = Some(StencilMode::Test);
    }

    /// Overdraw accounting: every fragment bumps its stencil counter.
    pub fn enable_debug_write(&mut self, gl: &dyn GlApi) {
        self.enable(gl);
        gl.stencil_func(StencilFunc::Always, 0x1, 0xffff_ffff);
        gl.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Incr);
        gl.stencil_mask(0xff);
        self.mode = Some(StencilMode::Write);
    }

    pub fn disable(&mut self, gl: &dyn GlApi) {
        if self.mode != Some(StencilMode::Disabled) {
            gl.disable(Capability::StencilTest);
            self.mode = Some(StencilMode::Disabled);
        }
    }

    /// Zeroes the stencil buffer. Always reaches the driver.
    pub fn clear(&mut self, gl: &dyn GlApi) {
        gl.clear_stencil(0);
        gl.clear(ClearBuffer::Stencil);
    }

    pub fn invalidate(&mut self) {
        self.mode = None;
    }

    pub fn is_synced(&self) -> bool {
        self.mode.is_some()
    }

    pub fn mode(&self) -> Option<StencilMode> {
        self.mode
    }

    fn enable(&mut self, gl: &dyn GlApi) {
        if !matches!(self.mode, Some(StencilMode::Test | StencilMode::Write)) {
            gl.enable(Capability::StencilTest);
        }
    }
}
