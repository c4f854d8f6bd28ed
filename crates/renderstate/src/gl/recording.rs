use std::cell::{Cell, RefCell};

use super::{
    BlendFactor, BufferTarget, Capability, ClearBuffer, GlApi, GlName, StencilFunc, StencilOp,
    TextureTarget,
};

/// One driver call captured by [`RecordingGl`].
#[derive(Clone, Debug, PartialEq)]
pub enum GlCall {
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    BindFramebuffer(GlName),
    ClearColor([f32; 4]),
    Clear(ClearBuffer),
    Enable(Capability),
    Disable(Capability),
    BlendFunc(BlendFactor, BlendFactor),
    Scissor { x: i32, y: i32, width: i32, height: i32 },
    StencilFunc(StencilFunc, i32, u32),
    StencilOp(StencilOp, StencilOp, StencilOp),
    StencilMask(u32),
    ClearStencil(i32),
    BindBuffer(BufferTarget, GlName),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        components: i32,
        stride: i32,
        offset: i32,
    },
    UseProgram(GlName),
    ActiveTexture(u32),
    BindTexture(TextureTarget, GlName),
    CreateTexture(GlName),
    DeleteTexture(GlName),
}

impl GlCall {
    /// Stable name of the GL entry point, used for summaries.
    pub fn entry_point(&self) -> &'static str {
        match self {
            GlCall::Viewport { .. } => "glViewport",
            GlCall::BindFramebuffer(_) => "glBindFramebuffer",
            GlCall::ClearColor(_) => "glClearColor",
            GlCall::Clear(_) => "glClear",
            GlCall::Enable(_) => "glEnable",
            GlCall::Disable(_) => "glDisable",
            GlCall::BlendFunc(..) => "glBlendFunc",
            GlCall::Scissor { .. } => "glScissor",
            GlCall::StencilFunc(..) => "glStencilFunc",
            GlCall::StencilOp(..) => "glStencilOp",
            GlCall::StencilMask(_) => "glStencilMask",
            GlCall::ClearStencil(_) => "glClearStencil",
            GlCall::BindBuffer(..) => "glBindBuffer",
            GlCall::EnableVertexAttribArray(_) => "glEnableVertexAttribArray",
            GlCall::DisableVertexAttribArray(_) => "glDisableVertexAttribArray",
            GlCall::VertexAttribPointer { .. } => "glVertexAttribPointer",
            GlCall::UseProgram(_) => "glUseProgram",
            GlCall::ActiveTexture(_) => "glActiveTexture",
            GlCall::BindTexture(..) => "glBindTexture",
            GlCall::CreateTexture(_) => "glGenTextures",
            GlCall::DeleteTexture(_) => "glDeleteTextures",
        }
    }
}

/// Backend that performs no driver work and logs every call in order.
///
/// The log lives in a `RefCell`, so the backend can move to the render
/// thread together with the coordinator but is never shared between threads.
#[derive(Debug)]
pub struct RecordingGl {
    calls: RefCell<Vec<GlCall>>,
    next_name: Cell<GlName>,
}

impl Default for RecordingGl {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            next_name: Cell::new(1),
        }
    }
}

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    /// Drains the log, returning what was recorded since the last take.
    pub fn take(&self) -> Vec<GlCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Counts recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: GlCall) {
        tracing::trace!(entry_point = call.entry_point(), ?call, "gl");
        self.calls.borrow_mut().push(call);
    }
}

impl GlApi for RecordingGl {
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn bind_framebuffer(&self, framebuffer: GlName) {
        self.record(GlCall::BindFramebuffer(framebuffer));
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.record(GlCall::ClearColor([red, green, blue, alpha]));
    }

    fn clear(&self, buffer: ClearBuffer) {
        self.record(GlCall::Clear(buffer));
    }

    fn enable(&self, capability: Capability) {
        self.record(GlCall::Enable(capability));
    }

    fn disable(&self, capability: Capability) {
        self.record(GlCall::Disable(capability));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(GlCall::BlendFunc(src, dst));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Scissor {
            x,
            y,
            width,
            height,
        });
    }

    fn stencil_func(&self, func: StencilFunc, reference: i32, mask: u32) {
        self.record(GlCall::StencilFunc(func, reference, mask));
    }

    fn stencil_op(&self, stencil_fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        self.record(GlCall::StencilOp(stencil_fail, depth_fail, depth_pass));
    }

    fn stencil_mask(&self, mask: u32) {
        self.record(GlCall::StencilMask(mask));
    }

    fn clear_stencil(&self, value: i32) {
        self.record(GlCall::ClearStencil(value));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: GlName) {
        self.record(GlCall::BindBuffer(target, buffer));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: i32, offset: i32) {
        self.record(GlCall::VertexAttribPointer {
            index,
            components,
            stride,
            offset,
        });
    }

    fn use_program(&self, program: GlName) {
        self.record(GlCall::UseProgram(program));
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: TextureTarget, texture: GlName) {
        self.record(GlCall::BindTexture(target, texture));
    }

    fn create_texture(&self) -> GlName {
        let name = self.next_name.get();
        self.next_name.set(name.wrapping_add(1).max(1));
        self.record(GlCall::CreateTexture(name));
        name
    }

    fn delete_texture(&self, texture: GlName) {
        self.record(GlCall::DeleteTexture(texture));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_issue_order() {
        let gl = RecordingGl::new();
        gl.viewport(0, 0, 10, 20);
        gl.bind_framebuffer(3);
        gl.enable(Capability::Blend);

        assert_eq!(
            gl.calls(),
            vec![
                GlCall::Viewport {
                    x: 0,
                    y: 0,
                    width: 10,
                    height: 20
                },
                GlCall::BindFramebuffer(3),
                GlCall::Enable(Capability::Blend),
            ]
        );
    }

    #[test]
    fn created_texture_names_are_unique_and_nonzero() {
        let gl = RecordingGl::new();
        let first = gl.create_texture();
        let second = gl.create_texture();
        assert_ne!(first, 0);
        assert_ne!(first, second);
    }

    #[test]
    fn take_drains_the_log() {
        let gl = RecordingGl::new();
        gl.use_program(0);
        assert_eq!(gl.take().len(), 1);
        assert!(gl.is_empty());
    }
}
