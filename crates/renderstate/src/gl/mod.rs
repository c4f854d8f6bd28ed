//! Driver seam for everything the coordinator and its state objects send to GL.
//!
//! `GlApi` covers only the calls this crate issues, one method per entry
//! point, so a recorded call log reads like a driver trace.
//! - `recording` keeps an in-memory log of every call (tests, probe harness).
//! - `glow` (feature `glow`) forwards to a real `glow::HasContext`.

#[cfg(feature = "glow")]
mod glow;
mod recording;

#[cfg(feature = "glow")]
pub use self::glow::GlowGl;
pub use recording::{GlCall, RecordingGl};

/// GL object name. `0` is the default framebuffer / "nothing bound".
pub type GlName = u32;

/// Server-side capabilities toggled through `glEnable`/`glDisable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    ScissorTest,
    StencilTest,
}

/// Buffer binding points used by the mesh state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Texture binding points tracked per texture unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2d,
    External,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilFunc {
    Always,
    Equal,
    Less,
    LessOrEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Replace,
    Incr,
}

/// Buffers cleared by a `clear` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClearBuffer {
    Color,
    Stencil,
}

/// Graphics API calls issued by the render-state subsystem.
///
/// Every method mirrors one GL entry point. Implementations must be driven
/// from the thread that owns the context; the coordinator checks that before
/// it reaches the backend.
pub trait GlApi {
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn bind_framebuffer(&self, framebuffer: GlName);
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear(&self, buffer: ClearBuffer);
    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn stencil_func(&self, func: StencilFunc, reference: i32, mask: u32);
    fn stencil_op(&self, stencil_fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp);
    fn stencil_mask(&self, mask: u32);
    fn clear_stencil(&self, value: i32);
    fn bind_buffer(&self, target: BufferTarget, buffer: GlName);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    /// Float attribute pointer into the currently bound array buffer.
    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: i32, offset: i32);
    fn use_program(&self, program: GlName);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: TextureTarget, texture: GlName);
    fn create_texture(&self) -> GlName;
    fn delete_texture(&self, texture: GlName);
}
