use std::num::NonZeroU32;

use glow::HasContext;

use super::{
    BlendFactor, BufferTarget, Capability, ClearBuffer, GlApi, GlName, StencilFunc, StencilOp,
    TextureTarget,
};

// GL_OES_EGL_image_external
const TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

/// [`GlApi`] backed by a `glow` context.
///
/// Every call goes straight to the driver. The wrapper adds no caching of its
/// own; deduplication is the state objects' job.
pub struct GlowGl {
    gl: glow::Context,
}

impl GlowGl {
    /// Wraps a loaded context.
    ///
    /// # Safety
    ///
    /// `gl` must belong to a context that is current on the thread that will
    /// own the coordinator, for as long as this value is used.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

impl std::fmt::Debug for GlowGl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowGl").finish_non_exhaustive()
    }
}

fn capability(value: Capability) -> u32 {
    match value {
        Capability::Blend => glow::BLEND,
        Capability::ScissorTest => glow::SCISSOR_TEST,
        Capability::StencilTest => glow::STENCIL_TEST,
    }
}

fn blend_factor(value: BlendFactor) -> u32 {
    match value {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

fn stencil_func(value: StencilFunc) -> u32 {
    match value {
        StencilFunc::Always => glow::ALWAYS,
        StencilFunc::Equal => glow::EQUAL,
        StencilFunc::Less => glow::LESS,
        StencilFunc::LessOrEqual => glow::LEQUAL,
    }
}

fn stencil_op(value: StencilOp) -> u32 {
    match value {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::Incr => glow::INCR,
    }
}

fn texture_target(value: TextureTarget) -> u32 {
    match value {
        TextureTarget::Texture2d => glow::TEXTURE_2D,
        TextureTarget::External => TEXTURE_EXTERNAL_OES,
    }
}

impl GlApi for GlowGl {
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn bind_framebuffer(&self, framebuffer: GlName) {
        let framebuffer = NonZeroU32::new(framebuffer).map(glow::NativeFramebuffer);
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.gl.clear_color(red, green, blue, alpha) }
    }

    fn clear(&self, buffer: ClearBuffer) {
        let mask = match buffer {
            ClearBuffer::Color => glow::COLOR_BUFFER_BIT,
            ClearBuffer::Stencil => glow::STENCIL_BUFFER_BIT,
        };
        unsafe { self.gl.clear(mask) }
    }

    fn enable(&self, capability_value: Capability) {
        unsafe { self.gl.enable(capability(capability_value)) }
    }

    fn disable(&self, capability_value: Capability) {
        unsafe { self.gl.disable(capability(capability_value)) }
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) }
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn stencil_func(&self, func: StencilFunc, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func(stencil_func(func), reference, mask) }
    }

    fn stencil_op(&self, stencil_fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        unsafe {
            self.gl.stencil_op(
                stencil_op(stencil_fail),
                stencil_op(depth_fail),
                stencil_op(depth_pass),
            )
        }
    }

    fn stencil_mask(&self, mask: u32) {
        unsafe { self.gl.stencil_mask(mask) }
    }

    fn clear_stencil(&self, value: i32) {
        unsafe { self.gl.clear_stencil(value) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: GlName) {
        let target = match target {
            BufferTarget::Array => glow::ARRAY_BUFFER,
            BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        };
        let buffer = NonZeroU32::new(buffer).map(glow::NativeBuffer);
        unsafe { self.gl.bind_buffer(target, buffer) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, stride, offset)
        }
    }

    fn use_program(&self, program: GlName) {
        let program = NonZeroU32::new(program).map(glow::NativeProgram);
        unsafe { self.gl.use_program(program) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, target: TextureTarget, texture: GlName) {
        let texture = NonZeroU32::new(texture).map(glow::NativeTexture);
        unsafe { self.gl.bind_texture(texture_target(target), texture) }
    }

    fn create_texture(&self) -> GlName {
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => texture.0.get(),
            Err(err) => {
                tracing::error!(%err, "glGenTextures failed");
                0
            }
        }
    }

    fn delete_texture(&self, texture: GlName) {
        if let Some(name) = NonZeroU32::new(texture) {
            unsafe { self.gl.delete_texture(glow::NativeTexture(name)) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_map_to_enable_caps() {
        assert_eq!(capability(Capability::Blend), glow::BLEND);
        assert_eq!(capability(Capability::ScissorTest), glow::SCISSOR_TEST);
        assert_eq!(capability(Capability::StencilTest), glow::STENCIL_TEST);
    }

    #[test]
    fn blend_factors_map_to_gl_enums() {
        assert_eq!(blend_factor(BlendFactor::Zero), glow::ZERO);
        assert_eq!(blend_factor(BlendFactor::One), glow::ONE);
        assert_eq!(blend_factor(BlendFactor::SrcAlpha), glow::SRC_ALPHA);
        assert_eq!(
            blend_factor(BlendFactor::OneMinusSrcAlpha),
            glow::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(blend_factor(BlendFactor::DstAlpha), glow::DST_ALPHA);
        assert_eq!(
            blend_factor(BlendFactor::OneMinusDstAlpha),
            glow::ONE_MINUS_DST_ALPHA
        );
    }

    #[test]
    fn stencil_funcs_and_ops_map_to_gl_enums() {
        assert_eq!(stencil_func(StencilFunc::Always), glow::ALWAYS);
        assert_eq!(stencil_func(StencilFunc::Equal), glow::EQUAL);
        assert_eq!(stencil_func(StencilFunc::Less), glow::LESS);
        assert_eq!(stencil_func(StencilFunc::LessOrEqual), glow::LEQUAL);

        assert_eq!(stencil_op(StencilOp::Keep), glow::KEEP);
        assert_eq!(stencil_op(StencilOp::Replace), glow::REPLACE);
        assert_eq!(stencil_op(StencilOp::Incr), glow::INCR);
    }

    #[test]
    fn external_textures_use_the_oes_target() {
        assert_eq!(texture_target(TextureTarget::Texture2d), glow::TEXTURE_2D);
        assert_eq!(texture_target(TextureTarget::External), 0x8D65);
    }
}
