//! Cached GL binding state, split into four disjoint slices.
//!
//! Each object remembers what it last told the driver and skips calls that
//! would not change anything. The cache is only trustworthy while nothing
//! else touches the same state; `invalidate()` drops the assumption so the
//! next request is re-applied unconditionally.
//! - `blend` owns `GL_BLEND` and the blend function.
//! - `mesh` owns array/index buffer bindings and vertex attribute pointers.
//! - `scissor` owns `GL_SCISSOR_TEST` and the scissor rectangle.
//! - `stencil` owns `GL_STENCIL_TEST`, stencil func/op and the debug modes.

mod blend;
mod mesh;
mod scissor;
mod stencil;

pub use blend::Blend;
pub use mesh::{MeshState, POSITION_SLOT, TEX_COORDS_SLOT};
pub use scissor::Scissor;
pub use stencil::{Stencil, StencilMode};

/// The four state objects that exist exactly while a GL context is alive.
#[derive(Debug, Default)]
pub struct StateObjects {
    pub blend: Blend,
    pub mesh: MeshState,
    pub scissor: Scissor,
    pub stencil: Stencil,
}

impl StateObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every cached binding across all four objects.
    pub fn invalidate_all(&mut self) {
        self.blend.invalidate();
        self.mesh.invalidate();
        self.scissor.invalidate();
        self.stencil.invalidate();
    }
}
