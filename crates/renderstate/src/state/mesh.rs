use crate::gl::{BufferTarget, GlApi, GlName};

/// Attribute slot bound to vertex positions.
pub const POSITION_SLOT: u32 = 0;
/// Attribute slot bound to texture coordinates.
pub const TEX_COORDS_SLOT: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct VertexPointer {
    offset: i32,
    stride: i32,
}

/// Cache for buffer bindings and the position/texcoord attribute pointers.
#[derive(Debug)]
pub struct MeshState {
    mesh_buffer: Option<GlName>,
    indices_buffer: Option<GlName>,
    position_pointer: Option<VertexPointer>,
    tex_coords_pointer: Option<VertexPointer>,
    tex_coords_enabled: Option<bool>,
}

impl Default for MeshState {
    fn default() -> Self {
        Self {
            mesh_buffer: Some(0),
            indices_buffer: Some(0),
            position_pointer: None,
            tex_coords_pointer: None,
            tex_coords_enabled: Some(false),
        }
    }
}

impl MeshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `buffer` as the array buffer. Returns whether the binding changed.
    pub fn bind_mesh_buffer(&mut self, gl: &dyn GlApi, buffer: GlName) -> bool {
        if self.mesh_buffer == Some(buffer) {
            return false;
        }
        gl.bind_buffer(BufferTarget::Array, buffer);
        self.mesh_buffer = Some(buffer);
        true
    }

    pub fn unbind_mesh_buffer(&mut self, gl: &dyn GlApi) -> bool {
        self.bind_mesh_buffer(gl, 0)
    }

    pub fn bind_indices_buffer(&mut self, gl: &dyn GlApi, buffer: GlName) -> bool {
        if self.indices_buffer == Some(buffer) {
            return false;
        }
        gl.bind_buffer(BufferTarget::ElementArray, buffer);
        self.indices_buffer = Some(buffer);
        true
    }

    pub fn unbind_indices_buffer(&mut self, gl: &dyn GlApi) -> bool {
        self.bind_indices_buffer(gl, 0)
    }

    /// Points the position attribute at `offset` into the bound array buffer.
    pub fn bind_position_vertex_pointer(&mut self, gl: &dyn GlApi, offset: i32, stride: i32) {
        let pointer = VertexPointer { offset, stride };
        if self.position_pointer != Some(pointer) {
            gl.vertex_attrib_pointer(POSITION_SLOT, 2, stride, offset);
            self.position_pointer = Some(pointer);
        }
    }

    pub fn bind_tex_coords_vertex_pointer(&mut self, gl: &dyn GlApi, offset: i32, stride: i32) {
        let pointer = VertexPointer { offset, stride };
        if self.tex_coords_pointer != Some(pointer) {
            gl.vertex_attrib_pointer(TEX_COORDS_SLOT, 2, stride, offset);
            self.tex_coords_pointer = Some(pointer);
        }
    }

    /// Forgets both attribute pointers so the next bind re-specifies them.
    pub fn reset_vertex_pointers(&mut self) {
        self.position_pointer = None;
        self.tex_coords_pointer = None;
    }

    pub fn enable_tex_coords_vertex_array(&mut self, gl: &dyn GlApi) {
        if self.tex_coords_enabled != Some(true) {
            gl.enable_vertex_attrib_array(TEX_COORDS_SLOT);
            self.tex_coords_enabled = Some(true);
        }
    }

    pub fn disable_tex_coords_vertex_array(&mut self, gl: &dyn GlApi) {
        if self.tex_coords_enabled != Some(false) {
            gl.disable_vertex_attrib_array(TEX_COORDS_SLOT);
            self.tex_coords_enabled = Some(false);
        }
    }

    pub fn invalidate(&mut self) {
        self.mesh_buffer = None;
        self.indices_buffer = None;
        self.tex_coords_enabled = None;
        self.reset_vertex_pointers();
    }

    pub fn is_synced(&self) -> bool {
        self.mesh_buffer.is_some()
            || self.indices_buffer.is_some()
            || self.tex_coords_enabled.is_some()
            || self.position_pointer.is_some()
            || self.tex_coords_pointer.is_some()
    }

    pub fn mesh_buffer(&self) -> Option<GlName> {
        self.mesh_buffer
    }

    pub fn indices_buffer(&self) -> Option<GlName> {
        self.indices_buffer
    }
}
