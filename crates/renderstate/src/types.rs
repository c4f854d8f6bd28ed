/// Texture units the renderer relies on being available.
pub const DEFAULT_TEXTURE_UNITS: usize = 4;

/// Options the coordinator hands to its resource cache on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStateOptions {
    /// Visualise overdraw through the stencil buffer when drawing to the
    /// default framebuffer.
    pub debug_overdraw: bool,
    /// Number of texture units tracked by the texture state.
    pub texture_units: usize,
}

impl Default for RenderStateOptions {
    fn default() -> Self {
        Self {
            debug_overdraw: false,
            texture_units: DEFAULT_TEXTURE_UNITS,
        }
    }
}

/// Last dimensions passed to `set_viewport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Why a functor is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawGlMode {
    /// Draw into the current framebuffer.
    Draw,
    /// Run pending work that needs the context but draws nothing.
    Process,
    /// Like `Process`, but the context is gone; GL must not be touched.
    ProcessNoContext,
    /// Synchronise UI-thread state before the next frame.
    Sync,
}

/// Frame information passed to a functor alongside its mode.
///
/// The functor may write back a dirty rectangle and status flags.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawGlInfo {
    pub clip_left: i32,
    pub clip_top: i32,
    pub clip_right: i32,
    pub clip_bottom: i32,
    pub width: i32,
    pub height: i32,
    pub is_layer: bool,
    /// Column-major 4x4 transform.
    pub transform: [f32; 16],
    pub dirty_left: f32,
    pub dirty_top: f32,
    pub dirty_right: f32,
    pub dirty_bottom: f32,
    pub status: FunctorStatus,
}

impl DrawGlInfo {
    /// Full-surface info with an identity transform.
    pub fn for_surface(width: i32, height: i32) -> Self {
        let mut transform = [0.0; 16];
        transform[0] = 1.0;
        transform[5] = 1.0;
        transform[10] = 1.0;
        transform[15] = 1.0;
        Self {
            clip_left: 0,
            clip_top: 0,
            clip_right: width,
            clip_bottom: height,
            width,
            height,
            is_layer: false,
            transform,
            dirty_left: 0.0,
            dirty_top: 0.0,
            dirty_right: 0.0,
            dirty_bottom: 0.0,
            status: FunctorStatus::Done,
        }
    }
}

/// Result a functor reports through [`DrawGlInfo::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctorStatus {
    #[default]
    Done,
    /// The functor drew and its dirty rectangle is valid.
    Drew,
    /// The functor wants to be invoked again with `DrawGlMode::Process`.
    Invoke,
}
