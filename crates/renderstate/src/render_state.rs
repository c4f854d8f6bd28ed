use std::sync::Arc;

use crate::atlas::{AssetAtlas, AtlasEntry, AtlasEntryId};
use crate::caches::{Caches, Program, ResourceCache};
use crate::context::ContextManager;
use crate::gl::{GlApi, GlName};
use crate::layer::{Layer, LayerRegistry};
use crate::state::{Blend, MeshState, Scissor, StateObjects, Stencil};
use crate::task::{TaskQueue, TaskQueueError};
use crate::thread::OwnerThread;
use crate::types::{DrawGlInfo, DrawGlMode, RenderStateOptions, Viewport};

const LIFECYCLE_VIOLATION: &str = "State object lifecycle not managed correctly";
const NO_CONTEXT: &str = "render state used without a live GL context";

/// Services the owning render thread provides to the coordinator.
pub struct ThreadServices {
    queue: TaskQueue,
    context: Box<dyn ContextManager + Send>,
}

impl ThreadServices {
    pub fn new(queue: TaskQueue, context: impl ContextManager + Send + 'static) -> Self {
        Self {
            queue,
            context: Box::new(context),
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn context_manager(&mut self) -> &mut dyn ContextManager {
        self.context.as_mut()
    }
}

impl std::fmt::Debug for ThreadServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadServices")
            .field("queue", &self.queue)
            .field("has_context", &self.context.has_context())
            .finish()
    }
}

/// Externally supplied callback that may issue arbitrary GL calls mid-frame.
pub trait Functor {
    fn invoke(&mut self, gl: &dyn GlApi, mode: DrawGlMode, info: &mut DrawGlInfo);
}

impl<F> Functor for F
where
    F: FnMut(&dyn GlApi, DrawGlMode, &mut DrawGlInfo),
{
    fn invoke(&mut self, gl: &dyn GlApi, mode: DrawGlMode, info: &mut DrawGlInfo) {
        self(gl, mode, info)
    }
}

/// Where the coordinator is in the functor protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctorPhase {
    Idle,
    Interrupted,
}

/// Owns the cached GL binding state for one render thread.
///
/// The four state objects exist exactly between `on_context_created` and
/// `on_context_destroyed`. Every mutating call checks that it runs on the
/// thread that built the coordinator; there is no locking.
pub struct RenderState<G: GlApi, C: ResourceCache = Caches> {
    owner: OwnerThread,
    thread: ThreadServices,
    gl: G,
    options: RenderStateOptions,
    viewport: Viewport,
    framebuffer: GlName,
    objects: Option<StateObjects>,
    caches: Option<C>,
    atlas: AssetAtlas,
    layers: LayerRegistry,
    phase: FunctorPhase,
    generation: u64,
}

impl<G: GlApi, C: ResourceCache> RenderState<G, C> {
    /// Builds the coordinator and captures the calling thread as its owner.
    pub fn new(thread: ThreadServices, gl: G, options: RenderStateOptions) -> Self {
        let owner = OwnerThread::capture();
        tracing::debug!(
            owner = ?owner.id(),
            name = owner.name().unwrap_or("<unnamed>"),
            "render state created"
        );
        Self {
            owner,
            thread,
            gl,
            options,
            viewport: Viewport::default(),
            framebuffer: 0,
            objects: None,
            caches: None,
            atlas: AssetAtlas::new(),
            layers: LayerRegistry::new(),
            phase: FunctorPhase::Idle,
            generation: 0,
        }
    }

    /// Creates the state objects for a freshly created context.
    ///
    /// Panics if they already exist: a second create without a destroy in
    /// between means the context lifecycle is being driven incorrectly.
    pub fn on_context_created(&mut self) {
        self.owner.assert_current();
        if self.objects.is_some() {
            panic!("{LIFECYCLE_VIOLATION}");
        }
        self.objects = Some(StateObjects::new());
        // A new context starts out rendering to the default framebuffer.
        self.framebuffer = 0;
        self.phase = FunctorPhase::Idle;

        let gl: &dyn GlApi = &self.gl;
        // Deferred to here: building the cache already issues GL calls.
        let caches = self
            .caches
            .get_or_insert_with(|| C::create(gl, &self.options));
        caches.init(gl);
        caches.set_asset_atlas(&self.atlas);

        self.generation += 1;
        tracing::debug!(generation = self.generation, "GL context created");
    }

    /// Tears everything down ahead of context destruction.
    ///
    /// Layers hear about the loss before the cache they may reference is
    /// terminated.
    pub fn on_context_destroyed(&mut self) {
        self.owner.assert_current();
        if self.objects.is_none() {
            tracing::warn!("context destroyed without a matching create");
            return;
        }

        let notified = self.layers.notify_context_lost();
        let gl: &dyn GlApi = &self.gl;
        self.atlas.terminate(gl);
        if let Some(caches) = self.caches.as_mut() {
            caches.terminate(gl);
        }
        self.objects = None;
        self.phase = FunctorPhase::Idle;

        tracing::debug!(
            generation = self.generation,
            layers_notified = notified,
            "GL context destroyed"
        );
    }

    /// Whether the four state objects currently exist.
    pub fn has_state_objects(&self) -> bool {
        self.objects.is_some()
    }

    /// Number of contexts created over the coordinator's lifetime.
    pub fn context_generation(&self) -> u64 {
        self.generation
    }

    /// Stores and applies the viewport. Always issues the call.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.owner.assert_current();
        self.viewport = Viewport::new(width, height);
        self.gl.viewport(0, 0, gl_size(width), gl_size(height));
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Binds `framebuffer`, skipping the call when it is already bound.
    ///
    /// Assumes nothing else rebinds the framebuffer behind the coordinator's
    /// back outside a functor bracket.
    pub fn bind_framebuffer(&mut self, framebuffer: GlName) {
        self.owner.assert_current();
        if self.framebuffer != framebuffer {
            self.framebuffer = framebuffer;
            self.gl.bind_framebuffer(framebuffer);
        } else {
            tracing::trace!(framebuffer, "framebuffer already bound");
        }
    }

    pub fn framebuffer(&self) -> GlName {
        self.framebuffer
    }

    /// Runs `functor` between an interrupt and a resume.
    ///
    /// The resume also runs when the functor panics, so the cached state is
    /// resynchronized before the panic continues unwinding.
    pub fn invoke_functor<F>(&mut self, functor: &mut F, mode: DrawGlMode, info: &mut DrawGlInfo)
    where
        F: Functor + ?Sized,
    {
        let bracket = FunctorBracket::enter(self);
        functor.invoke(bracket.gl(), mode, info);
        drop(bracket);
    }

    /// Strips every binding the coordinator believes it controls so foreign
    /// GL code starts from a state the caches agree with.
    pub fn interrupt_for_functor_invoke(&mut self) {
        self.owner.assert_current();
        if self.phase == FunctorPhase::Interrupted {
            tracing::warn!("interrupt requested while already interrupted");
        }

        let gl: &dyn GlApi = &self.gl;
        let caches = self.caches.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        let current_program = caches.current_program_mut();
        if current_program.as_ref().is_some_and(Program::is_in_use) {
            if let Some(mut program) = current_program.take() {
                program.remove(gl);
            }
        }
        caches.texture_state_mut().reset_active_texture();

        let objects = self.objects.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        objects.mesh.unbind_mesh_buffer(gl);
        objects.mesh.unbind_indices_buffer(gl);
        objects.mesh.reset_vertex_pointers();
        objects.mesh.disable_tex_coords_vertex_array(gl);

        self.debug_overdraw(false, false);
        self.phase = FunctorPhase::Interrupted;
        tracing::trace!("interrupted for functor");
    }

    /// Restores the state the renderer relies on after foreign GL code ran.
    pub fn resume_from_functor_invoke(&mut self) {
        self.owner.assert_current();
        self.gl.viewport(
            0,
            0,
            gl_size(self.viewport.width),
            gl_size(self.viewport.height),
        );
        self.gl.bind_framebuffer(self.framebuffer);
        self.debug_overdraw(false, false);

        self.gl.clear_color(0.0, 0.0, 0.0, 0.0);

        let objects = self.objects.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        objects.scissor.invalidate();
        objects.blend.invalidate();

        let gl: &dyn GlApi = &self.gl;
        let caches = self.caches.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        let texture_state = caches.texture_state_mut();
        texture_state.activate_texture(gl, 0);
        texture_state.reset_bound_textures();

        self.phase = FunctorPhase::Idle;
        tracing::trace!("resumed after functor");
    }

    pub fn functor_phase(&self) -> FunctorPhase {
        self.phase
    }

    /// Turns stencil-based overdraw accounting on or off.
    ///
    /// Only acts when the cache enables overdraw debugging and the default
    /// framebuffer is bound.
    pub fn debug_overdraw(&mut self, enable: bool, clear: bool) {
        self.owner.assert_current();
        let active = self
            .caches
            .as_ref()
            .is_some_and(|caches| caches.debug_overdraw());
        if !active || self.framebuffer != 0 {
            return;
        }

        let gl: &dyn GlApi = &self.gl;
        let objects = self.objects.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        if clear {
            objects.scissor.set_enabled(gl, false);
            objects.stencil.clear(gl);
        }
        if enable {
            objects.stencil.enable_debug_write(gl);
        } else {
            objects.stencil.disable(gl);
        }
    }

    /// Marshals the release of `object` onto the owning thread's queue.
    pub fn schedule_release<T>(&self, object: T) -> Result<(), TaskQueueError>
    where
        T: Send + 'static,
    {
        self.thread.queue().schedule_release(object)
    }

    /// Queue handle other threads can use to reach this render thread.
    pub fn queue(&self) -> &TaskQueue {
        self.thread.queue()
    }

    /// Panics unless called from the owning thread.
    #[track_caller]
    pub fn assert_owner_thread(&self) {
        self.owner.assert_current();
    }

    pub fn owner(&self) -> &OwnerThread {
        &self.owner
    }

    /// Makes sure a valid context is current. A failure is fatal.
    pub fn require_context(&mut self) {
        self.owner.assert_current();
        if let Err(err) = self.thread.context_manager().require_context() {
            panic!("unable to provide a current GL context: {err}");
        }
    }

    pub fn register_layer(&mut self, layer: &Arc<dyn Layer>) -> bool {
        self.owner.assert_current();
        self.layers.register(layer)
    }

    pub fn unregister_layer(&mut self, layer: &Arc<dyn Layer>) -> bool {
        self.owner.assert_current();
        self.layers.unregister(layer)
    }

    pub fn active_layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Uploads the shared atlas and points the texture cache at it.
    pub fn init_asset_atlas(
        &mut self,
        width: u32,
        height: u32,
        entries: impl IntoIterator<Item = (AtlasEntryId, AtlasEntry)>,
    ) -> bool {
        self.owner.assert_current();
        if self.objects.is_none() {
            panic!("{NO_CONTEXT}");
        }
        let initialized = self.atlas.init(&self.gl, width, height, entries);
        if let Some(caches) = self.caches.as_mut() {
            caches.set_asset_atlas(&self.atlas);
        }
        initialized
    }

    pub fn asset_atlas(&self) -> &AssetAtlas {
        &self.atlas
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }

    pub fn blend(&mut self) -> &mut Blend {
        &mut self.objects_mut().blend
    }

    pub fn mesh_state(&mut self) -> &mut MeshState {
        &mut self.objects_mut().mesh
    }

    pub fn scissor(&mut self) -> &mut Scissor {
        &mut self.objects_mut().scissor
    }

    pub fn stencil(&mut self) -> &mut Stencil {
        &mut self.objects_mut().stencil
    }

    /// GL backend plus the state objects, for driving a state object.
    pub fn split_state(&mut self) -> (&G, &mut StateObjects) {
        self.owner.assert_current();
        let objects = self.objects.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        (&self.gl, objects)
    }

    /// GL backend plus the resource cache.
    pub fn split_caches(&mut self) -> (&G, &mut C) {
        self.owner.assert_current();
        let caches = self.caches.as_mut().unwrap_or_else(|| panic!("{NO_CONTEXT}"));
        (&self.gl, caches)
    }

    fn objects_mut(&mut self) -> &mut StateObjects {
        self.split_state().1
    }
}

impl<G: GlApi, C: ResourceCache> Drop for RenderState<G, C> {
    fn drop(&mut self) {
        if self.objects.is_some() && !std::thread::panicking() {
            panic!("{LIFECYCLE_VIOLATION}");
        }
    }
}

impl<G: GlApi, C: ResourceCache> std::fmt::Debug for RenderState<G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderState")
            .field("owner", &self.owner)
            .field("viewport", &self.viewport)
            .field("framebuffer", &self.framebuffer)
            .field("has_state_objects", &self.objects.is_some())
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

/// Interrupted state that resumes when dropped.
struct FunctorBracket<'a, G: GlApi, C: ResourceCache> {
    state: &'a mut RenderState<G, C>,
}

impl<'a, G: GlApi, C: ResourceCache> FunctorBracket<'a, G, C> {
    fn enter(state: &'a mut RenderState<G, C>) -> Self {
        state.interrupt_for_functor_invoke();
        Self { state }
    }

    fn gl(&self) -> &dyn GlApi {
        &self.state.gl
    }
}

impl<G: GlApi, C: ResourceCache> Drop for FunctorBracket<'_, G, C> {
    fn drop(&mut self) {
        self.state.resume_from_functor_invoke();
    }
}

fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
