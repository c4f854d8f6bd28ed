//! Render-thread coordinator for cached GL binding state.
//!
//! One [`RenderState`] lives on each render thread. It owns the four state
//! objects that mirror driver bindings, the lazily created resource cache,
//! the shared asset atlas and a registry of layers that must drop their GPU
//! handles when the context goes away. The overall flow is:
//!
//! ```text
//!   any thread                         render thread
//!   ──────────                         ─────────────
//!   TaskQueue::schedule_release ──▶ RenderThread loop ──▶ DeferredRelease::run
//!                                        │
//!                                        ▼
//!            on_context_created ──▶ RenderState ──▶ on_context_destroyed
//!                                        │                 │
//!                  invoke_functor ◀──────┤                 └─▶ layers, atlas, caches
//!                  (interrupt ▸ functor ▸ resume)
//! ```
//!
//! Nothing here locks. Every mutating entry point checks that it runs on the
//! thread that built the coordinator and panics otherwise, and the only way
//! in from another thread is the task queue.

pub mod atlas;
pub mod caches;
pub mod context;
pub mod gl;
pub mod layer;
mod render_state;
pub mod runtime;
pub mod state;
pub mod task;
pub mod thread;
pub mod types;

pub use atlas::{AssetAtlas, AtlasEntry, AtlasEntryId, AtlasTable};
pub use caches::{Caches, Program, ResourceCache, TextureCache, TextureLookup, TextureState};
pub use context::{ContextError, ContextManager, HeadlessContext};
pub use gl::{GlApi, GlCall, GlName, RecordingGl};
pub use layer::{Layer, LayerRegistry};
pub use render_state::{Functor, FunctorPhase, RenderState, ThreadServices};
pub use runtime::{RenderThread, RenderThreadOptions};
pub use state::{Blend, MeshState, Scissor, StateObjects, Stencil, StencilMode};
pub use task::{task_queue, DeferredRelease, RenderTask, TaskQueue, TaskQueueError, TaskReceiver};
pub use thread::OwnerThread;
pub use types::{
    DrawGlInfo, DrawGlMode, FunctorStatus, RenderStateOptions, Viewport, DEFAULT_TEXTURE_UNITS,
};
