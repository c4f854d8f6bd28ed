use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use renderstate::{
    DrawGlInfo, DrawGlMode, GlApi, GlCall, HeadlessContext, Layer, RecordingGl, RenderState,
    RenderStateOptions, RenderThread, RenderThreadOptions, ThreadServices, Viewport,
};

type State = RenderState<RecordingGl>;

fn spawn_render_thread(name: &str) -> RenderThread<State> {
    let options = RenderThreadOptions { name: name.into() };
    RenderThread::spawn(&options, |queue| {
        let services = ThreadServices::new(queue, HeadlessContext::new());
        Ok(State::new(
            services,
            RecordingGl::new(),
            RenderStateOptions::default(),
        ))
    })
    .expect("render thread starts")
}

struct OrderedLayer {
    id: usize,
    log: Arc<Mutex<Vec<usize>>>,
    losses: AtomicUsize,
}

impl Layer for OrderedLayer {
    fn on_context_lost(&self) {
        self.losses.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.id);
    }
}

struct ReleaseWitness {
    released_on: Arc<Mutex<Vec<ThreadId>>>,
}

impl Drop for ReleaseWitness {
    fn drop(&mut self) {
        self.released_on.lock().unwrap().push(thread::current().id());
    }
}

#[test]
fn context_lifecycle_on_a_render_thread() {
    let render = spawn_render_thread("e2e-render");
    let log = Arc::new(Mutex::new(Vec::new()));
    let layers: Vec<Arc<OrderedLayer>> = (0..3)
        .map(|id| {
            Arc::new(OrderedLayer {
                id,
                log: log.clone(),
                losses: AtomicUsize::new(0),
            })
        })
        .collect();
    let handles: Vec<Arc<dyn Layer>> = layers
        .iter()
        .map(|layer| Arc::clone(layer) as Arc<dyn Layer>)
        .collect();

    let viewport = render
        .run_sync(move |state| {
            state.require_context();
            state.on_context_created();
            for layer in &handles {
                state.register_layer(layer);
            }
            state.set_viewport(800, 600);
            let viewport = state.viewport();
            state.on_context_destroyed();
            assert!(!state.has_state_objects());
            viewport
        })
        .unwrap();
    assert_eq!(viewport, Viewport::new(800, 600));

    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    for layer in &layers {
        assert_eq!(layer.losses.load(Ordering::SeqCst), 1);
    }

    // Released from this thread, dropped on the render thread.
    let released_on = Arc::new(Mutex::new(Vec::new()));
    render
        .queue()
        .schedule_release(ReleaseWitness {
            released_on: released_on.clone(),
        })
        .unwrap();
    let render_id = render.thread_id();
    render.run_sync(|_| ()).unwrap();
    assert_eq!(*released_on.lock().unwrap(), vec![render_id]);

    render.shutdown().unwrap();
}

#[test]
fn repeated_cycles_rebuild_state_objects() {
    let render = spawn_render_thread("cycle-render");
    let generations = render
        .run_sync(|state| {
            let mut generations = Vec::new();
            for _ in 0..10 {
                state.on_context_created();
                generations.push(state.context_generation());
                state.on_context_destroyed();
            }
            generations
        })
        .unwrap();
    assert_eq!(generations, (1..=10).collect::<Vec<u64>>());
    render.shutdown().unwrap();
}

#[test]
fn functor_bracket_restores_framebuffer_on_the_render_thread() {
    let render = spawn_render_thread("functor-render");
    let calls = render
        .run_sync(|state| {
            state.on_context_created();
            state.set_viewport(64, 64);
            state.bind_framebuffer(12);
            state.gl().take();

            let mut functor = |gl: &dyn GlApi, _: DrawGlMode, _: &mut DrawGlInfo| {
                gl.bind_framebuffer(0);
            };
            let mut info = DrawGlInfo::for_surface(64, 64);
            state.invoke_functor(&mut functor, DrawGlMode::Draw, &mut info);
            let calls = state.gl().take();
            state.on_context_destroyed();
            calls
        })
        .unwrap();

    let binds: Vec<&GlCall> = calls
        .iter()
        .filter(|call| matches!(call, GlCall::BindFramebuffer(_)))
        .collect();
    assert_eq!(
        binds,
        vec![&GlCall::BindFramebuffer(0), &GlCall::BindFramebuffer(12)]
    );
    render.shutdown().unwrap();
}

#[test]
fn coordinator_rejects_calls_from_other_threads() {
    let render = spawn_render_thread("owner-render");
    render.run_sync(|state| state.on_context_created()).unwrap();

    // Move the coordinator out to a foreign thread and poke it there.
    let (tx, rx) = std::sync::mpsc::channel();
    render
        .run_sync(move |state| {
            let outcome = thread::scope(|scope| {
                scope
                    .spawn(|| state.bind_framebuffer(3))
                    .join()
                    .is_err()
            });
            tx.send(outcome).unwrap();
            state.on_context_destroyed();
        })
        .unwrap();
    assert!(rx.recv().unwrap(), "foreign thread must be rejected");
    render.shutdown().unwrap();
}
