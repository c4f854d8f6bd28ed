use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use anyhow::{Context, Result};
use renderstate::gl::Capability;
use renderstate::{
    AtlasEntry, DrawGlInfo, DrawGlMode, FunctorStatus, GlApi, HeadlessContext, Layer,
    RecordingGl, RenderState, RenderThread, ThreadServices,
};
use serde::Serialize;
use stateconfig::RenderConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

type ProbeState = RenderState<RecordingGl>;

/// Program name a probe functor binds, standing in for foreign GL code.
const FUNCTOR_PROGRAM: u32 = 99;
const ATLAS_ASSET: u64 = 1;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub thread: String,
    pub cycles: u32,
    pub contexts_created: u64,
    pub viewport: [u32; 2],
    pub framebuffer: u32,
    pub debug_overdraw: bool,
    pub functor_invocations: u64,
    pub layers_notified: u64,
    pub releases: ReleaseReport,
    pub total_gl_calls: usize,
    pub gl_calls: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct ReleaseReport {
    pub posted: u64,
    pub on_render_thread: u64,
    pub elsewhere: u64,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let report = probe(&config)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("failed to load probe config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    if let Some(cycles) = cli.cycles {
        config.probe.cycles = cycles;
    }
    if let Some(viewport) = cli.viewport {
        config.probe.viewport = viewport;
    }
    if let Some(framebuffer) = cli.framebuffer {
        config.probe.framebuffer = framebuffer;
    }
    if let Some(functor_calls) = cli.functor_calls {
        config.probe.functor_calls = functor_calls;
    }
    if let Some(layers) = cli.layers {
        config.probe.layers = layers;
    }
    if let Some(releases) = cli.releases {
        config.probe.releases = releases;
    }
    if let Some(name) = &cli.thread_name {
        config.render_thread.name = name.clone();
    }
    if cli.debug_overdraw {
        config.caches.debug_overdraw = true;
    }

    config
        .validate()
        .context("invalid probe configuration after applying overrides")?;
    Ok(config)
}

/// Layer that only counts how often it lost its context.
struct ProbeLayer {
    losses: AtomicU64,
}

impl Layer for ProbeLayer {
    fn on_context_lost(&self) {
        self.losses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handle whose drop records which thread released it.
struct ReleaseProbe {
    owner: ThreadId,
    counters: Arc<ReleaseCounters>,
}

#[derive(Default)]
struct ReleaseCounters {
    on_owner: AtomicU64,
    elsewhere: AtomicU64,
}

impl Drop for ReleaseProbe {
    fn drop(&mut self) {
        if thread::current().id() == self.owner {
            self.counters.on_owner.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.elsewhere.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn probe(config: &RenderConfig) -> Result<ProbeReport> {
    let scenario = config.probe.clone();
    let options = config.render_state_options();
    let thread_options = config.render_thread_options();

    let render = RenderThread::spawn(&thread_options, move |queue| {
        let services = ThreadServices::new(queue, HeadlessContext::new());
        Ok(ProbeState::new(services, RecordingGl::new(), options))
    })
    .context("failed to start render thread")?;
    tracing::info!(
        thread = %thread_options.name,
        cycles = scenario.cycles,
        "render thread started"
    );

    let counters = Arc::new(ReleaseCounters::default());
    let mut functor_invocations = 0u64;
    let mut posted = 0u64;
    let mut layers: Vec<Arc<ProbeLayer>> = Vec::new();

    for cycle in 1..=scenario.cycles {
        let cycle_layers: Vec<Arc<ProbeLayer>> = (0..scenario.layers)
            .map(|_| {
                Arc::new(ProbeLayer {
                    losses: AtomicU64::new(0),
                })
            })
            .collect();
        let handles: Vec<Arc<dyn Layer>> = cycle_layers
            .iter()
            .map(|layer| Arc::clone(layer) as Arc<dyn Layer>)
            .collect();
        layers.extend(cycle_layers);

        let frame = scenario.clone();
        functor_invocations += render
            .run_sync(move |state| run_cycle(state, &frame, &handles))
            .with_context(|| format!("render cycle {cycle} failed"))?;

        for _ in 0..scenario.releases {
            render
                .queue()
                .schedule_release(ReleaseProbe {
                    owner: render.thread_id(),
                    counters: Arc::clone(&counters),
                })
                .context("render thread stopped accepting releases")?;
            posted += 1;
        }
        tracing::debug!(cycle, "cycle complete");
    }

    // Ordered after every release posted above.
    let (calls, contexts_created) = render.run_sync(|state| {
        let calls = state.gl().take();
        (calls, state.context_generation())
    })?;
    render.shutdown()?;

    let mut gl_calls = BTreeMap::new();
    for call in &calls {
        *gl_calls.entry(call.entry_point().to_string()).or_insert(0) += 1;
    }

    Ok(ProbeReport {
        thread: thread_options.name,
        cycles: scenario.cycles,
        contexts_created,
        viewport: [scenario.viewport.width, scenario.viewport.height],
        framebuffer: scenario.framebuffer,
        debug_overdraw: config.caches.debug_overdraw,
        functor_invocations,
        layers_notified: layers
            .iter()
            .map(|layer| layer.losses.load(Ordering::SeqCst))
            .sum(),
        releases: ReleaseReport {
            posted,
            on_render_thread: counters.on_owner.load(Ordering::SeqCst),
            elsewhere: counters.elsewhere.load(Ordering::SeqCst),
        },
        total_gl_calls: calls.len(),
        gl_calls,
    })
}

/// One context lifetime: create, draw a frame with functors, lose the context.
fn run_cycle(
    state: &mut ProbeState,
    scenario: &stateconfig::ProbeSection,
    layers: &[Arc<dyn Layer>],
) -> u64 {
    state.require_context();
    state.on_context_created();
    for layer in layers {
        state.register_layer(layer);
    }

    let entry = AtlasEntry {
        x: 0,
        y: 0,
        width: 32,
        height: 32,
        rotated: false,
    };
    state.init_asset_atlas(256, 256, [(ATLAS_ASSET, entry)]);

    let viewport = scenario.viewport;
    state.set_viewport(viewport.width, viewport.height);
    state.bind_framebuffer(scenario.framebuffer);
    state.debug_overdraw(true, true);
    {
        let (gl, caches) = state.split_caches();
        caches.bind_asset(gl, ATLAS_ASSET);
    }

    let mut invocations = 0;
    let mut functor = |gl: &dyn GlApi, _mode: DrawGlMode, info: &mut DrawGlInfo| {
        gl.bind_framebuffer(0);
        gl.enable(Capability::Blend);
        gl.use_program(FUNCTOR_PROGRAM);
        info.status = FunctorStatus::Drew;
    };
    for _ in 0..scenario.functor_calls {
        let mut info = DrawGlInfo::for_surface(
            i32::try_from(viewport.width).unwrap_or(i32::MAX),
            i32::try_from(viewport.height).unwrap_or(i32::MAX),
        );
        state.invoke_functor(&mut functor, DrawGlMode::Draw, &mut info);
        invocations += 1;
    }

    state.on_context_destroyed();
    for layer in layers {
        state.unregister_layer(layer);
    }
    invocations
}

fn print_report(report: &ProbeReport) {
    println!(
        "renderprobe: {} cycle(s) on thread '{}', viewport {}x{}, framebuffer {}",
        report.cycles, report.thread, report.viewport[0], report.viewport[1], report.framebuffer
    );
    println!("  contexts created:    {}", report.contexts_created);
    println!("  functor invocations: {}", report.functor_invocations);
    println!("  layers notified:     {}", report.layers_notified);
    println!(
        "  releases:            {} posted, {} on render thread, {} elsewhere",
        report.releases.posted, report.releases.on_render_thread, report.releases.elsewhere
    );
    println!("  GL calls ({} total):", report.total_gl_calls);
    for (entry_point, count) in &report.gl_calls {
        println!("    {entry_point:<28} {count}");
    }
}
