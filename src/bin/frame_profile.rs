//! Headless frame profiler: drives a scripted colony through the renderer
//! factory and reports per-frame statistics.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use colony_view::core::types::BuildingKind;
use colony_view::core::ViewConfig;
use colony_view::renderer::{create_renderer, BackendRequest, DisplayList, RendererMode, Viewport};
use colony_view::sim::{EventKind, NotificationDeduper, ScriptedColony, SimEvent, SimulationEngine};

#[derive(Parser, Debug)]
#[command(name = "frame_profile")]
#[command(about = "Render a scripted colony headlessly and report frame statistics")]
struct Args {
    /// Frames to render
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Random seed for the colony and effects
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Device pixel ratio
    #[arg(long, default_value_t = 1.0)]
    density: f32,

    /// Start with the scene renderer instead of the 2D pipeline
    #[arg(long)]
    scene: bool,

    /// Pretend the host can't allocate an offscreen raster
    #[arg(long)]
    no_raster: bool,

    /// TOML file overriding the default view configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final debug stats as JSON
    #[arg(long)]
    json: bool,
}

const FRAME_MS: f64 = 1000.0 / 60.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ViewConfig::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Using default view config");
            ViewConfig::default()
        }),
        None => ViewConfig::default(),
    };

    let mut request = BackendRequest::new(Viewport::new(args.width, args.height, args.density));
    request.seed = args.seed;
    request.capabilities.offscreen_raster = !args.no_raster;
    if args.scene {
        request.preferred = RendererMode::Scene3d;
    }

    let mut session = create_renderer(&config, request);
    tracing::info!(
        mode = session.renderer_mode().as_str(),
        degraded = session.is_degraded(),
        "Renderer ready"
    );

    let mut colony = ScriptedColony::founded(args.seed, 14);
    let inbox: Rc<RefCell<Vec<SimEvent>>> = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let sink = inbox.clone();
        colony.on(kind, Box::new(move |event| sink.borrow_mut().push(event.clone())));
    }
    let mut deduper = NotificationDeduper::new(4.0);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(1));

    let mut surface = DisplayList::new();
    let mut slowest = Duration::ZERO;
    let mut total = Duration::ZERO;
    let mut commands = 0usize;
    let mut notifications = 0usize;

    for frame in 0..args.frames {
        let now_ms = frame as f64 * FRAME_MS;
        colony.step(FRAME_MS / 1000.0);

        // Grow the settlement now and then so placement and terrain paths run
        if frame % 90 == 45 {
            let kind = BuildingKind::ALL[rng.gen_range(0..BuildingKind::ALL.len())];
            let outcome = colony.queue_building(kind, rng.gen_range(-8..=8), rng.gen_range(-8..=8));
            if !outcome.ok {
                tracing::debug!(reason = ?outcome.reason, "Placement rejected");
            }
        }
        if frame % 240 == 120 {
            colony.hire_colonist();
        }

        for event in inbox.borrow_mut().drain(..) {
            if deduper.admit(&event.message, event.time) {
                notifications += 1;
                tracing::info!(kind = ?event.kind, message = %event.message, "Notification");
            }
            session.backend_mut().notify(&event);
        }

        let snapshot = colony.snapshot();
        surface.clear();
        let started = Instant::now();
        session.backend_mut().render(&snapshot, now_ms, &mut surface);
        let elapsed = started.elapsed();
        total += elapsed;
        slowest = slowest.max(elapsed);
        commands += surface.len();
    }

    let frames = args.frames.max(1);
    println!("Renderer: {} (degraded: {})", session.renderer_mode().as_str(), session.is_degraded());
    println!("Frames: {}", args.frames);
    println!("Average frame: {:.3?}", total / frames);
    println!("Slowest frame: {:.3?}", slowest);
    println!("Draw commands per frame: {:.1}", commands as f64 / frames as f64);
    println!("Notifications shown: {}", notifications);

    match session.backend().debug_stats() {
        Some(stats) if args.json => match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize stats"),
        },
        Some(stats) => {
            println!(
                "Terrain: {} rebuilds, {} reuses, {} tiles",
                stats.terrain_rebuilds, stats.terrain_reuses, stats.terrain_tiles
            );
            println!(
                "Last frame: {} drawables, {} hit regions, {} culled, {} particles",
                stats.drawables, stats.interactives, stats.culled, stats.particles
            );
        }
        None => println!("No debug stats for this renderer"),
    }
}
