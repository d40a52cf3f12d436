//! Hello AR viewer
//!
//! Plays a recorded tracking session through the AR frame renderer on the
//! headless backend. A simulated input thread taps the middle of the screen
//! every second, placing pawns on the detected floor.
//!
//! The flags act like the settings menu: they are applied to the running
//! session and written back to `hello_ar.toml`, together with the answer to
//! the one-time depth prompt.
//!
//! ```text
//! hello_ar [recording.ron] [--occlusion] [--depth-view] [--instant]
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ar_render::app::{ArApp, ArLifecycle, LifecycleParticipant, LogNotifier};
use ar_render::assets::{builtin_shaders, DirectoryAssets, LayeredAssets};
use ar_render::core::{AppConfig, Config, DepthSettings, InstantPlacementSettings};
use ar_render::foundation::time::Timer;
use ar_render::placement::TapQueue;
use ar_render::render::backends::HeadlessBackend;
use ar_render::render::resources::RenderContext;
use ar_render::tracking::{ReplayRecording, ReplaySession, SessionError, Tap, TrackingSession};

const CONFIG_PATH: &str = "hello_ar/hello_ar.toml";
const DEFAULT_RECORDING: &str = "hello_ar/recordings/hello_ar.ron";
const SURFACE_WIDTH: u32 = 1080;
const SURFACE_HEIGHT: u32 = 1920;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const TAP_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Default)]
struct Options {
    recording: Option<String>,
    occlusion: bool,
    depth_view: bool,
    instant_placement: bool,
}

impl Options {
    fn from_args() -> Self {
        let mut options = Self::default();
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--occlusion" => options.occlusion = true,
                "--depth-view" => options.depth_view = true,
                "--instant" => options.instant_placement = true,
                other if other.starts_with("--") => log::warn!("Ignoring unknown flag {}", other),
                path => options.recording = Some(path.to_string()),
            }
        }
        options
    }

    fn has_settings(&self) -> bool {
        self.occlusion || self.depth_view || self.instant_placement
    }

    fn apply(&self, depth: &mut DepthSettings, instant_placement: &mut InstantPlacementSettings) {
        if self.occlusion {
            depth.set_use_depth_for_occlusion(true);
        }
        if self.depth_view {
            depth.set_depth_color_visualization_enabled(true);
        }
        if self.instant_placement {
            instant_placement.set_instant_placement_enabled(true);
        }
    }
}

/// Taps the screen center from its own thread while input is resumed
struct SimulatedInput {
    enabled: Arc<AtomicBool>,
}

impl SimulatedInput {
    fn spawn(taps: TapQueue, running: Arc<AtomicBool>) -> (Self, thread::JoinHandle<()>) {
        let enabled = Arc::new(AtomicBool::new(false));
        let worker_enabled = enabled.clone();
        let handle = thread::spawn(move || {
            let center = Tap { x: SURFACE_WIDTH as f32 / 2.0, y: SURFACE_HEIGHT as f32 * 0.6 };
            while running.load(Ordering::Relaxed) {
                thread::sleep(TAP_INTERVAL);
                if worker_enabled.load(Ordering::Relaxed) && !taps.offer(center) {
                    log::debug!("Tap queue full; dropping tap");
                }
            }
        });
        (Self { enabled }, handle)
    }
}

impl LifecycleParticipant for SimulatedInput {
    fn on_resume(&mut self) {
        self.enabled.store(true, Ordering::Relaxed);
        log::info!("Input resumed");
    }

    fn on_pause(&mut self) {
        self.enabled.store(false, Ordering::Relaxed);
        log::info!("Input paused");
    }
}

/// Stand-in for the platform view hosting the rendering surface
struct DisplaySurface;

impl LifecycleParticipant for DisplaySurface {
    fn on_resume(&mut self) {
        log::info!("Display surface resumed");
    }

    fn on_pause(&mut self) {
        log::info!("Display surface paused");
    }
}

fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load_or_default(CONFIG_PATH)?;
    config.validate()?;
    Ok(config)
}

fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    let assets = LayeredAssets::new()
        .with_layer(DirectoryAssets::new(config.assets.search_paths.iter().cloned()))
        .with_layer(builtin_shaders());
    let ctx = RenderContext::new(HeadlessBackend::new(), assets);

    let recording_path = options.recording.as_deref().unwrap_or(DEFAULT_RECORDING);
    let recording = ReplayRecording::load_from_file(recording_path)?;
    log::info!("Loaded {} recorded steps from {}", recording.steps.len(), recording_path);

    let taps = TapQueue::default();
    let running = Arc::new(AtomicBool::new(true));
    let (input, input_thread) = SimulatedInput::spawn(taps.clone(), running.clone());

    let factory = move || -> Result<Box<dyn TrackingSession>, SessionError> {
        Ok(Box::new(ReplaySession::new(recording.clone())))
    };
    let lifecycle = ArLifecycle::new(factory, DisplaySurface, input);
    let mut app = ArApp::new(&ctx, config, lifecycle, LogNotifier::new(true))
        .with_tap_queue(taps)
        .with_settings_file(CONFIG_PATH);

    app.resume()?;
    if options.has_settings() {
        app.apply_settings(|depth, instant_placement| options.apply(depth, instant_placement))?;
    }
    app.surface_created();
    app.surface_changed(SURFACE_WIDTH, SURFACE_HEIGHT);

    let mut timer = Timer::new();
    let result = loop {
        match app.tick() {
            Ok(()) => {}
            Err(e) if e.is_end_of_recording() => break Ok(()),
            Err(e) => break Err(e),
        }

        let report = app.renderer().last_report();
        if let Some(outcome) = report.placement {
            log::info!("Tap: {:?}", outcome);
        }
        ctx.inspect_backend_mut(|b: &mut HeadlessBackend| b.take_commands());

        timer.tick();
        if timer.frame_count() % 30 == 0 {
            log::info!(
                "Frame {}: {} planes, {} objects, {:.1} fps",
                timer.frame_count(),
                report.planes_drawn,
                report.objects_drawn,
                timer.average_fps()
            );
        }
        thread::sleep(FRAME_INTERVAL);
    };

    app.pause();
    running.store(false, Ordering::Relaxed);
    if input_thread.join().is_err() {
        log::warn!("Input thread panicked");
    }

    if let Some(stats) = ctx.inspect_backend(|b: &HeadlessBackend| b.stats()) {
        log::info!("Backend totals: {:?}", stats);
    }
    log::info!("{} anchors placed at exit", app.renderer().anchors().len());
    app.destroy();
    result.map_err(Into::into)
}

fn main() {
    ar_render::foundation::logging::init();
    log::info!("Starting hello_ar...");

    let options = Options::from_args();
    if let Err(e) = run(&options) {
        log::error!("hello_ar failed: {}", e);
        std::process::exit(1);
    }
    log::info!("hello_ar completed");
}
