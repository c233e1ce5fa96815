//! Realtime depth preview, end to end on a synthetic camera.
//!
//! Wires a capture source, the frame coordinator, a control board, a
//! directory still sink, and a console "renderer", then runs a ~5 s
//! draw loop that flips the toggles, fires a capture, and switches
//! cameras along the way.
//!
//! Usage: cargo run --bin realtime-depth [config.json]

use anyhow::Result;
use rdepth_camera::{CameraFacing, SyntheticCapture};
use rdepth_pipeline::{
    CameraRig, CaptureRequest, ControlBoard, Coordinator, DirStillSink, DrawableSize,
    PreviewConfig, PreviewSurface, Renderer, SharedDrawableSize, StillSink,
};
use rdepth_transform::RenderImage;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DRAW_HZ: u64 = 60;
const TOTAL_TICKS: u64 = 300;
const FPS_WINDOW_SIZE: usize = 30;

/// Stand-in for the GPU renderer: reports what it would draw.
struct ConsoleRenderer {
    draws: u64,
}

impl Renderer for ConsoleRenderer {
    fn update(&mut self, image: &RenderImage) {
        self.draws += 1;
        if self.draws % 60 == 0 {
            let mean: u64 = image.pixels.iter().map(|&p| u64::from(p)).sum::<u64>()
                / image.pixels.len().max(1) as u64;
            info!(
                width = image.width,
                height = image.height,
                mean_luma = mean,
                draws = self.draws,
                "depth image on screen"
            );
        }
    }
}

fn calculate_fps(window: &VecDeque<Instant>) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let duration = window.back().unwrap().duration_since(*window.front().unwrap());
    (window.len() - 1) as f64 / duration.as_secs_f64()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => PreviewConfig::load(path)?,
        None => PreviewConfig::default(),
    };
    info!(?cfg, "starting realtime depth preview");

    // Control surface + fire-once capture request.
    let (board, controls) = ControlBoard::with_initial(cfg.initial_toggles());
    let _ = board.spawn();
    let capture_request = CaptureRequest::new();

    // Coordinator wiring.
    let sink: Arc<dyn StillSink> = Arc::new(DirStillSink::new(&cfg.capture_dir)?);
    let drawable = SharedDrawableSize::new(DrawableSize::new(
        cfg.drawable_width,
        cfg.drawable_height,
    ));
    let (coordinator, slot) = Coordinator::new(
        controls.clone(),
        capture_request.clone(),
        sink,
        drawable.clone(),
    );
    let coordinator = Arc::new(coordinator);
    let surface = PreviewSurface::new(slot, drawable);

    // Camera.
    let source = SyntheticCapture::new(cfg.capture_width, cfg.capture_height, cfg.fps);
    let mut rig = CameraRig::new(Box::new(source), CameraFacing::Back);
    rig.set_depth_filter_enabled(cfg.depth_filter);
    rig.install_coordinator(Arc::clone(&coordinator));
    rig.start()?;

    // Draw loop on the main thread, pulling the latest depth image at
    // its own cadence.
    let mut renderer = ConsoleRenderer { draws: 0 };
    let mut times: VecDeque<Instant> = VecDeque::with_capacity(FPS_WINDOW_SIZE);
    let tick_interval = Duration::from_secs_f64(1.0 / DRAW_HZ as f64);

    for tick in 0..TOTAL_TICKS {
        let tick_start = Instant::now();
        surface.draw(&mut renderer);

        times.push_back(Instant::now());
        if times.len() > FPS_WINDOW_SIZE {
            times.pop_front();
        }

        match tick {
            60 => {
                info!("toggling disparity representation on");
                controls.set_use_disparity(true);
            }
            120 => {
                info!("toggling histogram equalization on");
                controls.set_equalize(true);
            }
            150 => {
                info!("requesting a still capture");
                capture_request.raise();
            }
            180 => rig.switch_camera()?,
            240 => {
                info!("resizing drawable to 320x240");
                surface.drawable_size_changed(DrawableSize::new(320, 240));
            }
            _ => {}
        }

        if tick % 60 == 59 {
            info!(fps = format!("{:.1}", calculate_fps(&times)), "draw loop");
        }

        let elapsed = tick_start.elapsed();
        if elapsed < tick_interval {
            std::thread::sleep(tick_interval - elapsed);
        }
    }

    rig.stop();
    coordinator.flush();
    println!(
        "{}",
        serde_json::to_string_pretty(&coordinator.stats())?
    );
    Ok(())
}
