//! Pull a few seconds of synthetic frames through the async stream
//! adapter and report the achieved rate.
//!
//! Usage: cargo run --example stream_preview [width height fps]

use rdepth_camera::{frame_stream, SyntheticCapture};
use std::collections::VecDeque;
use std::time::Instant;
use tokio_stream::StreamExt;

const FPS_WINDOW_SIZE: usize = 30;

fn calculate_fps(window: &VecDeque<Instant>) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let duration = window.back().unwrap().duration_since(*window.front().unwrap());
    (window.len() - 1) as f64 / duration.as_secs_f64()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (width, height, fps) = if args.len() >= 4 {
        (
            args[1].parse::<u32>().unwrap_or(640),
            args[2].parse::<u32>().unwrap_or(480),
            args[3].parse::<u32>().unwrap_or(30),
        )
    } else {
        (640, 480, 30)
    };

    println!("streaming {width}x{height} @ {fps} fps, 150 frames");

    let mut stream = frame_stream(Box::new(SyntheticCapture::new(width, height, fps)))?;
    let mut times: VecDeque<Instant> = VecDeque::with_capacity(FPS_WINDOW_SIZE);
    let mut count = 0u64;

    while let Some(frame) = stream.next().await {
        times.push_back(Instant::now());
        if times.len() > FPS_WINDOW_SIZE {
            times.pop_front();
        }
        count += 1;
        if count % 30 == 0 {
            let has_depth = frame.depth.is_some();
            println!(
                "frame {count}: pts {:?}, depth={has_depth}, {:.1} fps",
                frame.pts,
                calculate_fps(&times)
            );
        }
        if count >= 150 {
            break;
        }
    }

    println!("done ({count} frames)");
    Ok(())
}
