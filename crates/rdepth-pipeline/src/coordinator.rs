// rdepth-pipeline/src/coordinator.rs
// One entry point per camera tick.  Runs on the capture thread up to
// the toggle rendezvous, then hands off to a private serial worker.

use crate::controls::{CaptureRequest, ControlsHandle, ToggleSnapshot};
use crate::sink::{SaveCompletion, StillKind, StillSink};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::surface::{DepthSlot, SharedDrawableSize};
use crossbeam_channel::{bounded, unbounded, Sender};
use rdepth_camera::{ColorImage, DepthMap, SyncedFrame};
use rdepth_transform::{encode_color_png, equalize, resample, to_disparity, RenderImage};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

enum Job {
    Depth {
        depth: Option<DepthMap>,
        toggles: ToggleSnapshot,
        should_capture: bool,
    },
    Flush(Sender<()>),
}

/// Frame coordinator: capture callback in, rendered depth image out.
///
/// Per frame, in order: record the color image, consume the capture
/// request, persist the color still if requested, snapshot the toggles
/// via the blocking rendezvous, and queue the depth work.  The worker
/// is one serial thread; jobs never run in parallel with each other,
/// but a slow transform lets frames queue up behind it, so by the time
/// a job publishes its image the camera may already be frames ahead.
/// Nothing cancels a transform in flight.
pub struct Coordinator {
    controls: ControlsHandle,
    capture_request: CaptureRequest,
    sink: Arc<dyn StillSink>,
    stats: Arc<PipelineStats>,
    current_color: Mutex<Option<ColorImage>>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Build the coordinator and its worker thread.  The returned
    /// [`DepthSlot`] is the read side of the latest-depth-image cell.
    pub fn new(
        controls: ControlsHandle,
        capture_request: CaptureRequest,
        sink: Arc<dyn StillSink>,
        drawable_size: SharedDrawableSize,
    ) -> (Self, DepthSlot) {
        let (slot_tx, slot_rx) = watch::channel(None);
        let (jobs_tx, jobs_rx) = unbounded::<Job>();

        let worker_sink = Arc::clone(&sink);
        let stats = Arc::new(PipelineStats::default());
        let worker_stats = Arc::clone(&stats);

        let worker = std::thread::Builder::new()
            .name("depth-transform".into())
            .spawn(move || {
                while let Ok(job) = jobs_rx.recv() {
                    match job {
                        Job::Flush(ack) => {
                            let _ = ack.send(());
                        }
                        Job::Depth {
                            depth,
                            toggles,
                            should_capture,
                        } => run_depth_job(
                            &slot_tx,
                            &drawable_size,
                            worker_sink.as_ref(),
                            &worker_stats,
                            depth,
                            toggles,
                            should_capture,
                        ),
                    }
                }
            })
            .expect("spawn depth transform worker");

        (
            Self {
                controls,
                capture_request,
                sink,
                stats,
                current_color: Mutex::new(None),
                jobs: Some(jobs_tx),
                worker: Some(worker),
            },
            DepthSlot { rx: slot_rx },
        )
    }

    /// Capture-source callback: invoked once per frame triple, on the
    /// source's delivery thread.  Fire-and-forget; every failure along
    /// the way is absorbed.
    pub fn handle_frame(&self, frame: SyncedFrame) {
        self.stats.record_frame_in();
        let SyncedFrame {
            color, depth, face, ..
        } = frame;
        if face.is_some() {
            trace!("face metadata present; preview path ignores it");
        }

        {
            let mut slot = lock_ignore_poison(&self.current_color);
            *slot = Some(color);
        }

        // Consumed here and nowhere else; true for exactly this frame.
        let should_capture = self.capture_request.take();
        if should_capture {
            let guard = lock_ignore_poison(&self.current_color);
            if let Some(color) = guard.as_ref() {
                match encode_color_png(color) {
                    Ok(png) => self.sink.save(png, StillKind::Color, log_completion("color")),
                    Err(err) => {
                        // Known weak spot: the user's capture tap dies
                        // here with nothing but a counter and a line.
                        self.stats.record_encode_failure();
                        warn!(error = %err, "color still encode failed; capture dropped");
                    }
                }
            }
        }

        // Deliberate stall: block until the UI context answers so the
        // toggle pair is consistent for this frame.
        let toggles = self.controls.snapshot_blocking();

        if let Some(jobs) = self.jobs.as_ref() {
            let _ = jobs.send(Job::Depth {
                depth,
                toggles,
                should_capture,
            });
        }
    }

    /// Most recently received color image.
    pub fn current_color(&self) -> Option<ColorImage> {
        lock_ignore_poison(&self.current_color).clone()
    }

    /// Block until the worker has drained every job queued before this
    /// call.  The queue is serial, so this is exact.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = bounded(0);
        if let Some(jobs) = self.jobs.as_ref() {
            if jobs.send(Job::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The depth half of one frame, on the worker thread.
fn run_depth_job(
    slot: &watch::Sender<Option<RenderImage>>,
    drawable_size: &SharedDrawableSize,
    sink: &dyn StillSink,
    stats: &PipelineStats,
    depth: Option<DepthMap>,
    toggles: ToggleSnapshot,
    should_capture: bool,
) {
    // No depth this frame: the slot keeps its previous image.
    let Some(depth) = depth else {
        return;
    };

    let depth = if toggles.use_disparity {
        match to_disparity(&depth) {
            Ok(converted) => converted,
            Err(err) => {
                // Indistinguishable downstream from absent depth data.
                stats.record_disparity_failure();
                debug!(error = %err, "disparity conversion failed; depth path skipped");
                return;
            }
        }
    } else {
        depth
    };

    // Size is read now, not at frame arrival: a resize that landed
    // while this frame waited in the queue wins.
    let target = drawable_size.get();
    let image = match resample(&depth, target.width, target.height) {
        Ok(image) => image,
        Err(err) => {
            stats.record_resample_failure();
            warn!(
                error = %err,
                width = target.width,
                height = target.height,
                "depth resample failed; depth path skipped"
            );
            return;
        }
    };

    let image = if toggles.equalize {
        equalize(&image)
    } else {
        image
    };

    slot.send_replace(Some(image));
    stats.record_published();

    if should_capture {
        let guard = slot.borrow();
        if let Some(image) = guard.as_ref() {
            match image.encode_png() {
                Ok(png) => sink.save(png, StillKind::Depth, log_completion("depth")),
                Err(err) => {
                    stats.record_encode_failure();
                    warn!(error = %err, "depth still encode failed; capture dropped");
                }
            }
        }
    }
}

fn log_completion(tag: &'static str) -> SaveCompletion {
    Box::new(move |result| match result {
        Ok(()) => debug!(tag, "still saved"),
        Err(err) => warn!(tag, error = %err, "still save failed"),
    })
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
