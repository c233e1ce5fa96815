// rdepth-pipeline/src/lib.rs
// ============================================================
// Frame coordinator for the rdepth realtime depth preview
// Receives synchronized color+depth frames from a capture
// source, snapshots the UI toggles per frame, transforms the
// depth map on a private serial worker, and publishes the
// result into a last-writer-wins slot the render loop reads.
// ------------------------------------------------------------
// Public API:
//   * Coordinator – one handle_frame() entry per camera tick
//   * ControlBoard / ControlsHandle – UI toggles + rendezvous
//   * CaptureRequest – fire-once still capture flag
//   * PreviewSurface – drawable-size + draw-tick handler
//   * StillSink – persistence collaborator contract
// ============================================================

//! rdepth – frame coordination layer
//!
//! Three execution contexts meet here.  The capture thread calls
//! [`Coordinator::handle_frame`] once per tick; it stalls briefly on a
//! rendezvous with the control board (the UI context) so the two depth
//! toggles are read as a consistent pair, then hands the depth map to a
//! dedicated worker thread.  The worker converts, resamples, and
//! equalizes, then overwrites the latest-depth-image slot.  The render
//! context reads that slot on its own redraw cadence with no lock; a
//! stale-by-one-frame image is fine for a live preview and callers must
//! not "fix" the relaxed read with a lock on the draw path.
//!
//! Every per-frame failure (conversion, resample, still encode) is
//! absorbed: the frame simply contributes nothing.  Each absorption
//! site bumps a [`stats::PipelineStats`] counter and emits a `tracing`
//! event so the drops are at least visible.

mod config;
mod controls;
mod coordinator;
mod rig;
mod sink;
mod stats;
mod surface;

pub use config::PreviewConfig;
pub use controls::{CaptureRequest, ControlBoard, ControlsHandle, ToggleSnapshot};
pub use coordinator::Coordinator;
pub use rig::CameraRig;
pub use sink::{DirStillSink, MemoryStillSink, SaveCompletion, SinkError, StillKind, StillSink};
pub use stats::{PipelineStats, StatsSnapshot};
pub use surface::{DepthSlot, DrawableSize, PreviewSurface, Renderer, SharedDrawableSize};
