// rdepth-pipeline/src/controls.rs
// UI toggle state and the blocking snapshot rendezvous.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Consistent pair of depth toggles as of one instant on the UI
/// context.  Taken once per frame, never re-read mid-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleSnapshot {
    pub use_disparity: bool,
    pub equalize: bool,
}

enum ControlMsg {
    SetUseDisparity(bool),
    SetEqualize(bool),
    Snapshot(Sender<ToggleSnapshot>),
}

/// Owns the depth toggles; its service loop stands in for the UI
/// thread's event loop.
///
/// Set messages are fire-and-forget, applied in arrival order.  A
/// snapshot request is a rendezvous: the requesting frame thread blocks
/// until the board services it, which is what guarantees the two
/// toggles are never torn by a concurrent set.  Sets queued ahead of
/// the request land first; sets arriving after it cannot affect it.
pub struct ControlBoard {
    use_disparity: bool,
    equalize: bool,
    rx: Receiver<ControlMsg>,
}

impl ControlBoard {
    pub fn new() -> (Self, ControlsHandle) {
        Self::with_initial(ToggleSnapshot::default())
    }

    pub fn with_initial(initial: ToggleSnapshot) -> (Self, ControlsHandle) {
        let (tx, rx) = unbounded();
        (
            Self {
                use_disparity: initial.use_disparity,
                equalize: initial.equalize,
                rx,
            },
            ControlsHandle { tx },
        )
    }

    /// Block for the next message and apply it.  Returns `false` once
    /// every handle has been dropped.
    pub fn service_one(&mut self) -> bool {
        let Ok(msg) = self.rx.recv() else {
            return false;
        };
        match msg {
            ControlMsg::SetUseDisparity(on) => self.use_disparity = on,
            ControlMsg::SetEqualize(on) => self.equalize = on,
            ControlMsg::Snapshot(reply) => {
                let _ = reply.send(ToggleSnapshot {
                    use_disparity: self.use_disparity,
                    equalize: self.equalize,
                });
            }
        }
        true
    }

    pub fn run(mut self) {
        while self.service_one() {}
    }

    /// Run the service loop on its own thread.  The thread exits when
    /// the last [`ControlsHandle`] is dropped.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("control-board".into())
            .spawn(move || self.run())
            .expect("spawn control board thread")
    }
}

/// Cheap clonable handle to a [`ControlBoard`].
#[derive(Clone)]
pub struct ControlsHandle {
    tx: Sender<ControlMsg>,
}

impl ControlsHandle {
    pub fn set_use_disparity(&self, on: bool) {
        let _ = self.tx.send(ControlMsg::SetUseDisparity(on));
    }

    pub fn set_equalize(&self, on: bool) {
        let _ = self.tx.send(ControlMsg::SetEqualize(on));
    }

    /// Read both toggles as one consistent pair, blocking until the
    /// board's context answers.
    ///
    /// This is a deliberate stall of the calling frame thread, not an
    /// incidental one.  If the board is gone the toggles fall back to
    /// their defaults (both off).
    pub fn snapshot_blocking(&self) -> ToggleSnapshot {
        let (reply_tx, reply_rx) = bounded(0);
        if self.tx.send(ControlMsg::Snapshot(reply_tx)).is_err() {
            return ToggleSnapshot::default();
        }
        reply_rx.recv().unwrap_or_default()
    }
}

/// Fire-once still-capture request.
///
/// The UI raises it; the coordinator consumes it with an atomic
/// read-and-clear on the next frame it observes.  The clear belongs to
/// the coordinator alone, so exactly one frame honors any number of
/// raises in between.
#[derive(Clone, Default)]
pub struct CaptureRequest(Arc<AtomicBool>);

impl CaptureRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Atomically read and clear; true at most once per raise.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_sees_sets_queued_before_it() {
        let (board, handle) = ControlBoard::new();
        let _ = board.spawn();

        handle.set_use_disparity(true);
        handle.set_equalize(true);
        let snap = handle.snapshot_blocking();
        assert_eq!(
            snap,
            ToggleSnapshot {
                use_disparity: true,
                equalize: true
            }
        );

        handle.set_equalize(false);
        let snap = handle.snapshot_blocking();
        assert_eq!(
            snap,
            ToggleSnapshot {
                use_disparity: true,
                equalize: false
            }
        );
    }

    #[test]
    fn snapshot_defaults_when_board_is_gone() {
        let (board, handle) = ControlBoard::new();
        drop(board);
        assert_eq!(handle.snapshot_blocking(), ToggleSnapshot::default());
    }

    #[test]
    fn initial_toggles_are_honored() {
        let (board, handle) = ControlBoard::with_initial(ToggleSnapshot {
            use_disparity: true,
            equalize: false,
        });
        let _ = board.spawn();
        assert!(handle.snapshot_blocking().use_disparity);
    }

    #[test]
    fn capture_request_is_consumed_once() {
        let req = CaptureRequest::new();
        assert!(!req.take());

        req.raise();
        req.raise(); // double-tap still yields one capture
        assert!(req.is_raised());
        assert!(req.take());
        assert!(!req.take());
        assert!(!req.is_raised());
    }
}
