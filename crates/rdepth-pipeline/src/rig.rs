// rdepth-pipeline/src/rig.rs
// Thin lifecycle wrapper over a capture source: start, stop,
// switch-camera, depth-filter forwarding.

use crate::coordinator::Coordinator;
use rdepth_camera::{CameraFacing, CaptureSource, Result};
use std::sync::Arc;
use tracing::info;

/// Owns the capture source and the current camera identity.
pub struct CameraRig {
    source: Box<dyn CaptureSource>,
    facing: CameraFacing,
}

impl CameraRig {
    pub fn new(source: Box<dyn CaptureSource>, facing: CameraFacing) -> Self {
        Self { source, facing }
    }

    /// Route the source's frames into a coordinator.
    pub fn install_coordinator(&mut self, coordinator: Arc<Coordinator>) {
        self.source
            .set_frame_handler(Some(Box::new(move |frame| coordinator.handle_frame(frame))));
    }

    pub fn start(&mut self) -> Result<()> {
        info!(facing = ?self.facing, "starting capture");
        self.source.start()
    }

    /// Clear the handler first so no frame lands mid-teardown.
    pub fn stop(&mut self) {
        self.source.set_frame_handler(None);
        self.source.stop();
        info!("capture stopped");
    }

    /// Flip between the two camera identities and reconfigure the
    /// source under the new one.
    pub fn switch_camera(&mut self) -> Result<()> {
        self.facing = self.facing.flipped();
        info!(facing = ?self.facing, "switching camera");
        self.source.change_camera(self.facing)
    }

    pub fn set_depth_filter_enabled(&mut self, enabled: bool) {
        self.source.set_depth_filter_enabled(enabled);
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdepth_camera::FrameHandler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        starts: AtomicUsize,
        stops: AtomicUsize,
        changes: std::sync::Mutex<Vec<CameraFacing>>,
        filter: std::sync::Mutex<Vec<bool>>,
    }

    struct FakeSource(Arc<Recording>);

    impl CaptureSource for FakeSource {
        fn set_frame_handler(&mut self, _handler: Option<FrameHandler>) {}
        fn start(&mut self) -> Result<()> {
            self.0.starts.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn stop(&mut self) {
            self.0.stops.fetch_add(1, Ordering::Relaxed);
        }
        fn change_camera(&mut self, facing: CameraFacing) -> Result<()> {
            self.0.changes.lock().unwrap().push(facing);
            Ok(())
        }
        fn set_depth_filter_enabled(&mut self, enabled: bool) {
            self.0.filter.lock().unwrap().push(enabled);
        }
    }

    #[test]
    fn switch_alternates_identities() {
        let rec = Arc::new(Recording::default());
        let mut rig = CameraRig::new(Box::new(FakeSource(Arc::clone(&rec))), CameraFacing::Back);

        rig.start().unwrap();
        rig.switch_camera().unwrap();
        assert_eq!(rig.facing(), CameraFacing::Front);
        rig.switch_camera().unwrap();
        assert_eq!(rig.facing(), CameraFacing::Back);
        rig.stop();

        assert_eq!(rec.starts.load(Ordering::Relaxed), 1);
        assert_eq!(rec.stops.load(Ordering::Relaxed), 1);
        assert_eq!(
            *rec.changes.lock().unwrap(),
            vec![CameraFacing::Front, CameraFacing::Back]
        );
    }

    #[test]
    fn filter_toggle_forwards_to_source() {
        let rec = Arc::new(Recording::default());
        let mut rig = CameraRig::new(Box::new(FakeSource(Arc::clone(&rec))), CameraFacing::Back);
        rig.set_depth_filter_enabled(false);
        rig.set_depth_filter_enabled(true);
        assert_eq!(*rec.filter.lock().unwrap(), vec![false, true]);
    }
}
