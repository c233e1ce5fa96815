// rdepth-pipeline/src/surface.rs
// Render-side handlers: drawable size tracking and the draw tick.

use rdepth_transform::RenderImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Pixel dimensions of the current render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawableSize {
    pub width: u32,
    pub height: u32,
}

impl DrawableSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn pack(self) -> u64 {
        (u64::from(self.width) << 32) | u64::from(self.height)
    }

    fn unpack(bits: u64) -> Self {
        Self {
            width: (bits >> 32) as u32,
            height: bits as u32,
        }
    }
}

/// Drawable size shared between the render context (writer, on resize)
/// and the transform worker (reader, immediately before resampling).
///
/// Width and height travel in one atomic word so a reader never sees a
/// half-applied resize.  Size reads are independent of frame reads: a
/// resize mid-frame is honored by that frame's resample.
#[derive(Clone)]
pub struct SharedDrawableSize(Arc<AtomicU64>);

impl SharedDrawableSize {
    pub fn new(initial: DrawableSize) -> Self {
        Self(Arc::new(AtomicU64::new(initial.pack())))
    }

    pub fn get(&self) -> DrawableSize {
        DrawableSize::unpack(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, size: DrawableSize) {
        self.0.store(size.pack(), Ordering::Release);
    }
}

/// External GPU renderer contract: draw the supplied image on this tick.
pub trait Renderer {
    fn update(&mut self, image: &RenderImage);
}

/// Read side of the latest-depth-image slot.
///
/// A versioned last-writer-wins cell: the worker overwrites it every
/// frame, the render context reads whatever is newest.  Faster renders
/// redraw the same image twice; slower renders skip intermediate
/// frames.  No ordering is guaranteed between a transform completing
/// and a draw tick firing, and none is needed for a live preview.
#[derive(Clone)]
pub struct DepthSlot {
    pub(crate) rx: watch::Receiver<Option<RenderImage>>,
}

impl DepthSlot {
    /// Clone out the most recent image, if any frame has produced one.
    pub fn latest(&self) -> Option<RenderImage> {
        self.rx.borrow().clone()
    }

    pub fn has_image(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

/// The rendering surface's two callbacks, as one object.
pub struct PreviewSurface {
    slot: DepthSlot,
    size: SharedDrawableSize,
}

impl PreviewSurface {
    pub fn new(slot: DepthSlot, size: SharedDrawableSize) -> Self {
        Self { slot, size }
    }

    /// Size-change callback.  Takes effect on subsequent resamples,
    /// not retroactively.
    pub fn drawable_size_changed(&self, size: DrawableSize) {
        self.size.set(size);
    }

    /// Draw-tick callback.  No image yet means no-op; whatever the
    /// renderer last drew stays on screen.
    ///
    /// The image is cloned out of the slot before the renderer runs;
    /// the slot's read guard is never held across `update`, so a slow
    /// render cannot stall the worker's next publish.
    pub fn draw(&self, renderer: &mut dyn Renderer) {
        if let Some(image) = self.slot.latest() {
            renderer.update(&image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_size_round_trips() {
        let size = DrawableSize::new(1920, 1080);
        assert_eq!(DrawableSize::unpack(size.pack()), size);
    }

    #[test]
    fn shared_size_last_write_wins() {
        let shared = SharedDrawableSize::new(DrawableSize::new(4, 4));
        shared.set(DrawableSize::new(640, 480));
        shared.set(DrawableSize::new(300, 200));
        assert_eq!(shared.get(), DrawableSize::new(300, 200));
    }

    struct CountingRenderer {
        updates: usize,
        last_dims: Option<(u32, u32)>,
    }

    impl Renderer for CountingRenderer {
        fn update(&mut self, image: &RenderImage) {
            self.updates += 1;
            self.last_dims = Some((image.width, image.height));
        }
    }

    #[test]
    fn draw_is_noop_until_an_image_exists() {
        let (tx, rx) = watch::channel(None);
        let surface = PreviewSurface::new(
            DepthSlot { rx },
            SharedDrawableSize::new(DrawableSize::new(8, 8)),
        );
        let mut renderer = CountingRenderer {
            updates: 0,
            last_dims: None,
        };

        surface.draw(&mut renderer);
        assert_eq!(renderer.updates, 0);

        tx.send_replace(Some(RenderImage {
            width: 8,
            height: 8,
            pixels: vec![1; 64],
        }));
        surface.draw(&mut renderer);
        surface.draw(&mut renderer); // same image redrawn, not an error
        assert_eq!(renderer.updates, 2);
        assert_eq!(renderer.last_dims, Some((8, 8)));
    }

    struct RepublishingRenderer {
        tx: watch::Sender<Option<RenderImage>>,
        seen: Vec<(u32, u32)>,
    }

    impl Renderer for RepublishingRenderer {
        fn update(&mut self, image: &RenderImage) {
            self.seen.push((image.width, image.height));
            // A publish landing mid-draw must not wait on the draw
            // tick.  This send wedges on the channel's internal lock
            // if draw still holds the slot's read guard here.
            self.tx.send_replace(Some(RenderImage {
                width: 2,
                height: 2,
                pixels: vec![0; 4],
            }));
        }
    }

    #[test]
    fn a_publish_during_draw_does_not_wait_on_the_renderer() {
        let (tx, rx) = watch::channel(Some(RenderImage {
            width: 8,
            height: 8,
            pixels: vec![1; 64],
        }));
        let surface = PreviewSurface::new(
            DepthSlot { rx },
            SharedDrawableSize::new(DrawableSize::new(8, 8)),
        );
        let mut renderer = RepublishingRenderer {
            tx,
            seen: Vec::new(),
        };

        surface.draw(&mut renderer);
        surface.draw(&mut renderer);
        assert_eq!(renderer.seen, vec![(8, 8), (2, 2)]);
    }
}
