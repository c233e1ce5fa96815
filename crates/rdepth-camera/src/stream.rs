// rdepth-camera/src/stream.rs
use crate::{CaptureSource, Result, SyncedFrame};
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// back-pressure: capture thread → channel → consumer
const DEPTH: usize = 4;

/// Adapt a push-style [`CaptureSource`] into an async frame stream.
///
/// The source's delivery thread blocks on the channel when the consumer
/// falls behind (bounded at `DEPTH`); dropping the stream stops the
/// source.
pub fn frame_stream(mut source: Box<dyn CaptureSource>) -> Result<FrameStream> {
    let (tx, rx) = mpsc::channel(DEPTH);

    source.set_frame_handler(Some(Box::new(move |frame| {
        // consumer dropped → frames fall on the floor until stop()
        let _ = tx.blocking_send(frame);
    })));
    source.start()?;

    Ok(FrameStream {
        inner: ReceiverStream::new(rx),
        source,
    })
}

/// Stream of [`SyncedFrame`]s that owns its capture source.
pub struct FrameStream {
    inner: ReceiverStream<SyncedFrame>,
    source: Box<dyn CaptureSource>,
}

impl Stream for FrameStream {
    type Item = SyncedFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        // Close the channel first: a delivery thread parked in
        // blocking_send gets an error and releases the handler slot,
        // otherwise clearing the handler below could wait on it forever.
        self.inner.close();
        self.source.set_frame_handler(None);
        self.source.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticCapture;
    use tokio_stream::StreamExt;

    #[tokio::test(flavor = "multi_thread")]
    async fn streams_frames_in_order() {
        let source = Box::new(SyntheticCapture::new(8, 8, 240));
        let mut stream = frame_stream(source).unwrap();

        let mut last_pts = None;
        for _ in 0..3 {
            let frame = stream.next().await.expect("stream yields frames");
            assert_eq!((frame.color.width, frame.color.height), (8, 8));
            if let Some(prev) = last_pts.replace(frame.pts) {
                assert!(frame.pts >= prev);
            }
        }
    }
}
