//! Frame sources feeding the pipeline.

mod libcamera;
mod pattern;

pub use libcamera::LibcameraSource;
pub use pattern::PatternSource;

use bytes::Bytes;

use crate::Result;

/// Trait for raw-frame producers.
///
/// Sources abstract over where frames come from (camera process, synthetic
/// pattern) and handle their own pacing internally, the camera by its child
/// process's output rate and the pattern by a timer.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Get the next raw YUV420 frame.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - new frame available
    /// - `Ok(None)` - source ended (normal termination)
    /// - `Err(e)` - capture failure
    async fn next_frame(&mut self) -> Result<Option<Bytes>>;

    /// Nominal frame rate in frames per second.
    fn frame_rate(&self) -> u32;
}
