//! Synthetic test-pattern source.
//!
//! Produces a moving-bar YUV420 pattern paced by a tokio interval, so the
//! whole pipeline can run on machines without a camera (and in tests).

use bytes::Bytes;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::debug;

use super::FrameSource;
use crate::{Config, Result};

/// Interval-paced synthetic frame source.
pub struct PatternSource {
    width: usize,
    height: usize,
    framerate: u32,
    interval: Interval,
    tick: u64,
    /// Stop after this many frames; `None` runs forever. Used by tests.
    limit: Option<u64>,
}

impl PatternSource {
    pub fn new(config: &Config) -> Self {
        let frame_interval = std::time::Duration::from_secs(1) / config.framerate;
        let mut interval = interval(frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            width = config.width,
            height = config.height,
            framerate = config.framerate,
            "test pattern source ready"
        );

        Self {
            width: config.width as usize,
            height: config.height as usize,
            framerate: config.framerate,
            interval,
            tick: 0,
            limit: None,
        }
    }

    /// End the stream after `frames` frames instead of running forever.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    fn render(&self) -> Bytes {
        let luma_len = self.width * self.height;
        let mut frame = vec![128u8; luma_len * 3 / 2];

        // Horizontal gradient with a vertical bar sweeping one column per frame.
        let bar = (self.tick as usize) % self.width;
        for y in 0..self.height {
            let row = &mut frame[y * self.width..(y + 1) * self.width];
            for (x, px) in row.iter_mut().enumerate() {
                *px = if x.abs_diff(bar) < 8 { 235 } else { (x * 255 / self.width) as u8 };
            }
        }
        // Chroma planes stay neutral (grey), already 128.
        Bytes::from(frame)
    }
}

#[async_trait::async_trait]
impl FrameSource for PatternSource {
    async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if let Some(limit) = self.limit {
            if self.tick >= limit {
                return Ok(None);
            }
        }
        self.interval.tick().await;
        let frame = self.render();
        self.tick += 1;
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> u32 {
        self.framerate
    }
}
