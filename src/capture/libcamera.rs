//! Camera frame source backed by an `rpicam-vid` child process.
//!
//! The camera stack emits raw YUV420 frames on the child's stdout; one frame
//! is exactly `width * height * 3/2` bytes, so framing is by exact-size reads.

use bytes::Bytes;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

use super::FrameSource;
use crate::{Config, RelayError, Result};

/// How long the sensor needs to stabilize before the first frame is trusted.
const WARMUP: std::time::Duration = std::time::Duration::from_secs(1);

/// Frame source reading raw video from the camera child process.
pub struct LibcameraSource {
    child: Child,
    stdout: ChildStdout,
    frame_size: usize,
    framerate: u32,
}

impl LibcameraSource {
    /// Spawn the camera process and wait out the sensor warm-up.
    pub async fn spawn(config: &Config) -> Result<Self> {
        let mut command = Command::new("rpicam-vid");
        command
            .arg("--codec")
            .arg("yuv420")
            .arg("--width")
            .arg(config.width.to_string())
            .arg("--height")
            .arg(config.height.to_string())
            .arg("--framerate")
            .arg(config.framerate.to_string())
            .arg("--timeout")
            .arg("0")
            .arg("--nopreview")
            .arg("-o")
            .arg("-");
        if config.vflip {
            command.arg("--vflip");
        }
        if config.hflip {
            command.arg("--hflip");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        debug!(?command, "spawning camera process");
        let mut child = command
            .spawn()
            .map_err(|e| RelayError::capture("spawning rpicam-vid", e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Capture { context: "camera stdout missing".into(), source: None })?;

        tokio::time::sleep(WARMUP).await;
        info!(
            width = config.width,
            height = config.height,
            framerate = config.framerate,
            "camera source ready"
        );

        Ok(Self { child, stdout, frame_size: config.frame_size(), framerate: config.framerate })
    }
}

#[async_trait::async_trait]
impl FrameSource for LibcameraSource {
    async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let mut frame = vec![0u8; self.frame_size];
        match self.stdout.read_exact(&mut frame).await {
            Ok(_) => Ok(Some(Bytes::from(frame))),
            // EOF mid-frame or at a boundary both mean the camera stopped.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                let status = self.child.try_wait().ok().flatten();
                info!(?status, "camera process ended");
                Ok(None)
            }
            Err(e) => Err(RelayError::capture("reading camera frame", e)),
        }
    }

    fn frame_rate(&self) -> u32 {
        self.framerate
    }
}
