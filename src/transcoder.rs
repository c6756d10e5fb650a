//! External transcoding process.
//!
//! Raw frames go into an ffmpeg child process (`rawvideo yuv420p` in,
//! `mpeg1video` out) and encoded elementary-stream chunks come back out. The
//! process handle is split into a write half ([`TranscoderSink`], owned by the
//! capture pump) and a read half ([`TranscoderSource`], owned by the broadcast
//! hub), giving the shutdown contract one owner per side: the pump closes the
//! input on its exit path, the hub drains the output and reaps the child.

use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::{Config, RelayError, Result};

/// Byte stream of encoded chunks from the transcoding process.
///
/// Abstracting the read half behind a trait keeps the broadcast hub testable
/// without a live child process.
#[async_trait::async_trait]
pub trait ChunkStream: Send + 'static {
    /// Read up to `buf.len()` bytes of encoded output.
    ///
    /// Returns `Ok(0)` once the process's output is closed. A zero-byte read
    /// alone is not end-of-stream; callers must also check [`has_exited`].
    ///
    /// [`has_exited`]: ChunkStream::has_exited
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Whether the external process has terminated (non-blocking).
    async fn has_exited(&mut self) -> Result<bool>;

    /// Block until the process terminates and release its output stream.
    async fn finish(&mut self) -> Result<()>;
}

/// Spawner for the external transcoding process.
pub struct Transcoder;

impl Transcoder {
    /// Spawn the transcoder and split it into its write and read halves.
    pub fn spawn(config: &Config) -> Result<(TranscoderSink, TranscoderSource)> {
        let argv = match &config.transcoder_command {
            Some(argv) if !argv.is_empty() => argv.clone(),
            Some(_) => {
                return Err(RelayError::bad_request("transcoder_command", "must not be empty"));
            }
            None => Self::ffmpeg_argv(config),
        };

        debug!(?argv, "spawning transcoder");
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| RelayError::transcoder(format!("spawning '{}'", argv[0]), e))?;
        let stdin = child.stdin.take().ok_or_else(|| RelayError::Transcoder {
            context: "transcoder stdin missing".into(),
            source: None,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| RelayError::Transcoder {
            context: "transcoder stdout missing".into(),
            source: None,
        })?;

        info!(program = %argv[0], "transcoder started");
        Ok((TranscoderSink { stdin }, TranscoderSource { child, stdout }))
    }

    fn ffmpeg_argv(config: &Config) -> Vec<String> {
        let fps = config.framerate.to_string();
        let size = format!("{}x{}", config.width, config.height);
        let argv = [
            "ffmpeg", "-f", "rawvideo", "-pix_fmt", "yuv420p", "-s", &size, "-r", &fps, "-i", "-",
            "-f", "mpeg1video", "-b:v", &config.video_bitrate, "-r", &fps, "-",
        ];
        argv.iter().map(|s| s.to_string()).collect()
    }
}

/// Write half: raw frames into the transcoder's stdin.
#[derive(Debug)]
pub struct TranscoderSink {
    stdin: ChildStdin,
}

impl TranscoderSink {
    /// Push one raw frame; blocks when the process is not draining its input.
    pub async fn write(&mut self, frame: &[u8]) -> Result<()> {
        self.stdin
            .write_all(frame)
            .await
            .map_err(|e| RelayError::transcoder("writing raw frame", e))
    }

    /// Flush and close the input stream, signalling end-of-input.
    ///
    /// Called exactly once, by the capture pump on its exit path; the
    /// process drains its buffers and exits, which the read half observes as
    /// end-of-stream.
    pub async fn finish(mut self) -> Result<()> {
        self.stdin
            .shutdown()
            .await
            .map_err(|e| RelayError::transcoder("closing transcoder input", e))
    }
}

/// Read half: encoded chunks out of the transcoder's stdout, plus the child
/// handle for exit detection and reaping.
#[derive(Debug)]
pub struct TranscoderSource {
    child: Child,
    stdout: ChildStdout,
}

#[async_trait::async_trait]
impl ChunkStream for TranscoderSource {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stdout
            .read(buf)
            .await
            .map_err(|e| RelayError::transcoder("reading encoded chunk", e))
    }

    async fn has_exited(&mut self) -> Result<bool> {
        let status = self
            .child
            .try_wait()
            .map_err(|e| RelayError::transcoder("polling transcoder", e))?;
        Ok(status.is_some())
    }

    async fn finish(&mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| RelayError::transcoder("waiting for transcoder exit", e))?;
        if status.success() {
            info!("transcoder exited cleanly");
        } else {
            warn!(%status, "transcoder exited with failure");
        }
        Ok(())
    }
}
