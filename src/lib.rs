//! Live camera streaming relay with pan-tilt mount and RGBW light control.
//!
//! rigcast relays a camera feed to any number of browser clients over a
//! WebSocket: raw frames go into an external ffmpeg process, and the MPEG-1
//! elementary stream coming back is fanned out verbatim behind a fixed 8-byte
//! framing header. Alongside the stream, an HTTP control plane drives a
//! physical pan-tilt mount and an 8-pixel RGBW strip, with every hardware
//! command serialized through a single lock.
//!
//! # Architecture
//!
//! - **Capture**: a [`capture::FrameSource`] (camera process or synthetic
//!   pattern) produces raw YUV420 frames
//! - **Transcode**: an external process turns frames into encoded chunks
//!   ([`transcoder`])
//! - **Fan-out**: the [`hub::BroadcastHub`] delivers each chunk to every
//!   connected stream client
//! - **Control**: HTTP endpoints validate requests and issue driver commands
//!   through the [`hardware::HatController`]
//! - **Supervision**: the [`supervisor::Supervisor`] owns startup order and
//!   the strict teardown sequence that always leaves the hardware safe
//!
//! # Example
//!
//! ```rust,no_run
//! use rigcast::{Config, NullDriver, PatternSource, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let source = PatternSource::new(&config);
//!     let handle = Supervisor::start(config, Box::new(NullDriver), source).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown();
//!     handle.wait().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod capture;
mod config;
mod error;
pub mod hardware;
mod header;
pub mod hub;
pub mod supervisor;
pub mod transcoder;

pub use config::{Config, SourceKind};
pub use error::{RelayError, Result};
pub use header::{HEADER_LEN, STREAM_MAGIC, StreamHeader};

pub use capture::{FrameSource, LibcameraSource, PatternSource};
pub use hardware::{HatController, HatDriver, LightRequest, NullDriver, OrientationRequest};
pub use hub::BroadcastHub;
pub use supervisor::{PipelineState, Supervisor, SupervisorHandle};
