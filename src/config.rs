//! Relay configuration.
//!
//! Every field has a default matching a 640x480 @ 24fps rig, so the server
//! runs with no config file at all. A YAML file can override any subset:
//!
//! ```yaml
//! width: 1280
//! height: 720
//! framerate: 30
//! http_port: 8082
//! ws_port: 8084
//! source: pattern
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{RelayError, Result};

/// Which frame source feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Camera child process (`rpicam-vid`).
    Camera,
    /// Synthetic moving test pattern, no camera hardware needed.
    Pattern,
}

/// Relay configuration with defaults for every field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Video width in pixels.
    pub width: u16,
    /// Video height in pixels.
    pub height: u16,
    /// Capture frame rate in frames per second.
    pub framerate: u32,
    /// Port for the HTTP control plane and page assets.
    pub http_port: u16,
    /// Port for the WebSocket stream listener.
    pub ws_port: u16,
    /// Foreground color substituted into the page templates.
    pub color: String,
    /// Background color substituted into the page templates.
    pub bgcolor: String,
    /// Flip the camera image vertically.
    pub vflip: bool,
    /// Flip the camera image horizontally.
    pub hflip: bool,
    /// Frame source selection.
    pub source: SourceKind,
    /// Directory holding index.html, styles.css and jsmpg.js.
    pub asset_dir: PathBuf,
    /// Target bitrate passed to the transcoder (ffmpeg `-b:v` syntax).
    pub video_bitrate: String,
    /// Per-client chunk queue depth; a client this far behind is dropped.
    pub broadcast_capacity: usize,
    /// Override for the transcoder command line. When set, the first element
    /// is the program and the rest are its arguments, replacing the built-in
    /// ffmpeg invocation entirely. Used by tests to substitute `cat`.
    pub transcoder_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            framerate: 24,
            http_port: 8082,
            ws_port: 8084,
            color: "#444".to_string(),
            bgcolor: "#333".to_string(),
            vflip: false,
            hflip: false,
            source: SourceKind::Camera,
            asset_dir: PathBuf::from("assets"),
            video_bitrate: "800k".to_string(),
            broadcast_capacity: 64,
            transcoder_command: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RelayError::config(path.to_path_buf(), Box::new(e)))?;
        let config: Config = serde_yaml_ng::from_str(&text)
            .map_err(|e| RelayError::config(path.to_path_buf(), Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RelayError::bad_request("width/height", "must be non-zero"));
        }
        if self.framerate == 0 {
            return Err(RelayError::bad_request("framerate", "must be non-zero"));
        }
        if self.broadcast_capacity == 0 {
            return Err(RelayError::bad_request("broadcast_capacity", "must be non-zero"));
        }
        Ok(())
    }

    /// Size in bytes of one raw YUV420 frame at the configured resolution.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3 / 2
    }
}
