//! HTTP control plane and WebSocket stream surface.
//!
//! Two listeners: the control port serves the operator page, its assets, and
//! the `/do_orient` / `/do_light` endpoints; the stream port serves the
//! WebSocket video feed.

mod assets;
mod control;
mod routes;
mod stream;

pub use assets::Assets;
pub use routes::{control_router, stream_router};

use std::sync::Arc;

use crate::hardware::HatController;
use crate::hub::BroadcastHub;

/// Shared state for the control listener.
#[derive(Clone)]
pub struct ControlState {
    pub controller: Arc<HatController>,
    pub assets: Arc<Assets>,
}

/// Shared state for the stream listener.
#[derive(Clone)]
pub struct StreamState {
    pub hub: Arc<BroadcastHub>,
}
