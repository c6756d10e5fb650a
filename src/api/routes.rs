//! Router construction for both listeners.

use axum::Router;
use axum::routing::get;
use std::sync::Arc;

use super::{Assets, ControlState, StreamState, assets, control, stream};
use crate::hardware::HatController;
use crate::hub::BroadcastHub;

/// Router for the control port: operator page, assets, hardware endpoints.
pub fn control_router(controller: Arc<HatController>, assets: Arc<Assets>) -> Router {
    Router::new()
        .route("/", get(assets::root))
        .route("/index.html", get(assets::index))
        .route("/styles.css", get(assets::styles))
        .route("/jsmpg.js", get(assets::player))
        .route("/do_orient", get(control::do_orient))
        .route("/do_light", get(control::do_light))
        .with_state(ControlState { controller, assets })
}

/// Router for the stream port: WebSocket upgrade at the root.
pub fn stream_router(hub: Arc<BroadcastHub>) -> Router {
    Router::new().route("/", get(stream::ws_handler)).with_state(StreamState { hub })
}
