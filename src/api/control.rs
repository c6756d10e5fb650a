//! Hardware control endpoints.
//!
//! Both endpoints parse the query string into a fully validated request
//! before touching the controller, so a malformed request has zero hardware
//! side effects.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::ControlState;
use crate::RelayError;
use crate::hardware::{LightRequest, OrientationRequest};

/// `GET /do_orient?pan=<int>&tilt=<int>` (either or both axes).
pub(super) async fn do_orient(
    State(state): State<ControlState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let request = match OrientationRequest::from_pairs(as_strs(&pairs)) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };
    match state.controller.orient(request).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /do_light?<index>=<r>,<g>,<b>,<w>` (repeatable; index `-1` = all).
pub(super) async fn do_light(
    State(state): State<ControlState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let request = match LightRequest::from_pairs(as_strs(&pairs)) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };
    match state.controller.set_lights(request).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

fn as_strs(pairs: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

fn error_response(err: RelayError) -> Response {
    if err.is_client_error() {
        (StatusCode::BAD_REQUEST, err.to_string()).into_response()
    } else {
        error!(error = %err, "control request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
    }
}
