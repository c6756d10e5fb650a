//! Operator page assets.
//!
//! The index page and stylesheet are `${NAME}` templates filled in once at
//! startup (the stream geometry and ports are fixed for the process
//! lifetime); the player script is served verbatim. Missing files fall back
//! to built-in minimal placeholders so a headless rig still starts.

use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::path::Path;
use tracing::warn;

use super::ControlState;
use axum::extract::State;

use crate::Config;

const DEFAULT_INDEX: &str = include_str!("builtin/index.html");
const DEFAULT_STYLES: &str = include_str!("builtin/styles.css");
const DEFAULT_PLAYER: &str = include_str!("builtin/jsmpg.js");

/// Rendered page assets, fixed for the process lifetime.
pub struct Assets {
    index: String,
    styles: String,
    player: String,
}

impl Assets {
    /// Load templates from the configured asset directory and render them.
    pub async fn load(config: &Config) -> Self {
        let index = read_or_default(&config.asset_dir.join("index.html"), DEFAULT_INDEX).await;
        let styles = read_or_default(&config.asset_dir.join("styles.css"), DEFAULT_STYLES).await;
        let player = read_or_default(&config.asset_dir.join("jsmpg.js"), DEFAULT_PLAYER).await;

        let vars = [
            ("WS_PORT", config.ws_port.to_string()),
            ("WIDTH", config.width.to_string()),
            ("HEIGHT", config.height.to_string()),
            ("COLOR", config.color.clone()),
            ("BGCOLOR", config.bgcolor.clone()),
        ];
        Self { index: fill(&index, &vars), styles: fill(&styles, &vars), player }
    }
}

/// Replace each `${NAME}` placeholder; unknown placeholders are left alone.
fn fill(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("${{{name}}}"), value);
    }
    out
}

async fn read_or_default(path: &Path, fallback: &str) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "asset missing, using built-in");
            fallback.to_string()
        }
    }
}

pub(super) async fn root() -> Redirect {
    Redirect::permanent("/index.html")
}

pub(super) async fn index(State(state): State<ControlState>) -> Html<String> {
    Html(state.assets.index.clone())
}

pub(super) async fn styles(State(state): State<ControlState>) -> Response {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], state.assets.styles.clone())
        .into_response()
}

pub(super) async fn player(State(state): State<ControlState>) -> Response {
    ([(header::CONTENT_TYPE, "application/javascript")], state.assets.player.clone())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_substitutes_known_placeholders_only() {
        let vars = [("WIDTH", "640".to_string()), ("COLOR", "#444".to_string())];
        let out = fill("w=${WIDTH} c=${COLOR} keep=${NOPE}", &vars);
        assert_eq!(out, "w=640 c=#444 keep=${NOPE}");
    }

    #[tokio::test]
    async fn missing_asset_dir_falls_back_to_builtins() {
        let config = Config {
            asset_dir: std::path::PathBuf::from("/definitely/not/here"),
            ..Config::default()
        };
        let assets = Assets::load(&config).await;
        assert!(assets.index.contains("ws://"));
        // Templates were rendered with the configured geometry
        assert!(assets.index.contains("8084"));
        assert!(!assets.index.contains("${WS_PORT}"));
    }
}
