//! rigcast server binary.
//!
//! Usage: `rigcast [config.yaml]`. With no argument the built-in defaults
//! (640x480 @ 24fps, control on 8082, stream on 8084) are used. Set
//! `RUST_LOG` to adjust log verbosity.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rigcast::{Config, LibcameraSource, NullDriver, PatternSource, SourceKind, Supervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "rigcast=info".into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading config {path}"))?,
        None => Config::default(),
    };
    info!(
        width = config.width,
        height = config.height,
        framerate = config.framerate,
        "starting relay"
    );

    // The accessory driver is a capability this binary is wired with; rigs
    // with the physical HAT plug their driver in here.
    let driver = Box::new(NullDriver);

    let handle = match config.source {
        SourceKind::Camera => {
            let source = LibcameraSource::spawn(&config).await.context("starting camera")?;
            Supervisor::start(config, driver, source).await?
        }
        SourceKind::Pattern => {
            let source = PatternSource::new(&config);
            Supervisor::start(config, driver, source).await?
        }
    };

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    handle.wait().await;
    Ok(())
}
