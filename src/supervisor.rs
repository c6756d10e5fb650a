//! Pipeline supervisor: ordered startup and teardown.
//!
//! Owns every long-lived task in the process. Teardown follows a strict
//! order so no stage is torn down while still being fed: frame production
//! stops first, the transcoder drains and exits, the broadcast loop observes
//! end-of-stream, the listeners close, and only then is the hardware forced
//! to its safe state.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{self, Assets};
use crate::capture::FrameSource;
use crate::hardware::{HatController, HatDriver};
use crate::header::StreamHeader;
use crate::hub::{BroadcastHub, StreamSubscription};
use crate::transcoder::{Transcoder, TranscoderSink, TranscoderSource};
use crate::{Config, RelayError, Result};

/// Lifecycle of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// How long the broadcast loop gets to observe end-of-stream on its own
/// before the supervisor cancels it outright.
const DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Consecutive capture failures tolerated before the pump gives up.
const MAX_CAPTURE_ERRORS: u32 = 10;

/// Handle to a running pipeline.
pub struct SupervisorHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PipelineState>,
    hub: Arc<BroadcastHub>,
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Begin the ordered shutdown sequence.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Token that fires when shutdown begins; wire external signals to this.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch receiver over pipeline state transitions.
    pub fn state_receiver(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }

    /// Subscribe to the stream locally, bypassing the WebSocket listener.
    pub fn subscribe(&self) -> StreamSubscription {
        self.hub.subscribe()
    }

    /// Bound address of the control listener.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Bound address of the stream listener.
    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// Wait until the pipeline reaches `Stopped`.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "supervisor task failed");
        }
    }
}

/// Starts and supervises the whole pipeline.
pub struct Supervisor;

impl Supervisor {
    /// Start every stage and return a handle to the running pipeline.
    ///
    /// Fails fast if the hardware cannot be initialized, the transcoder
    /// cannot be spawned, or either listener cannot bind.
    pub async fn start<S>(
        config: Config,
        driver: Box<dyn HatDriver>,
        source: S,
    ) -> Result<SupervisorHandle>
    where
        S: FrameSource,
    {
        let (state_tx, state_rx) = watch::channel(PipelineState::Starting);
        let cancel = CancellationToken::new();

        let controller = Arc::new(HatController::new(driver));
        controller.initialize().await?;

        let (sink, transcoder_source) = Transcoder::spawn(&config)?;
        let hub = Arc::new(BroadcastHub::new(
            StreamHeader::new(config.width, config.height),
            config.broadcast_capacity,
        ));
        let assets = Arc::new(Assets::load(&config).await);

        let http_listener = bind(config.http_port, "control").await?;
        let ws_listener = bind(config.ws_port, "stream").await?;
        let http_addr = http_listener
            .local_addr()
            .map_err(|e| RelayError::listener("reading control listener address", e))?;
        let ws_addr = ws_listener
            .local_addr()
            .map_err(|e| RelayError::listener("reading stream listener address", e))?;
        info!(%http_addr, %ws_addr, "listeners bound");

        let task = tokio::spawn(Self::run(Stages {
            cancel: cancel.clone(),
            state: state_tx,
            controller,
            hub: Arc::clone(&hub),
            assets,
            sink,
            transcoder_source,
            frame_source: source,
            http_listener,
            ws_listener,
        }));

        Ok(SupervisorHandle { cancel, state: state_rx, hub, http_addr, ws_addr, task })
    }

    async fn run<S>(stages: Stages<S>)
    where
        S: FrameSource,
    {
        let Stages {
            cancel,
            state,
            controller,
            hub,
            assets,
            sink,
            transcoder_source,
            frame_source,
            http_listener,
            ws_listener,
        } = stages;

        // Capture stops ahead of everything else; the hub and listeners get
        // their own tokens so teardown stays ordered.
        let capture_cancel = cancel.child_token();
        let hub_cancel = CancellationToken::new();
        let listener_cancel = CancellationToken::new();

        let pump = tokio::spawn(Self::pump_frames(frame_source, sink, capture_cancel.clone()));
        let mut hub_loop = {
            let hub = Arc::clone(&hub);
            let hub_cancel = hub_cancel.clone();
            tokio::spawn(async move { hub.run(transcoder_source, hub_cancel).await })
        };
        let control_server = serve(
            http_listener,
            api::control_router(Arc::clone(&controller), assets),
            listener_cancel.clone(),
            "control",
        );
        let stream_server =
            serve(ws_listener, api::stream_router(Arc::clone(&hub)), listener_cancel.clone(), "stream");

        let _ = state.send(PipelineState::Running);
        info!("pipeline running");

        // Steady state until an external shutdown request, or until the
        // stream ends on its own (transcoder death is a normal ending).
        let mut hub_done = false;
        tokio::select! {
            _ = cancel.cancelled() => info!("shutdown requested"),
            joined = &mut hub_loop => {
                hub_done = true;
                if let Err(e) = joined {
                    error!(error = %e, "broadcast loop panicked");
                }
                info!("stream ended, shutting down");
            }
        }

        let _ = state.send(PipelineState::Stopping);

        // 1. Stop frame production; the pump closes the transcoder input on
        //    its way out.
        capture_cancel.cancel();
        if let Err(e) = pump.await {
            error!(error = %e, "capture pump panicked");
        }

        // 2. The transcoder drains and exits; the broadcast loop observes
        //    end-of-stream. Cancellation is only the fallback.
        if !hub_done {
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut hub_loop).await {
                Ok(Err(e)) => error!(error = %e, "broadcast loop panicked"),
                Ok(Ok(())) => {}
                Err(_) => {
                    warn!("broadcast loop did not observe end-of-stream, cancelling it");
                    hub_cancel.cancel();
                    if let Err(e) = hub_loop.await {
                        error!(error = %e, "broadcast loop panicked");
                    }
                }
            }
        }

        // 3. Close both listeners.
        listener_cancel.cancel();
        let _ = control_server.await;
        let _ = stream_server.await;

        // 4. Hardware always ends safe.
        controller.safe_shutdown().await;

        let _ = state.send(PipelineState::Stopped);
        info!("pipeline stopped");
    }

    async fn pump_frames<S>(mut source: S, mut sink: TranscoderSink, cancel: CancellationToken)
    where
        S: FrameSource,
    {
        info!(frame_rate = source.frame_rate(), "capture pump started");
        let mut frame_count = 0u64;
        let mut error_count = 0u32;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("capture pump cancelled");
                    break;
                }
                next = source.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => {
                    frame_count += 1;
                    error_count = 0;
                    if let Err(e) = sink.write(&frame).await {
                        // Transcoder went away; the hub will observe its exit.
                        debug!(error = %e, "transcoder stopped accepting frames");
                        break;
                    }
                }
                Ok(None) => {
                    info!("frame source ended after {frame_count} frames");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("capture error ({error_count}/{MAX_CAPTURE_ERRORS}): {e}");
                    if error_count >= MAX_CAPTURE_ERRORS {
                        error!("too many capture errors, stopping pump");
                        break;
                    }
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!("capture pump ended ({frame_count} frames)");
        // Single shutdown site for the transcoder input: end-of-input flows
        // from here through the process to the broadcast loop.
        if let Err(e) = sink.finish().await {
            warn!(error = %e, "failed to close transcoder input");
        }
    }
}

/// Everything the supervisor task owns, bundled to keep `run` readable.
struct Stages<S> {
    cancel: CancellationToken,
    state: watch::Sender<PipelineState>,
    controller: Arc<HatController>,
    hub: Arc<BroadcastHub>,
    assets: Arc<Assets>,
    sink: TranscoderSink,
    transcoder_source: TranscoderSource,
    frame_source: S,
    http_listener: TcpListener,
    ws_listener: TcpListener,
}

async fn bind(port: u16, role: &str) -> Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| RelayError::listener(format!("binding {role} listener on port {port}"), e))
}

fn serve(
    listener: TcpListener,
    app: axum::Router,
    cancel: CancellationToken,
    role: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let shutdown = cancel.cancelled_owned();
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!(error = %e, "{role} listener failed");
        }
        debug!("{role} listener closed");
    })
}
