//! Fan-out broadcast of encoded stream chunks.
//!
//! One reader loop drains the transcoder's output and fans every chunk out
//! verbatim to all connected stream clients through a bounded broadcast
//! channel. A client that falls more than the channel capacity behind is
//! disconnected by its own connection task rather than ever stalling the hub.

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::header::StreamHeader;
use crate::transcoder::ChunkStream;

/// Fixed read size for encoded chunks.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Re-poll interval when the transcoder produced nothing but is still alive.
const IDLE_POLL: std::time::Duration = std::time::Duration::from_millis(50);

/// A new client's view of the stream: the framing header it must be sent
/// first, then the live chunk feed.
pub struct StreamSubscription {
    pub header: StreamHeader,
    pub chunks: broadcast::Receiver<Bytes>,
}

/// Broadcast hub owning the stream client set.
pub struct BroadcastHub {
    tx: broadcast::Sender<Bytes>,
    header: StreamHeader,
}

impl BroadcastHub {
    /// Create a hub with the given framing header and per-client queue depth.
    pub fn new(header: StreamHeader, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, header }
    }

    /// Register a new stream client.
    ///
    /// The caller must deliver `header` to its client before forwarding any
    /// chunk. Dropping the receiver is a disconnect.
    pub fn subscribe(&self) -> StreamSubscription {
        let subscription = StreamSubscription { header: self.header, chunks: self.tx.subscribe() };
        debug!(clients = self.client_count(), "stream client subscribed");
        subscription
    }

    /// Number of currently connected stream clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Drain the transcoder output and broadcast until end-of-stream.
    ///
    /// The loop ends when the external process has exited and its output is
    /// drained; a zero-byte read alone only triggers a brief idle re-poll.
    /// Supervisor cancellation is a fallback exit for abnormal teardown. The
    /// child is reaped before returning.
    pub async fn run<S: ChunkStream>(&self, mut source: S, cancel: CancellationToken) {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut broadcast_bytes = 0u64;

        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("broadcast loop cancelled");
                    break;
                }
                read = source.read_chunk(&mut buf) => read,
            };

            match read {
                Ok(0) => match source.has_exited().await {
                    Ok(true) => {
                        info!(broadcast_bytes, "transcoder ended, broadcast loop done");
                        break;
                    }
                    Ok(false) => tokio::time::sleep(IDLE_POLL).await,
                    Err(e) => {
                        warn!(error = %e, "lost track of transcoder, stopping broadcast");
                        break;
                    }
                },
                Ok(n) => {
                    broadcast_bytes += n as u64;
                    // A send with zero receivers just means nobody is watching.
                    let _ = self.tx.send(Bytes::copy_from_slice(&buf[..n]));
                }
                Err(e) => {
                    warn!(error = %e, "transcoder read failed, stopping broadcast");
                    break;
                }
            }
        }

        if let Err(e) = source.finish().await {
            warn!(error = %e, "failed to reap transcoder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Scripted stand-in for the transcoder's read half.
    struct ScriptedStream {
        reads: VecDeque<Vec<u8>>,
        exit_answers: VecDeque<bool>,
        finished: Arc<AtomicBool>,
    }

    impl ScriptedStream {
        fn new(reads: Vec<Vec<u8>>, exit_answers: Vec<bool>) -> (Self, Arc<AtomicBool>) {
            let finished = Arc::new(AtomicBool::new(false));
            (
                Self {
                    reads: reads.into(),
                    exit_answers: exit_answers.into(),
                    finished: Arc::clone(&finished),
                },
                finished,
            )
        }
    }

    #[async_trait::async_trait]
    impl ChunkStream for ScriptedStream {
        async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.reads.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        async fn has_exited(&mut self) -> Result<bool> {
            Ok(self.exit_answers.pop_front().unwrap_or(true))
        }

        async fn finish(&mut self) -> Result<()> {
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn hub() -> BroadcastHub {
        BroadcastHub::new(StreamHeader::new(640, 480), 16)
    }

    #[tokio::test(start_paused = true)]
    async fn fans_chunks_out_to_every_subscriber() {
        let hub = hub();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.client_count(), 2);

        let (source, _) = ScriptedStream::new(vec![b"aaa".to_vec(), b"bb".to_vec()], vec![]);
        hub.run(source, CancellationToken::new()).await;

        for client in [&mut first, &mut second] {
            assert_eq!(client.chunks.recv().await.unwrap(), Bytes::from_static(b"aaa"));
            assert_eq!(client.chunks.recv().await.unwrap(), Bytes::from_static(b"bb"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_read_with_live_process_does_not_end_the_loop() {
        let hub = hub();
        let mut client = hub.subscribe();

        // First drain attempt comes up empty while the process is still
        // running; the loop must re-poll and pick up the late chunk.
        let (source, finished) =
            ScriptedStream::new(vec![vec![], b"late".to_vec()], vec![false, true]);
        hub.run(source, CancellationToken::new()).await;

        assert_eq!(client.chunks.recv().await.unwrap(), Bytes::from_static(b"late"));
        assert!(finished.load(Ordering::SeqCst), "child must be reaped");
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_with_no_clients_is_not_an_error() {
        let hub = hub();
        let (source, finished) = ScriptedStream::new(vec![b"chunk".to_vec()], vec![]);
        hub.run(source, CancellationToken::new()).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_an_idle_loop() {
        let hub = hub();
        // Endless "empty but alive" source
        let (source, finished) = ScriptedStream::new(vec![], vec![false; 10_000]);
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let run = tokio::spawn(async move { hub.run(source, cancel).await });
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        stopper.cancel();
        run.await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_carries_the_framing_header() {
        let hub = hub();
        let subscription = hub.subscribe();
        assert_eq!(subscription.header, StreamHeader::new(640, 480));
        assert_eq!(subscription.header.encode()[..4], *b"jsmp");
    }
}
