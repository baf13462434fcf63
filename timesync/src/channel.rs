use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::notify::{NoticeLevel, Notifier};

use crate::clock::ServerClock;
use crate::types::{ConnectionState, TimeFrame, TimeSample};

const BASE_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Delay before reconnect attempt number `attempts` (0-based):
/// 1s, 2s, 4s, 8s, 16s, then capped at 30s.
fn backoff_delay(attempts: u32) -> Duration {
    let exp = BASE_BACKOFF_MS.saturating_mul(1u64 << attempts.min(20));
    Duration::from_millis(exp.min(MAX_BACKOFF_MS))
}

/// Receive-only client for the server time-broadcast endpoint.
///
/// Owns the single live connection and all reconnection policy. Every
/// inbound `time_update` replaces the shared [`ServerClock`] sample; the
/// channel is the only writer of connection state.
pub struct TimeSyncChannel {
    url: String,
    clock: ServerClock,
    notifier: Arc<dyn Notifier>,
}

/// Handle to a spawned channel task.
pub struct TimeSyncHandle {
    shutting_down: Arc<AtomicBool>,
    clock: ServerClock,
    task: JoinHandle<()>,
}

impl TimeSyncHandle {
    /// Tear the channel down. The shutting-down flag is raised before the
    /// socket task is stopped so the close path can never schedule another
    /// reconnect. Idempotent.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.task.abort();
        self.clock.set_state(ConnectionState::Disconnected);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl TimeSyncChannel {
    pub fn new(url: String, clock: ServerClock, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            url,
            clock,
            notifier,
        }
    }

    /// Spawn the connection loop and return its handle.
    pub fn spawn(self) -> TimeSyncHandle {
        let shutting_down = Arc::new(AtomicBool::new(false));
        let clock = self.clock.clone();
        let flag = Arc::clone(&shutting_down);
        let task = tokio::spawn(async move { self.run(flag).await });

        TimeSyncHandle {
            shutting_down,
            clock,
            task,
        }
    }

    async fn run(self, shutting_down: Arc<AtomicBool>) {
        let mut attempts: u32 = 0;
        let mut warned_this_episode = false;

        loop {
            if shutting_down.load(Ordering::SeqCst) {
                break;
            }

            self.clock.set_state(ConnectionState::Connecting);
            debug!(url = %self.url, attempts, "dialing time channel");

            match connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    self.clock.set_state(ConnectionState::Connected);
                    attempts = 0;
                    warned_this_episode = false;
                    info!(url = %self.url, "time channel connected");

                    // Runs until the stream ends or errors. The socket is
                    // owned by this call and dropped on return, so a
                    // replacement is never dialed while it is still open.
                    self.read_frames(socket).await;
                }
                Err(e) => {
                    debug!(error = %e, "time channel dial failed");
                }
            }

            if shutting_down.load(Ordering::SeqCst) {
                break;
            }

            self.clock.set_state(ConnectionState::Disconnected);

            if !warned_this_episode {
                warned_this_episode = true;
                let episode = Uuid::new_v4();
                warn!(%episode, "time channel lost; falling back to local clock");
                self.notifier.notify(
                    "Server time connection lost; running on the local clock until it recovers",
                    NoticeLevel::Warning,
                );
            }

            let delay = backoff_delay(attempts);
            attempts = attempts.saturating_add(1);
            debug!(delay_ms = delay.as_millis() as u64, attempts, "reconnect scheduled");
            tokio::time::sleep(delay).await;
        }

        self.clock.set_state(ConnectionState::Disconnected);
        debug!("time channel task exited");
    }

    async fn read_frames(&self, mut socket: WebSocketStream<MaybeTlsStream<TcpStream>>) {
        while let Some(message) = socket.next().await {
            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "time channel read error");
                    break;
                }
            };

            if !message.is_text() {
                continue;
            }

            let Ok(raw) = message.to_text() else {
                continue;
            };

            match serde_json::from_str::<TimeFrame>(raw) {
                Ok(TimeFrame::TimeUpdate(update)) => {
                    self.clock.apply_sample(TimeSample {
                        server_epoch_ms: update.timestamp * 1_000,
                        received_at: Instant::now(),
                        timezone: update.timezone,
                    });
                }
                Ok(TimeFrame::Connected) => {
                    debug!("time channel handshake acknowledged");
                }
                Ok(TimeFrame::Unknown) => {
                    debug!("unrecognized frame kind on time channel");
                }
                Err(e) => {
                    debug!(error = %e, "undecodable frame on time channel");
                }
            }
        }
    }
}
