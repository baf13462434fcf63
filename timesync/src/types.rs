use std::fmt;
use std::time::Instant;

use serde::Deserialize;

/// Latest observation of the server clock.
///
/// Replaced wholesale on every `time_update` frame; never merged with the
/// previous sample. Derived "now" is the server instant plus the monotonic
/// time elapsed locally since the frame arrived, never raw wall-clock.
#[derive(Debug, Clone)]
pub struct TimeSample {
    pub server_epoch_ms: i64,
    pub received_at: Instant,
    pub timezone: String,
}

impl TimeSample {
    pub fn now_ms(&self) -> i64 {
        self.server_epoch_ms + self.received_at.elapsed().as_millis() as i64
    }
}

/// Connection state of the time channel. Written only by the channel task;
/// every other component reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
        };
        f.write_str(s)
    }
}

/// Server → client frames on the time channel. The client never sends.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TimeFrame {
    #[serde(rename = "connected")]
    Connected,

    #[serde(rename = "time_update")]
    TimeUpdate(TimeUpdate),

    /// Frame kinds this client does not know about are tolerated.
    #[serde(other)]
    Unknown,
}

/// Payload of a `time_update` frame. The server also sends pre-rendered
/// display fields (date, weekday, ...); the client derives those itself
/// from the timestamp and ignores them on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeUpdate {
    /// Unix seconds.
    pub timestamp: i64,
    pub timezone: String,
}
