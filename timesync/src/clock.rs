use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use parking_lot::RwLock;

use common::time::now_ms as local_now_ms;

use crate::types::{ConnectionState, TimeSample};

#[derive(Debug, Default)]
struct ClockInner {
    sample: Option<TimeSample>,
    state: ConnectionState,
}

/// Shared server-clock state.
///
/// The channel task is the single writer; everything else reads through a
/// [`ClockView`]. The sample is replaced wholesale, never merged.
#[derive(Clone, Default)]
pub struct ServerClock {
    inner: Arc<RwLock<ClockInner>>,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_sample(&self, sample: TimeSample) {
        self.inner.write().sample = Some(sample);
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.inner.write().state = state;
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.read().state
    }

    pub fn view(&self) -> ClockView {
        ClockView {
            clock: self.clone(),
        }
    }
}

/// Read model over the server clock.
///
/// While the channel is connected, `now_ms` derives from the last server
/// sample plus monotonic elapsed time, so it never goes backwards between
/// samples and jumps only when a fresh sample is applied. When the channel
/// is degraded it falls back silently to local wall-clock; callers must
/// not assume sub-second accuracy in that mode.
#[derive(Clone)]
pub struct ClockView {
    clock: ServerClock,
}

/// Display fields derived from a single instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTime {
    pub date: String,
    pub time: String,
    pub time_24h: String,
    pub weekday: String,
}

impl ClockView {
    pub fn now_ms(&self) -> i64 {
        let g = self.clock.inner.read();
        match (&g.sample, g.state) {
            (Some(sample), ConnectionState::Connected) => sample.now_ms(),
            _ => local_now_ms(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        to_utc(self.now_ms())
    }

    pub fn state(&self) -> ConnectionState {
        self.clock.state()
    }

    pub fn is_before(&self, t_ms: i64) -> bool {
        self.now_ms() < t_ms
    }

    pub fn is_after(&self, t_ms: i64) -> bool {
        self.now_ms() > t_ms
    }

    /// Timezone string from the latest sample, if any.
    pub fn timezone(&self) -> Option<String> {
        self.clock.inner.read().sample.as_ref().map(|s| s.timezone.clone())
    }

    /// Render an instant using the broadcast timezone when it parses as a
    /// fixed offset, UTC otherwise.
    pub fn format(&self, t_ms: i64) -> FormattedTime {
        let utc = to_utc(t_ms);
        match self.timezone().as_deref().and_then(parse_fixed_offset) {
            Some(offset) => render(&utc.with_timezone(&offset)),
            None => render(&utc),
        }
    }
}

fn to_utc(t_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(t_ms).single().unwrap_or_else(Utc::now)
}

fn render<Tz: TimeZone>(dt: &DateTime<Tz>) -> FormattedTime
where
    Tz::Offset: fmt::Display,
{
    FormattedTime {
        date: dt.format("%Y-%m-%d").to_string(),
        time: dt.format("%I:%M:%S %p").to_string(),
        time_24h: dt.format("%H:%M:%S").to_string(),
        weekday: dt.format("%A").to_string(),
    }
}

/// Accepts "UTC", "Z", and "+HH:MM" / "-HH:MM" forms. Named zones would
/// need a tz database and are rendered as UTC instead.
fn parse_fixed_offset(tz: &str) -> Option<FixedOffset> {
    if tz.eq_ignore_ascii_case("utc") || tz == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1i32, &tz[1..]),
        b'-' => (-1i32, &tz[1..]),
        _ => return None,
    };

    let (h, m) = rest.split_once(':')?;
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
}
