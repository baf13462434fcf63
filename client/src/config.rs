#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Websocket endpoint broadcasting server time at ~1 Hz.
    pub time_ws_url: String,

    /// Base URL of the parking REST API.
    pub api_base_url: String,

    /// Parking lot whose slots this client observes.
    pub lot_id: i64,

    /// Booking to watch from startup, if any.
    pub booking_id: Option<i64>,

    // =========================
    // Polling cadence
    // =========================
    /// Slot reconciliation interval (ms). Every poll replaces the local
    /// snapshot wholesale; there is no separate retry path for failures.
    pub slot_poll_ms: u64,

    /// Booking reconciliation interval (ms). Runs independently of the
    /// countdown so server-side auto-completion is caught even when the
    /// local clock missed it.
    pub reconcile_poll_ms: u64,

    // =========================
    // Renewal / payment
    // =========================
    /// Renewal discount in basis points off the original price.
    pub renewal_discount_bps: u32,

    /// Artificial settlement delay of the simulated payment processor (ms).
    pub payment_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            time_ws_url: env_or("TIME_WS_URL", "ws://127.0.0.1:8000/ws/server-time"),
            api_base_url: env_or("PARKING_API_URL", "http://127.0.0.1:8000/api"),
            lot_id: env_parse("LOT_ID", 1),
            booking_id: std::env::var("BOOKING_ID").ok().and_then(|v| v.parse().ok()),
            slot_poll_ms: env_parse("SLOT_POLL_MS", 10_000),
            reconcile_poll_ms: env_parse("RECONCILE_POLL_MS", 15_000),
            renewal_discount_bps: env_parse("RENEWAL_DISCOUNT_BPS", 1_000),
            payment_delay_ms: env_parse("PAYMENT_DELAY_MS", 1_500),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
