use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use resources::types::BookingSummary;

/// Advisory resume cache.
///
/// Lets a booking screen render instantly while the authoritative fetch is
/// in flight. Entries are JSON-serialized summaries keyed by booking id,
/// live only for this process, and are never treated as truth: every fetch
/// result supersedes them and renewal invalidates the old id.
#[derive(Clone, Default)]
pub struct ResumeCache {
    inner: Arc<Mutex<HashMap<i64, String>>>,
}

impl ResumeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, booking: &BookingSummary) {
        match serde_json::to_string(booking) {
            Ok(json) => {
                self.inner.lock().insert(booking.id, json);
            }
            Err(e) => debug!(booking_id = booking.id, error = %e, "resume cache encode failed"),
        }
    }

    pub fn get(&self, booking_id: i64) -> Option<BookingSummary> {
        let json = self.inner.lock().get(&booking_id).cloned()?;
        match serde_json::from_str(&json) {
            Ok(booking) => Some(booking),
            Err(e) => {
                debug!(booking_id, error = %e, "resume cache decode failed");
                None
            }
        }
    }

    /// Drop the entry for a booking id, if any. Returns whether one existed.
    pub fn invalidate(&self, booking_id: i64) -> bool {
        let removed = self.inner.lock().remove(&booking_id).is_some();
        if removed {
            debug!(booking_id, "resume cache entry invalidated");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
