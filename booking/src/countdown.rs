use std::collections::{HashMap, HashSet};

use tracing::debug;

use common::time::MINUTE_MS;
use resources::types::{BookingStatus, BookingSummary, PaymentStatus};

/// Default one-time warning threshold before expiry.
pub const EXPIRING_SOON_MS: i64 = 5 * MINUTE_MS;

/// Display phase of one tracked booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    /// Window not open yet, or payment unconfirmed: nothing counts down.
    Scheduled,
    Counting,
    Expired,
}

/// Display state for one tracked booking.
///
/// `start_time_ms` / `end_time_ms` are foreign data owned by the poller;
/// this module never invents or adjusts them.
#[derive(Debug, Clone)]
pub struct CountdownEntry {
    pub entity_id: i64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub remaining_ms: Option<i64>,
    status: BookingStatus,
    payment_pending: bool,
    phase: CountdownPhase,
    prev_remaining_ms: Option<i64>,
    warned_expiring: bool,
}

impl CountdownEntry {
    fn new(booking: &BookingSummary) -> Self {
        Self {
            entity_id: booking.id,
            start_time_ms: booking.start_time_ms,
            end_time_ms: booking.end_time_ms,
            remaining_ms: None,
            status: booking.status,
            payment_pending: booking.payment_status == PaymentStatus::Pending,
            phase: CountdownPhase::Scheduled,
            prev_remaining_ms: None,
            warned_expiring: false,
        }
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn expired(&self) -> bool {
        self.phase == CountdownPhase::Expired
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Remaining time crossed the warning threshold. At most once per entry.
    ExpiringSoon { entity_id: i64, remaining_ms: i64 },
    /// Remaining time ran out. Exactly once per entry.
    Expired { entity_id: i64 },
}

/// Tick-driven countdown engine over per-booking state.
///
/// Remaining time is always recomputed from the absolute end instant, so
/// skipped ticks (suspension, jitter) cannot accumulate drift. Expiry here
/// is display truth only: authoritative status transitions belong to the
/// reconciliation poll.
pub struct CountdownScheduler {
    entries: HashMap<i64, CountdownEntry>,
    threshold_ms: i64,
}

impl Default for CountdownScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownScheduler {
    pub fn new() -> Self {
        Self::with_threshold(EXPIRING_SOON_MS)
    }

    pub fn with_threshold(threshold_ms: i64) -> Self {
        Self {
            entries: HashMap::new(),
            threshold_ms,
        }
    }

    /// Reconcile against a fresh poll result: wholesale replacement of the
    /// foreign fields, removal of entries whose booking vanished or went
    /// terminal.
    pub fn sync(&mut self, bookings: &[BookingSummary]) {
        let live: HashSet<i64> = bookings
            .iter()
            .filter(|b| b.is_live())
            .map(|b| b.id)
            .collect();
        self.entries.retain(|id, _| live.contains(id));

        for booking in bookings.iter().filter(|b| b.is_live()) {
            let entry = self
                .entries
                .entry(booking.id)
                .or_insert_with(|| CountdownEntry::new(booking));

            // A changed window means the server replaced the booking terms;
            // the local latches no longer describe it.
            if entry.end_time_ms != booking.end_time_ms {
                entry.phase = CountdownPhase::Scheduled;
                entry.warned_expiring = false;
                entry.prev_remaining_ms = None;
            }

            entry.start_time_ms = booking.start_time_ms;
            entry.end_time_ms = booking.end_time_ms;
            entry.status = booking.status;
            entry.payment_pending = booking.payment_status == PaymentStatus::Pending;
        }
    }

    /// Advance every entry to `now_ms` and collect threshold crossings.
    pub fn tick(&mut self, now_ms: i64) -> Vec<CountdownEvent> {
        let mut events = Vec::new();

        for entry in self.entries.values_mut() {
            if entry.phase == CountdownPhase::Expired {
                continue;
            }

            // The countdown does not start until the server confirms
            // payment.
            if entry.payment_pending {
                entry.remaining_ms = None;
                entry.prev_remaining_ms = None;
                continue;
            }

            // A scheduled booking shows time until its window opens; the
            // poller promotes it to Active, not this timer.
            if entry.status == BookingStatus::Scheduled {
                entry.remaining_ms = Some((entry.start_time_ms - now_ms).max(0));
                entry.prev_remaining_ms = None;
                continue;
            }

            let remaining = entry.end_time_ms - now_ms;

            if remaining <= 0 {
                entry.phase = CountdownPhase::Expired;
                entry.remaining_ms = Some(0);
                debug!(entity_id = entry.entity_id, "countdown reached zero");
                events.push(CountdownEvent::Expired {
                    entity_id: entry.entity_id,
                });
                continue;
            }

            entry.phase = CountdownPhase::Counting;

            // Range test across the last observed value: an exact-equality
            // check misses the mark entirely when a tick is skipped.
            let crossed = match entry.prev_remaining_ms {
                Some(prev) => prev > self.threshold_ms && remaining <= self.threshold_ms,
                None => remaining <= self.threshold_ms,
            };
            if crossed && !entry.warned_expiring {
                entry.warned_expiring = true;
                events.push(CountdownEvent::ExpiringSoon {
                    entity_id: entry.entity_id,
                    remaining_ms: remaining,
                });
            }

            entry.prev_remaining_ms = Some(remaining);
            entry.remaining_ms = Some(remaining);
        }

        events
    }

    pub fn remove(&mut self, entity_id: i64) -> bool {
        self.entries.remove(&entity_id).is_some()
    }

    pub fn get(&self, entity_id: i64) -> Option<&CountdownEntry> {
        self.entries.get(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
