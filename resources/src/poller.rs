use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use timesync::clock::ClockView;

use crate::api::ParkingApi;
use crate::board::{SlotBoard, SlotSnapshot};
use crate::types::PollScope;

/// Slot reconciliation loop.
///
/// Polls the authoritative slot collection for the current scope on a
/// fixed cadence, immediately on scope change, and stops when the shutdown
/// flag flips. Each request carries an issue-order sequence number; the
/// board rejects responses that a newer request has superseded, so rapid
/// scope changes cannot leave a stale lot on screen.
///
/// Failures here are logged and swallowed: a transient poll error must
/// never clear already-displayed state, and the next tick is the retry.
pub async fn run_slot_poller<A>(
    api: Arc<A>,
    board: SlotBoard,
    clock: ClockView,
    mut scope_rx: watch::Receiver<PollScope>,
    mut shutdown_rx: watch::Receiver<bool>,
    poll_every: Duration,
) where
    A: ParkingApi + 'static,
{
    let mut ticker = interval(poll_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut seq: u64 = 0;

    info!(every_ms = poll_every.as_millis() as u64, "slot poller started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = scope_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // New scope polls now and restarts the cadence from here.
                ticker.reset();
            }
            res = shutdown_rx.changed() => {
                // A dropped sender counts as shutdown.
                if res.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let scope = scope_rx.borrow().clone();
        seq += 1;
        let issued = seq;

        let api = Arc::clone(&api);
        let board = board.clone();
        let clock = clock.clone();

        // Requests run detached so a slow response never blocks the next
        // scope change; the board's sequence gate arbitrates completions.
        tokio::spawn(async move {
            match api.list_slots(scope.lot_id, scope.vehicle_type).await {
                Ok(slots) => {
                    let applied = board
                        .apply(SlotSnapshot {
                            seq: issued,
                            scope: scope.clone(),
                            polled_at_ms: clock.now_ms(),
                            slots,
                        })
                        .await;

                    if applied {
                        debug!(seq = issued, lot_id = scope.lot_id, "slot snapshot applied");
                    } else {
                        debug!(seq = issued, lot_id = scope.lot_id, "stale slot snapshot dropped");
                    }
                }
                Err(e) => {
                    warn!(seq = issued, lot_id = scope.lot_id, error = %e, "slot poll failed");
                }
            }
        });
    }

    info!("slot poller stopped");
}
