use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use resources::api::ParkingApi;
use resources::board::SlotBoard;
use resources::error::ApiError;
use resources::poller::run_slot_poller;
use resources::types::{
    BookingSummary, NewBooking, PollScope, RenewalRequest, SlotView, VehicleCheck, VehicleType,
};
use timesync::clock::ServerClock;

fn slot_for(lot_id: i64) -> SlotView {
    SlotView {
        id: lot_id * 100,
        lot_id,
        vehicle_type: VehicleType::Car,
        price_cents: 10_000,
        is_available: true,
        booking: None,
    }
}

fn scope(lot_id: i64) -> PollScope {
    PollScope {
        lot_id,
        vehicle_type: None,
    }
}

/// Answers `list_slots` after a per-lot delay; everything else is unused.
struct ScriptedApi {
    delay_by_lot: HashMap<i64, Duration>,
    fail_after: Option<u64>,
    calls: AtomicU64,
}

impl ScriptedApi {
    fn with_delays(delays: &[(i64, Duration)]) -> Self {
        Self {
            delay_by_lot: delays.iter().cloned().collect(),
            fail_after: None,
            calls: AtomicU64::new(0),
        }
    }

    fn failing_after(calls: u64) -> Self {
        Self {
            delay_by_lot: HashMap::new(),
            fail_after: Some(calls),
            calls: AtomicU64::new(0),
        }
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParkingApi for ScriptedApi {
    async fn list_slots(
        &self,
        lot_id: i64,
        _vehicle_type: Option<VehicleType>,
    ) -> Result<Vec<SlotView>, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.delay_by_lot.get(&lot_id) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(limit) = self.fail_after {
            if n > limit {
                return Err(ApiError::Status(503));
            }
        }
        Ok(vec![slot_for(lot_id)])
    }

    async fn get_slot(&self, _id: i64) -> Result<SlotView, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn list_bookings(&self) -> Result<Vec<BookingSummary>, ApiError> {
        Ok(vec![])
    }

    async fn get_booking(&self, _id: i64) -> Result<BookingSummary, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn create_booking(&self, _req: &NewBooking) -> Result<BookingSummary, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn renew_booking(
        &self,
        _id: i64,
        _req: &RenewalRequest,
    ) -> Result<BookingSummary, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn check_vehicle(&self, _plate: &str) -> Result<VehicleCheck, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn set_slot_availability(
        &self,
        _slot_id: i64,
        _is_available: bool,
    ) -> Result<(), ApiError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn stale_in_flight_response_is_discarded_on_scope_change() {
    // Lot 1 answers slowly, lot 2 quickly: the response issued first
    // completes last.
    let api = Arc::new(ScriptedApi::with_delays(&[
        (1, Duration::from_secs(5)),
        (2, Duration::from_millis(100)),
    ]));
    let board = SlotBoard::new();
    let (scope_tx, scope_rx) = watch::channel(scope(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(run_slot_poller(
        Arc::clone(&api),
        board.clone(),
        ServerClock::new().view(),
        scope_rx,
        shutdown_rx,
        Duration::from_secs(60),
    ));

    // Let the initial poll for lot 1 go out, then switch scope while it is
    // still in flight.
    tokio::time::sleep(Duration::from_millis(10)).await;
    scope_tx.send(scope(2)).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let current = board.snapshot().await.expect("lot 2 snapshot applied");
    assert_eq!(current.scope.lot_id, 2);

    // The slow lot-1 response lands now and must be dropped.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let current = board.snapshot().await.unwrap();
    assert_eq!(current.scope.lot_id, 2);
    assert_eq!(current.slots[0].lot_id, 2);

    shutdown_tx.send(true).unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failures_retain_displayed_state() {
    let api = Arc::new(ScriptedApi::failing_after(1));
    let board = SlotBoard::new();
    let (_scope_tx, scope_rx) = watch::channel(scope(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(run_slot_poller(
        Arc::clone(&api),
        board.clone(),
        ServerClock::new().view(),
        scope_rx,
        shutdown_rx,
        Duration::from_secs(1),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(board.snapshot().await.is_some());

    // Several failing cycles later the first snapshot is still on screen.
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(api.calls() > 1);
    let current = board.snapshot().await.unwrap();
    assert_eq!(current.seq, 1);
    assert_eq!(current.slots.len(), 1);

    shutdown_tx.send(true).unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_poll_interval() {
    let api = Arc::new(ScriptedApi::with_delays(&[]));
    let board = SlotBoard::new();
    let (_scope_tx, scope_rx) = watch::channel(scope(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(run_slot_poller(
        Arc::clone(&api),
        board.clone(),
        ServerClock::new().view(),
        scope_rx,
        shutdown_rx,
        Duration::from_millis(100),
    ));

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(api.calls() >= 3);

    shutdown_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after_stop = api.calls();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(api.calls(), after_stop);
}
