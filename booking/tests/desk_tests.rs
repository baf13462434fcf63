use std::sync::Arc;
use std::time::Duration;

use booking::desk::{BookingDesk, BookingError};
use common::time::now_ms;
use resources::types::{BookingStatus, PaymentMethod, SlotView, VehicleType};
use timesync::clock::ServerClock;

mod support;
use support::{StubApi, booking};

fn open_slot(id: i64) -> SlotView {
    SlotView {
        id,
        lot_id: 1,
        vehicle_type: VehicleType::Car,
        price_cents: 10_000,
        is_available: true,
        booking: None,
    }
}

fn desk(api: Arc<StubApi>) -> BookingDesk<StubApi> {
    BookingDesk::new(api, ServerClock::new().view(), Duration::from_millis(10))
}

#[tokio::test]
async fn books_an_open_slot_after_payment() {
    let api = Arc::new(StubApi::empty());
    api.set_create_result(Ok(booking(55, BookingStatus::Active, now_ms() + 3_600_000)))
        .await;

    let created = desk(Arc::clone(&api))
        .book(&open_slot(3), "KA-01-1234", VehicleType::Car, PaymentMethod::Card)
        .await
        .expect("booking succeeds");

    assert_eq!(created.id, 55);
    assert_eq!(api.create_calls(), 1);
}

#[tokio::test]
async fn vehicle_with_a_live_booking_is_rejected_before_creation() {
    // The stub reports the vehicle busy while it holds a live booking.
    let api = Arc::new(StubApi::with_booking(booking(
        41,
        BookingStatus::Active,
        now_ms() + 3_600_000,
    )));

    let result = desk(Arc::clone(&api))
        .book(&open_slot(3), "KA-01-1234", VehicleType::Car, PaymentMethod::Card)
        .await;

    match result {
        Err(BookingError::VehicleBusy(message)) => {
            assert!(message.contains("active booking"));
        }
        other => panic!("expected vehicle rejection, got {other:?}"),
    }
    assert_eq!(api.create_calls(), 0);
}

#[tokio::test]
async fn occupied_slot_is_rejected_without_any_network_call() {
    let api = Arc::new(StubApi::empty());

    let mut slot = open_slot(3);
    slot.is_available = false;
    slot.booking = Some(booking(41, BookingStatus::Active, now_ms() + 1_800_000));

    let result = desk(Arc::clone(&api))
        .book(&slot, "KA-01-1234", VehicleType::Car, PaymentMethod::Card)
        .await;

    assert!(matches!(result, Err(BookingError::SlotTaken(3))));
    assert_eq!(api.create_calls(), 0);
}

#[tokio::test]
async fn slot_with_a_lapsed_booking_is_bookable_again() {
    // The last poll still carried the stale booking object, but its window
    // closed: the slot counts as released.
    let api = Arc::new(StubApi::empty());
    api.set_create_result(Ok(booking(56, BookingStatus::Active, now_ms() + 3_600_000)))
        .await;

    let mut slot = open_slot(4);
    slot.is_available = false;
    slot.booking = Some(booking(41, BookingStatus::Active, now_ms() - 1_000));

    let created = desk(Arc::clone(&api))
        .book(&slot, "KA-01-1234", VehicleType::Car, PaymentMethod::Wallet)
        .await
        .expect("released slot is bookable");

    assert_eq!(created.id, 56);
}
