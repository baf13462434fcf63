use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use resources::api::ParkingApi;
use resources::error::ApiError;
use resources::types::{BookingSummary, NewBooking, PaymentMethod, SlotView, VehicleType};
use timesync::clock::ClockView;

use crate::payment::{PaymentError, process_payment};

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("slot {0} is occupied")]
    SlotTaken(i64),

    #[error("vehicle rejected: {0}")]
    VehicleBusy(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Front desk for creating bookings.
///
/// Client-side guards run first (slot open by the server clock, vehicle
/// not already booked), the simulated payment settles, then the server
/// creates the fixed one-hour booking. Server rejections (validation,
/// conflict) surface as-is and block the transition; they are never
/// retried automatically.
pub struct BookingDesk<A> {
    api: Arc<A>,
    clock: ClockView,
    payment_delay: Duration,
}

impl<A: ParkingApi> BookingDesk<A> {
    pub fn new(api: Arc<A>, clock: ClockView, payment_delay: Duration) -> Self {
        Self {
            api,
            clock,
            payment_delay,
        }
    }

    pub async fn book(
        &self,
        slot: &SlotView,
        plate: &str,
        vehicle_type: VehicleType,
        method: PaymentMethod,
    ) -> Result<BookingSummary, BookingError> {
        if !slot.is_open(self.clock.now_ms()) {
            return Err(BookingError::SlotTaken(slot.id));
        }

        let check = self.api.check_vehicle(plate).await?;
        if !check.available {
            return Err(BookingError::VehicleBusy(check.message));
        }

        let receipt = process_payment(method, slot.price_cents, self.payment_delay).await?;

        let booking = self
            .api
            .create_booking(&NewBooking {
                slot_id: slot.id,
                vehicle_plate: plate.to_string(),
                vehicle_type,
                start_time_ms: self.clock.now_ms(),
            })
            .await?;

        info!(
            booking_id = booking.id,
            slot_id = slot.id,
            reference = %receipt.reference,
            "booking created"
        );
        Ok(booking)
    }
}
