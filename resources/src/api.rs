use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    BookingSummary, NewBooking, RenewalRequest, SlotView, VehicleCheck, VehicleType,
};

/// Client-facing contract of the parking backend.
///
/// Implemented over HTTP by [`crate::client::ApiClient`] and by in-memory
/// stand-ins in tests.
#[async_trait]
pub trait ParkingApi: Send + Sync {
    /// Authoritative slot collection for a lot, optionally narrowed to one
    /// vehicle category.
    async fn list_slots(
        &self,
        lot_id: i64,
        vehicle_type: Option<VehicleType>,
    ) -> Result<Vec<SlotView>, ApiError>;

    async fn get_slot(&self, id: i64) -> Result<SlotView, ApiError>;

    async fn list_bookings(&self) -> Result<Vec<BookingSummary>, ApiError>;

    async fn get_booking(&self, id: i64) -> Result<BookingSummary, ApiError>;

    /// Create a booking with the fixed one-hour window.
    async fn create_booking(&self, req: &NewBooking) -> Result<BookingSummary, ApiError>;

    /// Replace an expired booking with a fresh one; returns the new booking.
    async fn renew_booking(
        &self,
        id: i64,
        req: &RenewalRequest,
    ) -> Result<BookingSummary, ApiError>;

    /// Pre-booking guard: a vehicle that already holds a live booking is
    /// rejected server-side.
    async fn check_vehicle(&self, plate: &str) -> Result<VehicleCheck, ApiError>;

    async fn set_slot_availability(&self, slot_id: i64, is_available: bool)
    -> Result<(), ApiError>;
}
