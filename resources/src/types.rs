use std::fmt;

use serde::{Deserialize, Serialize};

use common::time::HOUR_MS;

/// Fixed booking window. Set server-side at creation and never mutated by
/// the client.
pub const BOOKING_DURATION_MS: i64 = HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Motorcycle,
    Truck,
}

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Motorcycle => "motorcycle",
            VehicleType::Truck => "truck",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Scheduled,
    /// Older server builds still emit `BOOKED` for this state.
    #[serde(alias = "BOOKED")]
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that still occupy a slot.
    pub fn is_live(self) -> bool {
        matches!(self, BookingStatus::Scheduled | BookingStatus::Active)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Scheduled => "SCHEDULED",
            BookingStatus::Active => "ACTIVE",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Wallet,
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Cash => "cash",
        };
        f.write_str(s)
    }
}

/// Server-owned booking view. Rebuilt wholesale from every poll response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub id: i64,
    pub slot_id: i64,
    pub status: BookingStatus,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub price_cents: i64,
    pub payment_status: PaymentStatus,
}

impl BookingSummary {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// The window has already closed according to `now_ms`.
    pub fn has_lapsed(&self, now_ms: i64) -> bool {
        self.end_time_ms <= now_ms
    }
}

/// Server-owned slot view. Derived data: availability is replaced by the
/// next poll or an explicit release call, never flipped by local timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub id: i64,
    pub lot_id: i64,
    pub vehicle_type: VehicleType,
    pub price_cents: i64,
    pub is_available: bool,
    pub booking: Option<BookingSummary>,
}

impl SlotView {
    /// Display availability. `is_available` is server truth, but a live
    /// booking whose window has already passed is treated as released even
    /// when the poll payload still carries it.
    pub fn is_open(&self, now_ms: i64) -> bool {
        match &self.booking {
            Some(b) if b.is_live() => b.has_lapsed(now_ms),
            _ => self.is_available,
        }
    }
}

/// Scope of one slot reconciliation poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollScope {
    pub lot_id: i64,
    pub vehicle_type: Option<VehicleType>,
}

/// Request body for booking creation. The server derives the end of the
/// window; clients only choose when it starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    pub slot_id: i64,
    pub vehicle_plate: String,
    pub vehicle_type: VehicleType,
    pub start_time_ms: i64,
}

/// Request body for the renew call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenewalRequest {
    pub payment_method: PaymentMethod,
    pub amount_cents: i64,
}

/// Response of the vehicle pre-booking check.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleCheck {
    pub available: bool,
    pub message: String,
}
