#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use common::notify::{NoticeLevel, Notifier};
use resources::api::ParkingApi;
use resources::error::ApiError;
use resources::types::{
    BookingStatus, BookingSummary, NewBooking, PaymentStatus, RenewalRequest, SlotView,
    VehicleCheck, VehicleType,
};

pub fn booking(id: i64, status: BookingStatus, end_time_ms: i64) -> BookingSummary {
    BookingSummary {
        id,
        slot_id: 1,
        status,
        start_time_ms: end_time_ms - common::time::HOUR_MS,
        end_time_ms,
        price_cents: 10_000,
        payment_status: PaymentStatus::Paid,
    }
}

/// In-memory stand-in for the parking backend.
pub struct StubApi {
    pub booking: Mutex<Option<BookingSummary>>,
    pub renew_result: Mutex<Option<Result<BookingSummary, ApiError>>>,
    pub create_result: Mutex<Option<Result<BookingSummary, ApiError>>>,
    pub last_renew: Mutex<Option<RenewalRequest>>,
    pub get_delay: Duration,
    pub get_calls: AtomicU64,
    pub renew_calls: AtomicU64,
    pub create_calls: AtomicU64,
}

impl StubApi {
    pub fn empty() -> Self {
        Self {
            booking: Mutex::new(None),
            renew_result: Mutex::new(None),
            create_result: Mutex::new(None),
            last_renew: Mutex::new(None),
            get_delay: Duration::ZERO,
            get_calls: AtomicU64::new(0),
            renew_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
        }
    }

    pub fn with_booking(b: BookingSummary) -> Self {
        let api = Self::empty();
        *api.booking.try_lock().expect("fresh stub") = Some(b);
        api
    }

    pub async fn set_booking(&self, b: BookingSummary) {
        *self.booking.lock().await = Some(b);
    }

    pub async fn set_renew_result(&self, result: Result<BookingSummary, ApiError>) {
        *self.renew_result.lock().await = Some(result);
    }

    pub async fn set_create_result(&self, result: Result<BookingSummary, ApiError>) {
        *self.create_result.lock().await = Some(result);
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn renew_calls(&self) -> u64 {
        self.renew_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParkingApi for StubApi {
    async fn list_slots(
        &self,
        _lot_id: i64,
        _vehicle_type: Option<VehicleType>,
    ) -> Result<Vec<SlotView>, ApiError> {
        Ok(vec![])
    }

    async fn get_slot(&self, _id: i64) -> Result<SlotView, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn list_bookings(&self) -> Result<Vec<BookingSummary>, ApiError> {
        Ok(self.booking.lock().await.clone().into_iter().collect())
    }

    async fn get_booking(&self, id: i64) -> Result<BookingSummary, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if !self.get_delay.is_zero() {
            tokio::time::sleep(self.get_delay).await;
        }
        match self.booking.lock().await.clone() {
            Some(b) if b.id == id => Ok(b),
            _ => Err(ApiError::NotFound),
        }
    }

    async fn create_booking(&self, _req: &NewBooking) -> Result<BookingSummary, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_result
            .lock()
            .await
            .take()
            .unwrap_or(Err(ApiError::NotFound))
    }

    async fn renew_booking(
        &self,
        _id: i64,
        req: &RenewalRequest,
    ) -> Result<BookingSummary, ApiError> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_renew.lock().await = Some(req.clone());
        self.renew_result
            .lock()
            .await
            .take()
            .unwrap_or(Err(ApiError::NotFound))
    }

    async fn check_vehicle(&self, _plate: &str) -> Result<VehicleCheck, ApiError> {
        let occupied = self
            .booking
            .lock()
            .await
            .as_ref()
            .map(|b| b.is_live())
            .unwrap_or(false);
        Ok(VehicleCheck {
            available: !occupied,
            message: if occupied {
                "vehicle already has an active booking".to_string()
            } else {
                "ok".to_string()
            },
        })
    }

    async fn set_slot_availability(
        &self,
        _slot_id: i64,
        _is_available: bool,
    ) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Notifier that records every notice for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: parking_lot::Mutex<Vec<(String, NoticeLevel)>>,
}

impl RecordingNotifier {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|(message, _)| message.contains(needle))
            .count()
    }

    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, level: NoticeLevel) {
        self.notices.lock().push((message.to_string(), level));
    }
}
