use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::ParkingApi;
use crate::error::ApiError;
use crate::types::{
    BookingSummary, NewBooking, RenewalRequest, SlotView, VehicleCheck, VehicleType,
};

/// HTTP implementation of [`ParkingApi`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SlotsEnvelope {
    slots: Vec<SlotView>,
}

#[derive(Deserialize)]
struct BookingsEnvelope {
    bookings: Vec<BookingSummary>,
}

#[derive(Deserialize)]
struct RenewEnvelope {
    new_booking: BookingSummary,
}

#[derive(Serialize)]
struct VehicleCheckRequest<'a> {
    identifier: &'a str,
}

#[derive(Serialize)]
struct AvailabilityPatch {
    is_available: bool,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base_url })
    }

    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), body))
    }
}

#[async_trait]
impl ParkingApi for ApiClient {
    #[instrument(skip(self), level = "debug")]
    async fn list_slots(
        &self,
        lot_id: i64,
        vehicle_type: Option<VehicleType>,
    ) -> Result<Vec<SlotView>, ApiError> {
        let url = format!("{}/lots/{}/slots", self.base_url, lot_id);
        let mut request = self.http.get(&url);
        if let Some(vt) = vehicle_type {
            request = request.query(&[("vehicle_type", vt.as_str())]);
        }

        let resp = Self::check(request.send().await?).await?;
        let envelope: SlotsEnvelope = resp.json().await?;

        debug!(lot_id, count = envelope.slots.len(), "slots fetched");
        Ok(envelope.slots)
    }

    async fn get_slot(&self, id: i64) -> Result<SlotView, ApiError> {
        let url = format!("{}/slots/{}", self.base_url, id);
        let resp = Self::check(self.http.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn list_bookings(&self) -> Result<Vec<BookingSummary>, ApiError> {
        let url = format!("{}/bookings", self.base_url);
        let resp = Self::check(self.http.get(&url).send().await?).await?;
        let envelope: BookingsEnvelope = resp.json().await?;
        Ok(envelope.bookings)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_booking(&self, id: i64) -> Result<BookingSummary, ApiError> {
        let url = format!("{}/bookings/{}", self.base_url, id);
        let resp = Self::check(self.http.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn create_booking(&self, req: &NewBooking) -> Result<BookingSummary, ApiError> {
        let url = format!("{}/bookings", self.base_url);
        let resp = Self::check(self.http.post(&url).json(req).send().await?).await?;
        let booking: BookingSummary = resp.json().await?;

        debug!(booking_id = booking.id, slot_id = booking.slot_id, "booking created");
        Ok(booking)
    }

    async fn renew_booking(
        &self,
        id: i64,
        req: &RenewalRequest,
    ) -> Result<BookingSummary, ApiError> {
        let url = format!("{}/bookings/{}/renew", self.base_url, id);
        let resp = Self::check(self.http.post(&url).json(req).send().await?).await?;
        let envelope: RenewEnvelope = resp.json().await?;

        debug!(old_booking = id, new_booking = envelope.new_booking.id, "booking renewed");
        Ok(envelope.new_booking)
    }

    async fn check_vehicle(&self, plate: &str) -> Result<VehicleCheck, ApiError> {
        let url = format!("{}/vehicles/check", self.base_url);
        let resp = Self::check(
            self.http
                .post(&url)
                .json(&VehicleCheckRequest { identifier: plate })
                .send()
                .await?,
        )
        .await?;
        Ok(resp.json().await?)
    }

    async fn set_slot_availability(
        &self,
        slot_id: i64,
        is_available: bool,
    ) -> Result<(), ApiError> {
        let url = format!("{}/slots/{}/availability", self.base_url, slot_id);
        Self::check(
            self.http
                .patch(&url)
                .json(&AvailabilityPatch { is_available })
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }
}
