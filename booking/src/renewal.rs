use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use resources::api::ParkingApi;
use resources::error::ApiError;
use resources::types::{BookingSummary, PaymentMethod, RenewalRequest};

use crate::cache::ResumeCache;
use crate::payment::{PaymentError, process_payment};
use crate::watcher::{BookingPhase, BookingWatcher};

#[derive(Debug, Clone)]
pub struct RenewalConfig {
    /// Fixed discount for renewing straight after expiry, in basis points
    /// off the original price. A configuration constant, never derived at
    /// runtime.
    pub discount_bps: u32,
    /// Artificial settlement delay of the simulated payment processor.
    pub payment_delay: Duration,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            discount_bps: 1_000,
            payment_delay: Duration::from_millis(1_500),
        }
    }
}

#[derive(Error, Debug)]
pub enum RenewalError {
    #[error("booking is not expired yet; renewal is only offered after expiry")]
    NotExpired,

    #[error("booking details are not loaded; wait for the fetch to finish")]
    Unloaded,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone)]
pub struct Renewed {
    pub new_booking_id: i64,
    pub booking: BookingSummary,
}

/// Executes the renew protocol for an expired booking.
///
/// On success the old id has left every local structure (resume cache,
/// countdown, watcher timers) before the new id is handed back for
/// navigation, so no path can observe both at once.
pub struct RenewalCoordinator<A> {
    api: Arc<A>,
    cache: ResumeCache,
    cfg: RenewalConfig,
}

impl<A: ParkingApi> RenewalCoordinator<A> {
    pub fn new(api: Arc<A>, cache: ResumeCache, cfg: RenewalConfig) -> Self {
        Self { api, cache, cfg }
    }

    /// Renewal price after the configured discount.
    pub fn discounted_amount(&self, price_cents: i64) -> i64 {
        price_cents - (price_cents * self.cfg.discount_bps as i64) / 10_000
    }

    /// Renew `watcher`'s booking.
    ///
    /// Rejected client-side, with no network call, unless the watcher has
    /// reached `Expired`. A server `Conflict` means the resource changed
    /// underneath us: the watcher is told to re-poll and the caller must
    /// wait for fresh state before another attempt.
    pub async fn renew(
        &self,
        watcher: &BookingWatcher,
        method: PaymentMethod,
    ) -> Result<Renewed, RenewalError> {
        if watcher.phase() != BookingPhase::Expired {
            return Err(RenewalError::NotExpired);
        }
        let old = watcher.view().booking().ok_or(RenewalError::Unloaded)?;

        let amount_cents = self.discounted_amount(old.price_cents);
        let receipt = process_payment(method, amount_cents, self.cfg.payment_delay).await?;

        let request = RenewalRequest {
            payment_method: method,
            amount_cents,
        };
        let renewed = match self.api.renew_booking(old.id, &request).await {
            Ok(booking) => booking,
            Err(e @ ApiError::Conflict(_)) => {
                watcher.request_reconcile();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        // The old id leaves every local structure before the new one is
        // exposed.
        self.cache.invalidate(old.id);
        watcher.shutdown();

        info!(
            old_booking = old.id,
            new_booking = renewed.id,
            amount_cents,
            reference = %receipt.reference,
            "booking renewed"
        );

        Ok(Renewed {
            new_booking_id: renewed.id,
            booking: renewed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_is_applied_in_basis_points() {
        let coordinator = RenewalCoordinator::new(
            Arc::new(NoopApi),
            ResumeCache::new(),
            RenewalConfig {
                discount_bps: 1_000,
                payment_delay: Duration::ZERO,
            },
        );
        assert_eq!(coordinator.discounted_amount(10_000), 9_000);
        assert_eq!(coordinator.discounted_amount(0), 0);
        assert_eq!(coordinator.discounted_amount(99), 90);
    }

    struct NoopApi;

    #[async_trait::async_trait]
    impl ParkingApi for NoopApi {
        async fn list_slots(
            &self,
            _lot_id: i64,
            _vehicle_type: Option<resources::types::VehicleType>,
        ) -> Result<Vec<resources::types::SlotView>, ApiError> {
            Ok(vec![])
        }

        async fn get_slot(&self, _id: i64) -> Result<resources::types::SlotView, ApiError> {
            Err(ApiError::NotFound)
        }

        async fn list_bookings(&self) -> Result<Vec<BookingSummary>, ApiError> {
            Ok(vec![])
        }

        async fn get_booking(&self, _id: i64) -> Result<BookingSummary, ApiError> {
            Err(ApiError::NotFound)
        }

        async fn create_booking(
            &self,
            _req: &resources::types::NewBooking,
        ) -> Result<BookingSummary, ApiError> {
            Err(ApiError::NotFound)
        }

        async fn renew_booking(
            &self,
            _id: i64,
            _req: &RenewalRequest,
        ) -> Result<BookingSummary, ApiError> {
            Err(ApiError::NotFound)
        }

        async fn check_vehicle(
            &self,
            _plate: &str,
        ) -> Result<resources::types::VehicleCheck, ApiError> {
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
}
