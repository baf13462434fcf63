use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use resources::types::PaymentMethod;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
}

#[derive(Debug, Clone)]
pub struct PaymentResult {
    pub reference: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
}

/// Simulated payment processor: a fixed artificial delay, then success.
///
/// There is no settlement behind this call; it exists so the lifecycle
/// engine exercises the same asynchronous shape a real processor would
/// have. The declined path is reserved for callers that surface processor
/// rejections.
pub async fn process_payment(
    method: PaymentMethod,
    amount_cents: i64,
    delay: Duration,
) -> Result<PaymentResult, PaymentError> {
    debug!(%method, amount_cents, "processing payment");
    tokio::time::sleep(delay).await;

    let reference = format!("pay-{}", Uuid::new_v4());
    debug!(%method, amount_cents, reference = %reference, "payment settled");

    Ok(PaymentResult {
        reference,
        method,
        amount_cents,
    })
}
