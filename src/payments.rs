//! Payment settlement adapter.
//!
//! The gateway is an injected trait object, constructed once at startup and
//! carried in `AppState`; handlers and services never reach for module-level
//! client state. A real processor client implements [`PaymentGateway`]
//! against its HTTP API; the in-process implementation below covers local
//! development and tests.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Initial status recorded on a freshly created intent. Confirmation moves
/// it to `succeeded` or `failed` outside this component.
pub const INTENT_STATUS_PENDING: &str = "pending";
pub const INTENT_STATUS_SUCCEEDED: &str = "succeeded";
pub const INTENT_STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentIntent {
    /// External transaction id, recorded on the order's payment record.
    pub id: String,
    /// Opaque reference the client uses to confirm the payment.
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::PaymentGateway(err.0)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an intent for exactly `amount` in the smallest currency unit.
    async fn create_intent(&self, amount: i64, currency: &str)
    -> Result<PaymentIntent, GatewayError>;
}

/// Deterministic local gateway: mints intent ids without a network round-trip.
pub struct InProcessGateway;

#[async_trait]
impl PaymentGateway for InProcessGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        if amount <= 0 {
            return Err(GatewayError(format!(
                "intent amount must be positive, got {amount}"
            )));
        }
        let id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{id}_secret_{}", Uuid::new_v4().simple());
        Ok(PaymentIntent {
            id,
            client_secret,
            amount,
            currency: currency.to_string(),
            status: INTENT_STATUS_PENDING.to_string(),
        })
    }
}

/// Gateway that rejects every intent; used by tests to drive the
/// reservation-rollback path.
pub struct AlwaysFailGateway;

#[async_trait]
impl PaymentGateway for AlwaysFailGateway {
    async fn create_intent(
        &self,
        _amount: i64,
        _currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        Err(GatewayError("payment processor unreachable".into()))
    }
}
