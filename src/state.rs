use std::sync::Arc;

use crate::db::DbPool;
use crate::payments::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub payments: Arc<dyn PaymentGateway>,
    pub currency: String,
}
