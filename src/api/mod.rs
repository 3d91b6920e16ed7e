pub mod health;
pub mod routes;

use std::sync::Arc;

use crate::db::PoolStore;
use crate::payments::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub store: PoolStore,
    pub gateway: Arc<dyn PaymentGateway>,
}
