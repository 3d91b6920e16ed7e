//! Payment collaborator. The submission workflow computes a price, freezes it
//! on the guess row, and opens a checkout session carrying the frozen payload
//! in metadata. The provider's webhook echoes that metadata back and the
//! confirmation path consumes it verbatim — the price is never re-derived.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Frozen guess payload round-tripped through the checkout provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub guess_id: Uuid,
    pub pool_id: Uuid,
    pub user_id: Uuid,
    pub guessed_birth_date: String,
    /// Ounces.
    pub guessed_weight: f64,
    /// Dollars, frozen at submission.
    pub calculated_price: f64,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
    pub description: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Webhook event delivered asynchronously by the checkout provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub session_id: String,
    pub metadata: CheckoutMetadata,
}

pub const CHECKOUT_COMPLETED: &str = "checkout.completed";

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, req: CheckoutRequest) -> Result<CheckoutSession>;
}

/// HTTP implementation talking to the hosted checkout provider.
pub struct HttpCheckoutGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl HttpCheckoutGateway {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.checkout_api_url.clone(),
            secret_key: cfg.checkout_secret_key.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpCheckoutGateway {
    async fn create_checkout_session(&self, req: CheckoutRequest) -> Result<CheckoutSession> {
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({
                "amount": req.amount_cents,
                "currency": "usd",
                "description": req.description,
                "metadata": req.metadata,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Payment(format!(
                "checkout session creation failed: HTTP {}",
                resp.status()
            )));
        }

        let session: CheckoutSession = resp.json().await?;
        info!(
            session_id = %session.id,
            guess_id = %req.metadata.guess_id,
            amount_cents = req.amount_cents,
            "checkout session created"
        );
        Ok(session)
    }
}
