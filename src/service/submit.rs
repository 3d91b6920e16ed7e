//! Guess submission workflow: read the pool's pricing configuration, run the
//! pricing engine, persist the guess with its frozen price, and open a
//! checkout session. Payment confirmation arrives later via webhook.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::dates::{day_offset, parse_ymd};
use crate::db::PoolStore;
use crate::error::{AppError, Result};
use crate::payments::{
    CheckoutMetadata, CheckoutRequest, CheckoutWebhookEvent, PaymentGateway, CHECKOUT_COMPLETED,
};
use crate::pricing::{guess_price, round_dollars, PricingConfig};
use crate::types::{Guess, PaymentStatus, User};

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitGuessRequest {
    /// YYYY-MM-DD.
    pub guessed_birth_date: String,
    /// Ounces.
    pub guessed_weight_oz: f64,
    pub name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug)]
pub struct SubmittedGuess {
    pub guess_id: Uuid,
    /// Dollars, frozen.
    pub price: f64,
    pub checkout_session_id: String,
    pub checkout_url: Option<String>,
}

pub async fn submit_guess(
    store: &PoolStore,
    gateway: &dyn PaymentGateway,
    user: &User,
    slug: &str,
    req: SubmitGuessRequest,
) -> Result<SubmittedGuess> {
    let pool = store
        .pool_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))?;

    if pool.is_locked {
        return Err(AppError::Conflict(format!(
            "pool '{slug}' is closed and no longer accepts guesses"
        )));
    }

    if !req.guessed_weight_oz.is_finite() || req.guessed_weight_oz <= 0.0 {
        return Err(AppError::Validation(format!(
            "guessed weight must be a positive number of ounces, got {}",
            req.guessed_weight_oz
        )));
    }

    let guessed_date = parse_ymd(&req.guessed_birth_date)?;
    let due_date = parse_ymd(&pool.mu_due_date)?;
    let offset_days = day_offset(guessed_date, due_date) as f64;

    let pricing = PricingConfig::from_pool(&pool)?;
    let price = round_dollars(guess_price(offset_days, req.guessed_weight_oz, &pricing));

    let guess = Guess {
        id: Uuid::new_v4(),
        pool_id: pool.id,
        user_id: user.id,
        guessed_birth_date: req.guessed_birth_date.clone(),
        guessed_weight: req.guessed_weight_oz,
        calculated_price: price,
        payment_status: PaymentStatus::Unpaid,
        name: req.name,
        is_anonymous: req.is_anonymous,
    };
    store.insert_guess(&guess).await?;

    let session = gateway
        .create_checkout_session(CheckoutRequest {
            amount_cents: (price * 100.0).round() as i64,
            description: format!("Baby pool guess — {}", pool.title),
            metadata: CheckoutMetadata {
                guess_id: guess.id,
                pool_id: pool.id,
                user_id: user.id,
                guessed_birth_date: guess.guessed_birth_date.clone(),
                guessed_weight: guess.guessed_weight,
                calculated_price: price,
            },
        })
        .await?;

    info!(
        guess_id = %guess.id,
        pool = %slug,
        offset_days,
        weight_oz = guess.guessed_weight,
        price,
        "guess submitted, awaiting payment"
    );

    Ok(SubmittedGuess {
        guess_id: guess.id,
        price,
        checkout_session_id: session.id,
        checkout_url: session.url,
    })
}

/// Consume a checkout webhook. Trusts the frozen payload carried in metadata
/// and never re-derives the price. Idempotent under redelivery; unknown guess
/// ids are logged and acknowledged so the provider stops retrying.
pub async fn confirm_payment(store: &PoolStore, event: &CheckoutWebhookEvent) -> Result<()> {
    if event.event_type != CHECKOUT_COMPLETED {
        info!(event_type = %event.event_type, "ignoring non-completion webhook");
        return Ok(());
    }

    let found = store.mark_guess_paid(event.metadata.guess_id).await?;
    if found {
        info!(
            guess_id = %event.metadata.guess_id,
            session_id = %event.session_id,
            price = event.metadata.calculated_price,
            "guess payment confirmed"
        );
    } else {
        tracing::warn!(
            guess_id = %event.metadata.guess_id,
            session_id = %event.session_id,
            "webhook for unknown guess — acknowledged without action"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
