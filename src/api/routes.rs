use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{health::health, AppState};
use crate::auth::CurrentUser;
use crate::config::{BOUND_DAYS, BOUND_WEIGHT_OZ, DEFAULT_SIGMA_CUTOFF};
use crate::dates::{day_offset, parse_ymd};
use crate::error::AppError;
use crate::payments::CheckoutWebhookEvent;
use crate::pricing::{calculate_sigma, guess_price, round_dollars, PricingConfig};
use crate::service::close::{close_pool, preview_standings, ClosePoolRequest};
use crate::service::submit::{confirm_payment, submit_guess, SubmitGuessRequest};
use crate::types::{PaymentStatus, Pool};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pools", post(create_pool))
        .route("/pools/:slug", get(get_pool))
        .route("/pools/:slug/quote", get(get_quote))
        .route("/pools/:slug/guesses", get(list_guesses).post(post_guess))
        .route("/pools/:slug/close", post(post_close))
        .route("/pools/:slug/standings", get(get_standings))
        .route("/pools/:slug/preview", get(get_preview))
        .route("/webhooks/checkout", post(post_checkout_webhook))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePoolRequest {
    pub slug: String,
    pub title: String,
    pub price_floor: f64,
    pub price_ceiling: f64,
    /// Ounces.
    pub mu_weight_oz: f64,
    /// YYYY-MM-DD.
    pub mu_due_date: String,
    pub sigma_days: f64,
    /// Pounds.
    pub sigma_weight_lbs: f64,
}

#[derive(Serialize)]
pub struct PoolResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub price_floor: f64,
    pub price_ceiling: f64,
    pub mu_weight_oz: f64,
    pub mu_due_date: String,
    pub sigma_days: f64,
    pub sigma_weight_lbs: f64,
    pub actual_birth_date: Option<String>,
    pub actual_birth_weight_lbs: Option<f64>,
    pub is_locked: bool,
}

impl From<Pool> for PoolResponse {
    fn from(p: Pool) -> Self {
        Self {
            id: p.id,
            slug: p.slug,
            title: p.title,
            price_floor: p.price_floor,
            price_ceiling: p.price_ceiling,
            mu_weight_oz: p.mu_weight,
            mu_due_date: p.mu_due_date,
            sigma_days: p.sigma_days,
            sigma_weight_lbs: p.sigma_weight,
            actual_birth_date: p.actual_birth_date,
            actual_birth_weight_lbs: p.actual_birth_weight,
            is_locked: p.is_locked,
        }
    }
}

#[derive(Deserialize)]
pub struct QuoteQuery {
    /// YYYY-MM-DD.
    pub date: String,
    /// Ounces.
    pub weight_oz: f64,
    /// Demo knob: derive sigmas from the axis bounds instead of using the
    /// pool's explicit values.
    #[serde(default)]
    pub derived_sigma: bool,
    /// Gaussian cutoff for derived sigmas. Invalid values are rejected, never
    /// clamped.
    pub cutoff: Option<f64>,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub price: f64,
    pub day_offset: i64,
}

#[derive(Serialize)]
pub struct GuessResponse {
    pub id: Uuid,
    pub guessed_birth_date: String,
    pub guessed_weight_oz: f64,
    pub calculated_price: f64,
    pub payment_status: PaymentStatus,
    /// Null for anonymous guesses.
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitGuessResponse {
    pub guess_id: Uuid,
    pub price: f64,
    pub checkout_session_id: String,
    pub checkout_url: Option<String>,
}

#[derive(Serialize)]
pub struct StandingEntry {
    pub rank: i64,
    pub distance: f64,
    pub guess_id: String,
    pub guessed_birth_date: String,
    pub guessed_weight_oz: f64,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct StandingsResponse {
    pub slug: String,
    pub actual_birth_date: Option<String>,
    pub actual_birth_weight_lbs: Option<f64>,
    pub standings: Vec<StandingEntry>,
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    /// Hypothetical actual birth date, YYYY-MM-DD.
    pub date: String,
    /// Hypothetical actual weight, pounds.
    pub weight_lbs: f64,
}

#[derive(Serialize)]
pub struct PreviewEntry {
    pub rank: u32,
    pub distance: f64,
    pub guess_id: Uuid,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_pool(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePoolRequest>,
) -> Result<Json<PoolResponse>, AppError> {
    if !valid_slug(&req.slug) {
        return Err(AppError::Validation(
            "slug must be non-empty lowercase letters, digits, and hyphens".to_string(),
        ));
    }
    parse_ymd(&req.mu_due_date)?;

    // Rejects non-positive sigmas and floor >= ceiling before anything is
    // written; pools never persist an unusable pricing configuration.
    PricingConfig::new(
        req.price_floor,
        req.price_ceiling,
        req.mu_weight_oz,
        req.sigma_days,
        req.sigma_weight_lbs,
    )?;

    if state.store.pool_by_slug(&req.slug).await?.is_some() {
        return Err(AppError::Conflict(format!("slug '{}' is taken", req.slug)));
    }

    let pool = Pool {
        id: Uuid::new_v4(),
        slug: req.slug,
        title: req.title,
        created_by: user.id,
        price_floor: req.price_floor,
        price_ceiling: req.price_ceiling,
        mu_weight: req.mu_weight_oz,
        mu_due_date: req.mu_due_date,
        sigma_days: req.sigma_days,
        sigma_weight: req.sigma_weight_lbs,
        actual_birth_date: None,
        actual_birth_weight: None,
        is_locked: false,
    };
    state.store.insert_pool(&pool).await?;
    Ok(Json(pool.into()))
}

async fn get_pool(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PoolResponse>, AppError> {
    let pool = state
        .store
        .pool_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))?;
    Ok(Json(pool.into()))
}

/// Price preview — the same computation the submission path freezes, minus
/// any persistence. With `cutoff` set, sigmas are derived from the bounds.
async fn get_quote(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, AppError> {
    let pool = state
        .store
        .pool_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))?;

    let mut pricing = PricingConfig::from_pool(&pool)?;
    if q.derived_sigma || q.cutoff.is_some() {
        let cutoff = q.cutoff.unwrap_or(DEFAULT_SIGMA_CUTOFF);
        pricing.sigma_days = calculate_sigma(BOUND_DAYS, cutoff)?;
        pricing.sigma_weight_oz = calculate_sigma(BOUND_WEIGHT_OZ, cutoff)?;
    }

    let offset = day_offset(parse_ymd(&q.date)?, parse_ymd(&pool.mu_due_date)?);
    if !q.weight_oz.is_finite() || q.weight_oz <= 0.0 {
        return Err(AppError::Validation(format!(
            "weight_oz must be a positive number, got {}",
            q.weight_oz
        )));
    }

    let price = round_dollars(guess_price(offset as f64, q.weight_oz, &pricing));
    Ok(Json(QuoteResponse {
        price,
        day_offset: offset,
    }))
}

async fn list_guesses(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<GuessResponse>>, AppError> {
    let pool = state
        .store
        .pool_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))?;

    let guesses = state.store.guesses_for_pool(pool.id).await?;
    let out = guesses
        .into_iter()
        .map(|g| GuessResponse {
            id: g.id,
            guessed_birth_date: g.guessed_birth_date,
            guessed_weight_oz: g.guessed_weight,
            calculated_price: g.calculated_price,
            payment_status: g.payment_status,
            name: if g.is_anonymous { None } else { g.name },
        })
        .collect();
    Ok(Json(out))
}

async fn post_guess(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SubmitGuessRequest>,
) -> Result<Json<SubmitGuessResponse>, AppError> {
    let out = submit_guess(&state.store, state.gateway.as_ref(), &user, &slug, req).await?;
    Ok(Json(SubmitGuessResponse {
        guess_id: out.guess_id,
        price: out.price,
        checkout_session_id: out.checkout_session_id,
        checkout_url: out.checkout_url,
    }))
}

async fn post_close(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ClosePoolRequest>,
) -> Result<Json<StandingsResponse>, AppError> {
    close_pool(&state.store, &user, &slug, req).await?;
    standings_response(&state, &slug).await.map(Json)
}

async fn get_standings(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<StandingsResponse>, AppError> {
    let pool = state
        .store
        .pool_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))?;
    if !pool.is_locked {
        return Err(AppError::Precondition(format!(
            "pool '{slug}' has not been closed yet"
        )));
    }
    standings_response(&state, &slug).await.map(Json)
}

/// Live unpersisted ranking against a hypothetical outcome — recomputed on
/// every call, valid for open pools.
async fn get_preview(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<PreviewQuery>,
) -> Result<Json<Vec<PreviewEntry>>, AppError> {
    let ranked = preview_standings(&state.store, &slug, &q.date, q.weight_lbs).await?;
    let out = ranked
        .into_iter()
        .map(|r| PreviewEntry {
            rank: r.rank,
            distance: r.distance,
            guess_id: r.guess_id,
            name: r.name,
        })
        .collect();
    Ok(Json(out))
}

async fn post_checkout_webhook(
    State(state): State<AppState>,
    Json(event): Json<CheckoutWebhookEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    confirm_payment(&state.store, &event).await?;
    Ok(Json(serde_json::json!({ "received": true })))
}

fn valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

async fn standings_response(state: &AppState, slug: &str) -> Result<StandingsResponse, AppError> {
    let pool = state
        .store
        .pool_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))?;

    let rows = state.store.standings_for_pool(pool.id).await?;
    let standings = rows
        .into_iter()
        .map(|r| StandingEntry {
            rank: r.rank,
            distance: r.distance,
            guess_id: r.guess_id,
            guessed_birth_date: r.guessed_birth_date,
            guessed_weight_oz: r.guessed_weight,
            name: if r.is_anonymous != 0 { None } else { r.name },
        })
        .collect();

    Ok(StandingsResponse {
        slug: pool.slug,
        actual_birth_date: pool.actual_birth_date,
        actual_birth_weight_lbs: pool.actual_birth_weight,
        standings,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
