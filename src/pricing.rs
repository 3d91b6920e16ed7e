//! Pricing engine: maps a (date-offset, weight) guess to a dollar price using
//! a bounded, normalized Gaussian per axis. Pure functions, no state, safe to
//! call from any number of request handlers concurrently.
//!
//! Each axis gets exactly half of the pool's price range. The Gaussian is
//! rescaled so it reads 1.0 at the expected value and exactly 0.0 at
//! `mean ± bound`; a guess beyond the bound normalizes below zero and prices
//! below the axis floor. That is intentional — the bound is a reference
//! point on the curve, not a clamp.

use crate::config::{BOUND_DAYS, BOUND_WEIGHT_OZ, OUNCES_PER_POUND};
use crate::error::{AppError, Result};
use crate::types::Pool;

/// Validated pricing parameters for one pool. Sigma for the weight axis is
/// converted pounds → ounces here, once, so everything downstream is ounces.
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    pub price_floor: f64,
    pub price_ceiling: f64,
    /// Expected weight, ounces.
    pub mu_weight_oz: f64,
    pub sigma_days: f64,
    /// Weight spread, ounces.
    pub sigma_weight_oz: f64,
}

impl PricingConfig {
    pub fn new(
        price_floor: f64,
        price_ceiling: f64,
        mu_weight_oz: f64,
        sigma_days: f64,
        sigma_weight_lbs: f64,
    ) -> Result<Self> {
        if price_floor <= 0.0 {
            return Err(AppError::InvalidPricing(format!(
                "price_floor must be > 0, got {price_floor}"
            )));
        }
        if price_ceiling <= price_floor {
            return Err(AppError::InvalidPricing(format!(
                "price_ceiling ({price_ceiling}) must exceed price_floor ({price_floor})"
            )));
        }
        if sigma_days <= 0.0 || sigma_weight_lbs <= 0.0 {
            return Err(AppError::InvalidPricing(format!(
                "sigma must be > 0, got sigma_days={sigma_days} sigma_weight={sigma_weight_lbs}"
            )));
        }
        if mu_weight_oz <= 0.0 {
            return Err(AppError::InvalidPricing(format!(
                "expected weight must be > 0 oz, got {mu_weight_oz}"
            )));
        }
        Ok(Self {
            price_floor,
            price_ceiling,
            mu_weight_oz,
            sigma_days,
            sigma_weight_oz: sigma_weight_lbs * OUNCES_PER_POUND,
        })
    }

    pub fn from_pool(pool: &Pool) -> Result<Self> {
        Self::new(
            pool.price_floor,
            pool.price_ceiling,
            pool.mu_weight,
            pool.sigma_days,
            pool.sigma_weight,
        )
    }

    /// Each axis carries half of the total price range.
    fn axis_min(&self) -> f64 {
        self.price_floor / 2.0
    }

    fn axis_max(&self) -> f64 {
        self.price_ceiling / 2.0
    }
}

/// Price contribution of a single axis.
///
/// The Gaussian value at `guess` is normalized against its value at the
/// domain edge: 1.0 at `guess == mean`, exactly 0.0 at `guess == mean ± bound`,
/// negative beyond. The result is NOT clamped.
pub fn component_price(
    guess: f64,
    mean: f64,
    bound: f64,
    sigma: f64,
    min_price: f64,
    max_price: f64,
) -> f64 {
    let exp_extreme = (-0.5 * (bound / sigma).powi(2)).exp();
    let exp_guess = (-0.5 * ((guess - mean) / sigma).powi(2)).exp();
    let normalized = (exp_guess - exp_extreme) / (1.0 - exp_extreme);
    min_price + (max_price - min_price) * normalized
}

/// Total price for a guess: date component + weight component.
/// `day_offset` is the signed whole-day distance from the due date,
/// `weight_oz` the guessed weight in ounces. Peaks at exactly
/// `price_ceiling` when both axes sit on their means.
pub fn guess_price(day_offset: f64, weight_oz: f64, cfg: &PricingConfig) -> f64 {
    let date_component = component_price(
        day_offset,
        0.0,
        BOUND_DAYS,
        cfg.sigma_days,
        cfg.axis_min(),
        cfg.axis_max(),
    );
    let weight_component = component_price(
        weight_oz,
        cfg.mu_weight_oz,
        BOUND_WEIGHT_OZ,
        cfg.sigma_weight_oz,
        cfg.axis_min(),
        cfg.axis_max(),
    );
    date_component + weight_component
}

/// Derive a sigma such that the raw Gaussian reads `cutoff` at `bound`.
/// Used by the quote preview when no explicit sigma is supplied; the
/// persisted pricing path always carries pool sigmas.
pub fn calculate_sigma(bound: f64, cutoff: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&cutoff) || cutoff == 0.0 {
        return Err(AppError::InvalidPricing(format!(
            "cutoff must be in (0, 1), got {cutoff}"
        )));
    }
    if bound <= 0.0 {
        return Err(AppError::InvalidPricing(format!(
            "bound must be > 0, got {bound}"
        )));
    }
    Ok(bound / (-2.0 * cutoff.ln()).sqrt())
}

/// Round to cents for display and API responses. The stored price keeps the
/// rounded value as well — it is frozen at submission time.
pub fn round_dollars(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
