use crate::error::{AppError, Result};

/// Domain half-width for the date axis: a guess this many days from the due
/// date sits exactly at the price floor for that axis.
pub const BOUND_DAYS: f64 = 14.0;

/// Domain half-width for the weight axis, in ounces (±2 lbs).
pub const BOUND_WEIGHT_OZ: f64 = 32.0;

/// Default Gaussian cutoff used when deriving a sigma from a bound
/// (quote preview only — persisted pools always carry explicit sigmas).
pub const DEFAULT_SIGMA_CUTOFF: f64 = 0.01;

/// Ounces per pound. Pool sigma_weight and actual_birth_weight are stored in
/// pounds; guesses and mu_weight in ounces.
pub const OUNCES_PER_POUND: f64 = 16.0;

/// Tie-breaking precision for ranking: distances are rounded to this many
/// decimal places before being compared for equality.
pub const RANK_TIE_DECIMALS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Base URL of the checkout provider (CHECKOUT_API_URL).
    pub checkout_api_url: String,
    /// Secret key sent as a bearer token to the checkout provider.
    pub checkout_secret_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "babypool.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            checkout_api_url: std::env::var("CHECKOUT_API_URL")
                .unwrap_or_else(|_| "https://api.checkout.example.com".to_string()),
            checkout_secret_key: std::env::var("CHECKOUT_SECRET_KEY").unwrap_or_default(),
        })
    }
}
