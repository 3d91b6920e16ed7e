use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// One baby's guessing event, with its own pricing configuration and
/// lifecycle. Weight units follow the storage convention: `mu_weight` is
/// ounces, `sigma_weight` and `actual_birth_weight` are pounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub created_by: Uuid,
    pub price_floor: f64,
    pub price_ceiling: f64,
    /// Expected weight, ounces.
    pub mu_weight: f64,
    /// Expected date, YYYY-MM-DD.
    pub mu_due_date: String,
    pub sigma_days: f64,
    /// Weight spread, pounds.
    pub sigma_weight: f64,
    pub actual_birth_date: Option<String>,
    /// Pounds (not ounces — see migration notes).
    pub actual_birth_weight: Option<f64>,
    pub is_locked: bool,
}

// ---------------------------------------------------------------------------
// Guess
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        }
    }
}

/// One paid prediction against a pool. `calculated_price` is frozen at
/// submission time and is never recomputed from later pool edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guess {
    pub id: Uuid,
    pub pool_id: Uuid,
    pub user_id: Uuid,
    /// YYYY-MM-DD.
    pub guessed_birth_date: String,
    /// Ounces.
    pub guessed_weight: f64,
    /// Dollars, frozen at submission.
    pub calculated_price: f64,
    pub payment_status: PaymentStatus,
    pub name: Option<String>,
    pub is_anonymous: bool,
}

// ---------------------------------------------------------------------------
// Outcome & rankings
// ---------------------------------------------------------------------------

/// Actual birth outcome, validated at construction. Weight is ounces here —
/// callers convert from the pool's pound-denominated field before building.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub date: NaiveDate,
    pub weight_oz: f64,
}

impl Outcome {
    /// Build from the pool's nullable outcome fields. The stored weight is
    /// pounds; ranking math runs in ounces. A missing or unusable field is a
    /// precondition failure — the pool is not yet closeable.
    pub fn from_parts(date: Option<&str>, weight_lbs: Option<f64>) -> crate::error::Result<Self> {
        use crate::config::OUNCES_PER_POUND;
        use crate::error::AppError;

        let date = date.ok_or_else(|| {
            AppError::Precondition("actual birth date is required".to_string())
        })?;
        let weight_lbs = weight_lbs.ok_or_else(|| {
            AppError::Precondition("actual birth weight is required".to_string())
        })?;
        if !weight_lbs.is_finite() || weight_lbs <= 0.0 {
            return Err(AppError::Precondition(format!(
                "actual birth weight must be a positive number of pounds, got {weight_lbs}"
            )));
        }
        Ok(Self {
            date: crate::dates::parse_ymd(date)?,
            weight_oz: weight_lbs * OUNCES_PER_POUND,
        })
    }
}

/// One row of final standings, persisted at pool close.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub pool_id: Uuid,
    pub guess_id: Uuid,
    /// 1-based, dense: tied guesses share a rank, next group is rank + 1.
    pub rank: u32,
    /// Normalized Euclidean distance to the actual outcome.
    pub distance: f64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}
