//! Database row types matching migrations/0001_init.sql. Ids are stored as
//! uuid TEXT; row → domain conversions parse them and fail loudly on corrupt
//! data rather than guessing.

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::types::{Guess, PaymentStatus, Pool, User};

#[derive(Debug, sqlx::FromRow)]
pub struct PoolRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub created_by: String,
    pub price_floor: f64,
    pub price_ceiling: f64,
    pub mu_weight: f64,
    pub mu_due_date: String,
    pub sigma_days: f64,
    pub sigma_weight: f64,
    pub actual_birth_date: Option<String>,
    pub actual_birth_weight: Option<f64>,
    pub is_locked: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct GuessRow {
    pub id: String,
    pub pool_id: String,
    pub user_id: String,
    pub guessed_birth_date: String,
    pub guessed_weight: f64,
    pub calculated_price: f64,
    pub payment_status: String,
    pub name: Option<String>,
    pub is_anonymous: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Ranking joined with its guess for the standings endpoint.
#[derive(Debug, sqlx::FromRow)]
pub struct StandingRow {
    pub guess_id: String,
    pub rank: i64,
    pub distance: f64,
    pub guessed_birth_date: String,
    pub guessed_weight: f64,
    pub name: Option<String>,
    pub is_anonymous: i64,
}

fn parse_id(s: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|_| AppError::Validation(format!("corrupt {field} id in database: {s}")))
}

impl TryFrom<PoolRow> for Pool {
    type Error = AppError;

    fn try_from(r: PoolRow) -> Result<Self> {
        Ok(Pool {
            id: parse_id(&r.id, "pool")?,
            slug: r.slug,
            title: r.title,
            created_by: parse_id(&r.created_by, "user")?,
            price_floor: r.price_floor,
            price_ceiling: r.price_ceiling,
            mu_weight: r.mu_weight,
            mu_due_date: r.mu_due_date,
            sigma_days: r.sigma_days,
            sigma_weight: r.sigma_weight,
            actual_birth_date: r.actual_birth_date,
            actual_birth_weight: r.actual_birth_weight,
            is_locked: r.is_locked != 0,
        })
    }
}

impl TryFrom<GuessRow> for Guess {
    type Error = AppError;

    fn try_from(r: GuessRow) -> Result<Self> {
        Ok(Guess {
            id: parse_id(&r.id, "guess")?,
            pool_id: parse_id(&r.pool_id, "pool")?,
            user_id: parse_id(&r.user_id, "user")?,
            guessed_birth_date: r.guessed_birth_date,
            guessed_weight: r.guessed_weight,
            calculated_price: r.calculated_price,
            payment_status: PaymentStatus::parse(&r.payment_status),
            name: r.name,
            is_anonymous: r.is_anonymous != 0,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(r: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_id(&r.id, "user")?,
            email: r.email,
            display_name: r.display_name,
        })
    }
}
