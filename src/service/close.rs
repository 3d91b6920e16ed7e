//! Pool close workflow: validate the actual outcome, rank every guess, and
//! persist standings plus the permanent lock in one transaction. Also backs
//! the live standings preview the organizer sees while filling in the close
//! form — same ranking engine, nothing persisted.

use serde::Deserialize;
use tracing::info;

use crate::db::PoolStore;
use crate::error::{AppError, Result};
use crate::ranking::{rank, RankEntry, RankedGuess};
use crate::types::{Guess, Outcome, Pool, Ranking, User};

#[derive(Debug, Clone, Deserialize)]
pub struct ClosePoolRequest {
    /// YYYY-MM-DD.
    pub actual_birth_date: String,
    /// Pounds — matches the pool's storage convention for actuals.
    pub actual_birth_weight_lbs: f64,
}

pub async fn close_pool(
    store: &PoolStore,
    user: &User,
    slug: &str,
    req: ClosePoolRequest,
) -> Result<Vec<Ranking>> {
    let pool = load_pool(store, slug).await?;

    if pool.created_by != user.id {
        return Err(AppError::Unauthorized(
            "only the pool organizer can close it".to_string(),
        ));
    }
    if pool.is_locked {
        return Err(AppError::Conflict(format!("pool '{slug}' is already closed")));
    }

    let outcome = Outcome::from_parts(
        Some(&req.actual_birth_date),
        Some(req.actual_birth_weight_lbs),
    )?;

    let guesses = store.guesses_for_pool(pool.id).await?;
    let entries = to_entries(&guesses)?;
    let ranked = rank(&entries, &outcome)?;

    let rankings: Vec<Ranking> = ranked
        .iter()
        .map(|r| Ranking {
            pool_id: pool.id,
            guess_id: r.guess_id,
            rank: r.rank,
            distance: r.distance,
        })
        .collect();

    store
        .close_pool(
            pool.id,
            &req.actual_birth_date,
            req.actual_birth_weight_lbs,
            &rankings,
        )
        .await?;

    info!(
        pool = %slug,
        guesses = rankings.len(),
        actual_date = %req.actual_birth_date,
        actual_weight_lbs = req.actual_birth_weight_lbs,
        "pool closed"
    );
    Ok(rankings)
}

/// Rank against a hypothetical outcome without touching the pool. Re-runnable
/// on every form keystroke; works on open pools.
pub async fn preview_standings(
    store: &PoolStore,
    slug: &str,
    actual_birth_date: &str,
    actual_birth_weight_lbs: f64,
) -> Result<Vec<RankedGuess>> {
    let pool = load_pool(store, slug).await?;
    let outcome = Outcome::from_parts(Some(actual_birth_date), Some(actual_birth_weight_lbs))?;
    let guesses = store.guesses_for_pool(pool.id).await?;
    rank(&to_entries(&guesses)?, &outcome)
}

async fn load_pool(store: &PoolStore, slug: &str) -> Result<Pool> {
    store
        .pool_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pool '{slug}'")))
}

fn to_entries(guesses: &[Guess]) -> Result<Vec<RankEntry>> {
    guesses
        .iter()
        .map(|g| {
            Ok(RankEntry {
                guess_id: g.id,
                name: if g.is_anonymous { None } else { g.name.clone() },
                date: crate::dates::parse_ymd(&g.guessed_birth_date)?,
                weight_oz: g.guessed_weight,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn test_store() -> (PoolStore, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = sqlx::SqlitePool::connect(&url).await.expect("connect");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
        (PoolStore::new(pool), dir)
    }

    async fn seed_pool(store: &PoolStore, organizer: &User) -> Pool {
        store.insert_user(organizer, "organizer-tok").await.unwrap();
        let pool = Pool {
            id: Uuid::new_v4(),
            slug: "baby-smith".to_string(),
            title: "Baby Smith".to_string(),
            created_by: organizer.id,
            price_floor: 10.0,
            price_ceiling: 100.0,
            mu_weight: 121.6,
            mu_due_date: "2025-12-07".to_string(),
            sigma_days: 9.0,
            sigma_weight: 1.25,
            actual_birth_date: None,
            actual_birth_weight: None,
            is_locked: false,
        };
        store.insert_pool(&pool).await.unwrap();
        pool
    }

    async fn seed_guess(store: &PoolStore, pool: &Pool, user: &User, date: &str, oz: f64) -> Guess {
        let guess = Guess {
            id: Uuid::new_v4(),
            pool_id: pool.id,
            user_id: user.id,
            guessed_birth_date: date.to_string(),
            guessed_weight: oz,
            calculated_price: 50.0,
            payment_status: PaymentStatus::Paid,
            name: Some("Guesser".to_string()),
            is_anonymous: false,
        };
        store.insert_guess(&guess).await.unwrap();
        guess
    }

    fn organizer() -> User {
        User {
            id: Uuid::new_v4(),
            email: "organizer@example.com".to_string(),
            display_name: None,
        }
    }

    fn close_req(date: &str, lbs: f64) -> ClosePoolRequest {
        ClosePoolRequest {
            actual_birth_date: date.to_string(),
            actual_birth_weight_lbs: lbs,
        }
    }

    #[tokio::test]
    async fn close_ranks_and_locks() {
        let (store, _dir) = test_store().await;
        let org = organizer();
        let pool = seed_pool(&store, &org).await;
        // actual will be 2025-12-07 / 7.6 lbs = 121.6 oz
        let exact = seed_guess(&store, &pool, &org, "2025-12-07", 121.6).await;
        let near = seed_guess(&store, &pool, &org, "2025-12-08", 121.6).await;

        let rankings = close_pool(&store, &org, "baby-smith", close_req("2025-12-07", 7.6))
            .await
            .unwrap();
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].guess_id, exact.id);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[0].distance, 0.0);
        assert_eq!(rankings[1].guess_id, near.id);
        assert_eq!(rankings[1].rank, 2);
        assert!(rankings[1].distance > 0.0);

        let loaded = store.pool_by_slug("baby-smith").await.unwrap().unwrap();
        assert!(loaded.is_locked);
        let standings = store.standings_for_pool(pool.id).await.unwrap();
        assert_eq!(standings.len(), 2);
    }

    #[tokio::test]
    async fn only_the_organizer_can_close() {
        let (store, _dir) = test_store().await;
        let org = organizer();
        seed_pool(&store, &org).await;

        let stranger = User {
            id: Uuid::new_v4(),
            email: "stranger@example.com".to_string(),
            display_name: None,
        };
        let err = close_pool(&store, &stranger, "baby-smith", close_req("2025-12-07", 7.6))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn double_close_conflicts() {
        let (store, _dir) = test_store().await;
        let org = organizer();
        seed_pool(&store, &org).await;

        close_pool(&store, &org, "baby-smith", close_req("2025-12-07", 7.6))
            .await
            .unwrap();
        let err = close_pool(&store, &org, "baby-smith", close_req("2025-12-08", 8.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unusable_outcome_fails_before_locking() {
        let (store, _dir) = test_store().await;
        let org = organizer();
        seed_pool(&store, &org).await;

        let err = close_pool(&store, &org, "baby-smith", close_req("2025-12-07", f64::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));

        let loaded = store.pool_by_slug("baby-smith").await.unwrap().unwrap();
        assert!(!loaded.is_locked, "failed close must not lock the pool");
    }

    #[tokio::test]
    async fn preview_does_not_persist_or_lock() {
        let (store, _dir) = test_store().await;
        let org = organizer();
        let pool = seed_pool(&store, &org).await;
        seed_guess(&store, &pool, &org, "2025-12-05", 118.0).await;
        seed_guess(&store, &pool, &org, "2025-12-09", 125.0).await;

        let a = preview_standings(&store, "baby-smith", "2025-12-07", 7.6)
            .await
            .unwrap();
        let b = preview_standings(&store, "baby-smith", "2025-12-07", 7.6)
            .await
            .unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);

        let loaded = store.pool_by_slug("baby-smith").await.unwrap().unwrap();
        assert!(!loaded.is_locked);
        assert!(store.standings_for_pool(pool.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closing_an_empty_pool_is_fine() {
        let (store, _dir) = test_store().await;
        let org = organizer();
        seed_pool(&store, &org).await;

        let rankings = close_pool(&store, &org, "baby-smith", close_req("2025-12-07", 7.6))
            .await
            .unwrap();
        assert!(rankings.is_empty());
        let loaded = store.pool_by_slug("baby-smith").await.unwrap().unwrap();
        assert!(loaded.is_locked);
    }
}
