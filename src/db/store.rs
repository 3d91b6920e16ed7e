use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{GuessRow, PoolRow, StandingRow, UserRow};
use crate::error::{AppError, Result};
use crate::types::{Guess, Pool, Ranking, User};

/// Persistence collaborator. All pool/guess/ranking access goes through here;
/// the pricing and ranking engines never touch it.
#[derive(Clone)]
pub struct PoolStore {
    pool: sqlx::SqlitePool,
}

impl PoolStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Cheap connectivity check for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // -- users --------------------------------------------------------------

    pub async fn insert_user(&self, user: &User, api_token: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, api_token, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(api_token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name FROM users WHERE api_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    // -- pools --------------------------------------------------------------

    pub async fn insert_pool(&self, pool: &Pool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pools (
                id, slug, title, created_by,
                price_floor, price_ceiling, mu_weight, mu_due_date,
                sigma_days, sigma_weight, is_locked, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(pool.id.to_string())
        .bind(&pool.slug)
        .bind(&pool.title)
        .bind(pool.created_by.to_string())
        .bind(pool.price_floor)
        .bind(pool.price_ceiling)
        .bind(pool.mu_weight)
        .bind(&pool.mu_due_date)
        .bind(pool.sigma_days)
        .bind(pool.sigma_weight)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn pool_by_slug(&self, slug: &str) -> Result<Option<Pool>> {
        let row = sqlx::query_as::<_, PoolRow>(
            r#"
            SELECT id, slug, title, created_by,
                   price_floor, price_ceiling, mu_weight, mu_due_date,
                   sigma_days, sigma_weight,
                   actual_birth_date, actual_birth_weight, is_locked
            FROM pools WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Pool::try_from).transpose()
    }

    // -- guesses ------------------------------------------------------------

    pub async fn insert_guess(&self, guess: &Guess) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO guesses (
                id, pool_id, user_id,
                guessed_birth_date, guessed_weight, calculated_price,
                payment_status, name, is_anonymous, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guess.id.to_string())
        .bind(guess.pool_id.to_string())
        .bind(guess.user_id.to_string())
        .bind(&guess.guessed_birth_date)
        .bind(guess.guessed_weight)
        .bind(guess.calculated_price)
        .bind(guess.payment_status.to_string())
        .bind(&guess.name)
        .bind(i64::from(guess.is_anonymous))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn guesses_for_pool(&self, pool_id: Uuid) -> Result<Vec<Guess>> {
        let rows = sqlx::query_as::<_, GuessRow>(
            r#"
            SELECT id, pool_id, user_id,
                   guessed_birth_date, guessed_weight, calculated_price,
                   payment_status, name, is_anonymous
            FROM guesses WHERE pool_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(pool_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Guess::try_from).collect()
    }

    /// Flip a guess to paid. Idempotent — re-delivered webhooks are a no-op.
    /// Returns false if the guess does not exist.
    pub async fn mark_guess_paid(&self, guess_id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE guesses SET payment_status = 'paid' WHERE id = ?")
            .bind(guess_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- closing ------------------------------------------------------------

    /// Record the actual outcome, lock the pool, and persist the final
    /// standings as one logical transaction. The lock is a conditional
    /// UPDATE on `is_locked = 0`; a second concurrent close sees zero rows
    /// affected, gets a Conflict, and nothing it wrote survives.
    pub async fn close_pool(
        &self,
        pool_id: Uuid,
        actual_birth_date: &str,
        actual_birth_weight_lbs: f64,
        rankings: &[Ranking],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE pools
            SET actual_birth_date = ?, actual_birth_weight = ?, is_locked = 1
            WHERE id = ? AND is_locked = 0
            "#,
        )
        .bind(actual_birth_date)
        .bind(actual_birth_weight_lbs)
        .bind(pool_id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict("pool is already closed".to_string()));
        }

        let created_at = Utc::now().to_rfc3339();
        for r in rankings {
            sqlx::query(
                r#"
                INSERT INTO rankings (pool_id, guess_id, rank, distance, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(r.pool_id.to_string())
            .bind(r.guess_id.to_string())
            .bind(r.rank as i64)
            .bind(r.distance)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            pool_id = %pool_id,
            rankings = rankings.len(),
            "pool closed and standings persisted"
        );
        Ok(())
    }

    pub async fn standings_for_pool(&self, pool_id: Uuid) -> Result<Vec<StandingRow>> {
        let rows = sqlx::query_as::<_, StandingRow>(
            r#"
            SELECT r.guess_id, r.rank, r.distance,
                   g.guessed_birth_date, g.guessed_weight, g.name, g.is_anonymous
            FROM rankings r
            JOIN guesses g ON g.id = r.guess_id
            WHERE r.pool_id = ?
            ORDER BY r.rank ASC, r.distance ASC
            "#,
        )
        .bind(pool_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use tempfile::TempDir;

    async fn test_store() -> (PoolStore, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = sqlx::SqlitePool::connect(&url).await.expect("connect");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
        (PoolStore::new(pool), dir)
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            display_name: Some("Test".to_string()),
        }
    }

    fn test_pool(created_by: Uuid, slug: &str) -> Pool {
        Pool {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: "Baby Test".to_string(),
            created_by,
            price_floor: 10.0,
            price_ceiling: 100.0,
            mu_weight: 121.6,
            mu_due_date: "2025-12-07".to_string(),
            sigma_days: 9.0,
            sigma_weight: 1.25,
            actual_birth_date: None,
            actual_birth_weight: None,
            is_locked: false,
        }
    }

    fn test_guess(pool_id: Uuid, user_id: Uuid) -> Guess {
        Guess {
            id: Uuid::new_v4(),
            pool_id,
            user_id,
            guessed_birth_date: "2025-12-08".to_string(),
            guessed_weight: 120.0,
            calculated_price: 42.50,
            payment_status: PaymentStatus::Unpaid,
            name: Some("Aunt Jo".to_string()),
            is_anonymous: false,
        }
    }

    #[tokio::test]
    async fn pool_round_trips_by_slug() {
        let (store, _dir) = test_store().await;
        let user = test_user();
        store.insert_user(&user, "tok-1").await.unwrap();
        let pool = test_pool(user.id, "baby-smith");
        store.insert_pool(&pool).await.unwrap();

        let loaded = store.pool_by_slug("baby-smith").await.unwrap().unwrap();
        assert_eq!(loaded.id, pool.id);
        assert_eq!(loaded.mu_weight, 121.6);
        assert!(!loaded.is_locked);
        assert!(loaded.actual_birth_date.is_none());

        assert!(store.pool_by_slug("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn guess_insert_and_fetch_preserves_frozen_price() {
        let (store, _dir) = test_store().await;
        let user = test_user();
        store.insert_user(&user, "tok-2").await.unwrap();
        let pool = test_pool(user.id, "baby-jones");
        store.insert_pool(&pool).await.unwrap();

        let guess = test_guess(pool.id, user.id);
        store.insert_guess(&guess).await.unwrap();

        let guesses = store.guesses_for_pool(pool.id).await.unwrap();
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].calculated_price, 42.50);
        assert_eq!(guesses[0].payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let (store, _dir) = test_store().await;
        let user = test_user();
        store.insert_user(&user, "tok-3").await.unwrap();
        let pool = test_pool(user.id, "baby-lee");
        store.insert_pool(&pool).await.unwrap();
        let guess = test_guess(pool.id, user.id);
        store.insert_guess(&guess).await.unwrap();

        assert!(store.mark_guess_paid(guess.id).await.unwrap());
        assert!(store.mark_guess_paid(guess.id).await.unwrap());
        let guesses = store.guesses_for_pool(pool.id).await.unwrap();
        assert_eq!(guesses[0].payment_status, PaymentStatus::Paid);

        assert!(!store.mark_guess_paid(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn close_pool_locks_once_and_rejects_a_second_close() {
        let (store, _dir) = test_store().await;
        let user = test_user();
        store.insert_user(&user, "tok-4").await.unwrap();
        let pool = test_pool(user.id, "baby-kim");
        store.insert_pool(&pool).await.unwrap();
        let guess = test_guess(pool.id, user.id);
        store.insert_guess(&guess).await.unwrap();

        let rankings = vec![Ranking {
            pool_id: pool.id,
            guess_id: guess.id,
            rank: 1,
            distance: 0.0,
        }];
        store
            .close_pool(pool.id, "2025-12-09", 7.4, &rankings)
            .await
            .unwrap();

        let loaded = store.pool_by_slug("baby-kim").await.unwrap().unwrap();
        assert!(loaded.is_locked);
        assert_eq!(loaded.actual_birth_date.as_deref(), Some("2025-12-09"));
        assert_eq!(loaded.actual_birth_weight, Some(7.4));

        // Second close must conflict and leave standings untouched.
        let err = store
            .close_pool(pool.id, "2025-12-10", 8.0, &rankings)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let standings = store.standings_for_pool(pool.id).await.unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].rank, 1);
    }

    #[tokio::test]
    async fn user_lookup_by_token() {
        let (store, _dir) = test_store().await;
        let user = test_user();
        store.insert_user(&user, "secret-token").await.unwrap();

        let found = store.user_by_token("secret-token").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.user_by_token("wrong").await.unwrap().is_none());
    }
}
