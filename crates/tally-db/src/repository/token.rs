//! # Refresh Token Repository
//!
//! A refresh token is valid only while its row exists and `expires_at` is in
//! the future. Rotation swaps one row for another inside a single
//! transaction, so a token can be redeemed at most once.
//!
//! ```text
//!   login ──► insert(T1)
//!   refresh(T1) ──► BEGIN; DELETE T1 (must exist, unexpired); INSERT T2; COMMIT
//!   refresh(T1) again ──► DELETE finds nothing ──► NotFound
//!   logout(T2) ──► DELETE T2
//! ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        RefreshTokenRepository { pool }
    }

    /// Persists a newly issued refresh token.
    pub async fn insert(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(user_id = %user_id, "Refresh token stored");
        Ok(())
    }

    /// Redeems `old` and stores `new` in its place.
    ///
    /// ## Returns
    /// * `Ok(user_id)` - owner of the rotated token
    /// * `Err(DbError::NotFound)` - `old` unknown, already used, or expired
    pub async fn rotate(
        &self,
        old: &str,
        new: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;

        let user_id: Option<String> = sqlx::query_scalar(
            "DELETE FROM refresh_tokens WHERE token = $1 AND expires_at > $2 RETURNING user_id",
        )
        .bind(old)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping tx rolls back.
        let user_id = user_id.ok_or_else(|| DbError::not_found("RefreshToken", "presented token"))?;

        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(new)
        .bind(&user_id)
        .bind(new_expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(user_id = %user_id, "Refresh token rotated");
        Ok(user_id)
    }

    /// Deletes a token. Returns whether a row existed.
    pub async fn revoke(&self, token: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every token belonging to a user, ending all their sessions.
    pub async fn revoke_all_for_user(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Removes tokens that expired at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "Expired refresh tokens removed");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, Database};
    use chrono::Duration;
    use tally_core::{NewUser, Role};

    async fn setup() -> Option<(Database, String)> {
        let db = testing::database().await?;
        let user = db
            .users()
            .create(NewUser {
                first_name: "Alan".to_string(),
                last_name: "Turing".to_string(),
                email: "alan@bletchley.uk".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        Some((db, user.id))
    }

    #[tokio::test]
    async fn test_rotation_is_single_use() {
        let Some((db, user_id)) = setup().await else {
            return;
        };
        let now = Utc::now();
        let tokens = db.refresh_tokens();

        tokens.insert("t1", &user_id, now + Duration::days(7)).await.unwrap();

        let owner = tokens.rotate("t1", "t2", now + Duration::days(7), now).await.unwrap();
        assert_eq!(owner, user_id);

        assert!(matches!(
            tokens.rotate("t1", "t3", now + Duration::days(7), now).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(!tokens.revoke("t3").await.unwrap());
        assert!(tokens.revoke("t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_cannot_rotate_and_is_purged() {
        let Some((db, user_id)) = setup().await else {
            return;
        };
        let now = Utc::now();
        let tokens = db.refresh_tokens();

        tokens.insert("old", &user_id, now - Duration::seconds(1)).await.unwrap();

        assert!(tokens.rotate("old", "new", now + Duration::days(1), now).await.is_err());
        assert_eq!(tokens.purge_expired(now).await.unwrap(), 1);
        assert!(!tokens.revoke("old").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_delete_cascades_to_tokens() {
        let Some((db, user_id)) = setup().await else {
            return;
        };
        let now = Utc::now();
        db.refresh_tokens()
            .insert("t1", &user_id, now + Duration::days(1))
            .await
            .unwrap();

        db.users().delete(&user_id).await.unwrap();

        assert!(!db.refresh_tokens().revoke("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_all_for_user_ends_every_session() {
        let Some((db, user_id)) = setup().await else {
            return;
        };
        let now = Utc::now();
        let tokens = db.refresh_tokens();
        for token in ["a", "b", "c"] {
            tokens.insert(token, &user_id, now + Duration::days(1)).await.unwrap();
        }

        assert_eq!(tokens.revoke_all_for_user(&user_id).await.unwrap(), 3);
        assert!(tokens.rotate("a", "d", now + Duration::days(1), now).await.is_err());
        assert_eq!(tokens.revoke_all_for_user(&user_id).await.unwrap(), 0);
    }
}
