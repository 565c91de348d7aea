//! # User Repository
//!
//! Accounts. Emails are stored lower-cased and are unique. A user referenced
//! by ledger or history rows cannot be deleted; deleting any other user also
//! removes their refresh tokens (FK cascade).

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{CoreError, NewUser, Page, Paginated, UpdateUser, User};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user with a fresh UUID v4 id.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation { field: "email" })` - email taken
    pub async fn create(&self, input: NewUser) -> DbResult<User> {
        let id = Uuid::new_v4().to_string();
        let email = input.email.trim().to_lowercase();
        let now = Utc::now();

        debug!(id = %id, role = %input.role, "Inserting user");

        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&id)
            .bind(input.first_name.trim())
            .bind(input.last_name.trim())
            .bind(&email)
            .bind(&input.password_hash)
            .bind(input.role)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_value(&email))?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Looks a user up by email, case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Users ordered by last name, first name.
    pub async fn list(&self, page: Page) -> DbResult<Paginated<User>> {
        let total = self.count().await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(users, page, total))
    }

    /// Partial update. Absent fields keep their value.
    pub async fn update(&self, id: &str, input: UpdateUser) -> DbResult<User> {
        let email = input.email.as_deref().map(|e| e.trim().to_lowercase());

        debug!(id = %id, "Updating user");

        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                role = COALESCE($6, role),
                updated_at = $7
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(input.first_name.as_deref().map(str::trim))
            .bind(input.last_name.as_deref().map(str::trim))
            .bind(email.as_deref())
            .bind(input.password_hash.as_deref())
            .bind(input.role)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_value(email.as_deref().unwrap_or_default()))?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes a user and, by cascade, their refresh tokens.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(UserHasHistory))` - audit rows reference the user
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::Domain(CoreError::UserHasHistory(id.to_string()))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tally_core::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_email_is_normalised_and_unique() {
        let Some(db) = testing::database().await else {
            return;
        };
        let user = db.users().create(new_user("Grace@Navy.MIL")).await.unwrap();
        assert_eq!(user.email, "grace@navy.mil");
        assert!(uuid::Uuid::parse_str(&user.id).is_ok());

        let found = db.users().find_by_email("GRACE@navy.mil").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let err = db.users().create(new_user("grace@navy.mil")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_update_role_and_delete() {
        let Some(db) = testing::database().await else {
            return;
        };
        let user = db.users().create(new_user("grace@navy.mil")).await.unwrap();

        let updated = db
            .users()
            .update(
                &user.id,
                UpdateUser {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.first_name, "Grace");

        db.users().delete(&user.id).await.unwrap();
        assert!(matches!(
            db.users().find_by_id(&user.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.users().update("missing", UpdateUser::default()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
