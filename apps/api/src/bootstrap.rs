//! First-run admin account.

use tally_core::validation::{validate_email, validate_password};
use tally_core::{NewUser, Role, User, ValidationErrors};
use tally_db::Database;
use tracing::{debug, info};

use crate::auth::hash_password;
use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Creates the configured admin when no user has its email yet.
///
/// Returns the new user, or `None` when nothing was configured or the
/// account already exists. An existing account is left untouched.
pub async fn ensure_admin(db: &Database, config: &ApiConfig) -> ApiResult<Option<User>> {
    let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(None);
    };

    let mut errors = ValidationErrors::new();
    let email = errors.check(validate_email(email));
    errors.check(validate_password(password));
    errors.into_result()?;
    let Some(email) = email else {
        return Ok(None);
    };

    if db.users().find_by_email(&email).await?.is_some() {
        debug!(email = %email, "Bootstrap admin already present");
        return Ok(None);
    }

    let user = db
        .users()
        .create(NewUser {
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            email,
            password_hash: hash_password(password)?,
            role: Role::Admin,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_db::testing;

    fn config(email: Option<&str>, password: Option<&str>) -> ApiConfig {
        ApiConfig {
            bootstrap_admin_email: email.map(str::to_string),
            bootstrap_admin_password: password.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let Some(db) = testing::database().await else {
            return;
        };
        let config = config(Some("Root@Example.com"), Some("s3cret-pass"));

        let created = ensure_admin(&db, &config).await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
        assert_eq!(created.email, "root@example.com");

        assert!(ensure_admin(&db, &config).await.unwrap().is_none());
        assert_eq!(db.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn nothing_configured_is_a_no_op() {
        let Some(db) = testing::database().await else {
            return;
        };
        assert!(ensure_admin(&db, &config(None, None)).await.unwrap().is_none());
        assert_eq!(db.users().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn weak_password_rejected() {
        let Some(db) = testing::database().await else {
            return;
        };
        let err = ensure_admin(&db, &config(Some("root@example.com"), Some("short")))
            .await
            .unwrap_err();
        assert_eq!(err.code, "VALIDATION_FAILED");
    }
}
