//! User administration. Admin only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::validation::{validate_email, validate_password, validate_person_name, validate_uuid};
use tally_core::{NewUser, Paginated, Role, UpdateUser, User, ValidationErrors};
use tracing::info;

use super::PageQuery;
use crate::auth::{hash_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::policy::{authorize, Capability};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    /// Validates present fields and hashes a new password.
    fn into_update(self) -> ApiResult<UpdateUser> {
        let mut errors = ValidationErrors::new();

        if let Some(first_name) = &self.first_name {
            errors.check(validate_person_name("firstName", first_name));
        }
        if let Some(last_name) = &self.last_name {
            errors.check(validate_person_name("lastName", last_name));
        }
        let email = match &self.email {
            Some(email) => errors.check(validate_email(email)),
            None => None,
        };
        if let Some(password) = &self.password {
            errors.check(validate_password(password));
        }
        errors.into_result()?;

        let password_hash = match &self.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        Ok(UpdateUser {
            first_name: self.first_name,
            last_name: self.last_name,
            email,
            password_hash,
            role: self.role,
        })
    }
}

fn user_id(id: &str) -> ApiResult<()> {
    validate_uuid(id).map_err(ApiError::from)
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Json<Paginated<User>>> {
    authorize(&user, Capability::ManageUsers)?;
    Ok(Json(state.db.users().list(query.into_page()?).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<String>,
) -> ApiResult<Json<User>> {
    authorize(&user, Capability::ManageUsers)?;
    user_id(&id)?;
    Ok(Json(state.db.users().find_by_id(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    authorize(&user, Capability::ManageUsers)?;

    let mut errors = ValidationErrors::new();
    errors.check(validate_person_name("firstName", &req.first_name));
    errors.check(validate_person_name("lastName", &req.last_name));
    let email = errors.check(validate_email(&req.email));
    errors.check(validate_password(&req.password));
    errors.into_result()?;

    let created = state
        .db
        .users()
        .create(NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: email.unwrap_or_default(),
            password_hash: hash_password(&req.password)?,
            role: req.role,
        })
        .await?;

    info!(user_id = %created.id, role = %created.role, by = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    authorize(&user, Capability::ManageUsers)?;
    user_id(&id)?;

    let update = req.into_update()?;
    let credentials_changed = update.role.is_some() || update.password_hash.is_some();
    let updated = state.db.users().update(&id, update).await?;

    // Outstanding sessions were issued under the old role or password.
    if credentials_changed {
        let revoked = state.db.refresh_tokens().revoke_all_for_user(&id).await?;
        info!(user_id = %id, revoked, "Refresh tokens revoked after credential change");
    }

    info!(user_id = %id, by = %user.id, "User updated");
    Ok(Json(updated))
}

/// Removes a user and their refresh tokens.
///
/// Refused with 409 once the user has recorded stock changes, and with 403
/// for the caller's own account.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<String>,
) -> ApiResult<StatusCode> {
    authorize(&user, Capability::ManageUsers)?;
    user_id(&id)?;

    if id == user.id {
        return Err(ApiError::forbidden("You cannot delete your own account"));
    }

    state.db.users().delete(&id).await?;
    info!(user_id = %id, by = %user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_validates_only_present_fields() {
        let update = UpdateUserRequest {
            last_name: Some("Lovelace".to_string()),
            email: Some(" ADA@Example.com ".to_string()),
            ..Default::default()
        }
        .into_update()
        .unwrap();

        assert_eq!(update.email.as_deref(), Some("ada@example.com"));
        assert!(update.password_hash.is_none());
        assert!(update.first_name.is_none());
    }

    #[test]
    fn update_collects_every_bad_field() {
        let err = UpdateUserRequest {
            first_name: Some(String::new()),
            email: Some("nope".to_string()),
            password: Some("short".to_string()),
            ..Default::default()
        }
        .into_update()
        .unwrap_err();

        let fields: Vec<_> = err.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["firstName", "email", "password"]);
    }
}
