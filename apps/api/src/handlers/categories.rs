use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tally_core::{Category, CategorySummary, NewCategory, UpdateCategory};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ValidJson, ValidPath};
use crate::policy::{authorize, Capability};
use crate::AppState;

/// Every category with its live product count, by name.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CategorySummary>>> {
    authorize(&user, Capability::ReadInventory)?;
    Ok(Json(state.db.categories().find_all().await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Json<CategorySummary>> {
    authorize(&user, Capability::ReadInventory)?;
    Ok(Json(state.db.categories().find_by_id(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(input): ValidJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    authorize(&user, Capability::ManageInventory)?;

    let category = state.db.categories().create(input).await?;
    info!(category_id = category.id, user_id = %user.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<UpdateCategory>,
) -> ApiResult<Json<CategorySummary>> {
    authorize(&user, Capability::ManageInventory)?;
    Ok(Json(state.db.categories().update(id, input).await?))
}

/// Refused with 409 while any live product still points at the category.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<StatusCode> {
    authorize(&user, Capability::ManageInventory)?;

    state.db.categories().delete(id).await?;
    info!(category_id = id, user_id = %user.id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
