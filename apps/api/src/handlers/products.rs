//! Product catalogue, quantity adjustments and per-product audit trails.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::{
    AdjustQuantity, NewProduct, Page, Paginated, Product, ProductFilter, ProductTransaction,
    QuantityHistoryEntry, StockStatus, UpdateProduct,
};
use tracing::info;

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::policy::{authorize, Capability};
use crate::AppState;

/// Query string of `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub include_deleted: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    pub fn into_parts(self) -> ApiResult<(ProductFilter, Page)> {
        let page = Page::new(self.page, self.limit)?;
        let filter = ProductFilter {
            category_id: self.category_id,
            search: self.search,
            is_active: self.is_active,
            min_price_cents: self.min_price_cents,
            max_price_cents: self.max_price_cents,
            stock_status: self.stock_status,
            include_deleted: self.include_deleted.unwrap_or(false),
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IncludeDeletedQuery {
    pub include_deleted: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

/// Body of `PATCH /api/products/:id/quantity`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuantityRequest {
    pub quantity_change: i64,
    pub reason_code: String,
    pub reason_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityResponse {
    pub product: Product,
    pub new_quantity: i64,
    pub previous_quantity: i64,
    pub transaction_id: i64,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<ProductQuery>,
) -> ApiResult<Json<Paginated<Product>>> {
    authorize(&user, Capability::ReadInventory)?;

    let (filter, page) = query.into_parts()?;
    let products = state.db.products().find_all(&filter, page).await?;
    Ok(Json(products))
}

/// Live products at or below their threshold, emptiest first.
pub async fn low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<LimitQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    authorize(&user, Capability::ReadInventory)?;

    let page = Page::new(None, query.limit)?;
    let products = state.db.products().low_stock(page.limit).await?;
    Ok(Json(products))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(query): ValidQuery<IncludeDeletedQuery>,
) -> ApiResult<Json<Product>> {
    authorize(&user, Capability::ReadInventory)?;

    let product = state
        .db
        .products()
        .find_by_id(id, query.include_deleted.unwrap_or(false))
        .await?;
    Ok(Json(product))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(input): ValidJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    authorize(&user, Capability::ManageInventory)?;

    let product = state.db.products().create(input).await?;
    info!(product_id = product.id, user_id = %user.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Partial update. Quantity is not an accepted field.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<UpdateProduct>,
) -> ApiResult<Json<Product>> {
    authorize(&user, Capability::ManageInventory)?;

    let product = state.db.products().update(id, input).await?;
    info!(product_id = id, user_id = %user.id, "Product updated");
    Ok(Json(product))
}

/// Soft delete. The product and its audit trail stay readable.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<StatusCode> {
    authorize(&user, Capability::ManageInventory)?;

    state.db.products().soft_delete(id).await?;
    info!(product_id = id, user_id = %user.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Posts one adjustment through the quantity ledger, attributed to the caller.
pub async fn adjust_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<QuantityRequest>,
) -> ApiResult<Json<QuantityResponse>> {
    authorize(&user, Capability::AdjustStock)?;

    let outcome = state
        .db
        .ledger()
        .adjust_quantity(AdjustQuantity {
            product_id: id,
            quantity_change: req.quantity_change,
            reason_code: req.reason_code,
            reason_description: req.reason_description,
            actor_id: user.id,
        })
        .await?;

    let product = state.db.products().find_by_id(id, false).await?;

    Ok(Json(QuantityResponse {
        product,
        new_quantity: outcome.new_quantity,
        previous_quantity: outcome.previous_quantity,
        transaction_id: outcome.transaction_id,
    }))
}

pub async fn transactions(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Json<Paginated<ProductTransaction>>> {
    authorize(&user, Capability::ReadInventory)?;

    let rows = state
        .db
        .reports()
        .product_transactions(id, query.into_page()?)
        .await?;
    Ok(Json(rows))
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> ApiResult<Json<Paginated<QuantityHistoryEntry>>> {
    authorize(&user, Capability::ReadInventory)?;

    let rows = state
        .db
        .reports()
        .quantity_history(id, query.into_page()?)
        .await?;
    Ok(Json(rows))
}
