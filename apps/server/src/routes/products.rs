//! Catalog maintenance: list, add, edit, remove.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::info;

use factura_core::validation::validate_new_product;
use factura_core::{NewProduct, Product};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(product) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    validate_new_product(&product)?;

    let created = state.db.products().insert(&product).await?;
    info!(product_id = created.id, name = %created.name, "Product added");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Json(product) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    validate_new_product(&product)?;

    let updated = state.db.products().update(id, &product).await?;
    info!(product_id = id, "Product updated");

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(id).await?;
    info!(product_id = id, "Product removed");
    Ok(StatusCode::NO_CONTENT)
}
