//! Sale registration, lookup and invoice endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use factura_core::{Customer, Sale, SaleLine};

use crate::error::{ApiError, ApiResult};
use crate::services::{RegisterSaleRequest, RegisterSaleResponse};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

/// `POST /sales` and `POST /venta/nueva`.
///
/// 200 even when every line was rejected; see `rejected` in the body.
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterSaleRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterSaleResponse>> {
    let Json(request) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    Ok(Json(state.sales.register(request).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// `GET /sales?limit=N`, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Sale>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.db.sales().list_recent(limit).await?))
}

/// A sale with its customer, lines and invoice figures.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub customer: Customer,
    pub lines: Vec<SaleLine>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SaleDetail>> {
    let data = state.db.sales().get_invoice_data(id).await?;
    let totals = data.totals(state.config.invoice.tax_rate())?;

    Ok(Json(SaleDetail {
        sale: data.sale,
        customer: data.customer,
        lines: data.lines,
        subtotal_cents: totals.subtotal.cents(),
        tax_cents: totals.tax.cents(),
        total_cents: totals.total.cents(),
    }))
}

/// `GET /sales/{id}/invoice.pdf`: renders without sending.
pub async fn invoice_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let invoice = state.sales.invoice_pdf(id).await?;
    let disposition = format!("inline; filename=\"{}\"", invoice.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        invoice.bytes,
    )
        .into_response())
}

/// `POST /sales/{id}/invoice/resend`.
pub async fn resend(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Sale>> {
    Ok(Json(state.sales.resend_invoice(id).await?))
}
