use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use factura_core::Customer;

use crate::error::ApiResult;
use crate::state::AppState;

/// Newest customers first.
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}
