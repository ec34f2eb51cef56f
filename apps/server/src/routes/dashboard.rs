use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use factura_core::DashboardSummary;
use factura_db::ReportWindow;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn summary(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardSummary>> {
    let window = ReportWindow::now(state.config.invoice.offset());
    let summary = state.db.reports().dashboard(window).await?;
    Ok(Json(summary))
}
