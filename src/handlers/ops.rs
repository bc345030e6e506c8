// src/handlers/ops.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{common::error::AppError, config::AppState, models::billing::FinanceMetrics};

// GET /api/ops/metrics
#[utoipa::path(
    get,
    path = "/api/ops/metrics",
    tag = "Ops",
    responses(
        (status = 200, description = "Indicadores financeiros do mês", body = FinanceMetrics)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_metrics(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let metrics = app_state.billing_repo.finance_metrics().await?;
    Ok((StatusCode::OK, Json(metrics)))
}
