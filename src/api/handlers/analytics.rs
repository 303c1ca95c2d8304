use axum::extract::State;
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::auth::AuthUser;
use crate::db::operation_repo;
use crate::errors::AppError;
use crate::AppState;

use super::ApiResponse;

#[derive(Serialize)]
pub struct PnlDataPoint {
    pub date: String,
    pub daily_pnl: String,
    pub cumulative_pnl: String,
}

/// GET /api/analytics/pnl-history — realized P&L per exit date, with running total
pub async fn pnl_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<PnlDataPoint>>>, AppError> {
    let rows = operation_repo::get_daily_realized_pnl(&state.db, user.user_id).await?;

    let mut cumulative = Decimal::ZERO;
    let points: Vec<PnlDataPoint> = rows
        .into_iter()
        .map(|(day, daily_pnl)| {
            cumulative += daily_pnl;
            PnlDataPoint {
                date: day.to_string(),
                daily_pnl: daily_pnl.to_string(),
                cumulative_pnl: cumulative.to_string(),
            }
        })
        .collect();

    Ok(ApiResponse::ok(points))
}
