use axum::extract::State;
use axum::{Extension, Json};

use crate::api::auth::AuthUser;
use crate::db::position_repo;
use crate::errors::AppError;
use crate::ledger::{journal_stats, ClosedTrade, JournalStats};
use crate::models::PositionStatus;
use crate::AppState;

use super::ApiResponse;

/// GET /api/dashboard/summary — aggregate journal metrics
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<JournalStats>>, AppError> {
    let open_positions =
        position_repo::count_by_status(&state.db, user.user_id, PositionStatus::Open).await?;
    let total_realized_pnl = position_repo::get_total_realized_pnl(&state.db, user.user_id).await?;
    let closed: Vec<ClosedTrade> = position_repo::get_closed_realized_pnls(&state.db, user.user_id)
        .await?
        .into_iter()
        .map(|realized_pnl| ClosedTrade { realized_pnl })
        .collect();

    Ok(ApiResponse::ok(journal_stats(
        &closed,
        open_positions,
        total_realized_pnl,
    )))
}
