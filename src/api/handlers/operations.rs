use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::errors::AppError;
use crate::ledger::OperationInput;
use crate::models::Operation;
use crate::services::journal::{self, DeletionOutcome, OperationOutcome};
use crate::AppState;

use super::positions::required;
use super::ApiResponse;

#[derive(Deserialize)]
pub struct OperationRequest {
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub date: Option<NaiveDate>,
}

impl OperationRequest {
    fn into_input(self) -> Result<OperationInput, AppError> {
        Ok(OperationInput {
            quantity: required(self.quantity, "quantity")?,
            price: required(self.price, "price")?,
            date: self.date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
        })
    }
}

/// GET /api/positions/{id}/operations — ledger of a position
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Operation>>>, AppError> {
    let detail = journal::get_position_detail(&state.db, user.user_id, id).await?;

    Ok(ApiResponse::ok(detail.operations))
}

/// POST /api/positions/{id}/increment
pub async fn increment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<OperationRequest>,
) -> Result<Json<ApiResponse<OperationOutcome>>, AppError> {
    let outcome = journal::add_increment(&state.db, user.user_id, id, body.into_input()?).await?;

    Ok(ApiResponse::ok(outcome))
}

/// POST /api/positions/{id}/partial-exit
pub async fn partial_exit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<OperationRequest>,
) -> Result<Json<ApiResponse<OperationOutcome>>, AppError> {
    let outcome =
        journal::add_partial_exit(&state.db, user.user_id, id, body.into_input()?).await?;

    Ok(ApiResponse::ok(outcome))
}

/// DELETE /api/positions/{id}/operations/{op_id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, op_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<DeletionOutcome>>, AppError> {
    let outcome = journal::delete_operation(&state.db, user.user_id, id, op_id).await?;

    Ok(ApiResponse::ok(outcome))
}
