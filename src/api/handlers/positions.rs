use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::db::position_repo::{self, NewPosition, PositionFilter, PositionMetadata};
use crate::errors::AppError;
use crate::models::{Direction, Position, PositionStatus, PositionWithOperations};
use crate::services::journal;
use crate::AppState;

use super::ApiResponse;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePositionRequest {
    pub ticker: String,
    pub direction: Direction,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub setup: Option<String>,
    pub observations: Option<String>,
    pub stop_loss: Option<Decimal>,
    pub stop_gain: Option<Decimal>,
}

/// Absent fields are left unchanged; an explicit `null` clears the field.
#[derive(Deserialize)]
pub struct UpdatePositionRequest {
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub setup: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub observations: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub stop_loss: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub stop_gain: Option<Option<Decimal>>,
}

/// Distinguish a present `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Default)]
pub struct ListPositionsQuery {
    pub status: Option<String>,
    pub direction: Option<String>,
    pub ticker: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ListPositionsQuery {
    fn into_filter(self) -> Result<PositionFilter, AppError> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(s) => Some(
                PositionStatus::from_api_str(s)
                    .ok_or_else(|| AppError::BadRequest(format!("invalid status: {s}")))?,
            ),
        };
        let direction = match self.direction.as_deref() {
            None | Some("") => None,
            Some(s) => Some(
                Direction::from_api_str(s)
                    .ok_or_else(|| AppError::BadRequest(format!("invalid direction: {s}")))?,
            ),
        };
        let ticker = self
            .ticker
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(PositionFilter {
            status,
            direction,
            ticker,
            from: self.from,
            to: self.to,
        })
    }
}

pub(super) fn required(value: Option<Decimal>, field: &str) -> Result<Decimal, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/positions — list the caller's positions
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListPositionsQuery>,
) -> Result<Json<ApiResponse<Vec<Position>>>, AppError> {
    let filter = query.into_filter()?;
    let positions = position_repo::list_positions(&state.db, user.user_id, &filter).await?;

    Ok(ApiResponse::ok(positions))
}

/// POST /api/positions — open a position with its entry
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreatePositionRequest>,
) -> Result<Json<ApiResponse<PositionWithOperations>>, AppError> {
    let new = NewPosition {
        ticker: body.ticker,
        direction: body.direction,
        quantity: required(body.quantity, "quantity")?,
        price: required(body.price, "price")?,
        date: body.date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
        setup: body.setup,
        observations: body.observations,
        stop_loss: body.stop_loss,
        stop_gain: body.stop_gain,
    };

    let created = journal::create_position(&state.db, user.user_id, new).await?;

    Ok(ApiResponse::ok(created))
}

/// GET /api/positions/{id} — position detail with operations
pub async fn detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PositionWithOperations>>, AppError> {
    let detail = journal::get_position_detail(&state.db, user.user_id, id).await?;

    Ok(ApiResponse::ok(detail))
}

/// PUT /api/positions/{id} — edit setup, observations, stops or ticker
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePositionRequest>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    let meta = PositionMetadata {
        ticker: body.ticker,
        setup: body.setup,
        observations: body.observations,
        stop_loss: body.stop_loss,
        stop_gain: body.stop_gain,
    };

    let position = journal::update_position(&state.db, user.user_id, id, meta).await?;

    Ok(ApiResponse::ok(position))
}

/// DELETE /api/positions/{id} — delete a position and its operations
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    journal::delete_position(&state.db, user.user_id, id).await?;

    Ok(ApiResponse::ok(()))
}
