use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::ledger::Recalculation;
use crate::models::{Direction, Position, PositionStatus};

/// Fields supplied when a position is opened.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub ticker: String,
    pub direction: Direction,
    pub quantity: Decimal,
    pub price: Decimal,
    pub date: NaiveDate,
    pub setup: Option<String>,
    pub observations: Option<String>,
    pub stop_loss: Option<Decimal>,
    pub stop_gain: Option<Decimal>,
}

/// Editable, non-derived position fields. The outer `None` leaves a field
/// unchanged; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct PositionMetadata {
    pub ticker: Option<String>,
    pub setup: Option<Option<String>>,
    pub observations: Option<Option<String>>,
    pub stop_loss: Option<Option<Decimal>>,
    pub stop_gain: Option<Option<Decimal>>,
}

/// List filters. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct PositionFilter {
    pub status: Option<PositionStatus>,
    pub direction: Option<Direction>,
    pub ticker: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Insert a position seeded from its entry. Aggregates are overwritten by the
/// first recalculation in the same transaction.
pub async fn insert_position(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    new: &NewPosition,
) -> anyhow::Result<Position> {
    let pos = sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions (
            user_id, ticker, direction, status, average_entry_price, current_quantity,
            total_realized_pnl, initial_entry_date, setup, observations, stop_loss, stop_gain
        )
        VALUES ($1, $2, $3, 'open', $4, $5, 0, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&new.ticker)
    .bind(new.direction)
    .bind(new.price)
    .bind(new.quantity)
    .bind(new.date)
    .bind(&new.setup)
    .bind(&new.observations)
    .bind(new.stop_loss)
    .bind(new.stop_gain)
    .fetch_one(db)
    .await?;

    Ok(pos)
}

/// Get a position owned by `user_id`.
pub async fn get_position(
    db: impl PgExecutor<'_>,
    id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<Position>> {
    let pos = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(pos)
}

/// Get a position owned by `user_id` and lock its row until the surrounding
/// transaction ends.
pub async fn get_position_for_update(
    db: impl PgExecutor<'_>,
    id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<Position>> {
    let pos = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(pos)
}

/// List a user's positions, newest entry first.
pub async fn list_positions(
    pool: &PgPool,
    user_id: Uuid,
    filter: &PositionFilter,
) -> anyhow::Result<Vec<Position>> {
    let positions = sqlx::query_as::<_, Position>(
        r#"
        SELECT * FROM positions
        WHERE user_id = $1
          AND ($2::position_status IS NULL OR status = $2)
          AND ($3::position_direction IS NULL OR direction = $3)
          AND ($4::text IS NULL OR UPPER(ticker) = UPPER($4))
          AND ($5::date IS NULL OR initial_entry_date >= $5)
          AND ($6::date IS NULL OR initial_entry_date <= $6)
        ORDER BY initial_entry_date DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(filter.status)
    .bind(filter.direction)
    .bind(&filter.ticker)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(pool)
    .await?;

    Ok(positions)
}

/// Overwrite the derived fields of a position with a ledger replay.
pub async fn update_aggregates(
    db: impl PgExecutor<'_>,
    id: Uuid,
    recalc: &Recalculation,
) -> anyhow::Result<Position> {
    let updated = sqlx::query_as::<_, Position>(
        r#"
        UPDATE positions
        SET average_entry_price = $2,
            current_quantity = $3,
            total_realized_pnl = $4,
            initial_entry_date = $5,
            last_exit_date = $6,
            status = $7,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(recalc.average_entry_price)
    .bind(recalc.current_quantity)
    .bind(recalc.total_realized_pnl)
    .bind(recalc.initial_entry_date)
    .bind(recalc.last_exit_date)
    .bind(recalc.status)
    .fetch_one(db)
    .await?;

    Ok(updated)
}

/// Update editable metadata. Returns `None` if the position is not the user's.
pub async fn update_metadata(
    db: impl PgExecutor<'_>,
    id: Uuid,
    user_id: Uuid,
    meta: &PositionMetadata,
) -> anyhow::Result<Option<Position>> {
    let updated = sqlx::query_as::<_, Position>(
        r#"
        UPDATE positions
        SET ticker = COALESCE($3, ticker),
            setup = CASE WHEN $4 THEN $5::text ELSE setup END,
            observations = CASE WHEN $6 THEN $7::text ELSE observations END,
            stop_loss = CASE WHEN $8 THEN $9::numeric ELSE stop_loss END,
            stop_gain = CASE WHEN $10 THEN $11::numeric ELSE stop_gain END,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&meta.ticker)
    .bind(meta.setup.is_some())
    .bind(meta.setup.clone().flatten())
    .bind(meta.observations.is_some())
    .bind(meta.observations.clone().flatten())
    .bind(meta.stop_loss.is_some())
    .bind(meta.stop_loss.flatten())
    .bind(meta.stop_gain.is_some())
    .bind(meta.stop_gain.flatten())
    .fetch_optional(db)
    .await?;

    Ok(updated)
}

/// Delete a position (operations cascade). Returns whether a row was removed.
pub async fn delete_position(
    db: impl PgExecutor<'_>,
    id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM positions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Count a user's positions with the given status.
pub async fn count_by_status(
    pool: &PgPool,
    user_id: Uuid,
    status: PositionStatus,
) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM positions WHERE user_id = $1 AND status = $2",
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Realized P&L of every closed position.
pub async fn get_closed_realized_pnls(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Decimal>> {
    let rows: Vec<(Decimal,)> = sqlx::query_as(
        r#"
        SELECT total_realized_pnl FROM positions
        WHERE user_id = $1 AND status = 'closed'
        ORDER BY last_exit_date
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Realized P&L across all positions, including partial exits on open ones.
pub async fn get_total_realized_pnl(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Decimal> {
    let row: (Option<Decimal>,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_realized_pnl), 0) FROM positions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0.unwrap_or(Decimal::ZERO))
}
