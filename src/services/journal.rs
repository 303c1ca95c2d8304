//! Transactional journal actions.
//!
//! Every mutation follows the same shape: begin a transaction, lock the
//! position row (scoped by owner), read/write its operations, replay the
//! ledger, write the recomputed aggregate, commit. Any error drops the
//! transaction, which rolls it back.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::position_repo::{NewPosition, PositionMetadata};
use crate::db::{operation_repo, position_repo};
use crate::errors::AppError;
use crate::ledger::{self, LedgerOp, OperationInput, Recalculation};
use crate::models::{Operation, OperationKind, Position, PositionStatus, PositionWithOperations};

/// Result of recording an increment or partial exit.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub position: Position,
    pub operation: Operation,
}

/// Result of deleting an operation: either the refreshed position, or the
/// position itself was removed because no operations remain.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionOutcome {
    pub position: Option<Position>,
    pub position_deleted: bool,
}

fn position_not_found() -> AppError {
    AppError::NotFound("position not found".into())
}

fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::BadRequest("ticker must not be empty".into()));
    }
    Ok(ticker)
}

fn check_stop_level(name: &str, level: Option<Decimal>) -> Result<(), AppError> {
    match level {
        Some(v) if v <= Decimal::ZERO => Err(AppError::BadRequest(format!(
            "{name} must be greater than zero"
        ))),
        _ => Ok(()),
    }
}

/// Replay the ledger of `position` and persist aggregates and exit results.
/// Deletes the position and returns `None` when no operations remain.
async fn replay_and_persist(
    conn: &mut PgConnection,
    position: &Position,
) -> Result<Option<(Position, Vec<Operation>)>, AppError> {
    let mut operations = operation_repo::get_operations(&mut *conn, position.id).await?;
    let ledger_ops: Vec<LedgerOp> = operations.iter().map(LedgerOp::from).collect();

    let Some(recalc) = ledger::recalculate(position.direction, &ledger_ops)? else {
        position_repo::delete_position(&mut *conn, position.id, position.user_id).await?;
        tracing::info!(position_id = %position.id, "Position deleted: no operations remain");
        return Ok(None);
    };

    persist_exit_results(conn, &mut operations, &recalc).await?;
    let updated = position_repo::update_aggregates(&mut *conn, position.id, &recalc).await?;

    // Mutations only run on open positions, so a replay can close but never reopen
    if position.status == PositionStatus::Open && updated.status == PositionStatus::Closed {
        metrics::counter!("positions_closed_total").increment(1);
        tracing::info!(
            position_id = %updated.id,
            total_realized_pnl = %updated.total_realized_pnl,
            "Position closed"
        );
    }

    Ok(Some((updated, operations)))
}

/// Write back exit results that changed in the replay.
async fn persist_exit_results(
    conn: &mut PgConnection,
    operations: &mut [Operation],
    recalc: &Recalculation,
) -> Result<(), AppError> {
    for (op_id, result) in &recalc.exit_results {
        if let Some(op) = operations.iter_mut().find(|o| o.id == *op_id) {
            if op.result != Some(*result) {
                operation_repo::set_result(&mut *conn, op.id, *result).await?;
                op.result = Some(*result);
            }
        }
    }
    Ok(())
}

/// Open a position together with its entry operation.
pub async fn create_position(
    pool: &PgPool,
    user_id: Uuid,
    mut new: NewPosition,
) -> Result<PositionWithOperations, AppError> {
    new.ticker = normalize_ticker(&new.ticker)?;
    check_stop_level("stop_loss", new.stop_loss)?;
    check_stop_level("stop_gain", new.stop_gain)?;

    let entry = OperationInput {
        quantity: new.quantity,
        price: new.price,
        date: new.date,
    };
    ledger::validate_operation_input(&entry, None, None)?;

    let mut tx = pool.begin().await?;

    let position = position_repo::insert_position(&mut *tx, user_id, &new).await?;
    operation_repo::insert_operation(&mut *tx, position.id, OperationKind::Entry, &entry).await?;

    let (position, operations) = replay_and_persist(&mut *tx, &position)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("new position has no operations")))?;

    tx.commit().await?;

    metrics::counter!("positions_created_total").increment(1);
    metrics::counter!("operations_recorded_total", "kind" => OperationKind::Entry.to_string())
        .increment(1);
    tracing::info!(
        position_id = %position.id,
        user_id = %user_id,
        ticker = %position.ticker,
        direction = %position.direction,
        quantity = %entry.quantity,
        price = %entry.price,
        "Position opened"
    );

    Ok(PositionWithOperations {
        position,
        operations,
    })
}

/// Add to an open position, blending the cost basis.
pub async fn add_increment(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
    input: OperationInput,
) -> Result<OperationOutcome, AppError> {
    record_operation(pool, user_id, position_id, OperationKind::Increment, input).await
}

/// Reduce an open position, realizing P&L against the average at exit time.
pub async fn add_partial_exit(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
    input: OperationInput,
) -> Result<OperationOutcome, AppError> {
    record_operation(pool, user_id, position_id, OperationKind::PartialExit, input).await
}

async fn record_operation(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
    kind: OperationKind,
    input: OperationInput,
) -> Result<OperationOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let position = position_repo::get_position_for_update(&mut *tx, position_id, user_id)
        .await?
        .ok_or_else(position_not_found)?;

    if !position.is_open() {
        return Err(AppError::Conflict(format!(
            "position is closed; cannot record {kind}"
        )));
    }

    let open_quantity = match kind {
        OperationKind::PartialExit => Some(position.current_quantity),
        _ => None,
    };
    ledger::validate_operation_input(&input, Some(position.initial_entry_date), open_quantity)?;

    let inserted = operation_repo::insert_operation(&mut *tx, position.id, kind, &input).await?;

    let (position, operations) = replay_and_persist(&mut *tx, &position)
        .await?
        .ok_or_else(position_not_found)?;

    let operation = operations
        .into_iter()
        .find(|o| o.id == inserted.id)
        .unwrap_or(inserted);

    tx.commit().await?;

    metrics::counter!("operations_recorded_total", "kind" => kind.to_string()).increment(1);
    tracing::info!(
        position_id = %position.id,
        user_id = %user_id,
        kind = %kind,
        quantity = %input.quantity,
        price = %input.price,
        result = ?operation.result,
        current_quantity = %position.current_quantity,
        average_entry_price = %position.average_entry_price,
        "Operation recorded"
    );

    Ok(OperationOutcome {
        position,
        operation,
    })
}

/// Remove a non-entry operation from an open position and replay the rest.
pub async fn delete_operation(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
    operation_id: Uuid,
) -> Result<DeletionOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let position = position_repo::get_position_for_update(&mut *tx, position_id, user_id)
        .await?
        .ok_or_else(position_not_found)?;

    let operation = operation_repo::get_operation(&mut *tx, operation_id, position.id)
        .await?
        .ok_or_else(|| AppError::NotFound("operation not found".into()))?;

    if !position.is_open() {
        return Err(AppError::Conflict(
            "position is closed; operations cannot be deleted".into(),
        ));
    }
    if operation.kind == OperationKind::Entry {
        return Err(AppError::BadRequest(
            "the entry operation cannot be deleted; delete the position instead".into(),
        ));
    }

    operation_repo::delete_operation(&mut *tx, operation.id).await?;
    let replayed = replay_and_persist(&mut *tx, &position).await?;

    tx.commit().await?;

    metrics::counter!("operations_deleted_total").increment(1);
    tracing::info!(
        position_id = %position.id,
        operation_id = %operation.id,
        kind = %operation.kind,
        "Operation deleted"
    );

    Ok(match replayed {
        Some((position, _)) => DeletionOutcome {
            position: Some(position),
            position_deleted: false,
        },
        None => DeletionOutcome {
            position: None,
            position_deleted: true,
        },
    })
}

/// Position with its operations in ledger order.
pub async fn get_position_detail(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
) -> Result<PositionWithOperations, AppError> {
    let position = position_repo::get_position(pool, position_id, user_id)
        .await?
        .ok_or_else(position_not_found)?;
    let operations = operation_repo::get_operations(pool, position.id).await?;

    Ok(PositionWithOperations {
        position,
        operations,
    })
}

/// Edit non-derived fields of a position.
pub async fn update_position(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
    mut meta: PositionMetadata,
) -> Result<Position, AppError> {
    if let Some(ticker) = &meta.ticker {
        meta.ticker = Some(normalize_ticker(ticker)?);
    }
    check_stop_level("stop_loss", meta.stop_loss.flatten())?;
    check_stop_level("stop_gain", meta.stop_gain.flatten())?;

    let position = position_repo::update_metadata(pool, position_id, user_id, &meta)
        .await?
        .ok_or_else(position_not_found)?;

    tracing::info!(position_id = %position.id, user_id = %user_id, "Position updated");
    Ok(position)
}

/// Delete a position and, by cascade, its operations.
pub async fn delete_position(
    pool: &PgPool,
    user_id: Uuid,
    position_id: Uuid,
) -> Result<(), AppError> {
    if !position_repo::delete_position(pool, position_id, user_id).await? {
        return Err(position_not_found());
    }

    tracing::info!(position_id = %position_id, user_id = %user_id, "Position deleted");
    Ok(())
}
