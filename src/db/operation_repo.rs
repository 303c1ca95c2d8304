use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::ledger::OperationInput;
use crate::models::{Operation, OperationKind};

/// Append an operation to a position's ledger.
pub async fn insert_operation(
    db: impl PgExecutor<'_>,
    position_id: Uuid,
    kind: OperationKind,
    input: &OperationInput,
) -> anyhow::Result<Operation> {
    let op = sqlx::query_as::<_, Operation>(
        r#"
        INSERT INTO position_operations (position_id, kind, quantity, price, date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(position_id)
    .bind(kind)
    .bind(input.quantity)
    .bind(input.price)
    .bind(input.date)
    .fetch_one(db)
    .await?;

    Ok(op)
}

/// All operations of a position in ledger order (date, then insertion).
pub async fn get_operations(
    db: impl PgExecutor<'_>,
    position_id: Uuid,
) -> anyhow::Result<Vec<Operation>> {
    let ops = sqlx::query_as::<_, Operation>(
        "SELECT * FROM position_operations WHERE position_id = $1 ORDER BY date, seq",
    )
    .bind(position_id)
    .fetch_all(db)
    .await?;

    Ok(ops)
}

pub async fn get_operation(
    db: impl PgExecutor<'_>,
    id: Uuid,
    position_id: Uuid,
) -> anyhow::Result<Option<Operation>> {
    let op = sqlx::query_as::<_, Operation>(
        "SELECT * FROM position_operations WHERE id = $1 AND position_id = $2",
    )
    .bind(id)
    .bind(position_id)
    .fetch_optional(db)
    .await?;

    Ok(op)
}

pub async fn delete_operation(db: impl PgExecutor<'_>, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM position_operations WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

/// Store the realized result of a partial exit.
pub async fn set_result(db: impl PgExecutor<'_>, id: Uuid, result: Decimal) -> anyhow::Result<()> {
    sqlx::query("UPDATE position_operations SET result = $2 WHERE id = $1")
        .bind(id)
        .bind(result)
        .execute(db)
        .await?;

    Ok(())
}

/// Realized P&L per exit date across a user's positions.
pub async fn get_daily_realized_pnl(
    pool: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<(NaiveDate, Decimal)>> {
    let rows: Vec<(NaiveDate, Option<Decimal>)> = sqlx::query_as(
        r#"
        SELECT o.date AS day, SUM(o.result) AS daily_pnl
        FROM position_operations o
        JOIN positions p ON p.id = o.position_id
        WHERE p.user_id = $1 AND o.kind = 'partial_exit' AND o.result IS NOT NULL
        GROUP BY o.date
        ORDER BY day
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(day, pnl)| (day, pnl.unwrap_or(Decimal::ZERO)))
        .collect())
}
