use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Direction, Operation, PositionStatus};

/// Database row for positions table.
///
/// `average_entry_price`, `current_quantity`, `total_realized_pnl`,
/// `initial_entry_date`, `last_exit_date` and `status` are derived from the
/// position's operations and only ever written by the journal service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker: String,
    pub direction: Direction,
    pub status: PositionStatus,
    pub average_entry_price: Decimal,
    pub current_quantity: Decimal,
    pub total_realized_pnl: Decimal,
    pub initial_entry_date: NaiveDate,
    pub last_exit_date: Option<NaiveDate>,
    pub setup: Option<String>,
    pub observations: Option<String>,
    pub stop_loss: Option<Decimal>,
    pub stop_gain: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

/// Position detail payload: the aggregate row plus its ledger.
#[derive(Debug, Clone, Serialize)]
pub struct PositionWithOperations {
    #[serde(flatten)]
    pub position: Position,
    pub operations: Vec<Operation>,
}
