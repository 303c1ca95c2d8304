use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::OperationKind;

/// Database row for position_operations table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Operation {
    pub id: Uuid,
    pub position_id: Uuid,
    pub kind: OperationKind,
    pub quantity: Decimal,
    pub price: Decimal,
    pub date: NaiveDate,
    /// Realized result, only set on partial exits.
    pub result: Option<Decimal>,
    /// Insertion sequence; breaks ties between operations on the same date.
    #[serde(skip_serializing)]
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}
