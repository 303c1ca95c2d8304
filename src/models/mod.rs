pub mod operation;
pub mod position;

pub use operation::Operation;
pub use position::{Position, PositionWithOperations};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "position_direction", rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Multiplier applied to `(exit - average) * quantity` to get a signed result.
    pub fn pnl_sign(&self) -> Decimal {
        match self {
            Direction::Buy => Decimal::ONE,
            Direction::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" => Some(Direction::Buy),
            "sell" | "short" => Some(Direction::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
        }
    }
}

// ---------------------------------------------------------------------------
// PositionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "position_status", rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Some(PositionStatus::Open),
            "closed" => Some(PositionStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "open"),
            PositionStatus::Closed => write!(f, "closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "operation_kind", rename_all = "snake_case")]
pub enum OperationKind {
    Entry,
    Increment,
    PartialExit,
}

impl OperationKind {
    /// Entry and Increment both add to the open lot.
    pub fn is_entry_like(&self) -> bool {
        matches!(self, OperationKind::Entry | OperationKind::Increment)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Entry => write!(f, "entry"),
            OperationKind::Increment => write!(f, "increment"),
            OperationKind::PartialExit => write!(f, "partial_exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::from_api_str("BUY"), Some(Direction::Buy));
        assert_eq!(Direction::from_api_str(" short "), Some(Direction::Sell));
        assert_eq!(Direction::from_api_str("hold"), None);
    }

    #[test]
    fn test_pnl_sign() {
        assert_eq!(Direction::Buy.pnl_sign(), Decimal::ONE);
        assert_eq!(Direction::Sell.pnl_sign(), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn test_operation_kind_serializes_snake_case() {
        let json = serde_json::to_string(&OperationKind::PartialExit).unwrap();
        assert_eq!(json, "\"partial_exit\"");
        assert!(OperationKind::Increment.is_entry_like());
        assert!(!OperationKind::PartialExit.is_entry_like());
    }
}
