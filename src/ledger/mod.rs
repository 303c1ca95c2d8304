//! Pure position-ledger math: input validation, recalculation of a
//! position's aggregates from its operations, and journal-wide statistics.
//!
//! Nothing in here touches the database; the journal service loads rows,
//! calls into this module and persists what comes back.

pub mod recalc;
pub mod stats;
pub mod validation;

pub use recalc::{recalculate, LedgerOp, Recalculation};
pub use stats::{journal_stats, ClosedTrade, JournalStats};
pub use validation::{validate_operation_input, OperationInput};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger rule violation. Always a caller error, never a persistence failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("quantity must be greater than zero (got {0})")]
    NonPositiveQuantity(Decimal),

    #[error("price must be greater than zero (got {0})")]
    NonPositivePrice(Decimal),

    #[error("operation date {date} is before the position's entry date {entry_date}")]
    DateBeforeEntry {
        date: NaiveDate,
        entry_date: NaiveDate,
    },

    #[error("exit quantity {requested} exceeds open quantity {open}")]
    ExitExceedsOpen { requested: Decimal, open: Decimal },

    #[error("position ledger must start with an entry operation")]
    MissingEntry,

    #[error("position ledger already has an entry operation")]
    DuplicateEntry,

    #[error("quantity or price too large: position value is out of range")]
    Overflow,
}
