use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::LedgerError;

/// Quantity, price and date submitted for an increment, partial exit or the
/// initial entry.
#[derive(Debug, Clone, Copy)]
pub struct OperationInput {
    pub quantity: Decimal,
    pub price: Decimal,
    pub date: NaiveDate,
}

/// Check an operation before it is persisted.
///
/// `entry_date` is the position's initial entry date (absent when the
/// operation *is* the entry). `open_quantity` is the position's current open
/// quantity and is only supplied for partial exits.
pub fn validate_operation_input(
    input: &OperationInput,
    entry_date: Option<NaiveDate>,
    open_quantity: Option<Decimal>,
) -> Result<(), LedgerError> {
    if input.quantity <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(input.quantity));
    }
    if input.price <= Decimal::ZERO {
        return Err(LedgerError::NonPositivePrice(input.price));
    }
    if let Some(entry_date) = entry_date {
        if input.date < entry_date {
            return Err(LedgerError::DateBeforeEntry {
                date: input.date,
                entry_date,
            });
        }
    }
    if let Some(open) = open_quantity {
        if input.quantity > open {
            return Err(LedgerError::ExitExceedsOpen {
                requested: input.quantity,
                open,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn input(quantity: i64, price: i64, date: NaiveDate) -> OperationInput {
        OperationInput {
            quantity: Decimal::from(quantity),
            price: Decimal::from(price),
            date,
        }
    }

    #[test]
    fn test_accepts_valid_increment() {
        assert!(validate_operation_input(&input(10, 5, day(2)), Some(day(1)), None).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_values() {
        assert_eq!(
            validate_operation_input(&input(0, 5, day(2)), None, None),
            Err(LedgerError::NonPositiveQuantity(Decimal::ZERO))
        );
        assert_eq!(
            validate_operation_input(&input(3, -1, day(2)), None, None),
            Err(LedgerError::NonPositivePrice(Decimal::from(-1)))
        );
    }

    #[test]
    fn test_rejects_date_before_entry() {
        let err = validate_operation_input(&input(1, 1, day(1)), Some(day(5)), None).unwrap_err();
        assert!(matches!(err, LedgerError::DateBeforeEntry { .. }));
    }

    #[test]
    fn test_exit_bounded_by_open_quantity() {
        // Exactly the open quantity is allowed
        assert!(validate_operation_input(
            &input(150, 5, day(3)),
            Some(day(1)),
            Some(Decimal::from(150))
        )
        .is_ok());

        let err = validate_operation_input(
            &input(151, 5, day(3)),
            Some(day(1)),
            Some(Decimal::from(150)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::ExitExceedsOpen {
                requested: Decimal::from(151),
                open: Decimal::from(150),
            }
        );
    }
}
