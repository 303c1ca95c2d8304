use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::LedgerError;
use crate::models::{Direction, Operation, OperationKind, PositionStatus};

/// The fields of an operation the ledger replay needs.
#[derive(Debug, Clone)]
pub struct LedgerOp {
    pub id: Uuid,
    pub kind: OperationKind,
    pub quantity: Decimal,
    pub price: Decimal,
    pub date: NaiveDate,
    pub seq: i64,
}

impl From<&Operation> for LedgerOp {
    fn from(op: &Operation) -> Self {
        Self {
            id: op.id,
            kind: op.kind,
            quantity: op.quantity,
            price: op.price,
            date: op.date,
            seq: op.seq,
        }
    }
}

/// Position aggregates derived from a full ledger replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Recalculation {
    pub average_entry_price: Decimal,
    pub current_quantity: Decimal,
    pub total_realized_pnl: Decimal,
    pub initial_entry_date: NaiveDate,
    pub last_exit_date: Option<NaiveDate>,
    pub status: PositionStatus,
    /// Realized result of every partial exit, in ledger order.
    pub exit_results: Vec<(Uuid, Decimal)>,
}

/// Replay a position's operations in ledger order (date, then insertion
/// sequence) and derive its aggregates.
///
/// Returns `Ok(None)` when there are no operations left: a position without
/// operations must not exist.
pub fn recalculate(
    direction: Direction,
    operations: &[LedgerOp],
) -> Result<Option<Recalculation>, LedgerError> {
    if operations.is_empty() {
        return Ok(None);
    }

    let mut ordered: Vec<&LedgerOp> = operations.iter().collect();
    ordered.sort_by_key(|op| (op.date, op.seq));

    let first = ordered[0];
    if first.kind != OperationKind::Entry {
        return Err(LedgerError::MissingEntry);
    }

    let sign = direction.pnl_sign();
    let mut running_cost = Decimal::ZERO;
    let mut running_qty = Decimal::ZERO;
    let mut average = Decimal::ZERO;
    let mut total_pnl = Decimal::ZERO;
    let mut last_exit_date = None;
    let mut exit_results = Vec::new();

    for (idx, op) in ordered.iter().enumerate() {
        if op.kind.is_entry_like() {
            if op.kind == OperationKind::Entry && idx > 0 {
                return Err(LedgerError::DuplicateEntry);
            }
            let cost = op.price.checked_mul(op.quantity).ok_or(LedgerError::Overflow)?;
            running_cost = running_cost.checked_add(cost).ok_or(LedgerError::Overflow)?;
            running_qty = running_qty
                .checked_add(op.quantity)
                .ok_or(LedgerError::Overflow)?;
            // running_qty > 0 here: quantities are validated positive
            if !running_qty.is_zero() {
                average = running_cost
                    .checked_div(running_qty)
                    .ok_or(LedgerError::Overflow)?;
            }
        } else {
            if running_qty.is_zero() || op.quantity > running_qty {
                return Err(LedgerError::ExitExceedsOpen {
                    requested: op.quantity,
                    open: running_qty,
                });
            }
            let result = op
                .price
                .checked_sub(average)
                .and_then(|diff| diff.checked_mul(op.quantity))
                .and_then(|pnl| pnl.checked_mul(sign))
                .ok_or(LedgerError::Overflow)?;
            total_pnl = total_pnl.checked_add(result).ok_or(LedgerError::Overflow)?;
            running_qty -= op.quantity;
            running_cost = average
                .checked_mul(running_qty)
                .ok_or(LedgerError::Overflow)?;
            last_exit_date = Some(op.date);
            exit_results.push((op.id, result));
        }
    }

    let status = if running_qty.is_zero() {
        PositionStatus::Closed
    } else {
        PositionStatus::Open
    };

    Ok(Some(Recalculation {
        average_entry_price: average,
        current_quantity: running_qty,
        total_realized_pnl: total_pnl,
        initial_entry_date: first.date,
        last_exit_date,
        status,
        exit_results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    struct Ledger {
        ops: Vec<LedgerOp>,
    }

    impl Ledger {
        fn new() -> Self {
            Self { ops: Vec::new() }
        }

        fn push(&mut self, kind: OperationKind, qty: i64, price: i64, date: NaiveDate) -> Uuid {
            let id = Uuid::new_v4();
            let seq = self.ops.len() as i64 + 1;
            self.ops.push(LedgerOp {
                id,
                kind,
                quantity: Decimal::from(qty),
                price: Decimal::from(price),
                date,
                seq,
            });
            id
        }

        fn remove(&mut self, id: Uuid) {
            self.ops.retain(|op| op.id != id);
        }
    }

    /// Small deterministic generator so sequences are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next_in(&mut self, lo: i64, hi: i64) -> i64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            lo + ((self.0 >> 33) as i64).rem_euclid(hi - lo + 1)
        }
    }

    #[test]
    fn test_worked_example_buy() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 100, 10, day(1));
        ledger.push(OperationKind::Increment, 100, 20, day(2));

        let r = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(r.average_entry_price, Decimal::from(15));
        assert_eq!(r.current_quantity, Decimal::from(200));
        assert_eq!(r.status, PositionStatus::Open);

        let first_exit = ledger.push(OperationKind::PartialExit, 50, 25, day(3));
        let r = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(r.exit_results, vec![(first_exit, Decimal::from(500))]);
        assert_eq!(r.current_quantity, Decimal::from(150));
        assert_eq!(r.average_entry_price, Decimal::from(15));

        ledger.push(OperationKind::PartialExit, 150, 5, day(4));
        let r = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(r.exit_results[1].1, Decimal::from(-1500));
        assert_eq!(r.current_quantity, Decimal::ZERO);
        assert_eq!(r.status, PositionStatus::Closed);
        assert_eq!(r.total_realized_pnl, Decimal::from(-1000));
        assert_eq!(r.last_exit_date, Some(day(4)));
        // Average of the closed lot is kept
        assert_eq!(r.average_entry_price, Decimal::from(15));
    }

    #[test]
    fn test_sell_direction_inverts_result() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 100, 50, day(1));
        ledger.push(OperationKind::PartialExit, 40, 45, day(2));

        let r = recalculate(Direction::Sell, &ledger.ops).unwrap().unwrap();
        // Short covered 5 lower: profit
        assert_eq!(r.total_realized_pnl, Decimal::from(200));
        assert_eq!(r.current_quantity, Decimal::from(60));
    }

    #[test]
    fn test_empty_ledger_yields_none() {
        assert_eq!(recalculate(Direction::Buy, &[]).unwrap(), None);
    }

    #[test]
    fn test_deleting_only_operation_leaves_nothing() {
        let mut ledger = Ledger::new();
        let entry = ledger.push(OperationKind::Entry, 10, 10, day(1));
        ledger.remove(entry);
        assert!(recalculate(Direction::Buy, &ledger.ops).unwrap().is_none());
    }

    #[test]
    fn test_average_is_weighted_mean_of_entries() {
        let mut rng = Lcg(42);
        for _ in 0..50 {
            let mut ledger = Ledger::new();
            let mut cost = Decimal::ZERO;
            let mut qty = Decimal::ZERO;
            let n = rng.next_in(1, 12);
            for i in 0..n {
                let q = rng.next_in(1, 500);
                let p = rng.next_in(1, 300);
                let kind = if i == 0 {
                    OperationKind::Entry
                } else {
                    OperationKind::Increment
                };
                ledger.push(kind, q, p, day(1 + i as u32));
                cost += Decimal::from(q * p);
                qty += Decimal::from(q);
            }

            let r = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
            assert_eq!(r.average_entry_price, cost / qty);
            assert_eq!(r.current_quantity, qty);
            assert_eq!(r.total_realized_pnl, Decimal::ZERO);
        }
    }

    #[test]
    fn test_exit_results_sum_to_total() {
        let mut rng = Lcg(7);
        for direction in [Direction::Buy, Direction::Sell] {
            for _ in 0..50 {
                let mut ledger = Ledger::new();
                let mut open = rng.next_in(10, 1000);
                ledger.push(OperationKind::Entry, open, rng.next_in(1, 200), day(1));

                for d in 2..20u32 {
                    if rng.next_in(0, 2) == 0 {
                        let q = rng.next_in(1, 300);
                        ledger.push(OperationKind::Increment, q, rng.next_in(1, 200), day(d));
                        open += q;
                    } else if open > 0 {
                        let q = rng.next_in(1, open);
                        ledger.push(OperationKind::PartialExit, q, rng.next_in(1, 200), day(d));
                        open -= q;
                    }
                }

                let r = recalculate(direction, &ledger.ops).unwrap().unwrap();
                let sum: Decimal = r.exit_results.iter().map(|(_, pnl)| *pnl).sum();
                assert_eq!(sum, r.total_realized_pnl);
                assert_eq!(r.current_quantity, Decimal::from(open));
                assert!(r.current_quantity >= Decimal::ZERO);
                assert_eq!(r.status == PositionStatus::Closed, open == 0);
            }
        }
    }

    #[test]
    fn test_exit_larger_than_open_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 100, 10, day(1));
        ledger.push(OperationKind::PartialExit, 101, 12, day(2));

        let err = recalculate(Direction::Buy, &ledger.ops).unwrap_err();
        assert_eq!(
            err,
            LedgerError::ExitExceedsOpen {
                requested: Decimal::from(101),
                open: Decimal::from(100),
            }
        );
    }

    #[test]
    fn test_removing_increment_can_invalidate_later_exit() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 100, 10, day(1));
        let inc = ledger.push(OperationKind::Increment, 100, 20, day(2));
        ledger.push(OperationKind::PartialExit, 150, 25, day(3));

        ledger.remove(inc);
        assert!(matches!(
            recalculate(Direction::Buy, &ledger.ops),
            Err(LedgerError::ExitExceedsOpen { .. })
        ));
    }

    #[test]
    fn test_removing_non_entry_ops_restores_entry_state() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 80, 12, day(1));
        let after_entry = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();

        let a = ledger.push(OperationKind::Increment, 20, 17, day(2));
        let b = ledger.push(OperationKind::PartialExit, 30, 20, day(3));
        let c = ledger.push(OperationKind::PartialExit, 70, 9, day(4));
        let closed = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);

        // Removing the final exit reopens the position
        ledger.remove(c);
        let reopened = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(reopened.status, PositionStatus::Open);
        assert_eq!(reopened.current_quantity, Decimal::from(70));

        ledger.remove(b);
        ledger.remove(a);
        let restored = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(restored, after_entry);
        assert_eq!(restored.last_exit_date, None);
    }

    #[test]
    fn test_same_day_operations_apply_in_insertion_order() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 100, 10, day(1));
        // Exit then increment on the same day: exit must see avg 10
        let exit = ledger.push(OperationKind::PartialExit, 100, 12, day(2));
        ledger.push(OperationKind::Increment, 50, 30, day(2));

        // Feed them out of order; ledger order is restored internally
        ledger.ops.reverse();
        let r = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(r.exit_results, vec![(exit, Decimal::from(200))]);
        assert_eq!(r.average_entry_price, Decimal::from(30));
        assert_eq!(r.current_quantity, Decimal::from(50));
        assert_eq!(r.status, PositionStatus::Open);
    }

    #[test]
    fn test_backdated_exit_uses_average_at_its_date() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 100, 10, day(1));
        ledger.push(OperationKind::Increment, 100, 20, day(5));
        // Recorded later but dated before the increment
        ledger.push(OperationKind::PartialExit, 50, 12, day(3));

        let r = recalculate(Direction::Buy, &ledger.ops).unwrap().unwrap();
        assert_eq!(r.total_realized_pnl, Decimal::from(100));
        // 50@10 left over blended with 100@20
        assert_eq!(r.current_quantity, Decimal::from(150));
        assert_eq!(r.average_entry_price, Decimal::from(2500) / Decimal::from(150));
    }

    #[test]
    fn test_oversized_values_report_overflow() {
        let huge = Decimal::from(1_000_000_000_000_000i64);
        let ops = vec![LedgerOp {
            id: Uuid::new_v4(),
            kind: OperationKind::Entry,
            quantity: huge,
            price: huge,
            date: day(1),
            seq: 1,
        }];

        assert_eq!(recalculate(Direction::Buy, &ops), Err(LedgerError::Overflow));
    }

    #[test]
    fn test_oversized_exit_result_reports_overflow() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 1_000_000_000_000, 1, day(1));
        ledger.push(OperationKind::PartialExit, 1_000_000_000_000, 1, day(2));
        ledger.ops[1].price = Decimal::MAX;

        assert_eq!(
            recalculate(Direction::Sell, &ledger.ops),
            Err(LedgerError::Overflow)
        );
    }

    #[test]
    fn test_ledger_must_start_with_single_entry() {
        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Increment, 10, 10, day(1));
        assert_eq!(
            recalculate(Direction::Buy, &ledger.ops),
            Err(LedgerError::MissingEntry)
        );

        let mut ledger = Ledger::new();
        ledger.push(OperationKind::Entry, 10, 10, day(1));
        ledger.push(OperationKind::Entry, 10, 10, day(2));
        assert_eq!(
            recalculate(Direction::Buy, &ledger.ops),
            Err(LedgerError::DuplicateEntry)
        );
    }
}
