use rust_decimal::Decimal;
use serde::Serialize;

/// Realized outcome of one closed position.
#[derive(Debug, Clone, Copy)]
pub struct ClosedTrade {
    pub realized_pnl: Decimal,
}

/// Dashboard metrics over a user's journal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalStats {
    pub open_positions: i64,
    pub closed_positions: i64,
    pub total_realized_pnl: Decimal,
    pub win_count: i64,
    pub loss_count: i64,
    pub win_rate: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    /// Gross wins over gross losses; `None` while there are no losses.
    pub profit_factor: Option<Decimal>,
    pub best_trade: Decimal,
    pub worst_trade: Decimal,
}

/// Fold closed positions into journal metrics.
///
/// `total_realized_pnl` is passed in separately because partial exits on
/// still-open positions count towards it but not towards win/loss stats.
pub fn journal_stats(
    closed: &[ClosedTrade],
    open_positions: i64,
    total_realized_pnl: Decimal,
) -> JournalStats {
    let mut win_count = 0i64;
    let mut loss_count = 0i64;
    let mut gross_win = Decimal::ZERO;
    let mut gross_loss = Decimal::ZERO;
    let mut best = None::<Decimal>;
    let mut worst = None::<Decimal>;

    for trade in closed {
        let pnl = trade.realized_pnl;
        if pnl > Decimal::ZERO {
            win_count += 1;
            gross_win += pnl;
        } else {
            loss_count += 1;
            gross_loss += pnl;
        }
        best = Some(best.map_or(pnl, |b| b.max(pnl)));
        worst = Some(worst.map_or(pnl, |w| w.min(pnl)));
    }

    let closed_positions = closed.len() as i64;
    let win_rate = if closed_positions > 0 {
        Decimal::from(win_count) / Decimal::from(closed_positions)
    } else {
        Decimal::ZERO
    };
    let average_win = if win_count > 0 {
        gross_win / Decimal::from(win_count)
    } else {
        Decimal::ZERO
    };
    let average_loss = if loss_count > 0 {
        gross_loss / Decimal::from(loss_count)
    } else {
        Decimal::ZERO
    };
    let profit_factor = if gross_loss.is_zero() {
        None
    } else {
        Some(gross_win / gross_loss.abs())
    };

    JournalStats {
        open_positions,
        closed_positions,
        total_realized_pnl,
        win_count,
        loss_count,
        win_rate,
        average_win,
        average_loss,
        profit_factor,
        best_trade: best.unwrap_or(Decimal::ZERO),
        worst_trade: worst.unwrap_or(Decimal::ZERO),
    }
}
