use chrono::{DateTime, Utc};
use halyard_execution::ExchangePosition;
use halyard_instrument::{Account, OrderSide, Position, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Stop-loss/take-profit band synthesized around the entry price for a position the auto-sync
/// path creates. The reconciler has no risk config to draw real levels from, so this picks a band
/// wide enough to never fire on its own; the next Exit Engine pass still applies ROI/time-stop
/// exits and the position is otherwise indistinguishable from a locally-opened one.
const AUTO_SYNC_BAND_PERCENT: Decimal = Decimal::from_parts(50, 0, 0, false, 2); // 0.50

/// How far a local/exchange quantity has to diverge before the mismatch is escalated from a
/// warning to a critical finding (SPEC_FULL.md §4.8).
const CRITICAL_QTY_DIVERGENCE: Decimal = Decimal::from_parts(10, 0, 0, false, 2); // 0.10
const WARNING_QTY_DIVERGENCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Discrepancy {
    /// Open locally but the exchange reports no position for the symbol.
    MissingOnExchange { symbol: Symbol, local_qty: Decimal },
    /// The exchange reports a position the engine has no local record of.
    MissingLocally { symbol: Symbol, exchange_qty: Decimal },
    /// Both sides hold the symbol but the quantities disagree.
    QtyMismatch { symbol: Symbol, local_qty: Decimal, exchange_qty: Decimal, relative_diff: Decimal },
}

impl Discrepancy {
    pub fn severity(&self) -> Severity {
        match self {
            Discrepancy::MissingOnExchange { .. } | Discrepancy::MissingLocally { .. } => Severity::Critical,
            Discrepancy::QtyMismatch { relative_diff, .. } => {
                if *relative_diff >= CRITICAL_QTY_DIVERGENCE {
                    Severity::Critical
                } else if *relative_diff >= WARNING_QTY_DIVERGENCE {
                    Severity::Warning
                } else {
                    Severity::Ok
                }
            }
        }
    }
}

/// Outcome of one reconciliation pass (SPEC_FULL.md §4.8).
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn overall_severity(&self) -> Severity {
        self.discrepancies
            .iter()
            .map(Discrepancy::severity)
            .max_by_key(|s| match s {
                Severity::Ok => 0,
                Severity::Warning => 1,
                Severity::Critical => 2,
            })
            .unwrap_or(Severity::Ok)
    }
}

/// Compares local position state against the exchange's own futures-position report
/// (SPEC_FULL.md §4.8). Paper/spot scenarios never call this — there is no independent
/// exchange-side ledger to drift from.
#[derive(Debug, Default)]
pub struct PositionReconciler;

impl PositionReconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile(&self, account: &Account, exchange_positions: &[ExchangePosition]) -> ReconciliationReport {
        let exchange_by_symbol: HashMap<&Symbol, &ExchangePosition> =
            exchange_positions.iter().map(|p| (&p.symbol, p)).collect();

        let mut discrepancies = Vec::new();

        for (symbol, position) in &account.positions {
            match exchange_by_symbol.get(symbol) {
                None => discrepancies.push(Discrepancy::MissingOnExchange { symbol: symbol.clone(), local_qty: position.quantity }),
                Some(exchange_position) => {
                    let diff = (position.quantity - exchange_position.quantity).abs();
                    if diff > Decimal::ZERO && position.quantity > Decimal::ZERO {
                        let relative_diff = diff / position.quantity;
                        if relative_diff >= WARNING_QTY_DIVERGENCE {
                            discrepancies.push(Discrepancy::QtyMismatch {
                                symbol: symbol.clone(),
                                local_qty: position.quantity,
                                exchange_qty: exchange_position.quantity,
                                relative_diff,
                            });
                        }
                    }
                }
            }
        }

        for exchange_position in exchange_positions {
            if !account.positions.contains_key(&exchange_position.symbol) {
                discrepancies.push(Discrepancy::MissingLocally {
                    symbol: exchange_position.symbol.clone(),
                    exchange_qty: exchange_position.quantity,
                });
            }
        }

        if !discrepancies.is_empty() {
            warn!(count = discrepancies.len(), "position reconciliation found discrepancies");
        }
        ReconciliationReport { discrepancies }
    }

    /// As [`Self::reconcile`], but additionally incorporates `MissingLocally` exchange positions
    /// into `account` (SPEC_FULL.md §4.8 "optional auto-sync mode"). The report returned still
    /// reflects the discrepancies found against the pre-sync account, so a caller can tell what
    /// was just synced; re-running against the now-synced account finds no more `MissingLocally`
    /// discrepancies for the same exchange state, which is what makes a second auto-sync pass a
    /// no-op.
    pub fn reconcile_with_auto_sync(
        &self,
        account: &mut Account,
        exchange_positions: &[ExchangePosition],
        now: DateTime<Utc>,
    ) -> ReconciliationReport {
        let report = self.reconcile(account, exchange_positions);
        for discrepancy in &report.discrepancies {
            if let Discrepancy::MissingLocally { symbol, exchange_qty } = discrepancy {
                let Some(exchange_position) = exchange_positions.iter().find(|p| &p.symbol == symbol) else { continue };
                if let Some(position) = synthesize_position(exchange_position, *exchange_qty, now) {
                    account.positions.insert(symbol.clone(), position);
                }
            }
        }
        report
    }
}

/// Builds a [`Position`] from an exchange-reported futures position for the auto-sync path.
/// Returns `None` only if the synthesized stop-loss/take-profit band fails `Position`'s own
/// invariant check, which cannot happen for a positive `entry_price` and the fixed band above.
fn synthesize_position(exchange_position: &ExchangePosition, quantity: Decimal, now: DateTime<Utc>) -> Option<Position> {
    let entry_price = exchange_position.entry_price;
    let symbol = exchange_position.symbol.clone();
    match exchange_position.side {
        OrderSide::Buy => Position::open_long(
            symbol,
            quantity,
            entry_price,
            now,
            entry_price * (Decimal::ONE - AUTO_SYNC_BAND_PERCENT),
            entry_price * (Decimal::ONE + AUTO_SYNC_BAND_PERCENT),
        )
        .ok(),
        OrderSide::Sell => Position::open_short(
            symbol,
            quantity,
            entry_price,
            now,
            entry_price * (Decimal::ONE + AUTO_SYNC_BAND_PERCENT),
            entry_price * (Decimal::ONE - AUTO_SYNC_BAND_PERCENT),
            Decimal::ZERO,
        )
        .ok(),
    }
}
