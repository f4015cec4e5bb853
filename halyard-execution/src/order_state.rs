use crate::client::{ExchangeClient, OrderStatus};
use crate::error::ExecutionError;
use chrono::{DateTime, Utc};
use halyard_instrument::{Account, PendingOrder, Side, Symbol, Trade};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Escalations the Order State Machine cannot resolve on its own; the caller is responsible for
/// dispatching a notification (SPEC_FULL.md §4.6) and, on [`OrderStateEvent::ForceExitRequired`],
/// invoking `ExecutionAdapter::force_exit`.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderStateEvent {
    PartialFill { order_id: String, filled_qty: Decimal, requested_qty: Decimal },
    ForceExitRequired { symbol: Symbol, order_id: String },
}

/// Threshold past which a repeatedly-timing-out exit order escalates to a forced market exit
/// (SPEC_FULL.md §4.6).
const FORCED_EXIT_THRESHOLD: u32 = 3;

/// Tracks every order the engine submits through `pending -> (filled | partially_filled |
/// expired | cancelled | rejected) -> terminal`.
///
/// Carries no state of its own: every operation reads and mutates the [`Account`] passed in,
/// matching the teacher's treatment of position bookkeeping as account-owned rather than
/// duplicated inside the execution layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderStateMachine;

impl OrderStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// On submission: adds a [`PendingOrder`] with an absolute timeout deadline.
    pub fn register(&self, account: &mut Account, order: PendingOrder) {
        account.open_orders.insert(order.order_id.clone(), order);
    }

    /// On fill confirmation: records the filled quantity and removes the order once it has
    /// reached a terminal status. Emits a partial-fill event when `filled_qty / requested_qty <
    /// 0.95`.
    pub fn confirm(
        &self,
        account: &mut Account,
        order_id: &str,
        filled_qty: Decimal,
        requested_qty: Decimal,
        terminal: bool,
    ) -> Option<OrderStateEvent> {
        if let Some(pending) = account.open_orders.get_mut(order_id) {
            pending.filled_qty = filled_qty;
        }
        if terminal {
            account.open_orders.remove(order_id);
        }
        if requested_qty > Decimal::ZERO && filled_qty / requested_qty < Decimal::new(95, 2) {
            return Some(OrderStateEvent::PartialFill {
                order_id: order_id.to_string(),
                filled_qty,
                requested_qty,
            });
        }
        None
    }

    /// Per-tick reconciliation: queries the exchange for every order past its deadline.
    /// Identical startup behaviour (`scanOpenOrders`, SPEC_FULL.md §4.6) reuses this directly —
    /// any pending order older than its deadline is, by definition, orphaned the same way
    /// whether that deadline was crossed mid-process or across a restart.
    pub async fn check_timeouts(
        &self,
        account: &mut Account,
        client: &dyn ExchangeClient,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderStateEvent>, ExecutionError> {
        let due: Vec<PendingOrder> = account
            .open_orders
            .values()
            .filter(|order| order.is_expired(now))
            .cloned()
            .collect();

        let mut events = Vec::new();
        for order in due {
            let report = match client.get_order(&order.symbol, &order.order_id).await {
                Ok(report) => report,
                Err(err) => {
                    warn!(order_id = %order.order_id, %err, "failed to query order state during timeout check");
                    continue;
                }
            };
            match report.status {
                OrderStatus::Filled => {
                    if let Some(event) = self.confirm(account, &order.order_id, report.executed_qty, order.requested_qty, true)
                    {
                        events.push(event);
                    }
                }
                OrderStatus::PartiallyFilled => {
                    if let Some(event) =
                        self.confirm(account, &order.order_id, report.executed_qty, order.requested_qty, false)
                    {
                        events.push(event);
                    }
                }
                OrderStatus::New => {
                    let _ = client.cancel_order(&order.symbol, &order.order_id).await;
                    if order.is_exit {
                        if let Some(position) = account.positions.get_mut(&order.symbol) {
                            position.exit_timeout_count += 1;
                            if position.exit_timeout_count >= FORCED_EXIT_THRESHOLD {
                                events.push(OrderStateEvent::ForceExitRequired {
                                    symbol: order.symbol.clone(),
                                    order_id: order.order_id.clone(),
                                });
                            }
                        }
                    }
                    account.open_orders.remove(&order.order_id);
                }
                OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Rejected => {
                    account.open_orders.remove(&order.order_id);
                }
            }
        }
        Ok(events)
    }

    /// Queries every `exchange_sl_order_id` on a held position; a FILLED native stop closes the
    /// local position at the reported average fill price (falling back to the limit price) and
    /// records the realised loss (SPEC_FULL.md §4.6).
    pub async fn sync_exchange_stop_losses(
        &self,
        account: &mut Account,
        client: &dyn ExchangeClient,
        now: DateTime<Utc>,
    ) -> Result<(), ExecutionError> {
        let symbols: Vec<Symbol> = account
            .positions
            .iter()
            .filter(|(_, position)| position.exchange_sl_order_id.is_some())
            .map(|(symbol, _)| symbol.clone())
            .collect();

        for symbol in symbols {
            let Some(position) = account.positions.get(&symbol) else { continue };
            let Some(order_id) = position.exchange_sl_order_id.clone() else { continue };
            let report = match client.get_order(&symbol, &order_id).await {
                Ok(report) => report,
                Err(err) => {
                    warn!(%symbol, %err, "failed to sync exchange stop loss");
                    continue;
                }
            };
            if report.status != OrderStatus::Filled {
                continue;
            }
            let Some(position) = account.positions.remove(&symbol) else { continue };
            let fill_price = report.average_fill_price();
            let proceeds = fill_price * position.quantity;
            let cost_basis = position.entry_price * position.quantity;
            let (credit, pnl, side) = match position.side {
                Side::Long => (proceeds, proceeds - cost_basis, Side::Long),
                Side::Short => {
                    let margin = position.margin_usdt.unwrap_or_default();
                    let pnl = (position.entry_price - fill_price) * position.quantity;
                    (margin + pnl, pnl, Side::Short)
                }
            };
            account.credit(credit);
            let cost_basis = position.entry_price * position.quantity;
            let pnl_percent = if cost_basis > Decimal::ZERO { pnl / cost_basis } else { Decimal::ZERO };
            account.push_trade(Trade {
                id: order_id,
                symbol: symbol.clone(),
                side,
                quantity: position.quantity,
                price: fill_price,
                usdt_amount: proceeds,
                fee: Decimal::ZERO,
                slippage: Decimal::ZERO,
                timestamp: now,
                reason: "stop_loss_exchange".into(),
                pnl: Some(pnl),
                pnl_percent: Some(pnl_percent),
            });
            info!(%symbol, %fill_price, %pnl, "native stop loss filled, position closed locally");
        }
        Ok(())
    }
}
