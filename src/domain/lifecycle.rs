//! Order lifecycle management: rebalancing deltas, time-in-force expiry,
//! shutdown liquidation.
//!
//! The manager owns every order from submission until a terminal state. The
//! host broker only reports events; expiry policy is evaluated here, once
//! per step.

use chrono::NaiveDateTime;
use log::{debug, warn};
use std::collections::HashMap;

use super::error::AlphacoreError;
use super::instrument::{InstrumentId, TradingCalendar};
use super::order::{Order, OrderEvent, OrderId, OrderRequest, OrderStatus, TimeInForce};
use super::snapshot::DataSnapshot;
use super::weights::TargetWeight;

/// Weight deltas at or below this are treated as "already at target" and
/// produce no order.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Quantities below this are noise from float division, not trades.
const MIN_QUANTITY: f64 = 1e-9;

#[derive(Debug, Default)]
pub struct OrderLifecycleManager {
    orders: HashMap<OrderId, Order>,
    calendars: HashMap<InstrumentId, TradingCalendar>,
}

impl OrderLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_instrument(&mut self, instrument: InstrumentId, calendar: TradingCalendar) {
        self.calendars.insert(instrument, calendar);
    }

    /// Orders needed to move current holdings toward the target weights.
    ///
    /// Per instrument: skip when an order is already in flight, when the
    /// weight delta is inside [`WEIGHT_TOLERANCE`] (the "already invested"
    /// guard), or when the snapshot carries no price to size against.
    pub fn rebalance(
        &self,
        holdings: &HashMap<InstrumentId, f64>,
        equity: f64,
        targets: &[TargetWeight],
        snapshot: &DataSnapshot,
        time_in_force: TimeInForce,
    ) -> Vec<OrderRequest> {
        if equity <= 0.0 {
            warn!("equity {equity} is not positive, skipping rebalance");
            return Vec::new();
        }

        let mut requests = Vec::new();
        for target in targets {
            if self.has_open_order(&target.instrument) {
                debug!("{}: order in flight, skipping", target.instrument);
                continue;
            }
            let Some(price) = snapshot.price(&target.instrument) else {
                debug!("{}: no price in snapshot, skipping", target.instrument);
                continue;
            };

            let held = holdings.get(&target.instrument).copied().unwrap_or(0.0);
            let current_weight = held * price / equity;
            let delta = target.weight - current_weight;
            if delta.abs() <= WEIGHT_TOLERANCE {
                debug!(
                    "{}: already at target ({:.4} vs {:.4}), no order",
                    target.instrument, current_weight, target.weight
                );
                continue;
            }

            let quantity = delta * equity / price;
            if quantity.abs() < MIN_QUANTITY {
                continue;
            }
            requests.push(
                OrderRequest::market(target.instrument.clone(), quantity, time_in_force)
                    .with_tag("rebalance"),
            );
        }
        requests
    }

    /// Validate and record a new order. `GoodTilDate` with an expiry at or
    /// before `now` is rejected here; no order is created.
    pub fn submit(
        &mut self,
        request: OrderRequest,
        now: NaiveDateTime,
    ) -> Result<Order, AlphacoreError> {
        let expires_at = match request.time_in_force {
            TimeInForce::Immediate => Some(now),
            TimeInForce::Day => {
                let calendar = self.calendars.get(&request.instrument).ok_or_else(|| {
                    AlphacoreError::UnknownInstrument {
                        symbol: request.instrument.to_string(),
                    }
                })?;
                Some(calendar.session_close(now))
            }
            TimeInForce::GoodTilCanceled => None,
            TimeInForce::GoodTilDate(expiry) => {
                if expiry <= now {
                    return Err(AlphacoreError::InvalidTimeInForce { expiry, now });
                }
                Some(expiry)
            }
        };

        let order = Order {
            id: OrderId::new(),
            instrument: request.instrument,
            quantity: request.quantity,
            kind: request.kind,
            tag: request.tag,
            time_in_force: request.time_in_force,
            status: OrderStatus::Submitted,
            submitted_at: now,
            expires_at,
        };
        debug!(
            "submitted {} {} x{:+} ({:?})",
            order.id, order.instrument, order.quantity, order.time_in_force
        );
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    /// Mark a submitted order as accepted by the broker.
    pub fn activate(&mut self, id: &OrderId) {
        if let Some(order) = self.orders.get_mut(id) {
            if order.status == OrderStatus::Submitted {
                order.status = OrderStatus::Active;
            }
        }
    }

    /// Apply broker events, then evaluate time-in-force expiry, once per
    /// step. Returns every state transition made.
    pub fn tick(
        &mut self,
        now: NaiveDateTime,
        events: Vec<OrderEvent>,
    ) -> Vec<(OrderId, OrderStatus)> {
        let mut transitions = Vec::new();

        for event in events {
            let id = event.order_id();
            let Some(order) = self.orders.get_mut(&id) else {
                debug!("event for unknown order {id}, ignoring");
                continue;
            };
            if order.status.is_terminal() {
                debug!("event for terminal order {id}, ignoring");
                continue;
            }
            let next = match event {
                OrderEvent::Filled { price, .. } => {
                    debug!("{id} filled at {price}");
                    OrderStatus::Filled
                }
                OrderEvent::Cancelled { .. } => OrderStatus::Cancelled,
                OrderEvent::Rejected { reason, .. } => {
                    warn!("{id} rejected by host: {reason}");
                    OrderStatus::Cancelled
                }
            };
            order.status = next;
            transitions.push((id, next));
        }

        for order in self.orders.values_mut() {
            if order.status.is_terminal() {
                continue;
            }
            let expired = match order.time_in_force {
                TimeInForce::Immediate => true,
                TimeInForce::Day | TimeInForce::GoodTilDate(_) => {
                    order.expires_at.is_some_and(|expiry| now >= expiry)
                }
                TimeInForce::GoodTilCanceled => false,
            };
            if expired {
                debug!("{} expired ({:?})", order.id, order.time_in_force);
                order.status = OrderStatus::Expired;
                transitions.push((order.id, OrderStatus::Expired));
            }
        }

        transitions
    }

    /// Flattening orders for shutdown liquidation: one Immediate market
    /// order per instrument with non-zero holdings, quantity the exact
    /// negative of the holding. Bypasses target-weight computation.
    pub fn liquidate(&self, holdings: &HashMap<InstrumentId, f64>) -> Vec<OrderRequest> {
        let mut requests: Vec<OrderRequest> = holdings
            .iter()
            .filter(|(_, quantity)| **quantity != 0.0)
            .map(|(instrument, quantity)| {
                OrderRequest::market(instrument.clone(), -quantity, TimeInForce::Immediate)
                    .with_tag("liquidation")
            })
            .collect();
        requests.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        requests
    }

    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn has_open_order(&self, instrument: &InstrumentId) -> bool {
        self.orders
            .values()
            .any(|order| &order.instrument == instrument && !order.status.is_terminal())
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| !o.status.is_terminal())
    }

    pub fn all_terminal(&self) -> bool {
        self.orders.values().all(|o| o.status.is_terminal())
    }

    pub fn count_with_status(&self, status: OrderStatus) -> usize {
        self.orders.values().filter(|o| o.status == status).count()
    }
}
