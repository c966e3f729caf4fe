//! Simulated broker for the CLI session runner and integration tests.
//!
//! Fills market orders at the current price as soon as one is known; limit
//! orders rest until marketable. No commissions, no slippage — execution
//! realism is the host's concern, this adapter only exercises the order
//! lifecycle.

use log::debug;
use std::collections::HashMap;

use crate::domain::instrument::InstrumentId;
use crate::domain::order::{Order, OrderEvent, OrderId, OrderKind};
use crate::domain::snapshot::DataSnapshot;
use crate::ports::broker_port::BrokerPort;

pub struct SimBroker {
    cash: f64,
    positions: HashMap<InstrumentId, f64>,
    prices: HashMap<InstrumentId, f64>,
    resting: Vec<Order>,
    events: Vec<OrderEvent>,
    fill_count: usize,
}

impl SimBroker {
    pub fn new(initial_cash: f64) -> Self {
        SimBroker {
            cash: initial_cash,
            positions: HashMap::new(),
            prices: HashMap::new(),
            resting: Vec::new(),
            events: Vec::new(),
            fill_count: 0,
        }
    }

    /// Feed the broker the same snapshot the strategy sees, then try to
    /// fill resting orders against the new prices.
    pub fn update(&mut self, snapshot: &DataSnapshot) {
        for (instrument, observation) in snapshot.iter() {
            self.prices.insert(instrument.clone(), observation.price);
        }

        let resting = std::mem::take(&mut self.resting);
        for order in resting {
            match self.prices.get(&order.instrument).copied() {
                Some(price) if Self::marketable(&order, price) => {
                    self.execute(&order, price, snapshot.at);
                }
                _ => self.resting.push(order),
            }
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    fn marketable(order: &Order, price: f64) -> bool {
        match order.kind {
            OrderKind::Market => true,
            OrderKind::Limit { price: limit } => {
                if order.quantity > 0.0 {
                    price <= limit
                } else {
                    price >= limit
                }
            }
        }
    }

    fn execute(&mut self, order: &Order, price: f64, at: chrono::NaiveDateTime) {
        *self.positions.entry(order.instrument.clone()).or_insert(0.0) += order.quantity;
        self.cash -= order.quantity * price;
        self.fill_count += 1;
        debug!(
            "filled {} {} x{:+} at {}",
            order.id, order.instrument, order.quantity, price
        );
        self.events.push(OrderEvent::Filled {
            id: order.id,
            price,
            at,
        });
    }
}

impl BrokerPort for SimBroker {
    fn place(&mut self, order: &Order) {
        match self.prices.get(&order.instrument).copied() {
            Some(price) if Self::marketable(order, price) => {
                self.execute(order, price, order.submitted_at);
            }
            _ => self.resting.push(order.clone()),
        }
    }

    fn cancel(&mut self, id: &OrderId) {
        let before = self.resting.len();
        self.resting.retain(|order| order.id != *id);
        if self.resting.len() < before {
            self.events.push(OrderEvent::Cancelled { id: *id });
        }
    }

    fn poll_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    fn holding(&self, instrument: &InstrumentId) -> f64 {
        self.positions.get(instrument).copied().unwrap_or(0.0)
    }

    fn holdings(&self) -> HashMap<InstrumentId, f64> {
        self.positions
            .iter()
            .filter(|(_, quantity)| **quantity != 0.0)
            .map(|(id, quantity)| (id.clone(), *quantity))
            .collect()
    }

    fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .iter()
            .filter_map(|(id, quantity)| self.prices.get(id).map(|price| quantity * price))
            .sum();
        self.cash + position_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderRequest, OrderStatus, TimeInForce};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn btc() -> InstrumentId {
        InstrumentId::new("BTCUSD")
    }

    fn at(hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn order(request: OrderRequest) -> Order {
        Order {
            id: crate::domain::order::OrderId::new(),
            instrument: request.instrument,
            quantity: request.quantity,
            kind: request.kind,
            tag: request.tag,
            time_in_force: request.time_in_force,
            status: OrderStatus::Active,
            submitted_at: at(10),
            expires_at: None,
        }
    }

    fn priced_broker() -> SimBroker {
        let mut broker = SimBroker::new(100_000.0);
        broker.update(&DataSnapshot::new(at(10)).with_observation(btc(), 50_000.0, 1.0));
        broker
    }

    #[test]
    fn market_order_fills_immediately() {
        let mut broker = priced_broker();
        let order = order(OrderRequest::market(btc(), 1.0, TimeInForce::Immediate));
        broker.place(&order);

        let events = broker.poll_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OrderEvent::Filled { price, .. } if price == 50_000.0));
        assert_relative_eq!(broker.holding(&btc()), 1.0);
        assert_relative_eq!(broker.cash(), 50_000.0);
        assert_relative_eq!(broker.equity(), 100_000.0);
    }

    #[test]
    fn market_order_without_price_rests() {
        let mut broker = SimBroker::new(100_000.0);
        let order = order(OrderRequest::market(btc(), 1.0, TimeInForce::GoodTilCanceled));
        broker.place(&order);
        assert!(broker.poll_events().is_empty());

        broker.update(&DataSnapshot::new(at(11)).with_observation(btc(), 40_000.0, 1.0));
        let events = broker.poll_events();
        assert_eq!(events.len(), 1);
        assert_relative_eq!(broker.holding(&btc()), 1.0);
    }

    #[test]
    fn buy_limit_rests_until_price_drops() {
        let mut broker = priced_broker();
        let order = order(OrderRequest::limit(
            btc(),
            1.0,
            45_000.0,
            TimeInForce::GoodTilCanceled,
        ));
        broker.place(&order);
        assert!(broker.poll_events().is_empty());

        broker.update(&DataSnapshot::new(at(11)).with_observation(btc(), 46_000.0, 1.0));
        assert!(broker.poll_events().is_empty());

        broker.update(&DataSnapshot::new(at(12)).with_observation(btc(), 44_500.0, 1.0));
        let events = broker.poll_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OrderEvent::Filled { price, .. } if price == 44_500.0));
    }

    #[test]
    fn sell_limit_fills_at_or_above_limit() {
        let mut broker = priced_broker();
        let order = order(OrderRequest::limit(
            btc(),
            -1.0,
            55_000.0,
            TimeInForce::GoodTilCanceled,
        ));
        broker.place(&order);
        assert!(broker.poll_events().is_empty());

        broker.update(&DataSnapshot::new(at(11)).with_observation(btc(), 55_000.0, 1.0));
        assert_eq!(broker.poll_events().len(), 1);
        assert_relative_eq!(broker.holding(&btc()), -1.0);
    }

    #[test]
    fn cancel_removes_resting_order() {
        let mut broker = priced_broker();
        let order = order(OrderRequest::limit(
            btc(),
            1.0,
            45_000.0,
            TimeInForce::GoodTilCanceled,
        ));
        broker.place(&order);
        broker.cancel(&order.id);

        let events = broker.poll_events();
        assert_eq!(events, vec![OrderEvent::Cancelled { id: order.id }]);

        // Price becomes marketable, but the order is gone.
        broker.update(&DataSnapshot::new(at(11)).with_observation(btc(), 40_000.0, 1.0));
        assert!(broker.poll_events().is_empty());
        assert_relative_eq!(broker.holding(&btc()), 0.0);
    }

    #[test]
    fn cancel_of_filled_order_is_ignored() {
        let mut broker = priced_broker();
        let order = order(OrderRequest::market(btc(), 1.0, TimeInForce::Immediate));
        broker.place(&order);
        broker.poll_events();

        broker.cancel(&order.id);
        assert!(broker.poll_events().is_empty());
    }

    #[test]
    fn holdings_skip_flat_positions() {
        let mut broker = priced_broker();
        let buy = order(OrderRequest::market(btc(), 1.0, TimeInForce::Immediate));
        broker.place(&buy);
        let sell = order(OrderRequest::market(btc(), -1.0, TimeInForce::Immediate));
        broker.place(&sell);

        assert!(broker.holdings().is_empty());
        assert_relative_eq!(broker.equity(), 100_000.0);
        assert_eq!(broker.fill_count(), 2);
    }
}
