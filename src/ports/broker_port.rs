//! Broker access port.
//!
//! The core submits orders and receives asynchronous fill/cancel/reject
//! notifications by polling once per step; holdings and equity are
//! queryable at any time. Host-side failures are opaque — an order that
//! draws no event simply remains non-terminal and is re-evaluated next
//! step. The core never retries a submission.

use std::collections::HashMap;

use crate::domain::instrument::InstrumentId;
use crate::domain::order::{Order, OrderEvent, OrderId};

pub trait BrokerPort {
    /// Hand an order to the host for execution.
    fn place(&mut self, order: &Order);

    /// Ask the host to stop working an order (e.g. after expiry).
    fn cancel(&mut self, id: &OrderId);

    /// Drain notifications accumulated since the last poll.
    fn poll_events(&mut self) -> Vec<OrderEvent>;

    /// Signed quantity currently held in one instrument.
    fn holding(&self, instrument: &InstrumentId) -> f64;

    /// Signed quantities for every instrument with a position.
    fn holdings(&self) -> HashMap<InstrumentId, f64>;

    /// Total portfolio value (cash plus positions at market).
    fn equity(&self) -> f64;
}
