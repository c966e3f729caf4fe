//! Order model: requests, lifecycle states, and time-in-force policies.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::instrument::InstrumentId;

/// Unique order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How long a submitted order remains eligible to fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    /// Fill within the submission step or expire.
    Immediate,
    /// Expires at the close of the current trading session.
    Day,
    /// No automatic expiry; lives until filled or externally cancelled.
    GoodTilCanceled,
    /// Expires at a fixed future instant.
    GoodTilDate(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Market,
    Limit { price: f64 },
}

/// Order lifecycle: Submitted → Active → {Filled | Cancelled | Expired}.
/// Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Active,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

/// What a caller asks the lifecycle manager to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: InstrumentId,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: f64,
    pub kind: OrderKind,
    pub tag: String,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn market(instrument: InstrumentId, quantity: f64, time_in_force: TimeInForce) -> Self {
        OrderRequest {
            instrument,
            quantity,
            kind: OrderKind::Market,
            tag: String::new(),
            time_in_force,
        }
    }

    pub fn limit(
        instrument: InstrumentId,
        quantity: f64,
        price: f64,
        time_in_force: TimeInForce,
    ) -> Self {
        OrderRequest {
            instrument,
            quantity,
            kind: OrderKind::Limit { price },
            tag: String::new(),
            time_in_force,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

/// A live order, owned by the lifecycle manager from submission until a
/// terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub instrument: InstrumentId,
    pub quantity: f64,
    pub kind: OrderKind,
    pub tag: String,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    pub submitted_at: NaiveDateTime,
    /// Precomputed automatic-expiry instant, None for GoodTilCanceled.
    pub expires_at: Option<NaiveDateTime>,
}

/// Asynchronous notification from the host broker.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Filled {
        id: OrderId,
        price: f64,
        at: NaiveDateTime,
    },
    Cancelled {
        id: OrderId,
    },
    Rejected {
        id: OrderId,
        reason: String,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::Filled { id, .. }
            | OrderEvent::Cancelled { id }
            | OrderEvent::Rejected { id, .. } => *id,
        }
    }
}
