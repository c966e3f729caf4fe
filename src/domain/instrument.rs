//! Instrument identity and trading-calendar classification.

use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable instrument identifier assigned at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Crypto,
    Forex,
}

/// Whether the instrument trades around the clock or inside a daily session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingCalendar {
    /// Trades 24/7; the session is the UTC calendar day.
    Continuous,
    /// Trades between `open` and `close` each day.
    SessionBound { open: NaiveTime, close: NaiveTime },
}

impl TradingCalendar {
    /// Instant at which the session containing (or next following) `t` closes.
    ///
    /// Day orders expire here. A continuous calendar closes its "session" at
    /// the next midnight after `t`.
    pub fn session_close(&self, t: NaiveDateTime) -> NaiveDateTime {
        let next_day = |time: NaiveTime| {
            t.date()
                .checked_add_days(Days::new(1))
                .map(|d| d.and_time(time))
                .unwrap_or(NaiveDateTime::MAX)
        };
        match self {
            TradingCalendar::Continuous => next_day(NaiveTime::MIN),
            TradingCalendar::SessionBound { close, .. } => {
                if t.time() < *close {
                    t.date().and_time(*close)
                } else {
                    next_day(*close)
                }
            }
        }
    }
}

/// An instrument as registered by the host. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub asset_class: AssetClass,
    pub calendar: TradingCalendar,
}

impl Instrument {
    pub fn equity(symbol: &str, open: NaiveTime, close: NaiveTime) -> Self {
        Instrument {
            id: InstrumentId::new(symbol),
            asset_class: AssetClass::Equity,
            calendar: TradingCalendar::SessionBound { open, close },
        }
    }

    pub fn crypto(symbol: &str) -> Self {
        Instrument {
            id: InstrumentId::new(symbol),
            asset_class: AssetClass::Crypto,
            calendar: TradingCalendar::Continuous,
        }
    }
}
