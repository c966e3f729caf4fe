#![allow(dead_code)]

//! Shared helpers for integration tests.

use alphacore::domain::instrument::InstrumentId;
use alphacore::domain::snapshot::DataSnapshot;
use chrono::{NaiveDate, NaiveDateTime};

pub fn btc() -> InstrumentId {
    InstrumentId::new("BTCUSD")
}

pub fn spy() -> InstrumentId {
    InstrumentId::new("SPY")
}

pub fn day(n: u32) -> NaiveDateTime {
    // Days counted from 2024-01-01; n may run past month boundaries.
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .checked_add_days(chrono::Days::new(n as u64 - 1))
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn snapshot(at: NaiveDateTime, instrument: &InstrumentId, price: f64) -> DataSnapshot {
    DataSnapshot::new(at).with_observation(instrument.clone(), price, 1.0)
}

pub fn daily_snapshot(n: u32, instrument: &InstrumentId, price: f64) -> DataSnapshot {
    snapshot(day(n), instrument, price)
}
