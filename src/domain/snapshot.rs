//! Point-in-time market data delivered by the host. Read-only to the core.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::instrument::InstrumentId;

/// A single price/volume observation for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub price: f64,
    pub volume: f64,
}

/// A set of observations keyed by instrument at one simulated instant.
///
/// Snapshots arrive serially; the core processes each to completion before
/// the next is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub at: NaiveDateTime,
    observations: BTreeMap<InstrumentId, Observation>,
}

impl DataSnapshot {
    pub fn new(at: NaiveDateTime) -> Self {
        DataSnapshot {
            at,
            observations: BTreeMap::new(),
        }
    }

    pub fn with_observation(mut self, instrument: InstrumentId, price: f64, volume: f64) -> Self {
        self.observations
            .insert(instrument, Observation { price, volume });
        self
    }

    pub fn observation(&self, instrument: &InstrumentId) -> Option<&Observation> {
        self.observations.get(instrument)
    }

    pub fn price(&self, instrument: &InstrumentId) -> Option<f64> {
        self.observations.get(instrument).map(|o| o.price)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentId> {
        self.observations.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentId, &Observation)> {
        self.observations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
