//! Indicator engine: rolling indicators keyed by instrument and slot name.
//!
//! A strategy registers named slots (e.g. "fast", "slow") per instrument and
//! feeds every snapshot through [`IndicatorEngine::apply`]. Indicators over
//! the same instrument are independent; the instrument key is the only thing
//! they share.

use std::collections::{BTreeMap, HashMap};

use super::error::AlphacoreError;
use super::indicator::{Indicator, IndicatorKind};
use super::instrument::InstrumentId;
use super::snapshot::DataSnapshot;

#[derive(Debug, Default)]
pub struct IndicatorEngine {
    slots: HashMap<InstrumentId, BTreeMap<String, Indicator>>,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named indicator slot. Re-registering a slot replaces it
    /// and restarts its warm-up.
    pub fn register(&mut self, instrument: InstrumentId, slot: &str, kind: IndicatorKind) {
        self.slots
            .entry(instrument)
            .or_default()
            .insert(slot.to_string(), Indicator::new(kind));
    }

    /// Feed one observation to every slot registered on `instrument`.
    pub fn update(&mut self, instrument: &InstrumentId, observation: f64) {
        if let Some(slots) = self.slots.get_mut(instrument) {
            for indicator in slots.values_mut() {
                indicator.update(observation);
            }
        }
    }

    /// Feed a snapshot through every registered instrument present in it.
    pub fn apply(&mut self, snapshot: &DataSnapshot) {
        for (instrument, observation) in snapshot.iter() {
            self.update(instrument, observation.price);
        }
    }

    /// Current value of a slot. `Err(NotWarm)` until the slot has seen
    /// `period` observations; consuming an unwarm value in a decision is a
    /// caller error, not a condition to recover from.
    pub fn value(&self, instrument: &InstrumentId, slot: &str) -> Result<f64, AlphacoreError> {
        let indicator = self
            .slots
            .get(instrument)
            .and_then(|slots| slots.get(slot))
            .ok_or_else(|| AlphacoreError::UnknownIndicator {
                instrument: instrument.to_string(),
                slot: slot.to_string(),
            })?;

        indicator.value().ok_or_else(|| AlphacoreError::NotWarm {
            instrument: instrument.to_string(),
            slot: slot.to_string(),
            seen: indicator.samples_seen(),
            period: indicator.kind().period(),
        })
    }

    pub fn is_warm(&self, instrument: &InstrumentId, slot: &str) -> bool {
        self.slots
            .get(instrument)
            .and_then(|slots| slots.get(slot))
            .is_some_and(|indicator| indicator.is_warm())
    }

    /// True once every registered slot is warm. An engine with no slots is
    /// trivially warm.
    pub fn all_warm(&self) -> bool {
        self.slots
            .values()
            .flat_map(|slots| slots.values())
            .all(|indicator| indicator.is_warm())
    }
}
