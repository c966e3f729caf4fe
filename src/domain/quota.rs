//! Lifetime emission quota over insights.
//!
//! The quota is a soft cap: once `max` insights have been accepted, further
//! emissions are dropped silently. The counter never resets; a reset is a
//! new strategy instance.

use log::debug;
use std::collections::HashMap;

use super::insight::Insight;
use super::instrument::InstrumentId;

#[derive(Debug)]
pub struct InsightQuota {
    max: usize,
    emitted: usize,
    /// Latest accepted insight per instrument; a newer insight supersedes
    /// the previous one for the same instrument.
    active: HashMap<InstrumentId, Insight>,
}

impl InsightQuota {
    pub fn new(max: usize) -> Self {
        InsightQuota {
            max,
            emitted: 0,
            active: HashMap::new(),
        }
    }

    /// Record the insight if the quota allows it. Returns false and drops
    /// the insight with no side effect once the quota is exhausted.
    pub fn try_emit(&mut self, insight: Insight) -> bool {
        if self.emitted >= self.max {
            debug!(
                "insight quota exhausted ({}/{}), dropping {:?} on {}",
                self.emitted, self.max, insight.direction, insight.instrument
            );
            return false;
        }
        self.emitted += 1;
        self.active.insert(insight.instrument.clone(), insight);
        true
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn remaining(&self) -> usize {
        self.max - self.emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.emitted >= self.max
    }

    /// Accepted insights in stable instrument order, expired ones included.
    /// Portfolio construction maps expired insights to an explicit flatten.
    pub fn insights(&self) -> Vec<&Insight> {
        let mut insights: Vec<&Insight> = self.active.values().collect();
        insights.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        insights
    }
}
