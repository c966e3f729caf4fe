//! Target portfolio weights from active insights.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::insight::{Direction, Insight};
use super::instrument::InstrumentId;

/// Desired fraction of portfolio value for one instrument, in [-1, 1].
/// Supersedes the previous target for the same instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWeight {
    pub instrument: InstrumentId,
    pub weight: f64,
}

/// Equal-weighting portfolio construction.
///
/// Each instrument with an active non-flat insight receives
/// `sign(direction) * 1/N`, where N is the count of such instruments. A Flat
/// or expired insight maps to an explicit 0 weight, never to "leave as is".
/// Construction is idempotent: the same insight set yields bit-for-bit the
/// same targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioConstructor;

impl PortfolioConstructor {
    pub fn new() -> Self {
        PortfolioConstructor
    }

    pub fn construct(&self, insights: &[&Insight], now: NaiveDateTime) -> Vec<TargetWeight> {
        let live = insights
            .iter()
            .filter(|i| i.is_active(now) && i.direction != Direction::Flat)
            .count();

        let mut targets: Vec<TargetWeight> = insights
            .iter()
            .map(|insight| {
                let weight = if insight.is_active(now) && live > 0 {
                    insight.direction.sign() / live as f64
                } else {
                    0.0
                };
                TargetWeight {
                    instrument: insight.instrument.clone(),
                    weight,
                }
            })
            .collect();

        targets.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        targets
    }
}
