//! Directional trading signals ("insights") with a validity window.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::instrument::InstrumentId;

/// Direction of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// +1 for Up, -1 for Down, 0 for Flat.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
            Direction::Flat => 0.0,
        }
    }
}

/// A directional signal produced by strategy logic. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub instrument: InstrumentId,
    pub direction: Direction,
    pub generated_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub confidence: f64,
    pub weight: Option<f64>,
}

impl Insight {
    pub fn new(
        instrument: InstrumentId,
        direction: Direction,
        generated_at: NaiveDateTime,
        period: Duration,
    ) -> Self {
        Insight {
            instrument,
            direction,
            generated_at,
            expires_at: generated_at
                .checked_add_signed(period)
                .unwrap_or(NaiveDateTime::MAX),
            confidence: 1.0,
            weight: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Active means unexpired; a Flat insight is active but carries no
    /// exposure.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        now < self.expires_at
    }
}
