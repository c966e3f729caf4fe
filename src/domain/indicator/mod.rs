//! Streaming technical indicators with explicit warm-up.
//!
//! Each indicator owns a rolling window over one instrument's observations.
//! An indicator is `warm` only once it has received at least `period`
//! observations; its value is undefined before that and must not be consumed.

pub mod ema;
pub mod sma;

use std::fmt;

pub use ema::Ema;
pub use sma::Sma;

/// Indicator identity + parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
}

impl IndicatorKind {
    pub fn period(&self) -> usize {
        match self {
            IndicatorKind::Sma(period) | IndicatorKind::Ema(period) => *period,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
        }
    }
}

/// A single rolling indicator over one instrument.
#[derive(Debug, Clone)]
pub enum Indicator {
    Sma(Sma),
    Ema(Ema),
}

impl Indicator {
    pub fn new(kind: IndicatorKind) -> Self {
        match kind {
            IndicatorKind::Sma(period) => Indicator::Sma(Sma::new(period)),
            IndicatorKind::Ema(period) => Indicator::Ema(Ema::new(period)),
        }
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            Indicator::Sma(sma) => IndicatorKind::Sma(sma.period()),
            Indicator::Ema(ema) => IndicatorKind::Ema(ema.period()),
        }
    }

    /// Append the newest observation, discarding the oldest past `period`.
    pub fn update(&mut self, observation: f64) {
        match self {
            Indicator::Sma(sma) => sma.update(observation),
            Indicator::Ema(ema) => ema.update(observation),
        }
    }

    /// True once at least `period` observations have been received.
    pub fn is_warm(&self) -> bool {
        match self {
            Indicator::Sma(sma) => sma.is_warm(),
            Indicator::Ema(ema) => ema.is_warm(),
        }
    }

    /// Number of observations received, capped at `period` for display.
    pub fn samples_seen(&self) -> usize {
        match self {
            Indicator::Sma(sma) => sma.samples_seen(),
            Indicator::Ema(ema) => ema.samples_seen(),
        }
    }

    /// Current value, or None while not warm.
    pub fn value(&self) -> Option<f64> {
        match self {
            Indicator::Sma(sma) => sma.value(),
            Indicator::Ema(ema) => ema.value(),
        }
    }
}
