//! Simple Moving Average over a fixed-capacity rolling window.
//!
//! Warmup: undefined until `period` observations have been received.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Sma {
            period: period.max(1),
            window: VecDeque::with_capacity(period.max(1) + 1),
            sum: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn update(&mut self, observation: f64) {
        self.window.push_back(observation);
        self.sum += observation;
        if self.window.len() > self.period {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
    }

    pub fn is_warm(&self) -> bool {
        self.window.len() >= self.period
    }

    pub fn samples_seen(&self) -> usize {
        self.window.len()
    }

    pub fn value(&self) -> Option<f64> {
        if !self.is_warm() {
            return None;
        }
        Some(self.sum / self.period as f64)
    }
}
