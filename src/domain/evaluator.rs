//! Crossover signal evaluation with re-entry suppression.

use super::insight::Direction;

/// Compares a fast against a slow indicator value and raises a directional
/// transition only on a change of sign relative to the previously evaluated
/// direction. Reaffirming the active direction is a no-op, so a standing
/// position is never re-entered. Exact equality never triggers an entry.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    current: Direction,
}

impl SignalEvaluator {
    pub fn new() -> Self {
        SignalEvaluator {
            current: Direction::Flat,
        }
    }

    pub fn current(&self) -> Direction {
        self.current
    }

    /// Returns the new direction when the evaluation flips state, None
    /// otherwise.
    pub fn evaluate(&mut self, fast: f64, slow: f64) -> Option<Direction> {
        if fast > slow && self.current != Direction::Up {
            self.current = Direction::Up;
            return Some(Direction::Up);
        }
        if fast < slow && self.current != Direction::Down {
            self.current = Direction::Down;
            return Some(Direction::Down);
        }
        None
    }
}

impl Default for SignalEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
