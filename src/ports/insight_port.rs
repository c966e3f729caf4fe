//! Insight publication port.

use crate::domain::insight::Insight;

/// Sink for accepted insights, recorded externally by the host. Insights
/// dropped by the quota never reach the sink.
pub trait InsightSink {
    fn publish(&mut self, insight: &Insight);
}
