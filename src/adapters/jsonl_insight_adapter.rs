//! JSON-lines insight sink: one serialized insight per line.

use log::error;
use std::io::Write;

use crate::domain::insight::Insight;
use crate::ports::insight_port::InsightSink;

pub struct JsonlInsightSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlInsightSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> InsightSink for JsonlInsightSink<W> {
    fn publish(&mut self, insight: &Insight) {
        match serde_json::to_string(insight) {
            Ok(line) => {
                if let Err(e) = writeln!(self.writer, "{line}") {
                    error!("failed to write insight: {e}");
                }
            }
            Err(e) => error!("failed to serialize insight: {e}"),
        }
    }
}

/// Sink that keeps every published insight in memory; test support.
#[derive(Debug, Default)]
pub struct RecordingInsightSink {
    pub published: Vec<Insight>,
}

impl RecordingInsightSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InsightSink for RecordingInsightSink {
    fn publish(&mut self, insight: &Insight) {
        self.published.push(insight.clone());
    }
}
