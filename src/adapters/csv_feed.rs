//! CSV price feed adapter.
//!
//! Reads a `timestamp,price,volume` series for one instrument and turns it
//! into the snapshot stream a host would deliver. Timestamps are
//! `%Y-%m-%d %H:%M:%S`, or `%Y-%m-%d` for daily bars (midnight assumed).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::path::PathBuf;

use crate::domain::error::AlphacoreError;
use crate::domain::instrument::InstrumentId;
use crate::domain::snapshot::DataSnapshot;

pub struct CsvFeedAdapter {
    path: PathBuf,
}

impl CsvFeedAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self, instrument: &InstrumentId) -> Result<Vec<DataSnapshot>, AlphacoreError> {
        let content = fs::read_to_string(&self.path).map_err(|e| AlphacoreError::PriceData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        parse_snapshots(&content, instrument)
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, AlphacoreError> {
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(at);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|e| AlphacoreError::PriceData {
            reason: format!("invalid timestamp {raw:?}: {e}"),
        })
}

fn parse_snapshots(
    content: &str,
    instrument: &InstrumentId,
) -> Result<Vec<DataSnapshot>, AlphacoreError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut snapshots = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| AlphacoreError::PriceData {
            reason: format!("CSV parse error: {e}"),
        })?;

        let raw_timestamp = record.get(0).ok_or_else(|| AlphacoreError::PriceData {
            reason: "missing timestamp column".into(),
        })?;
        let at = parse_timestamp(raw_timestamp)?;

        let price: f64 = record
            .get(1)
            .ok_or_else(|| AlphacoreError::PriceData {
                reason: "missing price column".into(),
            })?
            .trim()
            .parse()
            .map_err(|e| AlphacoreError::PriceData {
                reason: format!("invalid price: {e}"),
            })?;

        let volume: f64 = match record.get(2) {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim().parse().map_err(|e| AlphacoreError::PriceData {
                    reason: format!("invalid volume: {e}"),
                })?
            }
            _ => 0.0,
        };

        snapshots.push(
            DataSnapshot::new(at).with_observation(instrument.clone(), price, volume),
        );
    }

    Ok(snapshots)
}
