//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for alphacore.
#[derive(Debug, thiserror::Error)]
pub enum AlphacoreError {
    /// The indicator has not yet seen `period` observations. Callers must
    /// skip the decision step; the value is undefined.
    #[error("indicator {slot} on {instrument} is not warm ({seen}/{period} observations)")]
    NotWarm {
        instrument: String,
        slot: String,
        seen: usize,
        period: usize,
    },

    #[error("no indicator registered as {slot} on {instrument}")]
    UnknownIndicator { instrument: String, slot: String },

    #[error("good-til-date expiry {expiry} is not after submission time {now}")]
    InvalidTimeInForce {
        expiry: NaiveDateTime,
        now: NaiveDateTime,
    },

    #[error("instrument {symbol} is not registered")]
    UnknownInstrument { symbol: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid parameter {key}: {reason}")]
    ParameterInvalid { key: String, reason: String },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AlphacoreError> for std::process::ExitCode {
    fn from(err: &AlphacoreError) -> Self {
        let code: u8 = match err {
            AlphacoreError::Io(_) => 1,
            AlphacoreError::ConfigParse { .. } | AlphacoreError::ParameterInvalid { .. } => 2,
            AlphacoreError::PriceData { .. } => 3,
            AlphacoreError::NotWarm { .. }
            | AlphacoreError::UnknownIndicator { .. }
            | AlphacoreError::UnknownInstrument { .. } => 4,
            AlphacoreError::InvalidTimeInForce { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
