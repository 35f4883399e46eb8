//! Parsing of bar rows into latency samples.
//!
//! Rows are comma-delimited. The first column is the bar timestamp in
//! seconds and the last column is the local receive timestamp; anything in
//! between (OHLCV in the reference producer) is ignored here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field delimiter of the backing file.
pub const DELIMITER: char = ',';

/// A row needs at least a bar timestamp and a receive timestamp.
pub const MIN_FIELDS: usize = 2;

/// Default bar-aggregation period of the producer, in seconds.
///
/// A bar stamped `t` closes at `t + offset`, so that is the earliest moment
/// it can be received.
pub const DEFAULT_BAR_OFFSET_SECS: f64 = 5.0;

/// Unit of the receive timestamp column.
///
/// The file does not describe itself, so this is fixed per deployment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    /// Decimal seconds since the epoch.
    Seconds,
    /// Integer nanoseconds since the epoch (`time_ns()` style clocks).
    #[default]
    Nanoseconds,
}

impl TimestampUnit {
    /// Convert a raw value in this unit to seconds.
    pub fn to_seconds(self, raw: f64) -> f64 {
        match self {
            TimestampUnit::Seconds => raw,
            TimestampUnit::Nanoseconds => raw / 1e9,
        }
    }
}

/// Everything the parser needs to know about a stream's rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordFormat {
    pub receive_unit: TimestampUnit,
    /// Seconds added to the bar timestamp before measuring latency.
    pub bar_offset: f64,
    /// Exact column count of a row, once known.
    pub fields: Option<usize>,
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self {
            receive_unit: TimestampUnit::default(),
            bar_offset: DEFAULT_BAR_OFFSET_SECS,
            fields: None,
        }
    }
}

impl RecordFormat {
    /// Count the columns of a header row.
    pub fn fields_in_header(header: &str) -> usize {
        header.trim().split(DELIMITER).count()
    }
}

/// One latency measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Receive time, seconds since the epoch.
    pub arrival_time: f64,
    /// Receive time minus bar close time, in milliseconds. Negative when the
    /// local clock is behind the venue's.
    pub latency_ms: f64,
}

impl Sample {
    /// Build a sample from a bar timestamp (seconds) and a raw receive
    /// timestamp in the format's unit.
    pub fn from_timestamps(bar_timestamp: f64, receive_raw: f64, format: &RecordFormat) -> Self {
        let arrival_time = format.receive_unit.to_seconds(receive_raw);
        let latency_ms = (arrival_time - (bar_timestamp + format.bar_offset)) * 1000.0;
        Self {
            arrival_time,
            latency_ms,
        }
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("bar timestamp {0:?} is not a number")]
    BadBarTimestamp(String),

    #[error("receive timestamp {0:?} is not a number")]
    BadReceiveTimestamp(String),
}

/// A row that could not be turned into a [`Sample`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed record: {reason}")]
    Malformed { reason: MalformedReason },
}

impl ParseError {
    pub fn reason(&self) -> &MalformedReason {
        match self {
            ParseError::Malformed { reason } => reason,
        }
    }
}

impl From<MalformedReason> for ParseError {
    fn from(reason: MalformedReason) -> Self {
        ParseError::Malformed { reason }
    }
}

/// Parse one data row.
///
/// Never panics; every failure comes back as [`ParseError::Malformed`] so the
/// caller can skip the row and keep going.
///
/// # Example
///
/// ```
/// use latency_watch::data::record::{parse, RecordFormat, TimestampUnit};
///
/// let format = RecordFormat {
///     receive_unit: TimestampUnit::Seconds,
///     ..RecordFormat::default()
/// };
/// let sample = parse("100,1.0,1.1,0.9,1.05,300,105.25", &format).unwrap();
/// assert_eq!(sample.arrival_time, 105.25);
/// assert_eq!(sample.latency_ms, 250.0);
/// ```
pub fn parse(line: &str, format: &RecordFormat) -> Result<Sample, ParseError> {
    let fields: Vec<&str> = line.trim().split(DELIMITER).collect();
    let found = fields.len();
    let width_ok = match format.fields {
        Some(expected) => found == expected,
        None => true,
    };
    if found < MIN_FIELDS || !width_ok {
        return Err(MalformedReason::FieldCount {
            expected: format.fields.unwrap_or(MIN_FIELDS),
            found,
        }
        .into());
    }

    let bar_field = fields[0];
    let receive_field = fields[found - 1];

    let bar_timestamp = parse_number(bar_field)
        .ok_or_else(|| MalformedReason::BadBarTimestamp(bar_field.trim().to_string()))?;
    let receive_raw = parse_number(receive_field)
        .ok_or_else(|| MalformedReason::BadReceiveTimestamp(receive_field.trim().to_string()))?;

    Ok(Sample::from_timestamps(bar_timestamp, receive_raw, format))
}

fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds() -> RecordFormat {
        RecordFormat {
            receive_unit: TimestampUnit::Seconds,
            bar_offset: 5.0,
            fields: None,
        }
    }

    #[test]
    fn test_parse_two_column_rows() {
        let format = seconds();
        assert_eq!(parse("0,0", &format).unwrap().latency_ms, -5000.0);
        assert_eq!(parse("5,10", &format).unwrap().latency_ms, 0.0);
        assert_eq!(parse("10,20", &format).unwrap().latency_ms, 5000.0);
    }

    #[test]
    fn test_parse_nanosecond_receive_clock() {
        let format = RecordFormat {
            receive_unit: TimestampUnit::Nanoseconds,
            bar_offset: 5.0,
            fields: Some(7),
        };
        let sample = parse("1700000000,1,2,0.5,1.5,100,1700000005042000000", &format).unwrap();
        assert!((sample.arrival_time - 1_700_000_005.042).abs() < 1e-6);
        assert!((sample.latency_ms - 42.0).abs() < 1e-3);
    }

    #[test]
    fn test_middle_columns_are_ignored() {
        let format = seconds();
        let sample = parse("100,not,numbers,here,106", &format).unwrap();
        assert_eq!(sample.latency_ms, 1000.0);
    }

    #[test]
    fn test_trailing_whitespace_and_carriage_return() {
        let sample = parse(" 5 , 10\r", &seconds()).unwrap();
        assert_eq!(sample.arrival_time, 10.0);
    }

    #[test]
    fn test_short_row_against_header_width() {
        let format = RecordFormat {
            fields: Some(7),
            ..seconds()
        };
        let err = parse("1700000000,1700000005", &format).unwrap_err();
        assert_eq!(
            err.reason(),
            &MalformedReason::FieldCount {
                expected: 7,
                found: 2
            }
        );
    }

    #[test]
    fn test_single_field_is_malformed() {
        let err = parse("1700000000", &seconds()).unwrap_err();
        assert!(matches!(
            err.reason(),
            MalformedReason::FieldCount { found: 1, .. }
        ));
        assert!(parse("", &seconds()).is_err());
    }

    #[test]
    fn test_bad_numbers() {
        let format = seconds();
        assert_eq!(
            parse("abc,10", &format).unwrap_err().reason(),
            &MalformedReason::BadBarTimestamp("abc".to_string())
        );
        assert_eq!(
            parse("5,", &format).unwrap_err().reason(),
            &MalformedReason::BadReceiveTimestamp(String::new())
        );
        assert!(parse("5,NaN", &format).is_err());
        assert!(parse("inf,10", &format).is_err());
    }

    #[test]
    fn test_error_message() {
        let err = parse("x,1", &seconds()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed record: bar timestamp \"x\" is not a number"
        );
    }

    #[test]
    fn test_fields_in_header() {
        assert_eq!(
            RecordFormat::fields_in_header("timestamp,open,high,low,close,volume,ts_recv\r"),
            7
        );
    }

    #[test]
    fn test_unit_deserializes_lowercase() {
        let unit: TimestampUnit = serde_json::from_str("\"seconds\"").unwrap();
        assert_eq!(unit, TimestampUnit::Seconds);
    }
}
