//! Raw cell → typed literal.
//!
//! Every converter returns `Ok(None)` for an empty cell, so callers can drop
//! the property without special-casing blanks.

use crate::error::ConversionError;
use crate::rdf::RdfLiteral;
use crate::vocab::xsd;
use chrono::{NaiveDate, NaiveDateTime};

/// Timestamp layouts seen in MAST dumps.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%b %d %Y %I:%M:%S%.f%p",
    "%b %d %Y %I:%M%p",
];

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Lexical form of a double (`NaN`, `INF`, `-INF` for the special values).
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

pub fn double_literal(value: f64) -> RdfLiteral {
    RdfLiteral::typed(format_double(value), xsd::DOUBLE)
}

pub fn as_int(value: &str) -> Result<Option<RdfLiteral>, ConversionError> {
    if blank(value) {
        return Ok(None);
    }
    let parsed = value
        .trim()
        .parse::<i32>()
        .map_err(|_| ConversionError::NotInteger {
            value: value.to_string(),
        })?;
    Ok(Some(RdfLiteral::typed(parsed.to_string(), xsd::INT)))
}

pub fn parse_date_time(value: &str) -> Result<NaiveDateTime, ConversionError> {
    let trimmed = value.trim();
    // Sybase dumps pad single-digit days with an extra space.
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&collapsed, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&collapsed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(ConversionError::NotTimestamp {
        value: value.to_string(),
    })
}

pub fn as_date_time(value: &str) -> Result<Option<RdfLiteral>, ConversionError> {
    if blank(value) {
        return Ok(None);
    }
    let dt = parse_date_time(value)?;
    Ok(Some(RdfLiteral::typed(
        dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        xsd::DATE_TIME,
    )))
}

/// Exposure length in seconds as an `xsd:duration` (`PT<s>S`).
pub fn duration_literal(seconds: f64) -> Option<RdfLiteral> {
    if !seconds.is_finite() {
        return None;
    }
    let lexical = if seconds < 0.0 {
        format!("-PT{}S", -seconds)
    } else {
        format!("PT{seconds}S")
    };
    Some(RdfLiteral::typed(lexical, xsd::DURATION))
}

/// Non-empty cell as a plain literal.
pub fn plain(value: &str) -> Option<RdfLiteral> {
    if blank(value) {
        None
    } else {
        Some(RdfLiteral::plain(value.trim()))
    }
}
