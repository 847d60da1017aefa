//! Aggregation of numeric columns across the rows of one observation.
//!
//! Inputs are the raw cell strings. A column that cannot be read as numbers
//! is reported as "no data" (`None`) rather than as an error, so one bad cell
//! drops the aggregated property instead of the whole observation.

use crate::error::ConversionError;

/// Mean plus the percent-deviation statistic used in the diagnostics:
/// `100 * sqrt(sum((x - mean)^2) / n)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispersion {
    pub mean: f64,
    pub percent: f64,
}

fn parse_number(value: &str) -> Result<f64, ConversionError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConversionError::NotNumeric {
            value: value.to_string(),
        })
}

fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<f64>, ConversionError> {
    values.iter().map(|v| parse_number(v.as_ref())).collect()
}

/// Arithmetic mean. Fails on the first non-numeric value, or on empty input.
pub fn mean<S: AsRef<str>>(values: &[S]) -> Result<f64, ConversionError> {
    if values.is_empty() {
        return Err(ConversionError::Empty);
    }
    let xs = parse_all(values)?;
    Ok(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Mean and percent deviation, or `None` when the values cannot be
/// aggregated (empty input or any non-numeric value).
pub fn dispersion<S: AsRef<str>>(values: &[S]) -> Option<Dispersion> {
    let m = mean(values).ok()?;
    let xs = parse_all(values).ok()?;
    let s2: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    Some(Dispersion {
        mean: m,
        percent: 100.0 * (s2 / xs.len() as f64).sqrt(),
    })
}

/// Largest value, with the same "no data" rules as [`dispersion`].
pub fn maximum<S: AsRef<str>>(values: &[S]) -> Option<f64> {
    let xs = parse_all(values).ok()?;
    xs.into_iter().reduce(f64::max)
}
