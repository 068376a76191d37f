//! Built-in payload decoders
//!
//! Payloads are tab-separated `tag=value` fields. Each decoder returns an
//! error instead of a partial result; the registry turns errors into an
//! empty sample list.

use crate::types::Sample;
use crate::{BridgeError, Result};

const FIELD_SEPARATOR: char = '\t';

/// Tag whose value stays text in tagged payloads.
pub const DATETIME_TAG: &str = "datetime";

/// Split one `tag=value` field at the first `=`.
fn split_field<'a>(kind: &str, field: &'a str) -> Result<(&'a str, &'a str)> {
    field
        .split_once('=')
        .ok_or_else(|| BridgeError::decode(kind, format!("field '{}' is not tag=value", field)))
}

fn parse_number(kind: &str, name: &str, value: &str) -> Result<f64> {
    let number = value.trim().parse::<f64>().map_err(|e| {
        BridgeError::decode(kind, format!("{} value '{}' is not a number: {}", name, value, e))
    })?;
    finite(kind, name, number)
}

/// JSON has no encoding for NaN or infinities.
fn finite(kind: &str, name: &str, number: f64) -> Result<f64> {
    if number.is_finite() {
        Ok(number)
    } else {
        Err(BridgeError::decode(kind, format!("{} value {} is not finite", name, number)))
    }
}

/// Value of the field at `index`, whatever its tag.
fn positional_value<'a>(kind: &str, data: &'a str, index: usize) -> Result<&'a str> {
    let field = data.split(FIELD_SEPARATOR).nth(index).ok_or_else(|| {
        BridgeError::decode(kind, format!("expected at least {} fields", index + 1))
    })?;
    Ok(split_field(kind, field)?.1)
}

pub(super) fn passthrough(source: &str, data: &str, time: f64) -> Vec<Sample> {
    vec![Sample::text(source, time, data)]
}

pub(super) fn tagged(kind: &str, data: &str, time: f64) -> Result<Vec<Sample>> {
    data.split(FIELD_SEPARATOR)
        .map(|field| {
            let (name, value) = split_field(kind, field)?;
            if name == DATETIME_TAG {
                Ok(Sample::text(name, time, value))
            } else {
                Ok(Sample::number(name, time, parse_number(kind, name, value)?))
            }
        })
        .collect()
}

pub(super) fn angle(kind: &str, source: &str, data: &str, time: f64) -> Result<Vec<Sample>> {
    let value = positional_value(kind, data, 0)?;
    Ok(vec![Sample::number(source, time, parse_number(kind, source, value)?)])
}

/// Barometric altitude in feet for `pressure_hpa`, relative to `sea_level_hpa`.
pub fn altitude_feet(pressure_hpa: f64, sea_level_hpa: f64) -> f64 {
    145366.45 * (1.0 - (pressure_hpa / sea_level_hpa).powf(0.190284))
}

/// Celsius to Fahrenheit
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub(super) fn altitude(kind: &str, data: &str, time: f64, sea_level_hpa: f64) -> Result<Vec<Sample>> {
    let pressure = parse_number(kind, "pressure", positional_value(kind, data, 0)?)?;
    let temperature = parse_number(kind, "temperature", positional_value(kind, data, 1)?)?;
    let altitude = finite(kind, "altitude", altitude_feet(pressure, sea_level_hpa))?;

    Ok(vec![
        Sample::number("TEMP", time, celsius_to_fahrenheit(temperature)),
        Sample::number("PRESSURE", time, pressure),
        Sample::number("ALTITUDE", time, altitude),
    ])
}
