//! Decoded sample type

use serde::Serialize;

/// Value of one observation.
///
/// Serializes untagged so viewers see a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

impl SampleValue {
    /// Numeric value, if this sample carries one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Number(v) => Some(*v),
            SampleValue::Text(_) => None,
        }
    }

    /// Text value, if this sample carries one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SampleValue::Number(_) => None,
            SampleValue::Text(s) => Some(s),
        }
    }
}

/// One named, timestamped observation produced by a decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub source: String,
    pub time: f64,
    pub value: SampleValue,
}

impl Sample {
    /// Numeric sample
    pub fn number(source: impl Into<String>, time: f64, value: f64) -> Self {
        Self { source: source.into(), time, value: SampleValue::Number(value) }
    }

    /// Text sample
    pub fn text(source: impl Into<String>, time: f64, value: impl Into<String>) -> Self {
        Self { source: source.into(), time, value: SampleValue::Text(value.into()) }
    }
}
