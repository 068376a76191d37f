//! Reassembled transmission type

use super::TransmissionType;

/// One logical telemetry message, possibly spanning several wire frames.
///
/// Built only by the reassembler. Fields are read-only once emitted; each
/// consumer queue receives its own clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    transmission_number: u8,
    kind: TransmissionType,
    data: String,
    time: f64,
}

impl Transmission {
    /// Create a completed transmission
    pub fn new(transmission_number: u8, kind: TransmissionType, data: String, time: f64) -> Self {
        Self { transmission_number, kind, data, time }
    }

    /// Transmission counter from the wire header
    pub fn transmission_number(&self) -> u8 {
        self.transmission_number
    }

    /// Type tag from the first packet
    pub fn kind(&self) -> &TransmissionType {
        &self.kind
    }

    /// Concatenated payload chunks, type token removed
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Seconds since the first observed device loop counter
    pub fn time(&self) -> f64 {
        self.time
    }
}
