//! Payload decoders keyed by transmission type.
//!
//! Every [`TransmissionType`] maps to at most one [`Decoder`] through an
//! exhaustive match, so adding a type tag forces a decision about how it
//! decodes. Types without a decoder produce no samples.
//!
//! Decoding never fails outward: [`DecoderRegistry::decode`] logs the error
//! and returns an empty list, so one malformed payload cannot stall the
//! websocket clients. [`DecoderRegistry::try_decode`] keeps the error.
//!
//! ```rust
//! use groundlink::{DecoderRegistry, TransmissionType};
//!
//! let registry = DecoderRegistry::new();
//! let samples = registry.decode(&TransmissionType::Imu, "X=1\tY=2.5", 0.0);
//! assert_eq!(samples[0].source, "X");
//! assert_eq!(samples[1].value.as_f64(), Some(2.5));
//!
//! assert!(registry.decode(&TransmissionType::Unknown("PING".into()), "", 0.0).is_empty());
//! ```

mod builtin;

pub use builtin::{DATETIME_TAG, altitude_feet, celsius_to_fahrenheit};

use tracing::warn;

use crate::Result;
use crate::types::{Sample, Transmission, TransmissionType};

/// Reference pressure (hPa) at the launch site used for altitude.
pub const SEA_LEVEL_PRESSURE_HPA: f64 = 861.61;

/// Source label for grid fin angle samples.
pub const GRIDFIN_SOURCE: &str = "GRIDFIN";

/// Source label for log line samples.
pub const LOG_SOURCE: &str = "LOG";

/// Decoding routine for one payload layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Whole payload as one text sample
    Passthrough { source: &'static str },
    /// One numeric sample per `tag=value` field
    Tagged,
    /// First field as a single angle
    Angle { source: &'static str },
    /// Pressure and temperature fields to temperature, pressure and altitude
    Altitude,
}

/// Maps transmission types to decoders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderRegistry {
    sea_level_hpa: f64,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self { sea_level_hpa: SEA_LEVEL_PRESSURE_HPA }
    }
}

impl DecoderRegistry {
    /// Registry with the default reference pressure
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry computing altitude against a different reference pressure
    pub fn with_sea_level(sea_level_hpa: f64) -> Self {
        Self { sea_level_hpa }
    }

    /// Reference pressure in hPa
    pub fn sea_level_hpa(&self) -> f64 {
        self.sea_level_hpa
    }

    /// Decoder for a transmission type, `None` when the type carries no samples
    pub fn decoder_for(&self, kind: &TransmissionType) -> Option<Decoder> {
        match kind {
            TransmissionType::Log => Some(Decoder::Passthrough { source: LOG_SOURCE }),
            TransmissionType::Imu | TransmissionType::Gps => Some(Decoder::Tagged),
            TransmissionType::Alt => Some(Decoder::Altitude),
            TransmissionType::Gridfin => Some(Decoder::Angle { source: GRIDFIN_SOURCE }),
            TransmissionType::Loop | TransmissionType::Unknown(_) => None,
        }
    }

    /// Decode a payload, surfacing parse failures
    pub fn try_decode(&self, kind: &TransmissionType, data: &str, time: f64) -> Result<Vec<Sample>> {
        let tag = kind.as_tag();
        match self.decoder_for(kind) {
            None => Ok(Vec::new()),
            Some(Decoder::Passthrough { source }) => Ok(builtin::passthrough(source, data, time)),
            Some(Decoder::Tagged) => builtin::tagged(tag, data, time),
            Some(Decoder::Angle { source }) => builtin::angle(tag, source, data, time),
            Some(Decoder::Altitude) => builtin::altitude(tag, data, time, self.sea_level_hpa),
        }
    }

    /// Decode a payload; failures are logged and yield no samples
    pub fn decode(&self, kind: &TransmissionType, data: &str, time: f64) -> Vec<Sample> {
        self.try_decode(kind, data, time).unwrap_or_else(|e| {
            warn!("{}", e);
            Vec::new()
        })
    }

    /// Decode a completed transmission
    pub fn decode_transmission(&self, transmission: &Transmission) -> Vec<Sample> {
        self.decode(transmission.kind(), transmission.data(), transmission.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeError;
    use crate::types::SampleValue;
    use proptest::prelude::*;

    #[test]
    fn log_passes_text_through() {
        let registry = DecoderRegistry::new();
        let samples = registry.decode(&TransmissionType::Log, "armed\tstate=2", 4.0);
        assert_eq!(samples, vec![Sample::text("LOG", 4.0, "armed\tstate=2")]);
    }

    #[test]
    fn generic_fields_in_order() {
        let registry = DecoderRegistry::new();
        let samples = registry.decode(&TransmissionType::Imu, "X=1\tY=2.5", 3.0);
        assert_eq!(samples, vec![Sample::number("X", 3.0, 1.0), Sample::number("Y", 3.0, 2.5)]);
    }

    #[test]
    fn non_finite_values_never_reach_clients() {
        let registry = DecoderRegistry::new();
        assert!(registry.decode(&TransmissionType::Imu, "X=nan\tY=inf", 0.0).is_empty());
        assert!(registry.decode(&TransmissionType::Alt, "pressure=-5\ttemperature=0", 0.0).is_empty());
        assert!(DecoderRegistry::with_sea_level(0.0)
            .decode(&TransmissionType::Alt, "pressure=900\ttemperature=0", 0.0)
            .is_empty());
    }

    #[test]
    fn gps_keeps_datetime_as_text() {
        let registry = DecoderRegistry::new();
        let samples = registry.decode(
            &TransmissionType::Gps,
            "lat=-33.8\tlon=151.2\tdatetime=2024-03-01T10:00:00",
            0.5,
        );
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].value, SampleValue::Number(-33.8));
        assert_eq!(samples[2].source, "datetime");
        assert_eq!(samples[2].value, SampleValue::Text("2024-03-01T10:00:00".into()));
    }

    #[test]
    fn altitude_at_reference_pressure_is_zero() {
        let registry = DecoderRegistry::new();
        let samples =
            registry.decode(&TransmissionType::Alt, "pressure=861.61\ttemperature=0", 1.0);

        let sources: Vec<&str> = samples.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, ["TEMP", "PRESSURE", "ALTITUDE"]);
        assert_eq!(samples[0].value.as_f64(), Some(32.0));
        assert_eq!(samples[1].value.as_f64(), Some(861.61));
        assert!(samples[2].value.as_f64().unwrap().abs() < 1e-6);
    }

    #[test]
    fn altitude_uses_configured_reference() {
        let registry = DecoderRegistry::with_sea_level(1013.25);
        let samples =
            registry.decode(&TransmissionType::Alt, "pressure=1013.25\ttemperature=15", 0.0);
        assert!(samples[2].value.as_f64().unwrap().abs() < 1e-6);
        assert_eq!(samples[0].value.as_f64(), Some(59.0));
    }

    #[test]
    fn gridfin_reads_first_field() {
        let registry = DecoderRegistry::new();
        let samples = registry.decode(&TransmissionType::Gridfin, "angle=12.5\tservo=3", 2.0);
        assert_eq!(samples, vec![Sample::number("GRIDFIN", 2.0, 12.5)]);
    }

    #[test]
    fn loop_and_unknown_decode_to_nothing() {
        let registry = DecoderRegistry::new();
        assert!(registry.decoder_for(&TransmissionType::Loop).is_none());
        assert!(registry.decode(&TransmissionType::Loop, "lastLoopStart=10", 0.0).is_empty());
        assert!(
            registry.decode(&TransmissionType::Unknown("BATT".into()), "v=3.7", 0.0).is_empty()
        );
    }

    #[test]
    fn malformed_payload_yields_no_samples() {
        let registry = DecoderRegistry::new();
        assert!(registry.decode(&TransmissionType::Imu, "ax=fast", 0.0).is_empty());
        assert!(registry.decode(&TransmissionType::Alt, "pressure=900", 0.0).is_empty());

        let err = registry.try_decode(&TransmissionType::Imu, "ax=fast", 0.0).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { ref kind, .. } if kind == "IMU"));
    }

    #[test]
    fn decode_transmission_uses_its_time() {
        let registry = DecoderRegistry::new();
        let t = Transmission::new(9, TransmissionType::Gridfin, "a=1".into(), 7.25);
        assert_eq!(registry.decode_transmission(&t), vec![Sample::number("GRIDFIN", 7.25, 1.0)]);
    }

    proptest! {
        #[test]
        fn tagged_yields_one_sample_per_field(
            fields in prop::collection::vec(("[a-z][a-z0-9_]{0,8}", -1.0e6f64..1.0e6), 1..12),
            time in 0.0f64..1.0e4,
        ) {
            prop_assume!(fields.iter().all(|(name, _)| name != DATETIME_TAG));
            let data = fields
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("\t");

            let samples = DecoderRegistry::new().decode(&TransmissionType::Gps, &data, time);
            prop_assert_eq!(samples.len(), fields.len());
            for (sample, (name, value)) in samples.iter().zip(&fields) {
                prop_assert_eq!(&sample.source, name);
                prop_assert_eq!(sample.time, time);
                prop_assert_eq!(sample.value.as_f64(), Some(*value));
            }
        }

        #[test]
        fn decode_never_panics(kind in "[A-Z]{1,8}", data in ".*") {
            let kind = TransmissionType::from_tag(&kind);
            let _ = DecoderRegistry::new().decode(&kind, &data, 0.0);
        }
    }
}
