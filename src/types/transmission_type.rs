//! Transmission type tags

use std::fmt;

/// Type tag carried by the first packet of every transmission.
///
/// The set of tags the ground station understands is closed; anything else
/// is kept verbatim in [`TransmissionType::Unknown`] so it can still be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransmissionType {
    /// Free-form log line
    Log,
    /// Inertial measurement fields
    Imu,
    /// GPS fix fields
    Gps,
    /// Barometer pressure and temperature
    Alt,
    /// Grid fin deflection angle
    Gridfin,
    /// Flight loop timing, carries the device clock
    Loop,
    /// Any other tag
    Unknown(String),
}

impl TransmissionType {
    /// Classify a raw tag. Matching is case-sensitive.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "LOG" => TransmissionType::Log,
            "IMU" => TransmissionType::Imu,
            "GPS" => TransmissionType::Gps,
            "ALT" => TransmissionType::Alt,
            "GRIDFIN" => TransmissionType::Gridfin,
            "LOOP" => TransmissionType::Loop,
            other => TransmissionType::Unknown(other.to_string()),
        }
    }

    /// The wire tag for this type.
    pub fn as_tag(&self) -> &str {
        match self {
            TransmissionType::Log => "LOG",
            TransmissionType::Imu => "IMU",
            TransmissionType::Gps => "GPS",
            TransmissionType::Alt => "ALT",
            TransmissionType::Gridfin => "GRIDFIN",
            TransmissionType::Loop => "LOOP",
            TransmissionType::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for TransmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}
