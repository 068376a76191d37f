//! Core types for the telemetry pipeline.
//!
//! Data moves through three shapes, each owned by exactly one stage at a time:
//! - [`Frame`] is one delimiter-terminated wire unit, consumed by the reassembler
//! - [`Transmission`] is a reassembled message, cloned into every consumer queue
//! - [`Sample`] is a decoded observation, serialized once per client and dropped
//!
//! [`TransmissionType`] is the closed set of type tags the decoders dispatch on.
//!
//! ## Usage Example
//!
//! ```rust
//! use groundlink::types::{Frame, TransmissionType};
//!
//! let frame = Frame::parse(b"\x05\x00\x01GPS lat=1.0\tlon=2.0@").unwrap();
//! assert_eq!(frame.transmission_number, 5);
//! assert_eq!(frame.payload, "GPS lat=1.0\tlon=2.0");
//! assert_eq!(TransmissionType::from_tag("GPS"), TransmissionType::Gps);
//! ```

mod frame;
mod sample;
mod transmission;
mod transmission_type;

pub use frame::{DELIMITER, Frame, HEADER_LEN, MIN_FRAME_LEN};
pub use sample::{Sample, SampleValue};
pub use transmission::Transmission;
pub use transmission_type::TransmissionType;
