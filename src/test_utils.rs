//! Test utilities for building raw serial captures
//!
//! Helpers here produce bytes exactly as the transmitter puts them on the
//! wire, so tests and benches can drive the real framing path.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::DELIMITER;

/// Encode a single frame: three header bytes, payload, delimiter.
pub fn encode_frame(transmission_number: u8, packet_number: u8, packet_count: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 4);
    bytes.push(transmission_number);
    bytes.push(packet_number);
    bytes.push(packet_count);
    bytes.extend_from_slice(payload);
    bytes.push(DELIMITER);
    bytes
}

/// Encode a whole transmission, splitting `"<tag> <data>"` into packets
/// of at most `max_payload` bytes.
///
/// Panics if the transmission needs more than 255 packets.
pub fn encode_transmission(transmission_number: u8, tag: &str, data: &str, max_payload: usize) -> Vec<u8> {
    let text = format!("{} {}", tag, data);
    let chunks: Vec<&[u8]> = text.as_bytes().chunks(max_payload.max(1)).collect();
    let count = u8::try_from(chunks.len()).expect("too many packets for one transmission");

    chunks
        .iter()
        .enumerate()
        .flat_map(|(n, chunk)| encode_frame(transmission_number, n as u8, count, chunk))
        .collect()
}

/// A capture of a short flight: a clock sync followed by one of each
/// sensor transmission, repeated `loops` times.
pub fn synthetic_flight(loops: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut number = 0u8;
    let mut next = || {
        if number == DELIMITER {
            number += 1;
        }
        let n = number;
        number = number.wrapping_add(1);
        n
    };

    for i in 0..loops {
        let micros = 5_000_000 + u64::from(i) * 20_000;
        bytes.extend(encode_transmission(next(), "LOOP", &format!("lastLoopStart={}", micros), 40));
        bytes.extend(encode_transmission(next(), "IMU", &format!("ax={}\tay=0.1\taz=9.81", i), 16));
        bytes.extend(encode_transmission(
            next(),
            "GPS",
            &format!("lat=47.{}\tlon=-122.3\tdatetime=2024-06-01T12:00:{:02}", i, i % 60),
            24,
        ));
        bytes.extend(encode_transmission(next(), "ALT", "pressure=850.2\ttemperature=21.5", 64));
        bytes.extend(encode_transmission(next(), "GRIDFIN", &format!("angle={}", i % 90), 64));
        bytes.extend(encode_transmission(next(), "LOG", &format!("loop {} ok", i), 64));
    }
    bytes
}
