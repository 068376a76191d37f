//! Multi-packet transmission reassembly
//!
//! Frames of one transmission arrive in order with packet numbers `0..count`.
//! The first packet carries the type tag; later packets only carry data.
//! Any gap or foreign transmission number mid-sequence drops the partial
//! transmission. The next packet 0 starts over, so the stream heals itself.
//!
//! The reassembler also owns the relative clock. `LOOP` transmissions report
//! the flight computer's loop start counter in microseconds; the first one
//! seen becomes the zero point for every timestamp after it.

use tracing::{debug, trace, warn};

use crate::types::{Frame, Transmission, TransmissionType};
use crate::{BridgeError, Result};

/// Field inside a `LOOP` payload holding the device clock.
pub const LOOP_COUNTER_FIELD: &str = "lastLoopStart";

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Counters kept across the life of a reassembler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Transmissions emitted
    pub completed: u64,
    /// Partial transmissions dropped for sequencing
    pub sequence_errors: u64,
    /// Partial transmissions replaced by a new packet 0
    pub abandoned: u64,
}

#[derive(Debug)]
struct Pending {
    transmission_number: u8,
    packet_count: u8,
    packet_number: u8,
    kind: TransmissionType,
    chunks: Vec<String>,
    time: f64,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Collecting(Pending),
}

/// Device clock tracking for `LOOP` transmissions
#[derive(Debug, Default)]
struct LoopClock {
    baseline: Option<u64>,
    current: u64,
}

impl LoopClock {
    fn update(&mut self, counter: u64) {
        if self.baseline.is_none() {
            debug!("Loop clock baseline set to {}", counter);
            self.baseline = Some(counter);
        }
        self.current = counter;
    }

    fn seconds(&self) -> f64 {
        match self.baseline {
            Some(base) => (self.current as f64 - base as f64) / MICROS_PER_SECOND,
            None => 0.0,
        }
    }
}

/// Stateful frame-to-transmission accumulator
///
/// ```rust
/// use groundlink::{Reassembler, types::Frame};
///
/// let mut reassembler = Reassembler::new();
/// let first = Frame { transmission_number: 1, packet_number: 0, packet_count: 2, payload: "LOG hel".into() };
/// let second = Frame { transmission_number: 1, packet_number: 1, packet_count: 2, payload: "lo".into() };
///
/// assert!(reassembler.push(first).unwrap().is_none());
/// let done = reassembler.push(second).unwrap().unwrap();
/// assert_eq!(done.data(), "hello");
/// ```
#[derive(Debug, Default)]
pub struct Reassembler {
    state: State,
    clock: LoopClock,
    stats: ReassemblyStats,
}

impl Reassembler {
    /// Create an idle reassembler with no clock baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame.
    ///
    /// Returns `Ok(Some(_))` when the frame completes a transmission and
    /// `Ok(None)` while more packets are expected. A sequencing violation
    /// returns [`BridgeError::Sequence`] after dropping the partial
    /// transmission.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Transmission>> {
        if frame.is_first() {
            self.begin(frame);
        } else {
            self.append(frame)?;
        }

        let complete = match &self.state {
            State::Collecting(pending) => {
                pending.packet_number == pending.packet_count.saturating_sub(1)
            }
            State::Idle => false,
        };
        if !complete {
            return Ok(None);
        }

        let State::Collecting(pending) = std::mem::take(&mut self.state) else {
            return Ok(None);
        };
        self.stats.completed += 1;

        let transmission = Transmission::new(
            pending.transmission_number,
            pending.kind,
            pending.chunks.concat(),
            pending.time,
        );
        trace!(
            "Transmission {} complete: type={}, {} bytes",
            transmission.transmission_number(),
            transmission.kind(),
            transmission.data().len()
        );
        Ok(Some(transmission))
    }

    /// Whether a transmission is partially assembled
    pub fn in_progress(&self) -> bool {
        matches!(self.state, State::Collecting(_))
    }

    /// Current relative time in seconds
    pub fn current_time(&self) -> f64 {
        self.clock.seconds()
    }

    /// Lifetime counters
    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    fn begin(&mut self, frame: Frame) {
        if let State::Collecting(previous) = &self.state {
            debug!(
                "Transmission {} abandoned at packet {}/{}",
                previous.transmission_number,
                previous.packet_number + 1,
                previous.packet_count
            );
            self.stats.abandoned += 1;
        }

        let (tag, rest) = frame.payload.split_once(' ').unwrap_or((frame.payload.as_str(), ""));
        let kind = TransmissionType::from_tag(tag);

        if kind == TransmissionType::Loop {
            match parse_loop_counter(rest) {
                Some(counter) => self.clock.update(counter),
                None => warn!(
                    "LOOP transmission {} has no {} field, clock unchanged",
                    frame.transmission_number, LOOP_COUNTER_FIELD
                ),
            }
        }

        self.state = State::Collecting(Pending {
            transmission_number: frame.transmission_number,
            packet_count: frame.packet_count,
            packet_number: 0,
            kind,
            chunks: vec![rest.to_string()],
            time: self.clock.seconds(),
        });
    }

    fn append(&mut self, frame: Frame) -> Result<()> {
        let State::Collecting(pending) = &mut self.state else {
            self.stats.sequence_errors += 1;
            return Err(BridgeError::sequence(None, frame.packet_number));
        };

        let expected = pending.packet_number.wrapping_add(1);
        if frame.transmission_number != pending.transmission_number
            || frame.packet_number != expected
        {
            debug!(
                "Dropping transmission {}: got tx {} packet {}, expected packet {}",
                pending.transmission_number,
                frame.transmission_number,
                frame.packet_number,
                expected
            );
            self.state = State::Idle;
            self.stats.sequence_errors += 1;
            return Err(BridgeError::sequence(Some(expected), frame.packet_number));
        }

        pending.packet_number = frame.packet_number;
        pending.chunks.push(frame.payload);
        Ok(())
    }
}

/// Extract the loop counter: the first `lastLoopStart=` followed by digits,
/// wherever it sits in the payload.
fn parse_loop_counter(data: &str) -> Option<u64> {
    data.match_indices(LOOP_COUNTER_FIELD).find_map(|(start, field)| {
        let value = data[start + field.len()..].strip_prefix('=')?;
        let end = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
        value[..end].parse().ok()
    })
}
