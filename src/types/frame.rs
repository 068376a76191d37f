//! Wire frame type

use crate::{BridgeError, Result};

/// Byte that terminates every wire frame (`@`).
pub const DELIMITER: u8 = 0x40;

/// Header bytes preceding the payload.
pub const HEADER_LEN: usize = 3;

/// Shortest well-formed frame: header plus delimiter.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// One delimiter-terminated wire unit.
///
/// Layout: `[transmission_number][packet_number][packet_count][payload..][0x40]`.
/// Frames are transient; the reassembler consumes them by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Transmission counter, wraps at 255
    pub transmission_number: u8,

    /// Index of this packet within its transmission
    pub packet_number: u8,

    /// Total packets in the transmission
    pub packet_count: u8,

    /// Payload text, lossily decoded
    pub payload: String,
}

impl Frame {
    /// Parse a raw delimiter-terminated segment.
    ///
    /// Segments shorter than [`MIN_FRAME_LEN`], segments not ending in the
    /// delimiter and headers announcing zero packets are framing errors.
    /// Invalid UTF-8 in the payload is replaced, never rejected.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < MIN_FRAME_LEN {
            return Err(BridgeError::framing(format!(
                "frame of {} bytes is shorter than the {} byte minimum",
                raw.len(),
                MIN_FRAME_LEN
            )));
        }

        let Some((&last, body)) = raw.split_last() else {
            return Err(BridgeError::framing("empty frame"));
        };
        if last != DELIMITER {
            return Err(BridgeError::framing(format!(
                "frame ends with {:#04x} instead of the delimiter",
                last
            )));
        }

        let packet_count = body[2];
        if packet_count == 0 {
            return Err(BridgeError::framing("header announces zero packets"));
        }

        Ok(Self {
            transmission_number: body[0],
            packet_number: body[1],
            packet_count,
            payload: String::from_utf8_lossy(&body[HEADER_LEN..]).into_owned(),
        })
    }

    /// Whether this frame opens a new transmission.
    pub fn is_first(&self) -> bool {
        self.packet_number == 0
    }

    /// Whether this frame closes its transmission.
    pub fn is_last(&self) -> bool {
        self.packet_number == self.packet_count.saturating_sub(1)
    }
}
