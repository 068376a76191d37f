//! Delimiter framing for the serial byte stream
//!
//! The transmitter terminates every frame with `0x40`. The same byte may also
//! appear as the transmission number in a header, which makes the stream look
//! like it holds an empty frame. A lone delimiter segment is therefore carried
//! over and prepended to the segment that follows it.

use tracing::trace;

use crate::types::{DELIMITER, Frame};
use crate::{BridgeError, Result};

/// Longest partial segment buffered before it is dropped as line noise.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Incremental frame extractor.
///
/// Bytes are pushed with [`FrameReader::feed`] as they arrive; complete frames
/// are pulled with [`FrameReader::next_frame`]. Neither call blocks.
///
/// ```rust
/// use groundlink::FrameReader;
///
/// let mut reader = FrameReader::new();
/// reader.feed(b"\x01\x00\x01LOG boot");
/// assert!(reader.next_frame().is_none());
///
/// reader.feed(b"@");
/// let frame = reader.next_frame().unwrap().unwrap();
/// assert_eq!(frame.payload, "LOG boot");
/// ```
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
    carry: bool,
}

impl FrameReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the source
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pull the next complete frame, if one is buffered.
    ///
    /// Returns `Some(Err(_))` for a malformed frame; the bytes are consumed
    /// either way, so the caller just keeps pulling.
    pub fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            let Some(end) = self.buffer.iter().position(|&b| b == DELIMITER) else {
                return self.check_overflow();
            };

            let segment: Vec<u8> = self.buffer.drain(..=end).collect();

            if segment.len() == 1 && !self.carry {
                trace!("Lone delimiter, carrying into next segment");
                self.carry = true;
                continue;
            }

            let raw = if std::mem::take(&mut self.carry) {
                let mut raw = Vec::with_capacity(segment.len() + 1);
                raw.push(DELIMITER);
                raw.extend_from_slice(&segment);
                raw
            } else {
                segment
            };

            trace!("Raw frame: {} bytes", raw.len());
            return Some(Frame::parse(&raw));
        }
    }

    /// Bytes held waiting for a delimiter
    pub fn buffered(&self) -> usize {
        self.buffer.len() + usize::from(self.carry)
    }

    fn check_overflow(&mut self) -> Option<Result<Frame>> {
        if self.buffer.len() <= MAX_FRAME_LEN {
            return None;
        }

        let dropped = self.buffered();
        self.buffer.clear();
        self.carry = false;
        Some(Err(BridgeError::framing(format!(
            "no delimiter within {} bytes, dropped {} buffered bytes",
            MAX_FRAME_LEN, dropped
        ))))
    }
}
