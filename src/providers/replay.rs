//! Replay source for captured serial streams

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::provider::ByteSource;
use crate::{BridgeError, Result};

/// Bytes released per poll by default; roughly what a 115200 baud link
/// delivers in 10 ms.
pub const DEFAULT_REPLAY_CHUNK: usize = 128;

/// Source that replays a raw capture of the serial link
///
/// The capture is loaded into memory and handed out a chunk per poll, so a
/// recorded flight moves through the pipeline at roughly link speed.
pub struct ReplaySource {
    data: Vec<u8>,
    position: usize,
    chunk_size: usize,
    origin: PathBuf,
}

impl ReplaySource {
    /// Load a capture file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| BridgeError::file_error(path, e))?;
        info!("Loaded capture {}: {} bytes", path.display(), data.len());
        Ok(Self::with_origin(data, path.to_path_buf()))
    }

    /// Replay bytes already in memory (for testing)
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::with_origin(data.into(), PathBuf::from("<memory>"))
    }

    fn with_origin(data: Vec<u8>, origin: PathBuf) -> Self {
        Self { data, position: 0, chunk_size: DEFAULT_REPLAY_CHUNK, origin }
    }

    /// Release at most `chunk_size` bytes per poll (minimum 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Bytes handed out so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Capture length in bytes
    pub fn total_bytes(&self) -> usize {
        self.data.len()
    }
}

#[async_trait::async_trait]
impl ByteSource for ReplaySource {
    async fn bytes_available(&mut self) -> Result<Option<usize>> {
        let remaining = self.data.len() - self.position;
        if remaining == 0 {
            debug!("Reached end of capture {}", self.origin.display());
            return Ok(None);
        }
        Ok(Some(remaining.min(self.chunk_size)))
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let end = (self.position + self.chunk_size.min(buf.len())).min(self.data.len());
        let n = end - self.position;
        buf[..n].copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(n)
    }

    fn describe(&self) -> String {
        format!("replay {}", self.origin.display())
    }
}
