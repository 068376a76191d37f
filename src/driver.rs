//! Driver spawns and runs the serial polling task

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::fanout::Fanout;
use crate::framing::FrameReader;
use crate::provider::ByteSource;
use crate::reassembler::{ReassemblyStats, Reassembler};

/// Bytes read from the source per poll at most.
const READ_BUFFER_SIZE: usize = 4096;

/// Consecutive source failures tolerated before the task gives up.
const MAX_ERRORS: u32 = 10;

/// Counters reported when the polling task ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Bytes read from the source
    pub bytes: u64,
    /// Well-formed frames handed to the reassembler
    pub frames: u64,
    /// Frames discarded by the framing layer
    pub framing_errors: u64,
    /// Reassembly counters
    pub reassembly: ReassemblyStats,
}

/// Bytes in, transmissions out.
///
/// Chains the frame reader, the reassembler and the fanout. Protocol errors
/// are logged and counted here; none of them stop the pipeline.
pub struct Pipeline {
    reader: FrameReader,
    reassembler: Reassembler,
    fanout: Fanout,
    bytes: u64,
    frames: u64,
    framing_errors: u64,
}

impl Pipeline {
    /// Create a pipeline publishing into `fanout`
    pub fn new(fanout: Fanout) -> Self {
        Self {
            reader: FrameReader::new(),
            reassembler: Reassembler::new(),
            fanout,
            bytes: 0,
            frames: 0,
            framing_errors: 0,
        }
    }

    /// Process freshly read bytes. Returns how many transmissions completed.
    pub fn ingest(&mut self, bytes: &[u8]) -> usize {
        self.bytes += bytes.len() as u64;
        self.reader.feed(bytes);

        let mut completed = 0;
        while let Some(result) = self.reader.next_frame() {
            let frame = match result {
                Ok(frame) => frame,
                Err(e) => {
                    self.framing_errors += 1;
                    warn!("{}", e);
                    continue;
                }
            };
            self.frames += 1;

            match self.reassembler.push(frame) {
                Ok(Some(transmission)) => {
                    completed += 1;
                    self.fanout.publish(transmission);
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        completed
    }

    /// Counters so far
    pub fn stats(&self) -> DriverStats {
        DriverStats {
            bytes: self.bytes,
            frames: self.frames,
            framing_errors: self.framing_errors,
            reassembly: self.reassembler.stats(),
        }
    }
}

/// Driver spawns and manages the serial polling task
///
/// The task owns the byte source. Every iteration it reads whatever the
/// source reports as waiting, pushes it through the [`Pipeline`], then
/// sleeps for the poll interval whether or not anything was read.
pub struct Driver;

impl Driver {
    /// Spawn the polling task for `source`
    pub fn spawn<S>(
        source: S,
        fanout: Fanout,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<DriverStats>
    where
        S: ByteSource,
    {
        tokio::spawn(Self::run(source, fanout, poll_interval, cancel))
    }

    /// Run the polling loop until cancelled, the source ends or fails for good
    pub async fn run<S>(
        mut source: S,
        fanout: Fanout,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> DriverStats
    where
        S: ByteSource,
    {
        info!("Serial polling task started: {}", source.describe());
        let mut pipeline = Pipeline::new(fanout);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut error_count = 0u32;

        loop {
            if cancel.is_cancelled() {
                info!("Serial polling task cancelled");
                break;
            }

            match Self::poll_source(&mut source, &mut buf).await {
                Ok(Some(0)) => {}
                Ok(Some(n)) => {
                    error_count = 0;
                    let completed = pipeline.ingest(&buf[..n]);
                    if completed > 0 {
                        debug!("{} transmission(s) completed from {} bytes", completed, n);
                    }
                }
                Ok(None) => {
                    info!("Byte source exhausted");
                    break;
                }
                Err(e) => {
                    // Source error - don't give up on transient failures
                    error_count += 1;
                    error!("Source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many source errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => continue,
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Serial polling task cancelled during sleep");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }

        let stats = pipeline.stats();
        info!(
            "Serial polling task ended: {} bytes, {} frames, {} transmissions, {} framing errors, {} sequence errors",
            stats.bytes,
            stats.frames,
            stats.reassembly.completed,
            stats.framing_errors,
            stats.reassembly.sequence_errors
        );
        stats
    }

    /// Read waiting bytes, if any. `Ok(None)` means the source has ended.
    async fn poll_source<S: ByteSource>(source: &mut S, buf: &mut [u8]) -> crate::Result<Option<usize>> {
        match source.bytes_available().await? {
            None => Ok(None),
            Some(0) => Ok(Some(0)),
            Some(waiting) => {
                let limit = waiting.min(buf.len());
                let n = source.read_available(&mut buf[..limit]).await?;
                Ok(Some(n))
            }
        }
    }
}
