//! Transmission log: formatted lines into a batching sink
//!
//! The logger is one of the fanout consumers. It formats every transmission
//! as a single line and hands it to a [`LogSink`]. The file sink batches
//! lines in memory and writes them out once the batch passes a threshold,
//! and again when it is dropped, so a shutdown (clean or not) never loses
//! buffered lines that made it into the sink.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::fanout::ConsumerQueue;
use crate::types::Transmission;
use crate::{BridgeError, Result};

/// Lines buffered before the file sink writes a batch.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;

/// Format one log line: `[number]\t(TYPE)\tdata`
pub fn format_line(transmission: &Transmission) -> String {
    format!(
        "[{}]\t({})\t{}",
        transmission.transmission_number(),
        transmission.kind(),
        transmission.data()
    )
}

/// Destination for formatted log lines
pub trait LogSink: Send {
    /// Queue one line
    fn write(&mut self, line: String) -> Result<()>;

    /// Persist everything queued so far
    fn flush(&mut self) -> Result<()>;
}

/// Batching file sink.
///
/// With `overwrite` set, the first batch written truncates the file; every
/// later batch appends.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lines: Vec<String>,
    flush_threshold: usize,
    truncate_pending: bool,
}

impl FileSink {
    /// Create a sink for `path`. Nothing touches the file until the first flush.
    pub fn new(path: impl Into<PathBuf>, flush_threshold: usize, overwrite: bool) -> Self {
        Self { path: path.into(), lines: Vec::new(), flush_threshold, truncate_pending: overwrite }
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines buffered but not yet written
    pub fn pending(&self) -> usize {
        self.lines.len()
    }
}

impl LogSink for FileSink {
    fn write(&mut self, line: String) -> Result<()> {
        self.lines.push(line);
        if self.lines.len() > self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.lines.is_empty() {
            return Ok(());
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if self.truncate_pending {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }

        let mut batch = self.lines.join("\n");
        batch.push('\n');

        let mut file =
            options.open(&self.path).map_err(|e| BridgeError::file_error(&self.path, e))?;
        file.write_all(batch.as_bytes()).map_err(|e| BridgeError::file_error(&self.path, e))?;

        debug!("Flushed {} log lines to {}", self.lines.len(), self.path.display());
        self.lines.clear();
        self.truncate_pending = false;
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Final log flush failed: {}", e);
        }
    }
}

/// Fanout consumer that writes every transmission to a sink.
///
/// Owns its sink; dropping the logger flushes it on every exit path.
pub struct TransmissionLogger<S: LogSink> {
    sink: S,
    queue: ConsumerQueue,
    echo: bool,
    written: u64,
}

impl<S: LogSink> TransmissionLogger<S> {
    /// Create a logger draining `queue` into `sink`.
    ///
    /// With `echo` set, each line is also emitted as a tracing event.
    pub fn new(sink: S, queue: ConsumerQueue, echo: bool) -> Self {
        Self { sink, queue, echo, written: 0 }
    }

    /// Format and write one transmission
    pub fn log(&mut self, transmission: &Transmission) -> Result<()> {
        let line = format_line(transmission);
        if self.echo {
            info!(target: "groundlink::transmissions", "{}", line);
        }
        self.sink.write(line)?;
        self.written += 1;
        Ok(())
    }

    /// Lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Access the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Drain the queue until cancelled or the fanout goes away.
    ///
    /// Transmissions already queued at cancellation are still written.
    /// Returns the number of lines written.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<u64> {
        info!("Transmission logger started");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Transmission logger cancelled");
                    break;
                }
                next = self.queue.recv() => next,
            };

            match next {
                Some(transmission) => self.log_or_report(&transmission),
                None => {
                    debug!("Fanout closed, logger stopping");
                    break;
                }
            }
        }

        while let Ok(transmission) = self.queue.try_recv() {
            self.log_or_report(&transmission);
        }

        self.sink.flush()?;
        info!("Transmission logger stopped ({} lines)", self.written);
        Ok(self.written)
    }

    fn log_or_report(&mut self, transmission: &Transmission) {
        if let Err(e) = self.log(transmission) {
            error!("Failed to log transmission {}: {}", transmission.transmission_number(), e);
        }
    }
}

impl<S: LogSink> Drop for TransmissionLogger<S> {
    fn drop(&mut self) {
        if let Err(e) = self.sink.flush() {
            warn!("Final log flush failed: {}", e);
        }
    }
}
