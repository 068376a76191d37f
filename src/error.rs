//! Error types for the telemetry bridge.
//!
//! Every failure the pipeline can hit is a [`BridgeError`]. Most of them are
//! protocol-level and recoverable: the serial stream is continuous, so the
//! recovery strategy is "drop and resync" rather than retry.
//!
//! ## Error Categories
//!
//! - **Framing**: a wire frame is too short or carries an impossible header
//! - **Sequence**: a packet arrived out of order mid-reassembly
//! - **Decode**: a type decoder could not parse its payload
//! - **Consumer**: a websocket client went away mid-send
//! - **Startup**: the serial device could not be opened or the listen port bound
//!
//! ## Recovery
//!
//! ```rust
//! use groundlink::BridgeError;
//!
//! let error = BridgeError::sequence(Some(3), 5);
//! assert!(error.is_recoverable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Framing error: {reason}")]
    Framing { reason: String },

    #[error("Sequence error: expected packet {expected:?}, found {found}")]
    Sequence { expected: Option<u8>, found: u8 },

    #[error("Decode error in {kind}: {details}")]
    Decode { kind: String, details: String },

    #[error("Consumer {peer} failed")]
    Consumer {
        peer: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to open serial device {path}")]
    SerialOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to bind websocket listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Byte source error: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl BridgeError {
    /// Returns whether the pipeline keeps running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BridgeError::Framing { .. } => true,
            BridgeError::Sequence { .. } => true,
            BridgeError::Decode { .. } => true,
            BridgeError::Consumer { .. } => true,
            BridgeError::Source { .. } => true,
            BridgeError::SerialOpen { .. } => false,
            BridgeError::Bind { .. } => false,
            BridgeError::File { .. } => false,
            BridgeError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::Framing { .. } => vec![
                "Check the baud rate matches the transmitter",
                "Inspect the cable and ground connection for noise",
            ],
            BridgeError::Sequence { .. } => vec![
                "Packets were dropped on the link; the next transmission resyncs automatically",
                "Lower the transmitter rate if drops persist",
            ],
            BridgeError::Decode { .. } => vec![
                "Verify the firmware emits tag=value fields separated by tabs",
                "Check the transmission type tag matches the payload layout",
            ],
            BridgeError::Consumer { .. } => vec![
                "The client disconnected; reconnect the viewer",
                "Other clients are unaffected",
            ],
            BridgeError::SerialOpen { .. } => vec![
                "Check the device path exists and is not in use",
                "Verify permissions on the serial device (dialout group on Linux)",
                "Confirm the radio or board is plugged in",
            ],
            BridgeError::Bind { .. } => vec![
                "Choose a different websocket port",
                "Stop the process already listening on this port",
            ],
            BridgeError::Source { .. } => vec![
                "Check the serial device is still connected",
                "Restart the bridge once the device is back",
            ],
            BridgeError::File { .. } => vec![
                "Check the file path exists and is writable",
                "Ensure sufficient disk space",
            ],
            BridgeError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Run with --help to list the accepted options",
            ],
        }
    }

    /// Helper constructor for framing errors.
    pub fn framing(reason: impl Into<String>) -> Self {
        BridgeError::Framing { reason: reason.into() }
    }

    /// Helper constructor for sequence errors.
    ///
    /// `expected` is `None` when no transmission was in progress.
    pub fn sequence(expected: Option<u8>, found: u8) -> Self {
        BridgeError::Sequence { expected, found }
    }

    /// Helper constructor for decode errors.
    pub fn decode(kind: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Decode { kind: kind.into(), details: details.into() }
    }

    /// Helper constructor for consumer errors with source.
    pub fn consumer(
        peer: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Consumer { peer: peer.into(), source: Some(source) }
    }

    /// Helper constructor for byte source failures.
    pub fn source_failed(reason: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Source { reason: reason.into(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::File { path: path.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        BridgeError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
