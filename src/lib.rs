//! Serial telemetry bridge for rocket ground stations.
//!
//! Groundlink reads the flight computer's framed byte stream from a serial
//! radio, reassembles multi-packet transmissions, logs every one of them and
//! streams decoded samples to any number of live websocket viewers.
//!
//! # Pipeline
//!
//! ```text
//! ByteSource -> FrameReader -> Reassembler -> Fanout -+-> TransmissionLogger -> log file
//!                                                     +-> ClientBroadcaster (per client)
//!                                                           -> DecoderRegistry -> JSON
//! ```
//!
//! - **Framing**: frames end with `0x40`; see [`FrameReader`]
//! - **Reassembly**: ordered packets of one transmission; see [`Reassembler`]
//! - **Decoding**: per-type payload parsing; see [`DecoderRegistry`]
//! - **Fan-out**: one unbounded queue per consumer; see [`Fanout`]
//!
//! ## Example (replay a capture)
//!
//! ```rust,no_run
//! use groundlink::{Bridge, BridgeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig { replay: Some("flight.bin".into()), ..Default::default() };
//!     let handle = Bridge::new(config)?.start(CancellationToken::new()).await?;
//!     println!("clients connect to ws://{}", handle.local_addr());
//!
//!     let report = handle.wait().await;
//!     println!("{} transmissions", report.driver.reassembly.completed);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Protocol
pub mod decoders;
pub mod framing;
pub mod reassembler;

// Pipeline
pub mod driver;
pub mod fanout;
pub mod logger;
pub mod provider;
pub mod providers;
pub mod websocket;

// Orchestration
pub mod bridge;
pub mod config;

// Core exports
pub use error::*;
pub use types::*;

pub use bridge::{Bridge, BridgeHandle, BridgeReport};
pub use config::{BridgeConfig, SourceConfig};
pub use decoders::{Decoder, DecoderRegistry};
pub use driver::{Driver, DriverStats, Pipeline};
pub use fanout::{ConsumerQueue, Fanout};
pub use framing::FrameReader;
pub use logger::{FileSink, LogSink, TransmissionLogger};
pub use provider::ByteSource;
pub use providers::{ReplaySource, SerialSource};
pub use reassembler::{ReassemblyStats, Reassembler};
pub use websocket::{ClientBroadcaster, WebSocketServer};
