//! Wiring of source, polling task, logger and websocket server
//!
//! [`Bridge::start`] performs every fallible startup step first (opening the
//! byte source, binding the listener) and only then spawns tasks, so a bad
//! port or device never leaves half a pipeline running.

use std::net::SocketAddr;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{BridgeConfig, SourceConfig};
use crate::decoders::DecoderRegistry;
use crate::driver::{Driver, DriverStats};
use crate::fanout::Fanout;
use crate::logger::{FileSink, TransmissionLogger};
use crate::provider::ByteSource;
use crate::providers::{ReplaySource, SerialSource};
use crate::websocket::WebSocketServer;
use crate::Result;

/// Final counters of a bridge run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeReport {
    pub driver: DriverStats,
    /// Lines written to the log file
    pub logged: u64,
}

/// Configured but not yet running bridge
#[derive(Debug, Clone)]
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    /// Validate `config` and prepare a bridge
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Open the source, bind the server and spawn all tasks.
    ///
    /// Cancelling `cancel` stops every task; [`BridgeHandle::shutdown`] does
    /// that and waits for them.
    pub async fn start(self, cancel: CancellationToken) -> Result<BridgeHandle> {
        let config = self.config;
        let source = config.source()?;

        // Open before anything is spawned; both failures are fatal
        let source: Box<dyn ByteSource> = match source {
            SourceConfig::Serial { path, baud_rate } => Box::new(SerialSource::open(&path, baud_rate)?),
            SourceConfig::Replay { path } => Box::new(ReplaySource::open(&path)?),
        };
        let server = WebSocketServer::bind(config.listen_addr()).await?;
        let local_addr = server.local_addr();

        let fanout = Fanout::new();
        let registry = DecoderRegistry::with_sea_level(config.sea_level_hpa);

        // Logger subscribes before the first byte is read
        let sink = FileSink::new(&config.log_file, config.flush_threshold, config.overwrite);
        let logger = TransmissionLogger::new(sink, fanout.subscribe(), config.debug);
        let logger = tokio::spawn(logger.run(cancel.clone()));

        let server = tokio::spawn(server.run(fanout.clone(), registry, cancel.clone()));
        let driver = Driver::spawn(source, fanout, config.poll_interval(), cancel.clone());

        info!(
            "Bridge running: logging to {}, clients on ws://{}",
            config.log_file.display(),
            local_addr
        );

        Ok(BridgeHandle { local_addr, cancel, driver, logger, server })
    }
}

/// Handle onto a running bridge
pub struct BridgeHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    driver: JoinHandle<DriverStats>,
    logger: JoinHandle<Result<u64>>,
    server: JoinHandle<Result<()>>,
}

impl BridgeHandle {
    /// Address websocket clients connect to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Token that stops the bridge when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the polling task to end (source exhausted, too many source
    /// errors or cancellation), then shut everything down.
    pub async fn wait(mut self) -> BridgeReport {
        let driver = match (&mut self.driver).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Polling task failed: {}", e);
                DriverStats::default()
            }
        };
        self.cancel.cancel();
        let logged = Self::join_rest(self.logger, self.server).await;
        BridgeReport { driver, logged }
    }

    /// Cancel every task and wait for them to finish
    pub async fn shutdown(self) -> BridgeReport {
        self.cancel.cancel();
        self.wait().await
    }

    async fn join_rest(logger: JoinHandle<Result<u64>>, server: JoinHandle<Result<()>>) -> u64 {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("WebSocket server failed: {}", e),
            Err(e) => error!("WebSocket server task failed: {}", e),
        }

        match logger.await {
            Ok(Ok(logged)) => logged,
            Ok(Err(e)) => {
                error!("Transmission logger failed: {}", e);
                0
            }
            Err(e) => {
                error!("Transmission logger task failed: {}", e);
                0
            }
        }
    }
}
