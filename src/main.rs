use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use groundlink::{Bridge, BridgeConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serial telemetry bridge: logs every transmission and streams decoded
/// samples to websocket clients
#[derive(Parser, Debug)]
#[command(name = "groundlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial port (e.g. /dev/ttyUSB0, COM3)
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baudrate: Option<u32>,

    /// Websocket port
    #[arg(long)]
    web_port: Option<u16>,

    /// Interface the websocket server listens on
    #[arg(long)]
    host: Option<std::net::IpAddr>,

    /// Name of log file with extension
    #[arg(long)]
    log: Option<PathBuf>,

    /// Overwrite the log file instead of appending
    #[arg(long)]
    overwrite: Option<bool>,

    /// Echo serial transmissions to the console
    #[arg(long)]
    debug: bool,

    /// YAML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a raw serial capture instead of opening a port
    #[arg(long, conflicts_with = "port")]
    replay: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(port) = self.port {
            config.serial_port = Some(port);
            config.replay = None;
        }
        if let Some(replay) = self.replay {
            config.replay = Some(replay);
        }
        if let Some(baud_rate) = self.baudrate {
            config.baud_rate = baud_rate;
        }
        if let Some(web_port) = self.web_port {
            config.web_port = web_port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(log) = self.log {
            config.log_file = log;
        }
        if let Some(overwrite) = self.overwrite {
            config.overwrite = overwrite;
        }
        config.debug |= self.debug;

        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "groundlink=debug" } else { "groundlink=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;
    init_tracing(config.debug);

    let bridge = Bridge::new(config).context("invalid configuration")?;
    let cancel = CancellationToken::new();

    let handle = match bridge.start(cancel.clone()).await {
        Ok(handle) => handle,
        Err(e) => {
            for suggestion in e.recovery_suggestions() {
                warn!("hint: {}", suggestion);
            }
            return Err(e).context("failed to start bridge");
        }
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                cancel.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let report = handle.wait().await;
    info!(
        "Done: {} transmissions, {} logged, {} framing errors, {} sequence errors",
        report.driver.reassembly.completed,
        report.logged,
        report.driver.framing_errors,
        report.driver.reassembly.sequence_errors
    );
    Ok(())
}
