//! Bridge configuration
//!
//! Every field has a default, so a YAML file only needs the settings it
//! changes. The binary layers command line flags on top.
//!
//! ```rust
//! use groundlink::BridgeConfig;
//!
//! let config = BridgeConfig::from_yaml_str("serial_port: /dev/ttyUSB0\nweb_port: 6000\n").unwrap();
//! assert_eq!(config.baud_rate, 115200);
//! assert_eq!(config.listen_addr().port(), 6000);
//! config.validate().unwrap();
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::decoders::SEA_LEVEL_PRESSURE_HPA;
use crate::logger::DEFAULT_FLUSH_THRESHOLD;
use crate::{BridgeError, Result};

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default websocket port
pub const DEFAULT_WEB_PORT: u16 = 5001;

/// Default log destination
pub const DEFAULT_LOG_FILE: &str = "log.log";

/// Default pause between serial polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Where telemetry bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Live serial device
    Serial { path: String, baud_rate: u32 },
    /// Recorded capture file
    Replay { path: PathBuf },
}

/// Runtime settings for the bridge
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    /// Interface the websocket server listens on
    pub host: IpAddr,
    pub web_port: u16,
    pub log_file: PathBuf,
    /// Truncate the log file on the first flush instead of appending
    pub overwrite: bool,
    /// Echo every logged line through tracing
    pub debug: bool,
    /// Buffered log lines that trigger a flush
    pub flush_threshold: usize,
    pub poll_interval_ms: u64,
    /// Reference pressure (hPa) for barometric altitude
    pub sea_level_hpa: f64,
    /// Replay this capture instead of opening the serial device
    pub replay: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            web_port: DEFAULT_WEB_PORT,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            overwrite: true,
            debug: false,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            sea_level_hpa: SEA_LEVEL_PRESSURE_HPA,
            replay: None,
        }
    }
}

impl BridgeConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| BridgeError::config(format!("invalid YAML: {}", e)))
    }

    /// Load a YAML config file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BridgeError::file_error(path, e))?;
        Self::from_yaml_str(&text)
            .map_err(|e| BridgeError::config(format!("{}: {}", path.display(), e)))
    }

    /// Check settings that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<()> {
        if self.serial_port.is_none() && self.replay.is_none() {
            return Err(BridgeError::config("no serial port or replay capture given"));
        }
        if self.baud_rate == 0 {
            return Err(BridgeError::config("baud_rate must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(BridgeError::config("poll_interval_ms must be positive"));
        }
        if !(self.sea_level_hpa.is_finite() && self.sea_level_hpa > 0.0) {
            return Err(BridgeError::config(format!(
                "sea_level_hpa must be a positive pressure, got {}",
                self.sea_level_hpa
            )));
        }
        Ok(())
    }

    /// The byte source to open. A replay capture wins over a serial port.
    pub fn source(&self) -> Result<SourceConfig> {
        match (&self.replay, &self.serial_port) {
            (Some(path), _) => Ok(SourceConfig::Replay { path: path.clone() }),
            (None, Some(path)) => Ok(SourceConfig::Serial { path: path.clone(), baud_rate: self.baud_rate }),
            (None, None) => Err(BridgeError::config("no serial port or replay capture given")),
        }
    }

    /// Websocket listen address
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.web_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
