//! Serial device source

use std::io::Read;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{info, trace};

use crate::provider::ByteSource;
use crate::{BridgeError, Result};

/// Read timeout; reads are only issued when bytes are waiting, so this
/// only bounds a read racing a device unplug.
const READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Live source reading the ground station radio over UART
pub struct SerialSource {
    port: Box<dyn SerialPort>,
    path: String,
    baud_rate: u32,
}

impl SerialSource {
    /// Open a serial port, 8N1 without flow control.
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    /// * `baud_rate` - Baud rate (e.g., 115200)
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SerialOpen`] if the device is missing, busy or
    /// not accessible. This is fatal at startup.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| BridgeError::SerialOpen { path: path.to_string(), source })?;

        info!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self { port, path: path.to_string(), baud_rate })
    }

    /// Configured baud rate
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

#[async_trait::async_trait]
impl ByteSource for SerialSource {
    async fn bytes_available(&mut self) -> Result<Option<usize>> {
        let waiting = self.port.bytes_to_read().map_err(|e| BridgeError::Source {
            reason: format!("cannot query {}", self.path),
            source: Some(Box::new(e)),
        })?;
        Ok(Some(waiting as usize))
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => {
                trace!("Read {} bytes from {}", n, self.path);
                Ok(n)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(BridgeError::source_failed(format!("read from {} failed", self.path), e)),
        }
    }

    fn describe(&self) -> String {
        format!("serial {} @ {} baud", self.path, self.baud_rate)
    }
}
