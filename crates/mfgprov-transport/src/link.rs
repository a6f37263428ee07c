use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Baud rate the provisioning firmware listens on.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a read blocks before handing control back to the caller.
///
/// A timed-out read is not a fault: it lets the console loop notice a
/// cancellation request while the device is quiet.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Port name (e.g. `/dev/ttyUSB0` or `COM4`).
    pub port: String,
    /// Line speed. Default: 115200.
    pub baud_rate: u32,
    /// Per-read timeout. Default: 200 ms.
    pub poll_interval: Duration,
}

impl LinkConfig {
    /// Settings for `port` with the default baud rate and poll interval.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// An open serial connection to the device under provisioning.
///
/// Implements `Read + Write`; 8 data bits, no parity, one stop bit and no
/// flow control, matching the device's UART setup.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open the port described by `config`.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.poll_interval)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(port = %config.port, baud = config.baud_rate, "serial link open");
        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    /// Clone the handle so reads and writes can be owned separately.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self.port.try_clone()?;
        debug!(port = %self.name, "cloned serial link handle");
        Ok(Self {
            port,
            name: self.name.clone(),
        })
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.name)
            .finish()
    }
}
