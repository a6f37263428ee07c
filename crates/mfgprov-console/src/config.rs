use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use mfgprov_frame::FrameConfig;

/// Placeholder first MAC word.
pub const DEFAULT_MAC0: u32 = 0xDEAD_BEEF;

/// Placeholder second MAC word.
pub const DEFAULT_MAC1: u32 = 0x0000_BAD0;

/// Host-check token, "MFGH" read as a little-endian integer.
pub const DEFAULT_HOST_TOKEN: u32 = 0x4D46_4748;

/// Bytes of the EK certificate payload that hold the certificate itself.
pub const DEFAULT_EK_CERT_RANGE: Range<usize> = 10..326;

/// Placeholder system serial number, newline included.
pub const DEFAULT_SERIAL_NUMBER: &[u8] = b"RealSerialNumber123456789\n";

/// Everything the console answers the device with.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// First MAC word sent for `MFG:reqmac`.
    pub mac0: u32,
    /// Second MAC word sent for `MFG:reqmac`.
    pub mac1: u32,
    /// Token sent for `MFG:hostcheck`.
    pub host_token: u32,
    /// Certificate file sent for `MFG:devicecert`.
    pub device_cert: Option<PathBuf>,
    /// Certificate file sent for `MFG:ekcertificate`; falls back to `device_cert`.
    pub ek_certificate: Option<PathBuf>,
    /// Bytes sent for `MFG:smbiossystemserial`.
    pub serial_number: Vec<u8>,
    /// Append-only log of received key material.
    pub ek_log: PathBuf,
    /// Sub-range of an `MFG:ekcert` payload that is recorded.
    pub ek_cert_range: Range<usize>,
    /// Frame limits for both directions.
    pub frame: FrameConfig,
    /// Give up on a key-material frame not completed within this long.
    /// `None` waits indefinitely.
    pub exchange_timeout: Option<Duration>,
}

impl ConsoleConfig {
    /// Certificate file for `MFG:ekcertificate`.
    pub fn ek_certificate_path(&self) -> Option<&PathBuf> {
        self.ek_certificate.as_ref().or(self.device_cert.as_ref())
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            mac0: DEFAULT_MAC0,
            mac1: DEFAULT_MAC1,
            host_token: DEFAULT_HOST_TOKEN,
            device_cert: None,
            ek_certificate: None,
            serial_number: DEFAULT_SERIAL_NUMBER.to_vec(),
            ek_log: PathBuf::from("mfgek.txt"),
            ek_cert_range: DEFAULT_EK_CERT_RANGE,
            frame: FrameConfig::default(),
            exchange_timeout: None,
        }
    }
}
