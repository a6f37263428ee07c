//! Serial link transport for the provisioning console.
//!
//! This is the lowest layer of mfgprov. It opens the bench serial port,
//! splits it into independently owned reader and writer handles, and lists
//! the ports available on the host. Everything else builds on the
//! [`SerialLink`] type provided here.

pub mod error;
pub mod link;
pub mod ports;

pub use error::{Result, TransportError};
pub use link::{LinkConfig, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_POLL_INTERVAL};
pub use ports::{available_ports, PortInfo};
