//! Serial port discovery.

use serialport::SerialPortType;

use crate::error::{Result, TransportError};

/// A serial port present on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS name of the port (`/dev/ttyUSB0`, `COM4`).
    pub name: String,
    /// Short description of the port kind.
    pub kind: String,
    /// USB adapter product string, when the OS reports one.
    pub product: Option<String>,
}

/// List the serial ports on this host, sorted by name.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .map_err(TransportError::Enumerate)?
        .into_iter()
        .map(|port| describe(port.port_name, &port.port_type))
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}

fn describe(name: String, port_type: &SerialPortType) -> PortInfo {
    let (kind, product) = match port_type {
        SerialPortType::UsbPort(usb) => (
            format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
            usb.product.clone(),
        ),
        SerialPortType::PciPort => ("pci".to_string(), None),
        SerialPortType::BluetoothPort => ("bluetooth".to_string(), None),
        SerialPortType::Unknown => ("unknown".to_string(), None),
    };
    PortInfo {
        name,
        kind,
        product,
    }
}
