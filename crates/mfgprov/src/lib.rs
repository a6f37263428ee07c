//! Factory provisioning console for devices on a serial link.
//!
//! mfgprov answers a device's provisioning requests (MAC address, host
//! check, certificates, serial number) and collects the endorsement-key
//! material it sends back.
//!
//! # Crate Structure
//!
//! - [`transport`] — Serial link (open, split, port discovery)
//! - [`frame`] — Length-prefixed, checksum-trailed framing
//! - [`console`] — Device command table and the dispatch loop

/// Re-export transport types.
pub mod transport {
    pub use mfgprov_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mfgprov_frame::*;
}

/// Re-export console types.
pub mod console {
    pub use mfgprov_console::*;
}
