//! Length-prefixed, checksum-trailed framing for serial provisioning links.
//!
//! Every binary payload exchanged with the device is framed as:
//! - A 4-byte little-endian payload length
//! - The payload bytes
//! - A 4-byte little-endian additive checksum of the payload
//!
//! The same stream also carries newline-terminated text commands, so the
//! reader serves both lines and frames from a single receive buffer.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    checksum, decode_frame, encode_frame, Frame, FrameConfig, CHECKSUM_SIZE, DEFAULT_MAX_PAYLOAD,
    LENGTH_SIZE, OVERHEAD,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
