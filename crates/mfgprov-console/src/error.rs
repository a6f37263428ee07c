use std::path::PathBuf;

use mfgprov_frame::FrameError;

/// Errors that stop the console loop.
///
/// Device-side problems (failure commands, bad checksums, undecodable lines)
/// are reported as events instead; only host-side faults end up here.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Frame-level or link I/O error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Appending to the key-material log failed.
    #[error("failed to append to key log {path}: {source}")]
    KeyLog {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConsoleError {
    /// True when the device side of the link hung up.
    pub fn is_closed(&self) -> bool {
        matches!(self, ConsoleError::Frame(FrameError::ConnectionClosed))
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
