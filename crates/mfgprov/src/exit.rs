use std::fmt;
use std::io;

use mfgprov_console::ConsoleError;
use mfgprov_frame::FrameError;
use mfgprov_transport::TransportError;

// Process exit codes; sysexits-style values where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn code_for_io_kind(kind: io::ErrorKind, fallback: i32) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => fallback,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => FAILURE,
        kind => code_for_io_kind(kind, INTERNAL),
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = err
        .io_kind()
        .map(|kind| code_for_io_kind(kind, TRANSPORT_ERROR))
        .unwrap_or(TRANSPORT_ERROR);
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => CliError::new(
            code_for_io_kind(source.kind(), TRANSPORT_ERROR),
            format!("{context}: {source}"),
        ),
        FrameError::PayloadTooLarge { .. } | FrameError::ChecksumMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn console_error(context: &str, err: ConsoleError) -> CliError {
    match err {
        ConsoleError::Frame(err) => frame_error(context, err),
        ConsoleError::KeyLog { source, .. } => io_error(context, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_io_failure_is_transport_error() {
        let err = TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        let cli = transport_error("open failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("open failed: transport I/O error"));
    }

    #[test]
    fn permission_denied_maps_to_50() {
        let err = TransportError::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(transport_error("open failed", err).code, PERMISSION_DENIED);
    }

    #[test]
    fn frame_errors_map_to_codes() {
        let too_large = FrameError::PayloadTooLarge { size: 10, max: 4 };
        assert_eq!(frame_error("x", too_large).code, DATA_INVALID);
        assert_eq!(frame_error("x", FrameError::ConnectionClosed).code, FAILURE);
        let broken = FrameError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(frame_error("x", broken).code, TRANSPORT_ERROR);
    }

    #[test]
    fn missing_file_is_failure() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(io_error("read failed", err).code, FAILURE);
    }
}
