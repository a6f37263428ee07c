/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The checksum trailer does not match the received payload.
    #[error("checksum mismatch (declared {declared:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { declared: u32, computed: u32 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete frame or line was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the underlying read or write timed out.
    ///
    /// Timeouts leave buffered data intact, so the operation can be retried.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(err.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classification() {
        let timed_out = FrameError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut));
        let would_block = FrameError::Io(std::io::Error::from(std::io::ErrorKind::WouldBlock));
        let broken = FrameError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));

        assert!(timed_out.is_timeout());
        assert!(would_block.is_timeout());
        assert!(!broken.is_timeout());
        assert!(!FrameError::ConnectionClosed.is_timeout());
    }

    #[test]
    fn mismatch_message_shows_both_sums() {
        let err = FrameError::ChecksumMismatch {
            declared: 509,
            computed: 510,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch (declared 0x000001fd, computed 0x000001fe)"
        );
    }
}
