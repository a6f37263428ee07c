use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Longest line held back while waiting for a newline.
///
/// Longer runs of text without a newline are handed out in pieces of this
/// size so diagnostic chatter cannot grow the buffer without bound.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Reads text lines and complete frames from any `Read` stream.
///
/// Lines and frames share one receive buffer: bytes read ahead while looking
/// for a newline are still available to the next `read_frame`. Handles
/// partial reads internally; callers always get whole lines and frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// The checksum is reported, not enforced: check [`Frame::is_verified`].
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// timed-out read returns `FrameError::Io` and keeps what was buffered,
    /// so calling again resumes the same frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.poll_frame()? {
                return Ok(frame);
            }
        }
    }

    /// Make one read's worth of progress towards the next frame.
    ///
    /// Returns `Ok(None)` while the frame is still incomplete so the caller
    /// can check deadlines and cancellation between chunks. Errors match
    /// [`FrameReader::read_frame`].
    pub fn poll_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode_buffered()? {
            return Ok(Some(frame));
        }
        self.fill()?;
        self.decode_buffered()
    }

    fn decode_buffered(&mut self) -> Result<Option<Frame>> {
        let frame = decode_frame(&mut self.buf, self.config.max_payload_size)?;
        if let Some(frame) = &frame {
            trace!(size = frame.payload.len(), "frame received");
        }
        Ok(frame)
    }

    /// Read the next newline-terminated line (blocking).
    ///
    /// The trailing `\n` or `\r\n` is stripped. Bytes are returned undecoded;
    /// the device may emit non-UTF-8 chatter.
    pub fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                return Ok(line.freeze());
            }
            if self.buf.len() >= MAX_LINE_LENGTH {
                debug!(size = self.buf.len(), "overlong line split");
                return Ok(self.buf.split_to(MAX_LINE_LENGTH).freeze());
            }
            self.fill()?;
        }
    }

    /// Drop anything received but not yet consumed.
    ///
    /// Returns the number of bytes discarded.
    pub fn discard_buffered(&mut self) -> usize {
        let dropped = self.buf.len();
        self.buf.clear();
        dropped
    }

    /// Number of bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
            return Ok(());
        }
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.payload.as_ref(), b"hello");
        assert!(frame.is_verified());
    }

    #[test]
    fn read_mismatched_frame_reports_unverified() {
        let wire = vec![0x02, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFD, 0x01, 0x00, 0x00];
        let mut reader = FrameReader::new(Cursor::new(wire));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.payload.as_ref(), &[0xFF, 0xFF]);
        assert!(!frame.is_verified());
    }

    #[test]
    fn read_empty_frame() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8; 8]));
        let frame = reader.read_frame().unwrap();
        assert!(frame.payload.is_empty());
        assert!(frame.is_verified());
    }

    #[test]
    fn lines_and_frames_share_the_buffer() {
        let mut wire = BytesMut::new();
        wire.put_slice(b"MFG:ekcert\r\n");
        encode_frame(b"cert-bytes", &mut wire).unwrap();
        wire.put_slice(b"MFG:success\r\n");

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_line().unwrap().as_ref(), b"MFG:ekcert");
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"cert-bytes");
        assert_eq!(reader.read_line().unwrap().as_ref(), b"MFG:success");
    }

    #[test]
    fn line_endings_are_stripped() {
        let wire = b"crlf\r\nlf\n\r\n\n".to_vec();
        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(reader.read_line().unwrap().as_ref(), b"crlf");
        assert_eq!(reader.read_line().unwrap().as_ref(), b"lf");
        assert_eq!(reader.read_line().unwrap().as_ref(), b"");
        assert_eq!(reader.read_line().unwrap().as_ref(), b"");
    }

    #[test]
    fn non_utf8_line_is_returned_raw() {
        let wire = vec![0xC3, 0x28, 0xFF, b'\n'];
        let mut reader = FrameReader::new(Cursor::new(wire));
        assert_eq!(reader.read_line().unwrap().as_ref(), &[0xC3, 0x28, 0xFF]);
    }

    #[test]
    fn overlong_line_is_split() {
        let mut wire = vec![b'x'; MAX_LINE_LENGTH + 10];
        wire.push(b'\n');
        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(reader.read_line().unwrap().len(), MAX_LINE_LENGTH);
        assert_eq!(reader.read_line().unwrap().len(), 10);
    }

    #[test]
    fn partial_line_at_eof_is_connection_closed() {
        let mut reader = FrameReader::new(Cursor::new(b"MFG:succ".to_vec()));
        let err = reader.read_line().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        wire.put_slice(b"MFG:ekpublic\n");
        encode_frame(b"slow", &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        assert_eq!(reader.read_line().unwrap().as_ref(), b"MFG:ekpublic");
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn poll_frame_returns_after_each_chunk() {
        let mut wire = BytesMut::new();
        encode_frame(b"abc", &mut wire).unwrap();
        let total = wire.len();

        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        });

        for expected in 1..total {
            assert!(reader.poll_frame().unwrap().is_none());
            assert_eq!(reader.buffered(), expected);
        }
        let frame = reader.poll_frame().unwrap().expect("last byte completes the frame");
        assert_eq!(frame.payload.as_ref(), b"abc");
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn poll_frame_decodes_buffered_frame_without_reading() {
        let mut wire = BytesMut::new();
        wire.put_slice(b"MFG:ekpublic\n");
        encode_frame(b"one", &mut wire).unwrap();
        encode_frame(b"two", &mut wire).unwrap();

        let mut reader = FrameReader::new(TimeoutAfter {
            bytes: wire.to_vec(),
            pos: 0,
        });

        assert_eq!(reader.read_line().unwrap().as_ref(), b"MFG:ekpublic");
        let first = reader.poll_frame().unwrap().expect("first frame is buffered");
        let second = reader.poll_frame().unwrap().expect("second frame is buffered");
        assert_eq!(first.payload.as_ref(), b"one");
        assert_eq!(second.payload.as_ref(), b"two");
        assert!(reader.poll_frame().unwrap_err().is_timeout());
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(16);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_u32_le(1024);
        wire.put_slice(b"next\n");

        let cfg = FrameConfig {
            max_payload_size: 16,
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 1024, max: 16 }));
        assert_eq!(reader.read_line().unwrap().as_ref(), b"next");
    }

    #[test]
    fn discard_buffered_drops_partial_frame() {
        let mut wire = BytesMut::new();
        wire.put_u32_le(100);
        wire.put_slice(b"partial");

        let mut reader = FrameReader::new(TimeoutAfter {
            bytes: wire.to_vec(),
            pos: 0,
        });
        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(reader.buffered(), 4 + 7);
        assert_eq!(reader.discard_buffered(), 11);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn timeout_keeps_buffer_for_resume() {
        let mut wire = BytesMut::new();
        encode_frame(b"resumable", &mut wire).unwrap();
        let (head, tail) = wire.split_at(6);

        let mut reader = FrameReader::new(ScriptedReader::new(vec![
            Ok(head.to_vec()),
            Err(ErrorKind::TimedOut),
            Ok(tail.to_vec()),
        ]));

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"resumable");
        assert!(frame.is_verified());
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(b"ok", &mut wire).unwrap();

        let mut reader = FrameReader::new(ScriptedReader::new(vec![
            Err(ErrorKind::Interrupted),
            Ok(wire.to_vec()),
        ]));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    /// Serves its bytes, then times out forever.
    struct TimeoutAfter {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for TimeoutAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct ScriptedReader {
        script: std::collections::VecDeque<std::result::Result<Vec<u8>, ErrorKind>>,
    }

    impl ScriptedReader {
        fn new(script: Vec<std::result::Result<Vec<u8>, ErrorKind>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.script.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(kind)) => Err(std::io::Error::from(kind)),
                None => Ok(0),
            }
        }
    }
}
