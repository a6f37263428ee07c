use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix: 4 bytes, little-endian.
pub const LENGTH_SIZE: usize = 4;

/// Checksum trailer: 4 bytes, little-endian.
pub const CHECKSUM_SIZE: usize = 4;

/// Bytes added around every payload on the wire.
pub const OVERHEAD: usize = LENGTH_SIZE + CHECKSUM_SIZE;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Additive checksum of a payload: the sum of every byte value mod 2^32.
///
/// This only catches simple line noise. Addition is commutative, so any
/// permutation of the payload produces the same sum and reordered or
/// transposed bytes go unnoticed. The device computes the same sum, so this
/// must stay exactly as weak as it is.
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

/// A framed payload together with the checksum that accompanies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The payload bytes.
    pub payload: Bytes,
    /// The checksum carried in the trailer (declared by the sender).
    pub checksum: u32,
}

impl Frame {
    /// Create a frame for `payload` with its computed checksum.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum(&payload);
        Self { payload, checksum }
    }

    /// Checksum recomputed over the payload as received.
    pub fn computed_checksum(&self) -> u32 {
        checksum(&self.payload)
    }

    /// Whether the declared checksum matches the payload.
    pub fn is_verified(&self) -> bool {
        self.checksum == self.computed_checksum()
    }

    /// Return the payload if it verifies, otherwise a `ChecksumMismatch`.
    pub fn into_verified(self) -> Result<Bytes> {
        let computed = self.computed_checksum();
        if computed == self.checksum {
            Ok(self.payload)
        } else {
            Err(FrameError::ChecksumMismatch {
                declared: self.checksum,
                computed,
            })
        }
    }

    /// The total wire size of this frame (length + payload + checksum).
    pub fn wire_size(&self) -> usize {
        OVERHEAD + self.payload.len()
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┬──────────────┐
/// │ Length       │ Payload          │ Checksum     │
/// │ (4B LE)      │ (Length bytes)   │ (4B LE)      │
/// └──────────────┴──────────────────┴──────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(OVERHEAD + payload.len());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    dst.put_u32_le(checksum(payload));
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. The checksum is not
/// enforced here; see [`Frame::is_verified`].
///
/// An oversized length prefix is consumed before the error is returned, so
/// the caller can fall back to reading lines from what follows.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < LENGTH_SIZE {
        return Ok(None); // Need more data
    }

    let mut length = [0u8; LENGTH_SIZE];
    length.copy_from_slice(&src[..LENGTH_SIZE]);
    let payload_len = u32::from_le_bytes(length) as usize;

    if payload_len > max_payload {
        src.advance(LENGTH_SIZE);
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = OVERHEAD + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(LENGTH_SIZE);
    let payload = src.split_to(payload_len).freeze();
    let checksum = src.get_u32_le();

    Ok(Some(Frame { payload, checksum }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
