//! Fixed-capacity staging buffer for extended frame payloads.
//!
//! The buffer separates *capacity* (always [`MAX_EXTENDED_PAYLOAD`]) from the
//! number of bytes actually staged.  Only the staged bytes are ever handed to
//! the encoder, so unused capacity never reaches the wire.

use crate::protocol::codec::ProtocolError;
use crate::protocol::messages::{AxisVector, AXIS_VECTOR_SIZE, MAX_EXTENDED_PAYLOAD};

// Evaluated per `N` at monomorphisation; an oversized array fails to compile.
struct FitsStaging<const N: usize>;

impl<const N: usize> FitsStaging<N> {
    const OK: () = assert!(N <= MAX_EXTENDED_PAYLOAD, "array exceeds the staging capacity");
}

/// A stack-allocated buffer of at most [`MAX_EXTENDED_PAYLOAD`] bytes.
///
/// # Examples
///
/// ```rust
/// use quadlink_core::PayloadBuffer;
///
/// let mut buf = PayloadBuffer::new();
/// buf.push_u32(500).unwrap();
/// assert_eq!(buf.len(), 4);
/// assert_eq!(buf.capacity(), 64);
/// assert_eq!(buf.as_slice(), &500u32.to_le_bytes());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PayloadBuffer {
    bytes: [u8; MAX_EXTENDED_PAYLOAD],
    len: usize,
}

impl PayloadBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0u8; MAX_EXTENDED_PAYLOAD],
            len: 0,
        }
    }

    /// Stages a fixed-size array.  Arrays larger than the capacity are
    /// rejected at compile time, so this cannot fail.
    pub fn from_array<const N: usize>(data: [u8; N]) -> Self {
        let () = FitsStaging::<N>::OK;
        let mut bytes = [0u8; MAX_EXTENDED_PAYLOAD];
        bytes[..N].copy_from_slice(&data);
        Self { bytes, len: N }
    }

    /// Copies `data` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if `data` exceeds the capacity.
    pub fn from_slice(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = Self::new();
        buf.push(data)?;
        Ok(buf)
    }

    /// Appends `data` after the bytes already staged.
    ///
    /// Nothing is written when the result would exceed the capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] with the length the buffer
    /// would have reached.
    pub fn push(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let new_len = self.len + data.len();
        if new_len > MAX_EXTENDED_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len: new_len,
                max: MAX_EXTENDED_PAYLOAD,
            });
        }
        self.bytes[self.len..new_len].copy_from_slice(data);
        self.len = new_len;
        Ok(())
    }

    /// Appends a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if fewer than 4 bytes remain.
    pub fn push_u32(&mut self, value: u32) -> Result<(), ProtocolError> {
        self.push(&value.to_le_bytes())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Number of staged bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        MAX_EXTENDED_PAYLOAD
    }

    pub fn remaining(&self) -> usize {
        MAX_EXTENDED_PAYLOAD - self.len
    }

    /// The staged bytes only.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PayloadBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadBuffer")
            .field("len", &self.len)
            .field("bytes", &self.as_slice())
            .finish()
    }
}

impl AsRef<[u8]> for PayloadBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// The 16-byte axis payload: left x, left y, right x, right y.
impl From<&AxisVector> for PayloadBuffer {
    fn from(axis: &AxisVector) -> Self {
        let mut bytes = [0u8; AXIS_VECTOR_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(axis.to_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self::from_array(bytes)
    }
}
