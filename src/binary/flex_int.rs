use crate::binary::flex_uint::{truncated_raw, FlexUInt};
use crate::result::{incomplete_error, IonResult};

/// An Ion 1.1 encoding primitive that represents a variable-length signed integer.
///
/// A FlexInt has the same layout as a [`FlexUInt`], but its magnitude bits are interpreted as a
/// two's complement integer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FlexInt {
    value: i64,
    size_in_bytes: usize,
}

impl FlexInt {
    pub(crate) fn new(size_in_bytes: usize, value: i64) -> Self {
        Self {
            value,
            size_in_bytes,
        }
    }

    /// Reads a [`FlexInt`] from the beginning of `input`, which may hold only part of the
    /// encoding. Returns [`IonError::Incomplete`](crate::IonError::Incomplete) if `input` ends
    /// before the FlexInt does.
    #[inline]
    pub fn read(input: &[u8], offset: usize) -> IonResult<FlexInt> {
        let flex_uint = FlexUInt::read_flex_primitive_as_uint(input, offset, "FlexInt", true)
            .map_err(|e| e.unwrap_or_else(|| incomplete_error("a FlexInt", offset)))?;
        Ok(Self::sign_extend(flex_uint))
    }

    /// Reads a [`FlexInt`] that the caller knows to be entirely present in `input`.
    #[inline]
    pub fn read_unchecked(input: &[u8], offset: usize) -> IonResult<FlexInt> {
        let flex_uint = FlexUInt::read_flex_primitive_as_uint(input, offset, "FlexInt", true)
            .map_err(|e| e.unwrap_or_else(|| truncated_raw("FlexInt", offset)))?;
        Ok(Self::sign_extend(flex_uint))
    }

    // An N-byte encoding (N <= 9) carries 7*N bits of two's complement; shifting them to the top
    // of the word and back again copies the sign bit into every higher bit. Ten-byte encodings
    // have already been validated to hold exactly 64 meaningful bits.
    fn sign_extend(flex_uint: FlexUInt) -> FlexInt {
        let size_in_bytes = flex_uint.size_in_bytes();
        let unsigned_value = flex_uint.value();
        if size_in_bytes >= 10 {
            return FlexInt::new(size_in_bytes, unsigned_value as i64);
        }
        let unused_bits = 64 - (7 * size_in_bytes) as u32;
        let signed_value = ((unsigned_value << unused_bits) as i64) >> unused_bits;
        FlexInt::new(size_in_bytes, signed_value)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}
