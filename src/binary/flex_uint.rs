use crate::binary::constants::v1_1::MAX_FLEX_UINT_SIZE_IN_BYTES;
use crate::result::{
    decoding_error, decoding_error_raw, incomplete, incomplete_error, IonError, IonResult,
};

/// An Ion 1.1 encoding primitive that represents a variable-length unsigned integer.
///
/// The number of trailing zero bits in the first byte (plus one) is the number of bytes in the
/// encoding; the remaining bits are the little-endian magnitude. An encoding whose first byte
/// is zero continues that count into the second byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FlexUInt {
    value: u64,
    size_in_bytes: usize,
}

impl FlexUInt {
    pub(crate) fn new(size_in_bytes: usize, value: u64) -> Self {
        Self {
            value,
            size_in_bytes,
        }
    }

    /// Reads a [`FlexUInt`] from the beginning of `input`, which may hold only part of the
    /// encoding.
    ///
    /// `offset` is the position of the slice in some larger input stream. It is only used to
    /// populate an appropriate error message if reading fails. Returns
    /// [`IonError::Incomplete`] if `input` ends before the FlexUInt does.
    #[inline]
    pub fn read(input: &[u8], offset: usize) -> IonResult<FlexUInt> {
        const COMMON_CASE_INPUT_BYTES_NEEDED: usize = 8;

        // We want to minimize the number of branches that happen in the common case. To do this,
        // we perform a single length check, making sure that the buffer contains enough data to
        // represent a FlexUInt whose continuation bits fit in a single byte (i.e. one with 7 or
        // fewer bytes of magnitude). If the buffer doesn't have at least 8 bytes in it or the
        // FlexUInt we find requires more than 8 bytes to represent, we'll fall back to the general
        // case.
        if input.len() < COMMON_CASE_INPUT_BYTES_NEEDED || input[0] == 0 {
            return Self::read_flex_primitive_as_uint_no_inline(input, offset, "FlexUInt", false)
                .map_err(|e| e.unwrap_or_else(|| incomplete_error("a FlexUInt", offset)));
        }
        Ok(Self::read_small_flex_uint(input))
    }

    /// Reads a [`FlexUInt`] that the caller knows to be entirely present in `input`.
    ///
    /// A FlexUInt that extends past the end of `input` is reported as a decoding error, since
    /// the caller has already established that no more data belongs to the enclosing value.
    #[inline]
    pub fn read_unchecked(input: &[u8], offset: usize) -> IonResult<FlexUInt> {
        // Single-byte FlexUInts are by far the most common; they need no shifting or masking
        // beyond discarding the end flag.
        if let Some(&first_byte) = input.first() {
            if first_byte & 1 == 1 {
                return Ok(FlexUInt::new(1, (first_byte >> 1) as u64));
            }
        }
        if input.len() >= 8 && input[0] != 0 {
            return Ok(Self::read_small_flex_uint(input));
        }
        Self::read_flex_primitive_as_uint_no_inline(input, offset, "FlexUInt", false)
            .map_err(|e| e.unwrap_or_else(|| truncated_raw("FlexUInt", offset)))
    }

    /// Returns the number of bytes occupied by the FlexUInt or FlexInt at the beginning of
    /// `input` without decoding its value.
    ///
    /// Every leading `0x00` byte accounts for eight bytes of the encoding; the first non-zero
    /// byte's trailing zeros account for the rest. Returns [`IonError::Incomplete`] if `input`
    /// ends before a non-zero byte is found.
    pub fn encoded_length(input: &[u8], offset: usize) -> IonResult<usize> {
        let mut length = 0;
        for byte in input.iter().copied() {
            if byte != 0 {
                return Ok(length + byte.trailing_zeros() as usize + 1);
            }
            length += 8;
        }
        incomplete("the length of a FlexUInt", offset)
    }

    /// Helper method that reads a [`FlexUInt`] with 7 or fewer bytes of magnitude from the buffer.
    // Caller must confirm that `bytes` has at least 8 bytes and a non-zero first byte.
    #[inline]
    fn read_small_flex_uint(bytes: &[u8]) -> FlexUInt {
        debug_assert!(bytes.len() >= 8 && bytes[0] != 0);
        let num_encoded_bytes = bytes[0].trailing_zeros() as usize + 1;
        let num_encoded_bits = 8 * num_encoded_bytes;
        // Get a mask with the low 'n' bits set
        let mask = 1u64
            .checked_shl(num_encoded_bits as u32)
            .map(|v| v - 1)
            .unwrap_or(u64::MAX);
        let mut fixed_size_input = [0u8; 8];
        fixed_size_input.copy_from_slice(&bytes[..8]);
        // This step will often read unrelated bytes from beyond the FlexUInt, but they are
        // discarded by the mask.
        let encoded_value = u64::from_le_bytes(fixed_size_input);
        // `num_encoded_bytes` is also the number of continuation flags that we need to discard
        // via right shifting.
        let value = (encoded_value & mask) >> num_encoded_bytes;
        FlexUInt::new(num_encoded_bytes, value)
    }

    #[inline(never)]
    pub(crate) fn read_flex_primitive_as_uint_no_inline(
        input: &[u8],
        offset: usize,
        label: &'static str,
        support_sign_extension: bool,
    ) -> Result<FlexUInt, Option<IonError>> {
        Self::read_flex_primitive_as_uint(input, offset, label, support_sign_extension)
    }

    /// Helper method that reads a flex-encoded primitive from the buffer, returning it as a
    /// `FlexUInt`. Running out of input is reported as `Err(None)` so that each caller can decide
    /// whether that means "wait for more data" or "malformed".
    ///
    /// Flex primitives requiring 10 bytes to encode have 70 magnitude bits. If this value is
    /// unsigned (`support_sign_extension=false`), the six bits beyond the supported 64 must all
    /// be `0`. If this value will later be re-interpreted as a signed value
    /// (`support_sign_extension=true`), then the six bits beyond the supported 64 must all be the
    /// same as the 64th (highest supported) bit.
    pub(crate) fn read_flex_primitive_as_uint(
        input: &[u8],
        offset: usize,
        label: &'static str,
        support_sign_extension: bool,
    ) -> Result<FlexUInt, Option<IonError>> {
        let bytes_available = input.len();
        if bytes_available == 0 {
            return Err(None);
        }

        // `from_le_bytes` requires 8 bytes. If the input is shorter than the largest encoding,
        // copy it into a zero-padded temporary buffer.
        let mut buffer = [0u8; 16];
        let bytes = if bytes_available >= MAX_FLEX_UINT_SIZE_IN_BYTES {
            input
        } else {
            buffer[0..bytes_available].copy_from_slice(input);
            &buffer[..]
        };

        let first_byte = bytes[0];
        // If the first byte is not zero, the FlexUInt is 8 or fewer bytes.
        if first_byte != 0 {
            let num_encoded_bytes = first_byte.trailing_zeros() as usize + 1;
            if bytes_available < num_encoded_bytes {
                return Err(None);
            }
            return Ok(Self::read_small_flex_uint(bytes));
        }

        // The first byte was a zero, so the encoding is at least 9 bytes. The second byte holds
        // the rest of the length prefix.
        if bytes_available < 2 {
            return Err(None);
        }
        let second_byte = bytes[1];

        if second_byte & 0b11 == 0b00 {
            return Err(Some(decoding_error_raw(format!(
                "found a >10 byte {label} too large to fit in 64 bits at offset {offset}"
            ))));
        }

        if second_byte & 0b11 == 0b10 {
            if bytes_available < 10 {
                return Err(None);
            }
            return Self::read_10_byte_flex_primitive_as_uint(
                support_sign_extension,
                bytes,
                second_byte,
                label,
            )
            .map_err(Some);
        }

        // The lowest bit of the second byte is set. The encoding is 9 bytes with 63 bits of
        // magnitude.
        if bytes_available < 9 {
            return Err(None);
        }
        let mut remaining_data = [0u8; 8];
        remaining_data.copy_from_slice(&bytes[1..9]);
        // Lop off the lowest bit to discard the `end` flag.
        let value = u64::from_le_bytes(remaining_data) >> 1;
        Ok(FlexUInt::new(9, value))
    }

    /// Handles flex primitives whose encoding requires 10 bytes. Only the lower 64 of the 70
    /// magnitude bits can be stored, so the highest six must not change the meaning of the value.
    fn read_10_byte_flex_primitive_as_uint(
        support_sign_extension: bool,
        input: &[u8],
        second_byte: u8,
        label: &'static str,
    ) -> IonResult<FlexUInt> {
        // Little Endian byte diagram:
        //
        //      b0       b1       b2       b3
        //   PPPPPPPP MMMMMMPP MMMMMMMM MMMMMMMM
        //      b4       b5       b6       b7
        //   MMMMMMMM MMMMMMMM MMMMMMMM MMMMMMMM
        //      b8       b9
        //   MMMMMMMM XXXXXXMM
        //
        // P = Prefix bit
        // M = Magnitude bit
        // X = An 'extra' bit; if `support_sign_extension` is true, these are sign bits.
        let magnitude_low_six = second_byte >> 2;
        let mut remaining_data = [0u8; 8];
        remaining_data.copy_from_slice(&input[2..10]);
        let remaining_magnitude = u64::from_le_bytes(remaining_data);

        let sign_extension_bits = (remaining_magnitude & (0b111111 << 58)) >> 58;
        if support_sign_extension {
            // Bit 64 of the value is bit index 57 of `remaining_magnitude`.
            let high_bit_is_set = remaining_magnitude & (1 << 57) != 0;
            if (high_bit_is_set && sign_extension_bits != 0b111111)
                || (!high_bit_is_set && sign_extension_bits != 0)
            {
                return decoding_error(format!("found a 10-byte {label} too large to fit in a i64"));
            }
        } else if sign_extension_bits != 0 {
            return decoding_error(format!("found a 10-byte {label} too large to fit in a u64"));
        }

        let value = (remaining_magnitude << 6) | magnitude_low_six as u64;
        Ok(FlexUInt::new(10, value))
    }

    /// Returns the value as a `usize`, failing if it is too large to be a length or position.
    pub(crate) fn as_length(&self) -> IonResult<usize> {
        if self.value > i64::MAX as u64 {
            return decoding_error("Unsupported value: declared length is too long.");
        }
        usize::try_from(self.value)
            .map_err(|_| decoding_error_raw("Unsupported value: declared length is too long."))
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}

#[inline(never)]
pub(crate) fn truncated_raw(label: &'static str, offset: usize) -> IonError {
    decoding_error_raw(format!(
        "Malformed data: a {label} at offset {offset} extends past the end of the data"
    ))
}
