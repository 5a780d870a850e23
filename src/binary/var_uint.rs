use crate::binary::constants::v1_0::MAX_VAR_UINT_SIZE_IN_BYTES;
use crate::result::{decoding_error, incomplete, IonResult};

const BITS_PER_ENCODED_BYTE: usize = 7;

const LOWER_7_BITMASK: u8 = 0b0111_1111;
const HIGHEST_BIT_VALUE: u8 = 0b1000_0000;

/// Represents a variable-length unsigned integer. See the
/// [VarUInt and VarInt Fields](https://amazon-ion.github.io/ion-docs/docs/binary.html#varuint-and-varint-fields)
/// section of the binary Ion spec for more details.
///
/// Each byte contributes 7 bits of magnitude, most significant group first. The highest bit of
/// the final byte is set. Values are limited to 63 bits so that every decoded length or symbol
/// ID also fits in an `i64`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VarUInt {
    value: usize,
    size_in_bytes: usize,
}

impl VarUInt {
    pub(crate) fn new(value: usize, size_in_bytes: usize) -> Self {
        VarUInt {
            value,
            size_in_bytes,
        }
    }

    /// Reads a VarUInt from the beginning of `input`, which may hold only part of the encoding.
    ///
    /// If `input` ends before the final byte is found, returns [`IonError::Incomplete`](crate::IonError::Incomplete).
    /// No state is modified, so the same call can be repeated once more data is available.
    /// `offset` is the stream position of `input[0]` and is only used in error messages.
    #[inline]
    pub fn read(input: &[u8], offset: usize) -> IonResult<VarUInt> {
        match Self::decode(input) {
            Some(result) => result,
            None => incomplete("a VarUInt", offset),
        }
    }

    /// Reads a VarUInt from the beginning of `input`, which the caller has already established
    /// contains the entire encoding.
    ///
    /// Running out of bytes here means a declared length pointed past the end of the data,
    /// which is a decoding error rather than a reason to wait for more input.
    #[inline]
    pub fn read_unchecked(input: &[u8], offset: usize) -> IonResult<VarUInt> {
        // Most lengths and symbol IDs fit in a single byte.
        if let Some(&byte) = input.first() {
            if byte >= HIGHEST_BIT_VALUE {
                return Ok(VarUInt::new((byte & LOWER_7_BITMASK) as usize, 1));
            }
        }
        match Self::decode(input) {
            Some(result) => result,
            None => decoding_error(format!(
                "Malformed data: a VarUInt at offset {offset} extends past the end of the data"
            )),
        }
    }

    /// Returns `None` if `input` ends before the VarUInt does.
    fn decode(input: &[u8]) -> Option<IonResult<VarUInt>> {
        let mut magnitude: usize = 0;
        for (index, byte) in input.iter().copied().enumerate() {
            if index == MAX_VAR_UINT_SIZE_IN_BYTES {
                return Some(decoding_error(
                    "Found a VarUInt that was too large to fit in a `long`",
                ));
            }
            magnitude <<= BITS_PER_ENCODED_BYTE;
            magnitude |= (byte & LOWER_7_BITMASK) as usize;
            if byte >= HIGHEST_BIT_VALUE {
                return Some(Ok(VarUInt::new(magnitude, index + 1)));
            }
        }
        None
    }

    /// Returns the magnitude of the unsigned integer
    #[inline(always)]
    pub fn value(&self) -> usize {
        self.value
    }

    /// Returns the number of bytes that were read from the data source to construct this
    /// unsigned integer
    #[inline(always)]
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}
