//! Types that describe the arguments of an encoding expression: tagless primitive encodings and
//! the argument groups that hold a variable number of values.

use crate::binary::decode_mode::DecodeMode;
use crate::binary::non_blocking::binary_buffer::BinaryBuffer;
use crate::result::{decoding_error, IonResult};
use crate::types::IonType;

/// An encoding that a macro signature can assign to a parameter. Arguments of these encodings
/// are written without a type descriptor, so the caller must say which encoding to expect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveEncoding {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
    FlexUInt,
    FlexInt,
    FlexSym,
}

impl PrimitiveEncoding {
    /// The size of a value in this encoding, if every value has the same size.
    pub fn fixed_size(&self) -> Option<usize> {
        use PrimitiveEncoding::*;
        match self {
            UInt8 | Int8 => Some(1),
            UInt16 | Int16 | Float16 => Some(2),
            UInt32 | Int32 | Float32 => Some(4),
            UInt64 | Int64 | Float64 => Some(8),
            FlexUInt | FlexInt | FlexSym => None,
        }
    }

    /// The Ion type of values in this encoding.
    pub fn ion_type(&self) -> IonType {
        use PrimitiveEncoding::*;
        match self {
            Float16 | Float32 | Float64 => IonType::Float,
            FlexSym => IonType::Symbol,
            _ => IonType::Int,
        }
    }

    /// Reads just enough of the value at the buffer's position to learn its length. The value
    /// itself is not consumed. A FlexSym's inline text does not need to be buffered.
    pub(crate) fn read_length<M: DecodeMode>(
        &self,
        buffer: &mut BinaryBuffer<'_, M>,
    ) -> IonResult<usize> {
        if let Some(size) = self.fixed_size() {
            return Ok(size);
        }
        match self {
            // A FlexInt has the same length prefix as a FlexUInt.
            PrimitiveEncoding::FlexUInt | PrimitiveEncoding::FlexInt => {
                buffer.peek_flex_uint_length()
            }
            _ => match buffer.skip_flex_sym()? {
                Some(length) => Ok(length),
                None => decoding_error(format!(
                    "found a delimited end where a tagless symbol was expected at offset {}",
                    buffer.position()
                )),
            },
        }
    }
}

/// An argument group that the cursor has entered.
///
/// A tagged group is either length-prefixed (`end` is known) or delimited (its values are
/// followed by `0xF0`). A tagless group is a series of pages: each page is a FlexUInt byte length
/// followed by that many bytes of values, and a length of zero ends the group. For a tagless
/// group `end` is the end of the current page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ArgumentGroupFrame {
    pub encoding: Option<PrimitiveEncoding>,
    /// The number of containers (and encoding expressions) that were open when the group was
    /// entered. The group is the innermost scope while the depth is unchanged.
    pub depth: usize,
    pub start: usize,
    pub end: Option<usize>,
    pub is_delimited: bool,
    /// For tagless groups, whether the terminating empty page has been read.
    pub exhausted: bool,
}

impl ArgumentGroupFrame {
    pub fn is_tagless(&self) -> bool {
        self.encoding.is_some()
    }
}
