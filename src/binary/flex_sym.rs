use std::cmp::Ordering;

use crate::binary::constants::v1_1::opcodes;
use crate::binary::flex_int::FlexInt;
use crate::binary::flex_uint::truncated_raw;
use crate::result::{decoding_error, incomplete_error, IonError, IonResult};
use crate::types::SymbolId;

/// The meaning of a [`FlexSym`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexSymValue<'a> {
    SymbolId(SymbolId),
    /// Inline UTF-8 text. It has not been validated.
    Text(&'a [u8]),
    /// The end of a delimited struct, found where a field name was expected.
    DelimitedEnd,
}

/// An Ion 1.1 encoding primitive used for field names and annotations. It begins with a
/// [`FlexInt`]:
/// * a positive value is a symbol ID,
/// * a negative value is the length of the inline text that follows,
/// * zero is followed by a one-byte escape opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexSym<'a> {
    value: FlexSymValue<'a>,
    size_in_bytes: usize,
}

impl<'a> FlexSym<'a> {
    /// The encoding of a FlexInt `0`, which introduces an escape opcode.
    pub const ZERO: u8 = 0x01;

    /// Reads a FlexSym from `input`, which may hold only part of the encoding. Returns
    /// [`IonError::Incomplete`] if more bytes are needed.
    pub fn read(input: &'a [u8], offset: usize) -> IonResult<FlexSym<'a>> {
        let flex_int = FlexInt::read(input, offset)?;
        Self::read_after_flex_int(input, offset, flex_int, || {
            incomplete_error("a FlexSym", offset)
        })
    }

    /// Reads a FlexSym that the caller knows to be entirely present in `input`.
    pub fn read_unchecked(input: &'a [u8], offset: usize) -> IonResult<FlexSym<'a>> {
        let flex_int = FlexInt::read_unchecked(input, offset)?;
        Self::read_after_flex_int(input, offset, flex_int, || truncated_raw("FlexSym", offset))
    }

    fn read_after_flex_int(
        input: &'a [u8],
        offset: usize,
        flex_int: FlexInt,
        out_of_data: impl Fn() -> IonError,
    ) -> IonResult<FlexSym<'a>> {
        let flex_int_length = flex_int.size_in_bytes();
        let sym_value = flex_int.value();
        let (value, size_in_bytes) = match sym_value.cmp(&0) {
            Ordering::Greater => (
                FlexSymValue::SymbolId(sym_value as SymbolId),
                flex_int_length,
            ),
            Ordering::Less => {
                let text_length = sym_value.unsigned_abs() as usize;
                let end = flex_int_length + text_length;
                let text = input.get(flex_int_length..end).ok_or_else(&out_of_data)?;
                (FlexSymValue::Text(text), end)
            }
            Ordering::Equal => {
                let opcode = *input.get(flex_int_length).ok_or_else(&out_of_data)?;
                match opcode {
                    opcodes::DELIMITED_END => (FlexSymValue::DelimitedEnd, flex_int_length + 1),
                    opcodes::FLEX_SYM_EMPTY_TEXT => (FlexSymValue::Text(&[]), flex_int_length + 1),
                    opcodes::SYMBOL_ADDRESS_1_BYTE => {
                        let address = *input.get(flex_int_length + 1).ok_or_else(&out_of_data)?;
                        (
                            FlexSymValue::SymbolId(address as SymbolId),
                            flex_int_length + 2,
                        )
                    }
                    other => {
                        return decoding_error(format!(
                            "found FlexSym escape with unsupported opcode 0x{other:02X} at offset {}",
                            offset + flex_int_length
                        ))
                    }
                }
            }
        };
        Ok(FlexSym {
            value,
            size_in_bytes,
        })
    }

    pub fn value(&self) -> FlexSymValue<'a> {
        self.value
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::symbol_id_one(&[0x03], FlexSymValue::SymbolId(1), 1)]
    #[case::symbol_id_sixty_four(&[0x02, 0x01], FlexSymValue::SymbolId(64), 2)]
    #[case::inline_text(&[0xFB, b'f', b'o', b'o'], FlexSymValue::Text(b"foo"), 4)]
    #[case::empty_text(&[FlexSym::ZERO, 0x90], FlexSymValue::Text(b""), 2)]
    #[case::symbol_zero(&[FlexSym::ZERO, 0xE1, 0x00], FlexSymValue::SymbolId(0), 3)]
    #[case::system_symbol(&[FlexSym::ZERO, 0xE1, 0x04], FlexSymValue::SymbolId(4), 3)]
    #[case::delimited_end(&[FlexSym::ZERO, 0xF0], FlexSymValue::DelimitedEnd, 2)]
    fn read_flex_sym(
        #[case] encoding: &[u8],
        #[case] expected: FlexSymValue,
        #[case] size_in_bytes: usize,
    ) -> IonResult<()> {
        let flex_sym = FlexSym::read(encoding, 0)?;
        assert_eq!(flex_sym.value(), expected);
        assert_eq!(flex_sym.size_in_bytes(), size_in_bytes);
        assert_eq!(FlexSym::read_unchecked(encoding, 0)?, flex_sym);
        for end in 0..encoding.len() {
            assert!(FlexSym::read(&encoding[..end], 0).unwrap_err().is_incomplete());
            assert!(matches!(
                FlexSym::read_unchecked(&encoding[..end], 0),
                Err(IonError::Decoding(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn unsupported_escape() {
        assert!(matches!(
            FlexSym::read(&[FlexSym::ZERO, 0x5E], 0),
            Err(IonError::Decoding(_))
        ));
    }
}
