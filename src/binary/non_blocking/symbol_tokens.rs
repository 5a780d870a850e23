use std::str;

use crate::binary::flex_sym::{FlexSym, FlexSymValue};
use crate::binary::flex_uint::FlexUInt;
use crate::binary::type_descriptor::{AnnotationsEncoding, FieldNameEncoding};
use crate::binary::var_uint::VarUInt;
use crate::raw_symbol_token_ref::RawSymbolTokenRef;
use crate::result::{decoding_error, decoding_error_raw, IonResult};
use crate::types::SymbolId;

/// The three ways a symbol token can be written in a field name or annotation sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SymbolTokenEncoding {
    VarUInt,
    FlexUInt,
    FlexSym,
}

impl From<FieldNameEncoding> for SymbolTokenEncoding {
    fn from(encoding: FieldNameEncoding) -> Self {
        match encoding {
            FieldNameEncoding::VarUIntSymbolId => SymbolTokenEncoding::VarUInt,
            FieldNameEncoding::FlexUIntSymbolId => SymbolTokenEncoding::FlexUInt,
            FieldNameEncoding::FlexSym => SymbolTokenEncoding::FlexSym,
        }
    }
}

impl From<AnnotationsEncoding> for SymbolTokenEncoding {
    fn from(encoding: AnnotationsEncoding) -> Self {
        match encoding {
            AnnotationsEncoding::Wrapper => SymbolTokenEncoding::VarUInt,
            AnnotationsEncoding::SymbolAddresses { .. } => SymbolTokenEncoding::FlexUInt,
            AnnotationsEncoding::FlexSyms { .. } => SymbolTokenEncoding::FlexSym,
        }
    }
}

/// Decodes the symbol token at the beginning of `bytes`, which must be fully buffered. Returns
/// the token and the number of bytes it occupied.
pub(crate) fn read_symbol_token(
    bytes: &[u8],
    offset: usize,
    encoding: SymbolTokenEncoding,
) -> IonResult<(RawSymbolTokenRef<'_>, usize)> {
    match encoding {
        SymbolTokenEncoding::VarUInt => {
            let var_uint = VarUInt::read_unchecked(bytes, offset)?;
            Ok((
                RawSymbolTokenRef::SymbolId(var_uint.value()),
                var_uint.size_in_bytes(),
            ))
        }
        SymbolTokenEncoding::FlexUInt => {
            let flex_uint = FlexUInt::read_unchecked(bytes, offset)?;
            Ok((
                RawSymbolTokenRef::SymbolId(flex_uint.value() as SymbolId),
                flex_uint.size_in_bytes(),
            ))
        }
        SymbolTokenEncoding::FlexSym => {
            let flex_sym = FlexSym::read_unchecked(bytes, offset)?;
            let token = match flex_sym.value() {
                FlexSymValue::SymbolId(sid) => RawSymbolTokenRef::SymbolId(sid),
                FlexSymValue::Text(text) => RawSymbolTokenRef::Text(str::from_utf8(text).map_err(
                    |_| decoding_error_raw(format!("found invalid UTF-8 symbol text at offset {offset}")),
                )?),
                FlexSymValue::DelimitedEnd => {
                    return decoding_error(format!(
                        "found a delimited end in place of a symbol at offset {offset}"
                    ))
                }
            };
            Ok((token, flex_sym.size_in_bytes()))
        }
    }
}

/// Iterates over the raw symbol tokens of the current value's annotation sequence.
///
/// The symbol IDs are not resolved. If a token cannot be decoded, the error is returned and
/// iteration ends.
pub struct Annotations<'a> {
    bytes: &'a [u8],
    offset: usize,
    encoding: SymbolTokenEncoding,
}

impl<'a> Annotations<'a> {
    pub(crate) fn new(bytes: &'a [u8], offset: usize, encoding: SymbolTokenEncoding) -> Self {
        Annotations {
            bytes,
            offset,
            encoding,
        }
    }

    pub(crate) fn empty() -> Self {
        Annotations::new(&[], 0, SymbolTokenEncoding::VarUInt)
    }
}

impl<'a> Iterator for Annotations<'a> {
    type Item = IonResult<RawSymbolTokenRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        match read_symbol_token(self.bytes, self.offset, self.encoding) {
            Ok((token, size)) => {
                self.bytes = &self.bytes[size..];
                self.offset += size;
                Some(Ok(token))
            }
            Err(e) => {
                self.bytes = &[];
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::var_uint(&[0x84], SymbolTokenEncoding::VarUInt, RawSymbolTokenRef::SymbolId(4), 1)]
    #[case::flex_uint(&[0x02, 0x01], SymbolTokenEncoding::FlexUInt, RawSymbolTokenRef::SymbolId(64), 2)]
    #[case::flex_sym_id(&[0x09], SymbolTokenEncoding::FlexSym, RawSymbolTokenRef::SymbolId(4), 1)]
    #[case::flex_sym_text(&[0xFD, b'h', b'i'], SymbolTokenEncoding::FlexSym, RawSymbolTokenRef::Text("hi"), 3)]
    fn read_tokens(
        #[case] bytes: &[u8],
        #[case] encoding: SymbolTokenEncoding,
        #[case] expected: RawSymbolTokenRef,
        #[case] size: usize,
    ) -> IonResult<()> {
        assert_eq!(read_symbol_token(bytes, 0, encoding)?, (expected, size));
        Ok(())
    }

    #[test]
    fn invalid_text() {
        assert!(read_symbol_token(&[0xFF, 0xC3], 0, SymbolTokenEncoding::FlexSym).is_err());
    }

    #[test]
    fn iterate_annotations() -> IonResult<()> {
        let bytes = &[0x0B, 0xFB, b'a', b'b', b'c', 0x01, 0xE1, 0x05];
        let annotations: Vec<_> =
            Annotations::new(bytes, 10, SymbolTokenEncoding::FlexSym).collect::<IonResult<_>>()?;
        assert_eq!(
            annotations,
            vec![
                RawSymbolTokenRef::SymbolId(5),
                RawSymbolTokenRef::Text("abc"),
                RawSymbolTokenRef::SymbolId(5),
            ]
        );
        assert_eq!(Annotations::empty().count(), 0);
        Ok(())
    }
}
