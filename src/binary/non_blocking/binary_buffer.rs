use std::marker::PhantomData;

use crate::binary::constants::ivm;
use crate::binary::constants::v1_1::macro_addresses::TWELVE_BIT_BIAS;
use crate::binary::constants::v1_1::opcodes;
use crate::binary::decode_mode::DecodeMode;
use crate::binary::flex_int::FlexInt;
use crate::binary::flex_sym::{FlexSym, FlexSymValue};
use crate::binary::flex_uint::FlexUInt;
use crate::binary::non_blocking::marker::{AnnotationsSpan, FieldNameSpan};
use crate::binary::type_descriptor::{
    typed_null_descriptor, AnnotationsEncoding, FieldNameEncoding, LengthEncoding, MacroAddress,
    TokenKind, TypeDescriptor,
};
use crate::binary::var_uint::VarUInt;
use crate::result::{decoding_error, decoding_error_raw, IonResult};
use crate::types::IonType;

/// The result of reading a field name where one is expected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FieldNameToken {
    Name(FieldNameSpan),
    /// The FlexSym escape that ends a delimited struct.
    DelimitedEnd,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ValueHeader {
    pub descriptor: &'static TypeDescriptor,
    pub body_start: usize,
    /// `None` for delimited containers.
    pub end: Option<usize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct AnnotationsHeader {
    pub span: AnnotationsSpan,
    /// The end of the enclosing Ion 1.0 annotations wrapper, which must also be the end of the
    /// wrapped value.
    pub wrapper_end: Option<usize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct MacroHeader {
    pub id: usize,
    pub is_system: bool,
    pub arguments_start: usize,
    /// Only length-prefixed invocations have a known end.
    pub end: Option<usize>,
}

/// A view of a slice of the input that provides methods to read Ion's encoding primitives and
/// token headers.
///
/// `base` is the stream offset of the slice's first byte; every position the buffer reports is
/// a stream offset too. The decode mode `M` decides whether running out of bytes means
/// "incomplete" ([`Checked`](crate::binary::decode_mode::Checked)) or "malformed"
/// ([`Unchecked`](crate::binary::decode_mode::Unchecked)).
///
/// A `BinaryBuffer` never mutates anything outside itself, so a read that fails for lack of
/// data can simply be retried with a new buffer once more bytes are available.
pub(crate) struct BinaryBuffer<'a, M> {
    data: &'a [u8],
    base: usize,
    index: usize,
    // The number of bytes from `data[0]` that a failed `require` asked for.
    wanted: usize,
    mode: PhantomData<M>,
}

impl<'a, M: DecodeMode> BinaryBuffer<'a, M> {
    #[inline]
    pub fn new(data: &'a [u8], base: usize) -> BinaryBuffer<'a, M> {
        BinaryBuffer {
            data,
            base,
            index: 0,
            wanted: 0,
            mode: PhantomData,
        }
    }

    /// The stream offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.base + self.index
    }

    pub fn consumed(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    pub fn bytes(&self) -> &'a [u8] {
        &self.data[self.index..]
    }

    /// After a read has failed for lack of data, the number of bytes (counted from the start of
    /// the slice) that should be buffered before trying again. This is always more than the
    /// slice currently holds.
    pub fn wanted(&self) -> usize {
        self.wanted.max(self.data.len() + 1)
    }

    pub fn require(&mut self, length: usize, label: &'static str) -> IonResult<()> {
        if self.remaining() < length {
            self.wanted = self.wanted.max(self.index + length);
        }
        M::require(self.bytes(), length, self.position(), label)
    }

    #[inline]
    pub fn peek_next_byte(&mut self, label: &'static str) -> IonResult<u8> {
        self.require(1, label)?;
        Ok(self.data[self.index])
    }

    #[inline]
    pub fn next_byte(&mut self, label: &'static str) -> IonResult<u8> {
        let byte = self.peek_next_byte(label)?;
        self.index += 1;
        Ok(byte)
    }

    /// Marks the next `num_bytes_to_consume` bytes as read.
    #[inline]
    pub fn consume(&mut self, num_bytes_to_consume: usize) {
        // This assertion is always run during testing but is removed in the release build.
        debug_assert!(num_bytes_to_consume <= self.remaining());
        self.index += num_bytes_to_consume;
    }

    pub fn read_var_uint(&mut self) -> IonResult<VarUInt> {
        let var_uint = M::var_uint(self.bytes(), self.position())?;
        self.consume(var_uint.size_in_bytes());
        Ok(var_uint)
    }

    pub fn read_flex_uint(&mut self) -> IonResult<FlexUInt> {
        let flex_uint = M::flex_uint(self.bytes(), self.position())?;
        self.consume(flex_uint.size_in_bytes());
        Ok(flex_uint)
    }

    pub fn read_flex_int(&mut self) -> IonResult<FlexInt> {
        let flex_int = M::flex_int(self.bytes(), self.position())?;
        self.consume(flex_int.size_in_bytes());
        Ok(flex_int)
    }

    pub fn read_flex_sym(&mut self) -> IonResult<FlexSym<'a>> {
        let flex_sym = M::flex_sym(self.bytes(), self.position())?;
        self.consume(flex_sym.size_in_bytes());
        Ok(flex_sym)
    }

    /// Reads the FlexInt at the head of a FlexSym (and its escape, if it has one) and returns
    /// the FlexSym's total length, or `None` if it is the delimited end escape. Inline text is
    /// not consumed and does not need to be buffered.
    pub fn skip_flex_sym(&mut self) -> IonResult<Option<usize>> {
        let start = self.consumed();
        let value = self.read_flex_int()?.value();
        if value > 0 {
            return Ok(Some(self.consumed() - start));
        }
        if value < 0 {
            return Ok(Some(self.consumed() - start + value.unsigned_abs() as usize));
        }
        match self.next_byte("a FlexSym escape")? {
            opcodes::DELIMITED_END => Ok(None),
            opcodes::FLEX_SYM_EMPTY_TEXT => Ok(Some(self.consumed() - start)),
            opcodes::SYMBOL_ADDRESS_1_BYTE => {
                self.next_byte("a FlexSym escape operand")?;
                Ok(Some(self.consumed() - start))
            }
            other => decoding_error(format!(
                "found FlexSym escape with unsupported opcode 0x{other:02X} at offset {}",
                self.position() - 1
            )),
        }
    }

    /// Returns the size of the FlexUInt at the current position without consuming it.
    pub fn peek_flex_uint_length(&mut self) -> IonResult<usize> {
        M::flex_uint_length(self.bytes(), self.position())
    }

    /// Reads the four bytes of an Ion version marker and returns its `(major, minor)` version.
    ///
    /// See: <https://amazon-ion.github.io/ion-docs/docs/binary.html#value-streams>
    pub fn read_ivm(&mut self) -> IonResult<(u8, u8)> {
        self.require(ivm::LENGTH, "an Ion version marker")?;
        match self.bytes()[..ivm::LENGTH] {
            [ivm::START, major, minor, ivm::END] => {
                self.consume(ivm::LENGTH);
                Ok((major, minor))
            }
            _ => decoding_error("Invalid Ion version marker."),
        }
    }

    /// Reads the field name at the current position.
    pub fn read_field_name(&mut self, encoding: FieldNameEncoding) -> IonResult<FieldNameToken> {
        let start = self.position();
        let name = match encoding {
            FieldNameEncoding::VarUIntSymbolId => {
                self.read_var_uint()?;
                FieldNameSpan {
                    start,
                    end: self.position(),
                    encoding,
                    switched_to_flex_sym: false,
                }
            }
            FieldNameEncoding::FlexUIntSymbolId => {
                let address = self.read_flex_uint()?;
                if address.value() != 0 {
                    FieldNameSpan {
                        start,
                        end: self.position(),
                        encoding,
                        switched_to_flex_sym: false,
                    }
                } else {
                    // Address zero switches the struct to FlexSym field names, starting with
                    // the name that follows.
                    let flex_sym_start = self.position();
                    if self.read_flex_sym()?.value() == FlexSymValue::DelimitedEnd {
                        return decoding_error(format!(
                            "found a delimited end in a length-prefixed struct at offset {flex_sym_start}"
                        ));
                    }
                    FieldNameSpan {
                        start: flex_sym_start,
                        end: self.position(),
                        encoding: FieldNameEncoding::FlexSym,
                        switched_to_flex_sym: true,
                    }
                }
            }
            FieldNameEncoding::FlexSym => {
                if self.read_flex_sym()?.value() == FlexSymValue::DelimitedEnd {
                    return Ok(FieldNameToken::DelimitedEnd);
                }
                FieldNameSpan {
                    start,
                    end: self.position(),
                    encoding,
                    switched_to_flex_sym: false,
                }
            }
        };
        Ok(FieldNameToken::Name(name))
    }

    /// Reads the remainder of an annotations token whose type descriptor has already been
    /// consumed.
    pub fn read_annotations(&mut self, descriptor: &TypeDescriptor) -> IonResult<AnnotationsHeader> {
        let TokenKind::Annotations(encoding) = descriptor.kind else {
            return decoding_error("expected an annotations token");
        };
        match encoding {
            AnnotationsEncoding::Wrapper => {
                let wrapper_length = self.read_length(descriptor)?;
                let wrapper_end = self.end_after(wrapper_length)?;
                let sequence_length = self.read_var_uint()?.value();
                if sequence_length == 0 {
                    return decoding_error("Annotation wrapper must wrap at least one annotation.");
                }
                let start = self.position();
                let end = self.end_after(sequence_length)?;
                if end >= wrapper_end {
                    return decoding_error("Annotation wrapper must wrap a value.");
                }
                self.require(sequence_length, "an annotation sequence")?;
                self.consume(sequence_length);
                Ok(AnnotationsHeader {
                    span: AnnotationsSpan {
                        start,
                        end,
                        encoding,
                    },
                    wrapper_end: Some(wrapper_end),
                })
            }
            AnnotationsEncoding::SymbolAddresses { count: Some(count) }
            | AnnotationsEncoding::FlexSyms { count: Some(count) } => {
                let start = self.position();
                for _ in 0..count {
                    if matches!(encoding, AnnotationsEncoding::SymbolAddresses { .. }) {
                        self.read_flex_uint()?;
                    } else if self.read_flex_sym()?.value() == FlexSymValue::DelimitedEnd {
                        return decoding_error("found a delimited end in an annotation sequence");
                    }
                }
                Ok(AnnotationsHeader {
                    span: AnnotationsSpan {
                        start,
                        end: self.position(),
                        encoding,
                    },
                    wrapper_end: None,
                })
            }
            AnnotationsEncoding::SymbolAddresses { count: None }
            | AnnotationsEncoding::FlexSyms { count: None } => {
                let sequence_length = self.read_flex_uint()?.as_length()?;
                if sequence_length == 0 {
                    return decoding_error("found an empty annotation sequence");
                }
                let start = self.position();
                let end = self.end_after(sequence_length)?;
                self.require(sequence_length, "an annotation sequence")?;
                self.consume(sequence_length);
                Ok(AnnotationsHeader {
                    span: AnnotationsSpan {
                        start,
                        end,
                        encoding,
                    },
                    wrapper_end: None,
                })
            }
        }
    }

    /// Reads the remainder of a value header whose type descriptor has already been consumed.
    pub fn read_value_header(
        &mut self,
        descriptor: &'static TypeDescriptor,
    ) -> IonResult<ValueHeader> {
        if descriptor.opcode == opcodes::NULL_TYPED && descriptor.length == LengthEncoding::Fixed(1)
        {
            let type_code = self.next_byte("a typed null")?;
            let null_descriptor = typed_null_descriptor(type_code).ok_or_else(|| {
                decoding_error_raw(format!("found a typed null with invalid type code {type_code}"))
            })?;
            let position = self.position();
            return Ok(ValueHeader {
                descriptor: null_descriptor,
                body_start: position,
                end: Some(position),
            });
        }
        let length = match descriptor.length {
            LengthEncoding::Delimited => {
                return Ok(ValueHeader {
                    descriptor,
                    body_start: self.position(),
                    end: None,
                })
            }
            // The body is a FlexUInt; its own encoding says how long it is.
            LengthEncoding::FlexUIntValue => self.peek_flex_uint_length()?,
            _ => self.read_length(descriptor)?,
        };
        if length == 0 && descriptor.is_ordered_struct() {
            return decoding_error("Ordered struct must not be empty.");
        }
        if length <= 1
            && descriptor.length == LengthEncoding::VarUInt
            && descriptor.ion_type == Some(IonType::Timestamp)
        {
            return decoding_error("found a timestamp with length <= 1");
        }
        Ok(ValueHeader {
            descriptor,
            body_start: self.position(),
            end: Some(self.end_after(length)?),
        })
    }

    /// Reads the remainder of an encoding expression header whose opcode has already been
    /// consumed.
    pub fn read_macro_header(&mut self, descriptor: &TypeDescriptor) -> IonResult<MacroHeader> {
        let TokenKind::MacroInvocation(address) = descriptor.kind else {
            return decoding_error("expected an encoding expression");
        };
        let (id, is_system, end) = match address {
            MacroAddress::InOpcode => (descriptor.opcode as usize, false, None),
            MacroAddress::TwelveBit => {
                let low_bits = self.next_byte("a macro address")? as usize;
                let high_bits = (descriptor.opcode & 0x0F) as usize;
                ((high_bits << 8) + low_bits + TWELVE_BIT_BIAS, false, None)
            }
            MacroAddress::System => (self.next_byte("a system macro address")? as usize, true, None),
            MacroAddress::LengthPrefixed => {
                let address = self.read_flex_uint()?.as_length()?;
                let arguments_length = self.read_flex_uint()?.as_length()?;
                (address, false, Some(self.end_after(arguments_length)?))
            }
        };
        Ok(MacroHeader {
            id,
            is_system,
            arguments_start: self.position(),
            end,
        })
    }

    /// Reads the length of a NOP pad whose type descriptor has already been consumed and
    /// returns the stream offset just past the pad.
    pub fn read_nop_pad(&mut self, descriptor: &TypeDescriptor) -> IonResult<usize> {
        let length = self.read_length(descriptor)?;
        self.end_after(length)
    }

    /// Interprets the descriptor's length encoding, reading a length field if there is one.
    fn read_length(&mut self, descriptor: &TypeDescriptor) -> IonResult<usize> {
        match descriptor.length {
            LengthEncoding::Fixed(length) => Ok(length as usize),
            LengthEncoding::VarUInt => Ok(self.read_var_uint()?.value()),
            LengthEncoding::FlexUInt => self.read_flex_uint()?.as_length(),
            LengthEncoding::FlexUIntValue => self.peek_flex_uint_length(),
            LengthEncoding::Delimited => {
                decoding_error("a delimited token does not have a declared length")
            }
        }
    }

    /// The stream offset `length` bytes after the current position.
    fn end_after(&self, length: usize) -> IonResult<usize> {
        self.position()
            .checked_add(length)
            .ok_or_else(|| decoding_error_raw("Unsupported value: declared length is too long."))
    }
}
