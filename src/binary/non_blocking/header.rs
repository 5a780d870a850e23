use crate::binary::decode_mode::DecodeMode;
use crate::binary::non_blocking::binary_buffer::{
    AnnotationsHeader, BinaryBuffer, FieldNameToken, MacroHeader, ValueHeader,
};
use crate::binary::non_blocking::marker::FieldNameSpan;
use crate::binary::type_descriptor::{FieldNameEncoding, TokenKind, TypeDescriptor};
use crate::result::{decoding_error, IonResult};

/// What the cursor knows about the position it is about to read from.
#[derive(Debug, Copy, Clone)]
pub(crate) struct HeaderContext {
    pub descriptors: &'static [TypeDescriptor; 256],
    /// How the field name is encoded, if a field name precedes the token.
    pub field_names: Option<FieldNameEncoding>,
    /// Whether an annotation sequence has already been read for this value.
    pub annotated: bool,
    pub at_top_level: bool,
}

/// One unit of header parsing. Reading a header never changes the cursor; it describes what was
/// found so that the cursor can commit it all at once.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum TokenHeader {
    IonVersionMarker {
        major: u8,
        minor: u8,
        end: usize,
    },
    Nop {
        field_name: Option<FieldNameSpan>,
        end: usize,
    },
    /// Either a `0xF0` opcode or the FlexSym escape that ends a delimited struct.
    DelimitedEnd {
        end: usize,
    },
    /// A field name (if any) and an annotation sequence. The annotated value's type descriptor
    /// is at `end` and is read as a separate unit.
    Annotations {
        field_name: Option<FieldNameSpan>,
        annotations: AnnotationsHeader,
        end: usize,
    },
    Value {
        field_name: Option<FieldNameSpan>,
        header: ValueHeader,
    },
    MacroInvocation {
        field_name: Option<FieldNameSpan>,
        descriptor: &'static TypeDescriptor,
        header: MacroHeader,
    },
}

impl TokenHeader {
    pub fn field_name(&self) -> Option<FieldNameSpan> {
        match self {
            TokenHeader::Nop { field_name, .. }
            | TokenHeader::Annotations { field_name, .. }
            | TokenHeader::Value { field_name, .. }
            | TokenHeader::MacroInvocation { field_name, .. } => *field_name,
            _ => None,
        }
    }
}

/// Reads the token that begins at the buffer's current position.
pub(crate) fn read_token_header<M: DecodeMode>(
    buffer: &mut BinaryBuffer<'_, M>,
    context: &HeaderContext,
) -> IonResult<TokenHeader> {
    let field_name = match context.field_names {
        Some(encoding) => match buffer.read_field_name(encoding)? {
            FieldNameToken::Name(span) => Some(span),
            FieldNameToken::DelimitedEnd => {
                return Ok(TokenHeader::DelimitedEnd {
                    end: buffer.position(),
                })
            }
        },
        None => None,
    };
    let type_id_offset = buffer.position();
    let opcode = buffer.peek_next_byte("a type descriptor")?;
    let descriptor = &context.descriptors[opcode as usize];
    if descriptor.kind == TokenKind::IonVersionMarker {
        if !context.at_top_level || field_name.is_some() {
            return decoding_error(format!(
                "found an Ion version marker inside a container at offset {type_id_offset}"
            ));
        }
        if context.annotated {
            return decoding_error("Invalid annotation wrapper: an Ion version marker may not be annotated.");
        }
        let (major, minor) = buffer.read_ivm()?;
        return Ok(TokenHeader::IonVersionMarker {
            major,
            minor,
            end: buffer.position(),
        });
    }
    buffer.consume(1);
    match descriptor.kind {
        TokenKind::Invalid => decoding_error(format!(
            "Invalid type ID 0x{opcode:02X} at offset {type_id_offset}."
        )),
        TokenKind::Nop if context.annotated => {
            decoding_error("Invalid annotation wrapper: NOP pad may not occur inside a wrapper.")
        }
        TokenKind::Nop => Ok(TokenHeader::Nop {
            field_name,
            end: buffer.read_nop_pad(descriptor)?,
        }),
        TokenKind::DelimitedEnd if context.annotated || field_name.is_some() => decoding_error(
            format!("found a delimited end in place of a value at offset {type_id_offset}"),
        ),
        TokenKind::DelimitedEnd => Ok(TokenHeader::DelimitedEnd {
            end: buffer.position(),
        }),
        TokenKind::Annotations(_) if context.annotated => {
            decoding_error("Nested annotation wrappers are invalid.")
        }
        TokenKind::Annotations(_) => {
            let annotations = buffer.read_annotations(descriptor)?;
            Ok(TokenHeader::Annotations {
                field_name,
                annotations,
                end: buffer.position(),
            })
        }
        TokenKind::MacroInvocation(_) if context.annotated => decoding_error(format!(
            "found annotations on an encoding expression at offset {type_id_offset}"
        )),
        TokenKind::MacroInvocation(_) => Ok(TokenHeader::MacroInvocation {
            field_name,
            descriptor,
            header: buffer.read_macro_header(descriptor)?,
        }),
        TokenKind::Value => Ok(TokenHeader::Value {
            field_name,
            header: buffer.read_value_header(descriptor)?,
        }),
        // Handled above.
        TokenKind::IonVersionMarker => decoding_error("Invalid Ion version marker."),
    }
}

/// Ion 1.0 integers carry their sign in the type descriptor, so a negative int whose magnitude
/// is zero is representable but invalid.
pub(crate) fn validate_int_sign(descriptor: &TypeDescriptor, body: &[u8]) -> IonResult<()> {
    if descriptor.is_negative_int && !descriptor.is_null && body.iter().all(|b| *b == 0) {
        return decoding_error("Int zero may not be negative.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::decode_mode::{Checked, Unchecked};
    use crate::binary::type_descriptor::{
        NO_IVM_TYPE_DESCRIPTORS, ION_1_0_TYPE_DESCRIPTORS, ION_1_1_TYPE_DESCRIPTORS,
    };
    use crate::result::IonError;
    use crate::types::IonType;
    use rstest::rstest;

    fn context(descriptors: &'static [TypeDescriptor; 256]) -> HeaderContext {
        HeaderContext {
            descriptors,
            field_names: None,
            annotated: false,
            at_top_level: true,
        }
    }

    fn read(data: &[u8], context: &HeaderContext) -> IonResult<TokenHeader> {
        read_token_header(&mut BinaryBuffer::<Checked>::new(data, 0), context)
    }

    #[test]
    fn version_marker_before_any_value() -> IonResult<()> {
        let header = read(&[0xE0, 0x01, 0x01, 0xEA], &context(&NO_IVM_TYPE_DESCRIPTORS))?;
        assert_eq!(
            header,
            TokenHeader::IonVersionMarker {
                major: 1,
                minor: 1,
                end: 4
            }
        );
        assert!(read(&[0x21, 0x01], &context(&NO_IVM_TYPE_DESCRIPTORS)).is_err());
        Ok(())
    }

    #[test]
    fn version_marker_inside_a_container() {
        let nested = HeaderContext {
            at_top_level: false,
            ..context(&ION_1_0_TYPE_DESCRIPTORS)
        };
        assert!(matches!(
            read(&[0xE0, 0x01, 0x00, 0xEA], &nested),
            Err(IonError::Decoding(_))
        ));
    }

    #[test]
    fn field_name_and_value() -> IonResult<()> {
        let in_struct = HeaderContext {
            field_names: Some(FieldNameEncoding::VarUIntSymbolId),
            at_top_level: false,
            ..context(&ION_1_0_TYPE_DESCRIPTORS)
        };
        let TokenHeader::Value { field_name, header } = read(&[0x84, 0x21, 0x07], &in_struct)?
        else {
            panic!("expected a value header");
        };
        assert_eq!(field_name.map(|f| (f.start, f.end)), Some((0, 1)));
        assert_eq!(header.descriptor.ion_type, Some(IonType::Int));
        assert_eq!((header.body_start, header.end), (2, Some(3)));
        Ok(())
    }

    #[test]
    fn annotations_then_value() -> IonResult<()> {
        let cx = context(&ION_1_1_TYPE_DESCRIPTORS);
        let TokenHeader::Annotations { annotations, end, .. } =
            read(&[0xE4, 0x09, 0x61, 0x05], &cx)?
        else {
            panic!("expected annotations");
        };
        assert_eq!((annotations.span.start, annotations.span.end), (1, 2));
        assert_eq!(end, 2);
        let annotated = HeaderContext {
            annotated: true,
            ..cx
        };
        assert!(matches!(
            read_token_header(&mut BinaryBuffer::<Unchecked>::new(&[0x61, 0x05], 2), &annotated)?,
            TokenHeader::Value { .. }
        ));
        Ok(())
    }

    #[rstest]
    #[case::nested_annotations(&[0xE4, 0x09])]
    #[case::annotated_nop(&[0xEC])]
    #[case::annotated_macro(&[0x05])]
    #[case::annotated_end(&[0xF0])]
    fn invalid_after_annotations(#[case] data: &[u8]) {
        let annotated = HeaderContext {
            annotated: true,
            ..context(&ION_1_1_TYPE_DESCRIPTORS)
        };
        assert!(matches!(read(data, &annotated), Err(IonError::Decoding(_))));
    }

    #[test]
    fn delimited_struct_end() -> IonResult<()> {
        let in_struct = HeaderContext {
            field_names: Some(FieldNameEncoding::FlexSym),
            at_top_level: false,
            ..context(&ION_1_1_TYPE_DESCRIPTORS)
        };
        assert_eq!(
            read(&[0x01, 0xF0], &in_struct)?,
            TokenHeader::DelimitedEnd { end: 2 }
        );
        Ok(())
    }

    #[test]
    fn partial_header_is_incomplete() {
        let cx = context(&ION_1_0_TYPE_DESCRIPTORS);
        assert!(matches!(read(&[0x8E], &cx), Err(IonError::Incomplete(_))));
    }

    #[rstest]
    #[case(0x31, &[0x00], true)]
    #[case(0x32, &[0x00, 0x01], false)]
    #[case(0x21, &[0x00], false)]
    #[case(0x3F, &[], false)]
    fn negative_zero(#[case] opcode: u8, #[case] body: &[u8], #[case] invalid: bool) {
        let result = validate_int_sign(&ION_1_0_TYPE_DESCRIPTORS[opcode as usize], body);
        assert_eq!(result.is_err(), invalid);
    }
}
