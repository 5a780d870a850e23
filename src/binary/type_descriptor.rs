use crate::binary::constants::v1_0::length_codes;
use crate::binary::constants::v1_1::opcodes;
use crate::types::IonType;

/// What a leading byte introduces, beyond the [`IonType`] of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// The byte cannot begin a token in this version of the format.
    Invalid,
    /// Padding that the cursor skips without surfacing.
    Nop,
    /// The first byte of an Ion Version Marker.
    IonVersionMarker,
    /// An annotations wrapper (1.0) or an annotation sequence prefix (1.1).
    Annotations(AnnotationsEncoding),
    /// An encoding expression: a macro invocation that must be handled by a higher layer.
    MacroInvocation(MacroAddress),
    /// The end of a delimited container (1.1 only).
    DelimitedEnd,
    /// A value of the type in [`TypeDescriptor::ion_type`].
    Value,
}

/// How the length of a token's body is determined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LengthEncoding {
    /// The length is implied by the leading byte.
    Fixed(u8),
    /// A VarUInt length follows the leading byte (1.0).
    VarUInt,
    /// A FlexUInt length follows the leading byte (1.1).
    FlexUInt,
    /// The body is a single FlexUInt whose own encoded size is the body's length (1.1 `0xE3`).
    FlexUIntValue,
    /// The body is terminated by an explicit end marker (1.1 `0xF1..=0xF3`).
    Delimited,
}

/// How a sequence of annotations is encoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnnotationsEncoding {
    /// An Ion 1.0 annotations wrapper: the wrapper's length, the annotation sequence's length,
    /// a sequence of VarUInt symbol IDs, and finally the wrapped value.
    Wrapper,
    /// `count` FlexUInt symbol addresses, or a FlexUInt-length-prefixed sequence of them when
    /// `count` is `None`.
    SymbolAddresses { count: Option<u8> },
    /// `count` FlexSyms, or a FlexUInt-length-prefixed sequence of them when `count` is `None`.
    FlexSyms { count: Option<u8> },
}

/// How the address of an encoding expression is encoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MacroAddress {
    /// The opcode is the address (`0x00..=0x3F`).
    InOpcode,
    /// The opcode's low nibble holds the high bits of a biased 12-bit address; one more byte
    /// follows (`0x40..=0x4F`).
    TwelveBit,
    /// A one-byte system macro address follows (`0xEF`).
    System,
    /// A FlexUInt address follows, then a FlexUInt length of the argument bytes (`0xF4`).
    LengthPrefixed,
}

/// How the field names of a struct are encoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldNameEncoding {
    /// Ion 1.0 VarUInt symbol IDs.
    VarUIntSymbolId,
    /// Ion 1.1 FlexUInt symbol addresses. An address of zero switches the rest of the struct to
    /// FlexSym field names.
    FlexUIntSymbolId,
    /// Ion 1.1 FlexSyms, which may be symbol addresses or inline text.
    FlexSym,
}

/// Contains all of the information that can be extracted from the one-octet type descriptor
/// found at the beginning of each value, annotations sequence, IVM, macro invocation or NOP in
/// a binary Ion stream.
///
/// Each version of the format has its own statically computed table of 256 descriptors so
/// the cursor never needs to mask or shift a leading byte to learn what it introduces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub opcode: u8,
    pub kind: TokenKind,
    pub ion_type: Option<IonType>,
    pub length: LengthEncoding,
    pub is_null: bool,
    /// Ion 1.0 only; Ion 1.1 integers carry their sign in their two's complement body.
    pub is_negative_int: bool,
    /// Whether the token may contain inline text rather than symbol IDs.
    pub is_inlineable: bool,
    pub field_names: Option<FieldNameEncoding>,
}

const INVALID: TypeDescriptor = TypeDescriptor {
    opcode: 0,
    kind: TokenKind::Invalid,
    ion_type: None,
    length: LengthEncoding::Fixed(0),
    is_null: false,
    is_negative_int: false,
    is_inlineable: false,
    field_names: None,
};

/// A statically defined array of TypeDescriptor that allows a binary reader to map a given
/// Ion 1.0 byte (`u8`) to a `TypeDescriptor` without having to perform any masking or bitshift
/// operations.
pub static ION_1_0_TYPE_DESCRIPTORS: [TypeDescriptor; 256] = init_type_descriptor_cache(0);

/// The Ion 1.1 counterpart of [`ION_1_0_TYPE_DESCRIPTORS`].
pub static ION_1_1_TYPE_DESCRIPTORS: [TypeDescriptor; 256] = init_type_descriptor_cache(1);

/// Used before any Ion Version Marker has been read. Every byte other than the start of an IVM
/// is invalid, so a stream must declare its version before its first value.
pub static NO_IVM_TYPE_DESCRIPTORS: [TypeDescriptor; 256] = init_no_ivm_cache();

const fn init_type_descriptor_cache(minor_version: u8) -> [TypeDescriptor; 256] {
    let mut jump_table = [INVALID; 256];
    let mut index: usize = 0;
    while index < 256 {
        let byte = index as u8;
        jump_table[index] = if minor_version == 0 {
            TypeDescriptor::from_byte_1_0(byte)
        } else {
            TypeDescriptor::from_byte_1_1(byte)
        };
        index += 1;
    }
    jump_table
}

const fn init_no_ivm_cache() -> [TypeDescriptor; 256] {
    let mut jump_table = [INVALID; 256];
    let mut index: usize = 0;
    while index < 256 {
        jump_table[index].opcode = index as u8;
        index += 1;
    }
    jump_table[0xE0].kind = TokenKind::IonVersionMarker;
    jump_table
}

/// In Ion 1.1, a typed null is the opcode `0xEB` followed by a one-byte type code. Returns the
/// Ion 1.0 descriptor for the null of that type so the cursor can report it as if it had been
/// read from a single precomputed byte.
pub fn typed_null_descriptor(type_code: u8) -> Option<&'static TypeDescriptor> {
    let ion_1_0_byte = match type_code {
        0x0 => 0x1F, // null.bool
        0x1 => 0x2F, // null.int
        0x2 => 0x4F, // null.float
        0x3 => 0x5F, // null.decimal
        0x4 => 0x6F, // null.timestamp
        0x5 => 0x8F, // null.string
        0x6 => 0x7F, // null.symbol
        0x7 => 0xAF, // null.blob
        0x8 => 0x9F, // null.clob
        0x9 => 0xBF, // null.list
        0xA => 0xCF, // null.sexp
        0xB => 0xDF, // null.struct
        _ => return None,
    };
    Some(&ION_1_0_TYPE_DESCRIPTORS[ion_1_0_byte])
}

impl TypeDescriptor {
    const fn value(opcode: u8, ion_type: IonType, length: LengthEncoding) -> TypeDescriptor {
        TypeDescriptor {
            opcode,
            kind: TokenKind::Value,
            ion_type: Some(ion_type),
            length,
            ..INVALID
        }
    }

    const fn token(opcode: u8, kind: TokenKind, length: LengthEncoding) -> TypeDescriptor {
        TypeDescriptor {
            opcode,
            kind,
            length,
            ..INVALID
        }
    }

    const fn invalid(opcode: u8) -> TypeDescriptor {
        TypeDescriptor { opcode, ..INVALID }
    }

    const fn null(opcode: u8, ion_type: IonType) -> TypeDescriptor {
        TypeDescriptor {
            is_null: true,
            ..TypeDescriptor::value(opcode, ion_type, LengthEncoding::Fixed(0))
        }
    }

    const fn from_byte_1_0(byte: u8) -> TypeDescriptor {
        let (type_code, length_code) = (byte >> 4, byte & 0x0F);
        let length = if length_code == length_codes::VAR_UINT {
            LengthEncoding::VarUInt
        } else {
            LengthEncoding::Fixed(length_code)
        };
        let ion_type = match type_code {
            0x0 => IonType::Null,
            0x1 => IonType::Bool,
            0x2 | 0x3 => IonType::Int,
            0x4 => IonType::Float,
            0x5 => IonType::Decimal,
            0x6 => IonType::Timestamp,
            0x7 => IonType::Symbol,
            0x8 => IonType::String,
            0x9 => IonType::Clob,
            0xA => IonType::Blob,
            0xB => IonType::List,
            0xC => IonType::SExp,
            0xD => IonType::Struct,
            0xE => {
                return match length_code {
                    0x0 => TypeDescriptor::token(
                        byte,
                        TokenKind::IonVersionMarker,
                        LengthEncoding::Fixed(3),
                    ),
                    0x3..=0xE => TypeDescriptor::token(
                        byte,
                        TokenKind::Annotations(AnnotationsEncoding::Wrapper),
                        length,
                    ),
                    _ => TypeDescriptor::invalid(byte),
                }
            }
            _ => return TypeDescriptor::invalid(byte),
        };
        if length_code == length_codes::NULL {
            return TypeDescriptor {
                is_negative_int: type_code == 0x3,
                ..TypeDescriptor::null(byte, ion_type)
            };
        }
        match type_code {
            0x0 => TypeDescriptor::token(byte, TokenKind::Nop, length),
            0x1 if length_code <= 1 => {
                TypeDescriptor::value(byte, ion_type, LengthEncoding::Fixed(0))
            }
            0x1 => TypeDescriptor::invalid(byte),
            // Negative zero may not be encoded as a zero-length negative int.
            0x3 if length_code == 0 => TypeDescriptor::invalid(byte),
            0x3 => TypeDescriptor {
                is_negative_int: true,
                ..TypeDescriptor::value(byte, ion_type, length)
            },
            0x4 if !matches!(length_code, 0 | 4 | 8) => TypeDescriptor::invalid(byte),
            0x6 if length_code <= 1 => TypeDescriptor::invalid(byte),
            // D1 is an ordered struct, which always has a VarUInt length.
            0xD if length_code == 1 => TypeDescriptor {
                field_names: Some(FieldNameEncoding::VarUIntSymbolId),
                ..TypeDescriptor::value(byte, ion_type, LengthEncoding::VarUInt)
            },
            0xD => TypeDescriptor {
                field_names: Some(FieldNameEncoding::VarUIntSymbolId),
                ..TypeDescriptor::value(byte, ion_type, length)
            },
            _ => TypeDescriptor::value(byte, ion_type, length),
        }
    }

    const fn from_byte_1_1(byte: u8) -> TypeDescriptor {
        use LengthEncoding::*;
        let low_nibble = byte & 0x0F;
        match byte {
            0x00..=0x3F => {
                TypeDescriptor::token(byte, TokenKind::MacroInvocation(MacroAddress::InOpcode), Fixed(0))
            }
            0x40..=0x4F => TypeDescriptor::token(
                byte,
                TokenKind::MacroInvocation(MacroAddress::TwelveBit),
                Fixed(1),
            ),
            0x50..=0x58 => TypeDescriptor::value(byte, IonType::Int, Fixed(low_nibble)),
            0x5A => TypeDescriptor::value(byte, IonType::Float, Fixed(0)),
            0x5B => TypeDescriptor::value(byte, IonType::Float, Fixed(2)),
            0x5C => TypeDescriptor::value(byte, IonType::Float, Fixed(4)),
            0x5D => TypeDescriptor::value(byte, IonType::Float, Fixed(8)),
            0x5E | 0x5F => TypeDescriptor::value(byte, IonType::Bool, Fixed(0)),
            0x60..=0x6F => TypeDescriptor::value(byte, IonType::Decimal, Fixed(low_nibble)),
            0x70..=0x7C => {
                let length = match byte {
                    0x70 => 1,
                    0x71 | 0x72 => 2,
                    0x73 => 4,
                    0x74 | 0x78 | 0x79 => 5,
                    0x75 => 6,
                    0x76 | 0x7A => 7,
                    0x77 | 0x7B => 8,
                    _ => 9,
                };
                TypeDescriptor::value(byte, IonType::Timestamp, Fixed(length))
            }
            0x80..=0x8F => TypeDescriptor::value(byte, IonType::String, Fixed(low_nibble)),
            0x90..=0x9F => TypeDescriptor {
                is_inlineable: true,
                ..TypeDescriptor::value(byte, IonType::Symbol, Fixed(low_nibble))
            },
            0xA0..=0xAF => TypeDescriptor::value(byte, IonType::List, Fixed(low_nibble)),
            0xB0..=0xBF => TypeDescriptor::value(byte, IonType::SExp, Fixed(low_nibble)),
            0xC1 | 0xD0 | 0xD1 => TypeDescriptor::invalid(byte),
            0xC0..=0xCF => TypeDescriptor {
                field_names: Some(FieldNameEncoding::FlexUIntSymbolId),
                ..TypeDescriptor::value(byte, IonType::Struct, Fixed(low_nibble))
            },
            0xD2..=0xDF => TypeDescriptor {
                is_inlineable: true,
                field_names: Some(FieldNameEncoding::FlexSym),
                ..TypeDescriptor::value(byte, IonType::Struct, Fixed(low_nibble))
            },
            0xE0 => TypeDescriptor::token(byte, TokenKind::IonVersionMarker, Fixed(3)),
            0xE1 | 0xE2 => TypeDescriptor::value(byte, IonType::Symbol, Fixed(low_nibble)),
            opcodes::SYMBOL_ADDRESS_FLEX_UINT => {
                TypeDescriptor::value(byte, IonType::Symbol, FlexUIntValue)
            }
            opcodes::ANNOTATIONS_1_SYMBOL_ADDRESS..=opcodes::ANNOTATIONS_MANY_SYMBOL_ADDRESSES => {
                let count = match byte {
                    opcodes::ANNOTATIONS_1_SYMBOL_ADDRESS => Some(1),
                    opcodes::ANNOTATIONS_2_SYMBOL_ADDRESSES => Some(2),
                    _ => None,
                };
                TypeDescriptor::token(
                    byte,
                    TokenKind::Annotations(AnnotationsEncoding::SymbolAddresses { count }),
                    if count.is_some() { Fixed(0) } else { FlexUInt },
                )
            }
            opcodes::ANNOTATIONS_1_FLEX_SYM..=opcodes::ANNOTATIONS_MANY_FLEX_SYMS => {
                let count = match byte {
                    opcodes::ANNOTATIONS_1_FLEX_SYM => Some(1),
                    opcodes::ANNOTATIONS_2_FLEX_SYMS => Some(2),
                    _ => None,
                };
                TypeDescriptor {
                    is_inlineable: true,
                    ..TypeDescriptor::token(
                        byte,
                        TokenKind::Annotations(AnnotationsEncoding::FlexSyms { count }),
                        if count.is_some() { Fixed(0) } else { FlexUInt },
                    )
                }
            }
            opcodes::NULL_UNTYPED => TypeDescriptor::null(byte, IonType::Null),
            opcodes::NULL_TYPED => TypeDescriptor {
                length: Fixed(1),
                ..TypeDescriptor::null(byte, IonType::Null)
            },
            opcodes::ONE_BYTE_NOP => TypeDescriptor::token(byte, TokenKind::Nop, Fixed(0)),
            opcodes::VARIABLE_LENGTH_NOP => TypeDescriptor::token(byte, TokenKind::Nop, FlexUInt),
            opcodes::SYSTEM_MACRO_INVOCATION => TypeDescriptor::token(
                byte,
                TokenKind::MacroInvocation(MacroAddress::System),
                Fixed(1),
            ),
            opcodes::DELIMITED_END => TypeDescriptor::token(byte, TokenKind::DelimitedEnd, Fixed(0)),
            opcodes::DELIMITED_LIST => TypeDescriptor::value(byte, IonType::List, Delimited),
            opcodes::DELIMITED_SEXP => TypeDescriptor::value(byte, IonType::SExp, Delimited),
            opcodes::DELIMITED_STRUCT => TypeDescriptor {
                is_inlineable: true,
                field_names: Some(FieldNameEncoding::FlexSym),
                ..TypeDescriptor::value(byte, IonType::Struct, Delimited)
            },
            opcodes::LENGTH_PREFIXED_MACRO_INVOCATION => TypeDescriptor::token(
                byte,
                TokenKind::MacroInvocation(MacroAddress::LengthPrefixed),
                FlexUInt,
            ),
            0xF5 => TypeDescriptor::value(byte, IonType::Int, FlexUInt),
            0xF6 => TypeDescriptor::value(byte, IonType::Decimal, FlexUInt),
            0xF7 => TypeDescriptor::value(byte, IonType::Timestamp, FlexUInt),
            0xF8 => TypeDescriptor::value(byte, IonType::String, FlexUInt),
            0xF9 => TypeDescriptor {
                is_inlineable: true,
                ..TypeDescriptor::value(byte, IonType::Symbol, FlexUInt)
            },
            0xFA => TypeDescriptor::value(byte, IonType::List, FlexUInt),
            0xFB => TypeDescriptor::value(byte, IonType::SExp, FlexUInt),
            opcodes::STRUCT_WITH_SYMBOL_ADDRESSES => TypeDescriptor {
                field_names: Some(FieldNameEncoding::FlexUIntSymbolId),
                ..TypeDescriptor::value(byte, IonType::Struct, FlexUInt)
            },
            0xFD => TypeDescriptor {
                is_inlineable: true,
                field_names: Some(FieldNameEncoding::FlexSym),
                ..TypeDescriptor::value(byte, IonType::Struct, FlexUInt)
            },
            0xFE => TypeDescriptor::value(byte, IonType::Blob, FlexUInt),
            0xFF => TypeDescriptor::value(byte, IonType::Clob, FlexUInt),
            // 0x59, 0x7D..=0x7F and 0xEE
            _ => TypeDescriptor::invalid(byte),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind != TokenKind::Invalid
    }

    pub fn is_nop(&self) -> bool {
        self.kind == TokenKind::Nop
    }

    pub fn is_ivm_start(&self) -> bool {
        self.kind == TokenKind::IonVersionMarker
    }

    pub fn is_annotations(&self) -> bool {
        matches!(self.kind, TokenKind::Annotations(_))
    }

    pub fn is_macro_invocation(&self) -> bool {
        matches!(self.kind, TokenKind::MacroInvocation(_))
    }

    pub fn is_delimited_end(&self) -> bool {
        self.kind == TokenKind::DelimitedEnd
    }

    pub fn is_delimited(&self) -> bool {
        self.length == LengthEncoding::Delimited
    }

    /// Whether a length field follows the leading byte.
    pub fn is_variable_length(&self) -> bool {
        matches!(self.length, LengthEncoding::VarUInt | LengthEncoding::FlexUInt)
    }

    pub fn is_container(&self) -> bool {
        self.kind == TokenKind::Value
            && !self.is_null
            && matches!(self.ion_type, Some(IonType::List | IonType::SExp | IonType::Struct))
    }

    /// An Ion 1.0 struct whose fields are sorted by symbol ID. It may not be empty.
    pub fn is_ordered_struct(&self) -> bool {
        self.opcode == 0xD1 && self.field_names == Some(FieldNameEncoding::VarUIntSymbolId)
    }

    /// The body length implied by the leading byte, if any.
    pub fn fixed_length(&self) -> Option<usize> {
        match self.length {
            LengthEncoding::Fixed(length) => Some(length as usize),
            _ => None,
        }
    }
}
