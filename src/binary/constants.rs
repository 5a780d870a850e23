/// Constants shared by every version of the binary encoding.
pub mod ivm {
    /// The first byte of an Ion Version Marker.
    pub const START: u8 = 0xE0;
    /// The last byte of an Ion Version Marker.
    pub const END: u8 = 0xEA;
    /// The number of bytes in an Ion Version Marker, including its leading byte.
    pub const LENGTH: usize = 4;
}

/// Constants for Ion v1.0
pub mod v1_0 {
    /// Ion Version Marker byte sequence
    pub const IVM: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

    /// Constants for interpreting the length (`L`) code of binary values
    pub mod length_codes {
        pub const NULL: u8 = 15;
        pub const VAR_UINT: u8 = 14;
    }

    /// The largest number of bytes a VarUInt may occupy and still fit in an `i64`.
    pub const MAX_VAR_UINT_SIZE_IN_BYTES: usize = 9;
}

/// Constants for Ion v1.1
pub mod v1_1 {
    /// Ion Version Marker byte sequence
    pub const IVM: [u8; 4] = [0xE0, 0x01, 0x01, 0xEA];

    /// A FlexUInt or FlexInt never needs more than this many bytes to encode a 64-bit value.
    pub const MAX_FLEX_UINT_SIZE_IN_BYTES: usize = 10;

    /// Opcodes with a fixed meaning.
    pub mod opcodes {
        pub const SYMBOL_ADDRESS_1_BYTE: u8 = 0xE1;
        pub const SYMBOL_ADDRESS_2_BYTES: u8 = 0xE2;
        pub const SYMBOL_ADDRESS_FLEX_UINT: u8 = 0xE3;
        pub const ANNOTATIONS_1_SYMBOL_ADDRESS: u8 = 0xE4;
        pub const ANNOTATIONS_2_SYMBOL_ADDRESSES: u8 = 0xE5;
        pub const ANNOTATIONS_MANY_SYMBOL_ADDRESSES: u8 = 0xE6;
        pub const ANNOTATIONS_1_FLEX_SYM: u8 = 0xE7;
        pub const ANNOTATIONS_2_FLEX_SYMS: u8 = 0xE8;
        pub const ANNOTATIONS_MANY_FLEX_SYMS: u8 = 0xE9;
        pub const NULL_UNTYPED: u8 = 0xEA;
        pub const NULL_TYPED: u8 = 0xEB;
        pub const ONE_BYTE_NOP: u8 = 0xEC;
        pub const VARIABLE_LENGTH_NOP: u8 = 0xED;
        pub const SYSTEM_MACRO_INVOCATION: u8 = 0xEF;
        pub const DELIMITED_END: u8 = 0xF0;
        pub const DELIMITED_LIST: u8 = 0xF1;
        pub const DELIMITED_SEXP: u8 = 0xF2;
        pub const DELIMITED_STRUCT: u8 = 0xF3;
        pub const LENGTH_PREFIXED_MACRO_INVOCATION: u8 = 0xF4;
        pub const STRUCT_WITH_SYMBOL_ADDRESSES: u8 = 0xFC;
        /// The opcode that follows a FlexSym of zero to encode empty text.
        pub const FLEX_SYM_EMPTY_TEXT: u8 = 0x90;
    }

    /// Macro address biases for the multi-byte address forms.
    pub mod macro_addresses {
        /// Opcodes `0x00..=0x3F` encode the address directly; the 12-bit form starts after them.
        pub const TWELVE_BIT_BIAS: usize = 64;
    }
}
