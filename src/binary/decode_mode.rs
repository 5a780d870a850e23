//! Selects between the checked and unchecked forms of the primitive decoders.
//!
//! Code that parses token headers is written once, generic over [`DecodeMode`]. The cursor
//! instantiates it with [`Checked`] while streaming, where running out of bytes means "wait for
//! more data", and with [`Unchecked`] when the bytes are known to be resident, where running out
//! of bytes means the data is malformed.

use crate::binary::flex_int::FlexInt;
use crate::binary::flex_sym::FlexSym;
use crate::binary::flex_uint::{truncated_raw, FlexUInt};
use crate::binary::var_uint::VarUInt;
use crate::result::{incomplete, IonError, IonResult};

pub(crate) trait DecodeMode {
    fn var_uint(input: &[u8], offset: usize) -> IonResult<VarUInt>;
    fn flex_uint(input: &[u8], offset: usize) -> IonResult<FlexUInt>;
    fn flex_int(input: &[u8], offset: usize) -> IonResult<FlexInt>;
    fn flex_sym(input: &[u8], offset: usize) -> IonResult<FlexSym<'_>>;

    /// The number of bytes in the FlexUInt at the beginning of `input`.
    fn flex_uint_length(input: &[u8], offset: usize) -> IonResult<usize>;

    /// Fails if `input` holds fewer than `length` bytes.
    fn require(input: &[u8], length: usize, offset: usize, label: &'static str) -> IonResult<()>;
}

pub(crate) struct Checked;

pub(crate) struct Unchecked;

impl DecodeMode for Checked {
    #[inline]
    fn var_uint(input: &[u8], offset: usize) -> IonResult<VarUInt> {
        VarUInt::read(input, offset)
    }

    #[inline]
    fn flex_uint(input: &[u8], offset: usize) -> IonResult<FlexUInt> {
        FlexUInt::read(input, offset)
    }

    #[inline]
    fn flex_int(input: &[u8], offset: usize) -> IonResult<FlexInt> {
        FlexInt::read(input, offset)
    }

    #[inline]
    fn flex_sym(input: &[u8], offset: usize) -> IonResult<FlexSym<'_>> {
        FlexSym::read(input, offset)
    }

    #[inline]
    fn flex_uint_length(input: &[u8], offset: usize) -> IonResult<usize> {
        FlexUInt::encoded_length(input, offset)
    }

    #[inline]
    fn require(input: &[u8], length: usize, offset: usize, label: &'static str) -> IonResult<()> {
        if input.len() < length {
            return incomplete(label, offset);
        }
        Ok(())
    }
}

impl DecodeMode for Unchecked {
    #[inline]
    fn var_uint(input: &[u8], offset: usize) -> IonResult<VarUInt> {
        VarUInt::read_unchecked(input, offset)
    }

    #[inline]
    fn flex_uint(input: &[u8], offset: usize) -> IonResult<FlexUInt> {
        FlexUInt::read_unchecked(input, offset)
    }

    #[inline]
    fn flex_int(input: &[u8], offset: usize) -> IonResult<FlexInt> {
        FlexInt::read_unchecked(input, offset)
    }

    #[inline]
    fn flex_sym(input: &[u8], offset: usize) -> IonResult<FlexSym<'_>> {
        FlexSym::read_unchecked(input, offset)
    }

    #[inline]
    fn flex_uint_length(input: &[u8], offset: usize) -> IonResult<usize> {
        FlexUInt::encoded_length(input, offset).map_err(|e| match e {
            IonError::Incomplete(_) => truncated_raw("FlexUInt", offset),
            other => other,
        })
    }

    #[inline]
    fn require(input: &[u8], length: usize, offset: usize, label: &'static str) -> IonResult<()> {
        if input.len() < length {
            return Err(truncated_raw(label, offset));
        }
        Ok(())
    }
}
