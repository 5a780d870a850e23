//! Locates the end of a delimited container (or of a single value whose header is too large to
//! buffer) without surfacing any of the tokens inside it.
//!
//! A [`DelimitedScan`] is a small state machine that can be parked when the buffered data runs
//! out and resumed later. Each call to [`DelimitedScan::step`] examines one unit (a type
//! descriptor with its length field, a field name or a run of annotations) and commits its
//! progress only once the whole unit has been read. The bodies of length-prefixed tokens are
//! stepped over by position alone, so they never need to be buffered.

use smallvec::SmallVec;

use crate::binary::decode_mode::Checked;
use crate::binary::non_blocking::binary_buffer::BinaryBuffer;
use crate::binary::type_descriptor::{
    AnnotationsEncoding, FieldNameEncoding, MacroAddress, TokenKind,
};
use crate::binary::IonVersion;
use crate::result::{decoding_error, IonError, IonResult};
use crate::types::IonType;

/// A scope that the scan is currently inside of.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ScanFrame {
    /// Tagged values until an end marker: a delimited list or s-expression, or a delimited
    /// argument group.
    Sequence,
    /// FlexSym field names and their values until the FlexSym end escape.
    Struct { expecting_value: bool },
    /// Exactly one value, which may be preceded by a field name and annotations.
    Single {
        field_name: Option<FieldNameEncoding>,
    },
}

impl ScanFrame {
    /// The frame that scans the contents of a delimited container of the given type.
    pub fn for_container(ion_type: IonType) -> ScanFrame {
        match ion_type {
            IonType::Struct => ScanFrame::Struct {
                expecting_value: false,
            },
            _ => ScanFrame::Sequence,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ScanProgress {
    /// A unit was consumed; call `step` again.
    Advanced,
    /// The scan needs this many bytes (counted from its current position) to be buffered before
    /// it can read the next unit.
    NeedsBytes(usize),
    /// The outermost frame has ended; [`DelimitedScan::position`] is its end.
    Finished,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Action {
    None,
    /// A value (or a NOP standing in for one) was stepped over.
    Value,
    Push(ScanFrame),
    Pop,
    FieldName,
    SwitchToFlexSym,
    FlexSymAnnotations(u8),
    FlexSymAnnotation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Unit {
    length: usize,
    action: Action,
}

impl Unit {
    fn new(length: usize, action: Action) -> Unit {
        Unit { length, action }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DelimitedScan {
    version: IonVersion,
    position: usize,
    frames: SmallVec<[ScanFrame; 8]>,
    // FlexSym annotations still to be stepped over for the current `0xE7`/`0xE8` token.
    pending_flex_syms: u8,
    switched_to_flex_sym: bool,
}

impl DelimitedScan {
    pub fn new(version: IonVersion, position: usize, frame: ScanFrame) -> DelimitedScan {
        let mut frames = SmallVec::new();
        frames.push(frame);
        DelimitedScan {
            version,
            position,
            frames,
            pending_flex_syms: 0,
            switched_to_flex_sym: false,
        }
    }

    /// Nests `frame` inside the current innermost frame. The scan's position must be at the
    /// start of `frame`'s contents.
    pub fn push(&mut self, frame: ScanFrame) {
        self.frames.push(frame);
    }

    /// The stream offset of the next byte the scan will examine.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether a `Single` scan found the field name `0` that switches a symbol address struct to
    /// FlexSym field names.
    pub fn switched_to_flex_sym(&self) -> bool {
        self.switched_to_flex_sym
    }

    /// Examines the next unit. `input` holds the bytes that are buffered starting at
    /// [`position`](Self::position); it may be empty.
    pub fn step(&mut self, input: &[u8]) -> IonResult<ScanProgress> {
        if self.is_finished() {
            return Ok(ScanProgress::Finished);
        }
        let mut buffer = BinaryBuffer::<Checked>::new(input, self.position);
        let unit = match self.read_unit(&mut buffer) {
            Ok(unit) => unit,
            Err(IonError::Incomplete(_)) => return Ok(ScanProgress::NeedsBytes(buffer.wanted())),
            Err(e) => return Err(e),
        };
        self.apply(unit);
        if self.is_finished() {
            Ok(ScanProgress::Finished)
        } else {
            Ok(ScanProgress::Advanced)
        }
    }

    fn apply(&mut self, unit: Unit) {
        self.position += unit.length;
        match unit.action {
            Action::None => {}
            Action::Value => self.complete_value(),
            Action::Push(frame) => self.frames.push(frame),
            Action::Pop => {
                // The container that just ended is itself a value in the enclosing frame.
                self.frames.pop();
                self.complete_value();
            }
            Action::FieldName => match self.frames.last_mut() {
                Some(ScanFrame::Struct { expecting_value }) => *expecting_value = true,
                Some(ScanFrame::Single { field_name }) => *field_name = None,
                _ => {}
            },
            Action::SwitchToFlexSym => {
                if let Some(ScanFrame::Single { field_name }) = self.frames.last_mut() {
                    *field_name = Some(FieldNameEncoding::FlexSym);
                }
                self.switched_to_flex_sym = true;
            }
            Action::FlexSymAnnotations(count) => self.pending_flex_syms = count,
            Action::FlexSymAnnotation => self.pending_flex_syms -= 1,
        }
    }

    fn complete_value(&mut self) {
        match self.frames.last_mut() {
            Some(ScanFrame::Struct { expecting_value }) => *expecting_value = false,
            Some(ScanFrame::Single { .. }) => {
                self.frames.pop();
            }
            _ => {}
        }
    }

    fn read_unit(&self, buffer: &mut BinaryBuffer<'_, Checked>) -> IonResult<Unit> {
        if self.pending_flex_syms > 0 {
            return match buffer.skip_flex_sym()? {
                Some(length) => Ok(Unit::new(length, Action::FlexSymAnnotation)),
                None => decoding_error("found a delimited end in an annotation sequence"),
            };
        }
        match self.frames.last().copied() {
            Some(ScanFrame::Struct {
                expecting_value: false,
            }) => match buffer.skip_flex_sym()? {
                Some(length) => Ok(Unit::new(length, Action::FieldName)),
                None => Ok(Unit::new(buffer.consumed(), Action::Pop)),
            },
            Some(ScanFrame::Single {
                field_name: Some(encoding),
            }) => Self::read_field_name(buffer, encoding),
            _ => self.read_token(buffer),
        }
    }

    fn read_field_name(
        buffer: &mut BinaryBuffer<'_, Checked>,
        encoding: FieldNameEncoding,
    ) -> IonResult<Unit> {
        match encoding {
            FieldNameEncoding::VarUIntSymbolId => {
                buffer.read_var_uint()?;
            }
            FieldNameEncoding::FlexUIntSymbolId => {
                if buffer.read_flex_uint()?.value() == 0 {
                    return Ok(Unit::new(buffer.consumed(), Action::SwitchToFlexSym));
                }
            }
            FieldNameEncoding::FlexSym => {
                return match buffer.skip_flex_sym()? {
                    Some(length) => Ok(Unit::new(length, Action::FieldName)),
                    None => decoding_error("found a delimited end where a field name was expected"),
                };
            }
        }
        Ok(Unit::new(buffer.consumed(), Action::FieldName))
    }

    fn read_token(&self, buffer: &mut BinaryBuffer<'_, Checked>) -> IonResult<Unit> {
        let start = buffer.position();
        let opcode = buffer.next_byte("a type descriptor")?;
        let descriptor = &self.version.type_descriptors()[opcode as usize];
        match descriptor.kind {
            TokenKind::Invalid => decoding_error(format!(
                "Invalid type ID 0x{opcode:02X} at offset {start}."
            )),
            TokenKind::IonVersionMarker => {
                decoding_error("found an Ion version marker inside a container")
            }
            TokenKind::Nop => {
                let end = buffer.read_nop_pad(descriptor)?;
                Ok(Unit::new(end - start, Action::Value))
            }
            TokenKind::DelimitedEnd => match self.frames.last() {
                Some(ScanFrame::Sequence) => Ok(Unit::new(1, Action::Pop)),
                _ => decoding_error(format!("found an unexpected delimited end at offset {start}")),
            },
            TokenKind::Annotations(AnnotationsEncoding::Wrapper) => {
                // An Ion 1.0 wrapper's length covers the wrapped value too.
                let header = buffer.read_value_header(descriptor)?;
                Self::skip_to(start, header.end, Action::Value)
            }
            TokenKind::Annotations(AnnotationsEncoding::SymbolAddresses { count: Some(count) }) => {
                for _ in 0..count {
                    buffer.read_flex_uint()?;
                }
                Ok(Unit::new(buffer.consumed(), Action::None))
            }
            TokenKind::Annotations(AnnotationsEncoding::FlexSyms { count: Some(count) }) => {
                Ok(Unit::new(1, Action::FlexSymAnnotations(count)))
            }
            TokenKind::Annotations(_) => {
                let sequence_length = buffer.read_flex_uint()?.as_length()?;
                Ok(Unit::new(buffer.consumed() + sequence_length, Action::None))
            }
            TokenKind::MacroInvocation(MacroAddress::LengthPrefixed) => {
                let header = buffer.read_macro_header(descriptor)?;
                Self::skip_to(start, header.end, Action::Value)
            }
            TokenKind::MacroInvocation(_) => decoding_error(format!(
                "cannot skip the encoding expression at offset {start}: its length depends on its signature"
            )),
            TokenKind::Value if descriptor.is_delimited() => {
                let frame = ScanFrame::for_container(descriptor.ion_type.unwrap_or(IonType::List));
                Ok(Unit::new(1, Action::Push(frame)))
            }
            TokenKind::Value => {
                let header = buffer.read_value_header(descriptor)?;
                Self::skip_to(start, header.end, Action::Value)
            }
        }
    }

    fn skip_to(start: usize, end: Option<usize>, action: Action) -> IonResult<Unit> {
        match end {
            Some(end) => Ok(Unit::new(end - start, action)),
            None => decoding_error("expected a token with a declared length"),
        }
    }

}
