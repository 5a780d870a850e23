use crate::binary::type_descriptor::{AnnotationsEncoding, FieldNameEncoding, TypeDescriptor};
use crate::types::IonType;

/// The span of one token's representation in the input stream.
///
/// `start` and `end` are stream offsets. For a value, the span covers the value's body; its
/// header (field name, annotations, type descriptor and length) precedes `start`. An `end` of
/// `None` means the token is delimited and its end has not been located yet.
///
/// The cursor overwrites its markers as it advances. A `Marker` is `Copy` so that callers who
/// need to remember a span across calls can keep their own copy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Marker {
    start: usize,
    end: Option<usize>,
    descriptor: Option<&'static TypeDescriptor>,
}

impl Marker {
    pub(crate) const EMPTY: Marker = Marker {
        start: 0,
        end: Some(0),
        descriptor: None,
    };

    pub(crate) fn new(
        start: usize,
        end: Option<usize>,
        descriptor: Option<&'static TypeDescriptor>,
    ) -> Marker {
        Marker {
            start,
            end,
            descriptor,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> Option<usize> {
        self.end
    }

    pub fn len(&self) -> Option<usize> {
        self.end.map(|end| end - self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Whether the token ends with an explicit end marker rather than a declared length.
    pub fn is_delimited(&self) -> bool {
        self.descriptor.map(|d| d.is_delimited()).unwrap_or(false)
    }

    pub fn descriptor(&self) -> Option<&'static TypeDescriptor> {
        self.descriptor
    }

    pub fn ion_type(&self) -> Option<IonType> {
        self.descriptor.and_then(|d| d.ion_type)
    }

    pub(crate) fn set_end(&mut self, end: usize) {
        self.end = Some(end);
    }
}

/// What kind of scope a [`ContainerFrame`] represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Container(IonType),
    /// The arguments of an encoding expression.
    EExp,
}

/// An open container (or encoding expression) on the cursor's stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ContainerFrame {
    pub kind: FrameKind,
    pub start: usize,
    pub end: Option<usize>,
    pub is_delimited: bool,
    /// How the next field name is encoded, for structs. A symbol address struct can switch to
    /// FlexSym field names partway through.
    pub field_names: Option<FieldNameEncoding>,
}

impl ContainerFrame {
    pub fn is_struct(&self) -> bool {
        self.kind == FrameKind::Container(IonType::Struct)
    }
}

/// The span of a field name, along with how the bytes in it are encoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct FieldNameSpan {
    pub start: usize,
    pub end: usize,
    pub encoding: FieldNameEncoding,
    /// Whether this name was preceded by the symbol address `0`, which switches the rest of
    /// the struct to FlexSym field names.
    pub switched_to_flex_sym: bool,
}

/// The span of an annotation sequence (excluding any length prefix).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct AnnotationsSpan {
    pub start: usize,
    pub end: usize,
    pub encoding: AnnotationsEncoding,
}
