use std::fmt;
use std::io::{self, Read};

use log::{debug, trace, warn};

use crate::binary::decode_mode::{Checked, Unchecked};
use crate::binary::non_blocking::argument_group::{ArgumentGroupFrame, PrimitiveEncoding};
use crate::binary::non_blocking::binary_buffer::{BinaryBuffer, MacroHeader};
use crate::binary::non_blocking::byte_source::{ByteSource, FillOutcome, RefillState};
use crate::binary::non_blocking::delimited_scan::{DelimitedScan, ScanFrame, ScanProgress};
use crate::binary::non_blocking::header::{
    read_token_header, validate_int_sign, HeaderContext, TokenHeader,
};
use crate::binary::non_blocking::marker::{
    AnnotationsSpan, ContainerFrame, FieldNameSpan, FrameKind, Marker,
};
use crate::binary::non_blocking::symbol_tokens::{read_symbol_token, Annotations};
use crate::binary::type_descriptor::{FieldNameEncoding, TypeDescriptor, NO_IVM_TYPE_DESCRIPTORS};
use crate::binary::IonVersion;
use crate::buffer_config::{
    BufferConfig, DataHandler, OversizedValue, OversizedValueAction, OversizedValueHandler,
};
use crate::raw_symbol_token_ref::RawSymbolTokenRef;
use crate::result::{decoding_error, decoding_error_raw, illegal_operation, IonError, IonResult};
use crate::types::IonType;

/// The outcome of a cursor operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// The operation could not complete with the data that is available. Once more data can be
    /// read from the input, the same operation should be attempted again.
    NeedsData,
    /// The cursor is positioned on something that it cannot interpret on its own, such as an
    /// encoding expression, or has finished a step in or out. The caller decides what to do next.
    NeedsInstruction,
    /// The cursor is positioned on a scalar value's header. Its body may not be buffered yet.
    StartScalar,
    /// The current value's bytes are all buffered.
    ValueReady,
    /// The cursor is positioned on a container's header.
    StartContainer,
    /// The cursor has reached the end of the current container or argument group.
    EndContainer,
}

/// What the cursor's checkpoint marks. The checkpoint is only moved once a unit of input has
/// been fully read, so an operation that runs out of data can be repeated from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CheckpointLocation {
    /// At a field name (inside a struct) or a type descriptor that has no annotations before it.
    BeforeUnannotatedTypeId,
    /// At the type descriptor of a value whose field name and annotations have been read.
    BeforeAnnotatedTypeId,
    /// At the body of the current scalar value.
    AfterScalarHeader,
    /// At the body of the current container, or at the arguments of the current encoding
    /// expression.
    AfterContainerHeader,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ScanPurpose {
    /// Finding the end of the current delimited container so that it can be buffered.
    FillValue,
    /// Moving past the current delimited container.
    SkipValue,
    /// Finding the end of the delimited container (or argument group) the cursor is inside of.
    ScopeEnd,
    /// Moving past a value that is too large to buffer.
    Oversize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ScanMode {
    /// Bytes that the scan has passed over are retained.
    Fill,
    /// Bytes that the scan has passed over are discarded.
    Seek,
}

/// A delimited scan that ran out of data, waiting to be resumed.
#[derive(Debug)]
struct ParkedScan {
    scan: DelimitedScan,
    purpose: ScanPurpose,
    mode: ScanMode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ScanOutcome {
    Finished(usize),
    NeedsData,
    Oversized,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Progress {
    Done,
    Suspended,
    /// The value was too large and has been (or is being) skipped, or the cursor was terminated.
    Abandoned,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum HeaderRead {
    Header(TokenHeader),
    NeedsData,
    Oversized,
}

/// What the operation that is about to run intends to do with a suspended delimited fill.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Resume {
    /// Move past the value; a pending fill becomes a skip.
    Skip,
    /// Step into the value; a pending fill is no longer needed.
    StepInto,
}

type IvmNotificationConsumer = Box<dyn FnMut(u8, u8)>;

/// A pull cursor over a binary Ion 1.0 or 1.1 stream.
///
/// The cursor reports the structure of the stream (values, containers, encoding expressions and
/// argument groups) as a series of [`Event`]s and exposes the location of each token as a
/// [`Marker`]. It does not materialize scalar values; once a value is filled,
/// [`value_bytes`](Self::value_bytes) returns its body for a higher layer to decode.
///
/// A cursor created by [`from_bytes`](BinaryCursor::from_bytes) reads from a fixed array. A
/// cursor created by [`from_reader`](Self::from_reader) reads from an [`io::Read`] into a buffer
/// that grows up to a configured maximum. When the reader has no more data to offer, operations
/// return [`Event::NeedsData`] and can be repeated once more data is available; no progress is
/// lost.
///
/// ```
/// use ion_cursor::{BinaryCursor, Event, IonResult, IonType};
/// # fn main() -> IonResult<()> {
/// // An Ion 1.0 version marker followed by the int 42
/// let mut cursor = BinaryCursor::from_bytes(&[0xE0, 0x01, 0x00, 0xEA, 0x21, 0x2A][..]);
/// assert_eq!(cursor.next_value()?, Event::StartScalar);
/// assert_eq!(cursor.ion_type(), Some(IonType::Int));
/// assert_eq!(cursor.fill_value()?, Event::ValueReady);
/// assert_eq!(cursor.value_bytes(), Some(&[0x2A][..]));
/// assert_eq!(cursor.next_value()?, Event::NeedsData);
/// # Ok(())
/// # }
/// ```
pub struct BinaryCursor<R: Read = io::Empty> {
    source: ByteSource<R>,
    version: Option<IonVersion>,
    descriptors: &'static [TypeDescriptor; 256],
    event: Event,
    checkpoint: usize,
    checkpoint_location: CheckpointLocation,
    containers: Vec<ContainerFrame>,
    argument_groups: Vec<ArgumentGroupFrame>,

    // The current value
    value: Marker,
    // The first byte of the current value's encoding, including its field name.
    value_pre_header: usize,
    // The first byte of the current value's annotations or type descriptor.
    value_header: usize,
    field_name: Option<FieldNameSpan>,
    annotations: Option<AnnotationsSpan>,
    wrapper_end: Option<usize>,
    macro_invocation: Option<MacroHeader>,
    tagless_encoding: Option<PrimitiveEncoding>,

    is_value_incomplete: bool,
    scan: Option<ParkedScan>,
    is_terminated: bool,
    is_closed: bool,

    oversized_value_handler: Option<OversizedValueHandler>,
    maximum_configured: bool,
    data_handler: Option<DataHandler>,
    // The stream offset through which consumed bytes have been reported to the data handler.
    reported: usize,
    ivm_consumer: Option<IvmNotificationConsumer>,
}

impl BinaryCursor<io::Empty> {
    /// Constructs a cursor over a fixed array of bytes.
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        BinaryCursor::new(ByteSource::from_bytes(bytes.into()))
    }
}

impl<R: Read> BinaryCursor<R> {
    /// Constructs a cursor that reads from `input` using the default [`BufferConfig`].
    pub fn from_reader(input: R) -> IonResult<Self> {
        Self::from_reader_with_config(input, BufferConfig::default())
    }

    pub fn from_reader_with_config(input: R, mut config: BufferConfig) -> IonResult<Self> {
        config.validate()?;
        let source = ByteSource::from_reader(
            input,
            config.initial_buffer_size(),
            config.effective_maximum(),
        );
        let mut cursor = BinaryCursor::new(source);
        cursor.maximum_configured = config.maximum_buffer_size().is_some();
        cursor.oversized_value_handler = config.oversized_value_handler.take();
        cursor.data_handler = config.data_handler.take();
        Ok(cursor)
    }

    fn new(source: ByteSource<R>) -> Self {
        BinaryCursor {
            source,
            version: None,
            descriptors: &NO_IVM_TYPE_DESCRIPTORS,
            event: Event::NeedsData,
            checkpoint: 0,
            checkpoint_location: CheckpointLocation::BeforeUnannotatedTypeId,
            containers: Vec::new(),
            argument_groups: Vec::new(),
            value: Marker::EMPTY,
            value_pre_header: 0,
            value_header: 0,
            field_name: None,
            annotations: None,
            wrapper_end: None,
            macro_invocation: None,
            tagless_encoding: None,
            is_value_incomplete: false,
            scan: None,
            is_terminated: false,
            is_closed: false,
            oversized_value_handler: None,
            maximum_configured: false,
            data_handler: None,
            reported: 0,
            ivm_consumer: None,
        }
    }

    /// Replaces the handler that decides what happens to values too large to buffer.
    pub fn register_oversized_value_handler(
        &mut self,
        handler: impl FnMut(OversizedValue) -> IonResult<OversizedValueAction> + 'static,
    ) {
        self.oversized_value_handler = Some(Box::new(handler));
    }

    /// Registers a function that is called with the `(major, minor)` version of every Ion
    /// version marker the cursor reads.
    pub fn register_ivm_notification_consumer(&mut self, consumer: impl FnMut(u8, u8) + 'static) {
        self.ivm_consumer = Some(Box::new(consumer));
    }

    // ---------------------------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------------------------

    /// Advances to the next token in the current container (or at the top level).
    ///
    /// Returns [`Event::StartScalar`] or [`Event::StartContainer`] for a value,
    /// [`Event::NeedsInstruction`] for an encoding expression, [`Event::EndContainer`] at the end
    /// of the current container and [`Event::NeedsData`] if the next token is not available yet.
    /// If the cursor is inside an argument group, this is [`next_grouped_value`](Self::next_grouped_value).
    pub fn next_value(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        if self.innermost_group().is_some() {
            return self.next_grouped_value();
        }
        if !self.make_buffer_ready(Resume::Skip)? {
            return Ok(self.finish(Event::NeedsData));
        }
        let event = self.advance()?;
        Ok(self.finish(event))
    }

    /// Steps into the container the cursor is positioned on.
    pub fn step_into_container(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        if !self.make_buffer_ready(Resume::StepInto)? {
            return Ok(self.finish(Event::NeedsData));
        }
        let descriptor = match self.value.descriptor() {
            Some(descriptor)
                if self.checkpoint_location == CheckpointLocation::AfterContainerHeader
                    && self.macro_invocation.is_none() =>
            {
                descriptor
            }
            _ => {
                return illegal_operation(
                    "step_into_container requires the cursor to be positioned on a container",
                )
            }
        };
        let ion_type = descriptor.ion_type.unwrap_or(IonType::List);
        let start = self.value.start();
        self.containers.push(ContainerFrame {
            kind: FrameKind::Container(ion_type),
            start,
            end: self.value.end(),
            is_delimited: descriptor.is_delimited(),
            field_names: descriptor.field_names,
        });
        self.enter_scope_at(start);
        Ok(self.finish(Event::NeedsInstruction))
    }

    /// Steps out of the current container, moving past any of its contents that have not been
    /// read. For a delimited container, this requires finding its end.
    pub fn step_out_of_container(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        match self.containers.last() {
            None => return illegal_operation("Cannot step out at top level."),
            Some(frame) if frame.kind == FrameKind::EExp => {
                return illegal_operation(
                    "the cursor is inside an encoding expression; use step_out_of_eexp",
                )
            }
            Some(_) => {}
        }
        if self.innermost_group().is_some() {
            return illegal_operation("an argument group must be exited before stepping out");
        }
        if !self.make_buffer_ready(Resume::Skip)? || !self.seek_scope_end()? {
            return Ok(self.finish(Event::NeedsData));
        }
        self.containers.pop();
        Ok(self.finish(Event::NeedsInstruction))
    }

    /// Buffers every byte of the current value. For a container, the whole container is
    /// buffered, which allows its contents to be read without any further refills.
    ///
    /// Returns [`Event::ValueReady`] once the value is buffered. If the value is too large to
    /// buffer and the oversized value handler chooses to skip it, returns
    /// [`Event::NeedsInstruction`]; the cursor is then positioned after the value.
    pub fn fill_value(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        match self.scan.take() {
            Some(parked) if parked.purpose == ScanPurpose::FillValue => {
                debug!("resuming delimited fill at offset {}", parked.scan.position());
                match self.run_scan(parked.scan, ScanPurpose::FillValue, ScanMode::Fill)? {
                    Progress::Done => {}
                    Progress::Suspended => return Ok(self.finish(Event::NeedsData)),
                    Progress::Abandoned => return Ok(self.abandoned_event()),
                }
            }
            parked => {
                self.scan = parked;
                if !self.make_buffer_ready(Resume::Skip)? {
                    return Ok(self.finish(Event::NeedsData));
                }
            }
        }
        if !self.is_positioned_on_value() {
            return illegal_operation("fill_value requires the cursor to be positioned on a value");
        }
        if self.macro_invocation.is_some() {
            return Ok(self.finish(Event::NeedsInstruction));
        }
        let end = match self.value.end() {
            Some(end) => end,
            None => {
                let frame = ScanFrame::for_container(self.value.ion_type().unwrap_or(IonType::List));
                let scan = DelimitedScan::new(self.scan_version(), self.value.start(), frame);
                match self.run_scan(scan, ScanPurpose::FillValue, ScanMode::Fill)? {
                    Progress::Done => {}
                    Progress::Suspended => return Ok(self.finish(Event::NeedsData)),
                    Progress::Abandoned => return Ok(self.abandoned_event()),
                }
                match self.value.end() {
                    Some(end) => end,
                    None => return decoding_error("the end of a delimited container was not found"),
                }
            }
        };
        let start = self.value_pre_header;
        match self.source.fill_at(start, end - start)? {
            FillOutcome::Ready => {}
            FillOutcome::NeedsData => {
                if self.source.is_final() {
                    self.is_value_incomplete = true;
                }
                return Ok(self.finish(Event::NeedsData));
            }
            FillOutcome::Oversized => {
                let length = end - self.value_header;
                return match self.handle_oversized_value(self.value_header, Some(length))? {
                    OversizedValueAction::Skip => {
                        self.consume_through(end)?;
                        Ok(self.finish(Event::NeedsInstruction))
                    }
                    OversizedValueAction::Terminate => Ok(self.finish(Event::NeedsData)),
                };
            }
        }
        if let (Some(descriptor), Some(body)) = (self.value.descriptor(), self.value_bytes()) {
            validate_int_sign(descriptor, body)?;
        }
        Ok(self.finish(Event::ValueReady))
    }

    /// Declares that the input has ended. Fails with "Unexpected EOF" if the input ended in
    /// the middle of a token or value, or inside a container whose end has not been reached.
    ///
    /// This should be called after an operation has returned [`Event::NeedsData`] and the input
    /// is known to have no more data.
    pub fn end_stream(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        let pending = matches!(
            self.source.state(),
            RefillState::Seek | RefillState::SeekDelimited | RefillState::FillDelimited
        );
        if self.is_value_incomplete || pending || self.scan.is_some() || self.has_unread_bytes() {
            return decoding_error("Unexpected EOF");
        }
        Ok(self.finish(Event::NeedsData))
    }

    /// Stops the cursor permanently. Every later operation returns [`Event::NeedsData`].
    pub fn terminate(&mut self) {
        if !self.is_terminated {
            warn!("terminating the cursor at offset {}", self.checkpoint);
        }
        self.is_terminated = true;
        self.scan = None;
        self.source.terminate();
        self.event = Event::NeedsData;
    }

    /// Releases the input. Closing an already closed cursor has no effect; any other operation
    /// on a closed cursor is an error.
    pub fn close(&mut self) -> IonResult<()> {
        if self.is_closed {
            return Ok(());
        }
        self.source.close();
        self.is_closed = true;
        self.is_terminated = true;
        self.scan = None;
        self.event = Event::NeedsData;
        Ok(())
    }

    /// Repositions the cursor over the buffered stream range `start..end` as if those bytes were
    /// a complete top-level stream encoded with `version`.
    pub fn slice(&mut self, start: usize, end: usize, version: IonVersion) -> IonResult<()> {
        self.ensure_open()?;
        if start > end || start < self.source.start() || end > self.source.limit() {
            return illegal_operation(format!(
                "cannot slice {start}..{end}; only {}..{} is buffered",
                self.source.start(),
                self.source.limit()
            ));
        }
        self.scan = None;
        self.source.unpin();
        self.source.set_state(RefillState::Ready);
        self.source.slice(end);
        self.source.set_offset(start);
        self.containers.clear();
        self.argument_groups.clear();
        self.clear_value();
        self.is_value_incomplete = false;
        self.set_version(version);
        self.checkpoint = start;
        self.checkpoint_location = CheckpointLocation::BeforeUnannotatedTypeId;
        self.event = Event::NeedsData;
        Ok(())
    }

    // ---------------------------------------------------------------------------------------
    // Encoding expressions and argument groups
    // ---------------------------------------------------------------------------------------

    /// Steps into the arguments of the encoding expression the cursor is positioned on.
    pub fn step_into_eexp(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        if !self.make_buffer_ready(Resume::StepInto)? {
            return Ok(self.finish(Event::NeedsData));
        }
        let header = match self.macro_invocation {
            Some(header) if self.checkpoint_location == CheckpointLocation::AfterContainerHeader => {
                header
            }
            _ => {
                return illegal_operation(
                    "step_into_eexp requires the cursor to be positioned on an encoding expression",
                )
            }
        };
        self.containers.push(ContainerFrame {
            kind: FrameKind::EExp,
            start: header.arguments_start,
            end: header.end,
            is_delimited: false,
            field_names: None,
        });
        self.enter_scope_at(header.arguments_start);
        Ok(self.finish(Event::NeedsInstruction))
    }

    /// Steps out of the current encoding expression.
    ///
    /// Only a length-prefixed invocation has a known end. For any other invocation, the
    /// arguments' extent is defined by the macro's signature, so the cursor finishes the current
    /// argument and stops there.
    pub fn step_out_of_eexp(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        let end = match self.containers.last() {
            Some(frame) if frame.kind == FrameKind::EExp => frame.end,
            _ => return illegal_operation("the cursor is not inside an encoding expression"),
        };
        if self.innermost_group().is_some() {
            return illegal_operation("an argument group must be exited before stepping out");
        }
        if !self.make_buffer_ready(Resume::Skip)? {
            return Ok(self.finish(Event::NeedsData));
        }
        let finished = match end {
            Some(_) => self.seek_scope_end()?,
            None if self.is_positioned_on_value() => self.skip_current_value()?,
            None => true,
        };
        if !finished {
            return Ok(self.finish(Event::NeedsData));
        }
        self.containers.pop();
        Ok(self.finish(Event::NeedsInstruction))
    }

    /// Reads the next argument, which is written without a type descriptor in `encoding`.
    /// Returns [`Event::ValueReady`] once the argument is buffered.
    pub fn next_tagless_value(&mut self, encoding: PrimitiveEncoding) -> IonResult<Event> {
        self.ensure_open()?;
        if !self.make_buffer_ready(Resume::Skip)? {
            return Ok(self.finish(Event::NeedsData));
        }
        if self.is_positioned_on_value() && !self.skip_current_value()? {
            return Ok(self.finish(Event::NeedsData));
        }
        if self.checkpoint_location == CheckpointLocation::BeforeAnnotatedTypeId {
            return illegal_operation("a tagless value cannot follow annotations");
        }
        if let Some(end) = self.scope_end() {
            if self.checkpoint >= end {
                self.clear_value();
                return Ok(self.finish(Event::EndContainer));
            }
        }
        let event = self.read_tagless_value(encoding)?;
        Ok(self.finish(event))
    }

    /// Enters the argument group that begins at the cursor's position. The group's values are
    /// tagged if `encoding` is `None`; otherwise they are all written in `encoding`.
    pub fn enter_argument_group(&mut self, encoding: Option<PrimitiveEncoding>) -> IonResult<Event> {
        self.ensure_open()?;
        if !self.make_buffer_ready(Resume::Skip)? {
            return Ok(self.finish(Event::NeedsData));
        }
        if self.is_positioned_on_value() && !self.skip_current_value()? {
            return Ok(self.finish(Event::NeedsData));
        }
        if self.checkpoint_location == CheckpointLocation::BeforeAnnotatedTypeId {
            return illegal_operation("an argument group cannot follow annotations");
        }
        let start = self.checkpoint;
        let Some((length, body_start)) = self.read_group_length(start)? else {
            return Ok(self.finish(Event::NeedsData));
        };
        let group_end = match length {
            0 => None,
            _ => Some(body_start.checked_add(length).ok_or_else(|| {
                decoding_error_raw("Unsupported value: declared length is too long.")
            })?),
        };
        if let Some(end) = group_end {
            self.check_within_scope(end)?;
        }
        let frame = match encoding {
            None => ArgumentGroupFrame {
                encoding,
                depth: self.containers.len(),
                start: body_start,
                end: group_end,
                is_delimited: group_end.is_none(),
                exhausted: false,
            },
            Some(_) => ArgumentGroupFrame {
                encoding,
                depth: self.containers.len(),
                start: body_start,
                // An empty first page means the group has no values.
                end: Some(group_end.unwrap_or(body_start)),
                is_delimited: false,
                exhausted: group_end.is_none(),
            },
        };
        self.argument_groups.push(frame);
        self.enter_scope_at(body_start);
        Ok(self.finish(Event::NeedsInstruction))
    }

    /// Advances to the next value in the current argument group. Returns
    /// [`Event::EndContainer`] after the group's last value.
    pub fn next_grouped_value(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        let Some(group) = self.innermost_group().copied() else {
            return illegal_operation("the cursor is not inside an argument group");
        };
        if !self.make_buffer_ready(Resume::Skip)? {
            return Ok(self.finish(Event::NeedsData));
        }
        let Some(encoding) = group.encoding else {
            let event = self.advance()?;
            return Ok(self.finish(event));
        };
        if self.is_positioned_on_value() && !self.skip_current_value()? {
            return Ok(self.finish(Event::NeedsData));
        }
        loop {
            let Some(group) = self.innermost_group().copied() else {
                return illegal_operation("the cursor is not inside an argument group");
            };
            if group.exhausted {
                self.clear_value();
                return Ok(self.finish(Event::EndContainer));
            }
            let page_end = group.end.unwrap_or(self.checkpoint);
            if self.checkpoint > page_end {
                return decoding_error("Contained values overflowed the parent container length");
            }
            if self.checkpoint < page_end {
                let event = self.read_tagless_value(encoding)?;
                return Ok(self.finish(event));
            }
            if !self.read_next_page()? {
                return Ok(self.finish(Event::NeedsData));
            }
        }
    }

    /// Moves past the rest of the current argument group and leaves it.
    pub fn exit_argument_group(&mut self) -> IonResult<Event> {
        self.ensure_open()?;
        let Some(group) = self.innermost_group().copied() else {
            return illegal_operation("the cursor is not inside an argument group");
        };
        if !self.make_buffer_ready(Resume::Skip)? {
            return Ok(self.finish(Event::NeedsData));
        }
        if group.is_tagless() {
            loop {
                let Some(group) = self.innermost_group().copied() else {
                    return illegal_operation("the cursor is not inside an argument group");
                };
                if group.exhausted {
                    break;
                }
                let page_end = group.end.unwrap_or(self.checkpoint);
                if (self.checkpoint < page_end || self.is_positioned_on_value())
                    && !self.consume_through(page_end)?
                {
                    return Ok(self.finish(Event::NeedsData));
                }
                if !self.read_next_page()? {
                    return Ok(self.finish(Event::NeedsData));
                }
            }
        } else if !self.seek_scope_end()? {
            return Ok(self.finish(Event::NeedsData));
        }
        self.argument_groups.pop();
        self.clear_value();
        Ok(self.finish(Event::NeedsInstruction))
    }

    // ---------------------------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------------------------

    /// The result of the most recent operation.
    pub fn current_event(&self) -> Event {
        self.event
    }

    /// The `(major, minor)` version of the stream. Before the first Ion version marker has been
    /// read, this is `(1, 0)`.
    pub fn ion_version(&self) -> (u8, u8) {
        match self.version {
            Some(version) => (version.major(), version.minor()),
            None => (1, 0),
        }
    }

    /// The version declared by the most recent Ion version marker, if one has been read.
    pub fn version(&self) -> Option<IonVersion> {
        self.version
    }

    /// The span of the current value's body (or the arguments of the current encoding
    /// expression). The marker is overwritten when the cursor moves; copy it to keep it.
    pub fn value_marker(&self) -> Marker {
        self.value
    }

    /// The span of the current value's annotation sequence, if it has one.
    pub fn annotation_sequence_marker(&self) -> Option<Marker> {
        self.annotations
            .map(|span| Marker::new(span.start, Some(span.end), None))
    }

    pub fn has_annotations(&self) -> bool {
        self.annotations.is_some()
    }

    /// The raw symbol tokens of the current value's annotations.
    pub fn annotations(&self) -> Annotations<'_> {
        self.annotations
            .and_then(|span| {
                self.source
                    .bytes_between(span.start, span.end)
                    .map(|bytes| Annotations::new(bytes, span.start, span.encoding.into()))
            })
            .unwrap_or_else(Annotations::empty)
    }

    /// The raw symbol token of the current value's field name, if it is inside a struct.
    pub fn field_name(&self) -> Option<IonResult<RawSymbolTokenRef<'_>>> {
        let span = self.field_name?;
        let result = match self.source.bytes_between(span.start, span.end) {
            Some(bytes) => {
                read_symbol_token(bytes, span.start, span.encoding.into()).map(|(token, _)| token)
            }
            None => illegal_operation("the field name is no longer buffered"),
        };
        Some(result)
    }

    pub fn ion_type(&self) -> Option<IonType> {
        match self.tagless_encoding {
            Some(encoding) => Some(encoding.ion_type()),
            None => self.value.ion_type(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.descriptor().map(|d| d.is_null).unwrap_or(false)
    }

    /// The type of the current value if it is a typed null. An Ion 1.1 typed null is reported
    /// with the type named by the byte that follows its opcode.
    pub fn typed_null_type(&self) -> Option<IonType> {
        if self.is_null() {
            self.value.ion_type()
        } else {
            None
        }
    }

    /// The number of containers and encoding expressions the cursor is inside of.
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    /// The current value's body, if the cursor is positioned on a value and it is buffered.
    pub fn value_bytes(&self) -> Option<&[u8]> {
        if !self.is_positioned_on_value() {
            return None;
        }
        let end = self.value.end()?;
        self.source.bytes_between(self.value.start(), end)
    }

    /// The stream offset of the current value's first annotation or type descriptor byte.
    pub fn total_offset(&self) -> usize {
        self.value_header
    }

    pub fn is_byte_backed(&self) -> bool {
        self.source.is_byte_backed()
    }

    /// The address of the encoding expression the cursor is positioned on.
    pub fn macro_invocation_id(&self) -> Option<usize> {
        self.macro_invocation.map(|header| header.id)
    }

    /// Whether the current encoding expression invokes a macro from the system macro table.
    pub fn is_system_invocation(&self) -> bool {
        self.macro_invocation
            .map(|header| header.is_system)
            .unwrap_or(false)
    }

    pub fn is_terminated(&self) -> bool {
        self.is_terminated
    }

    // ---------------------------------------------------------------------------------------
    // Reading tokens
    // ---------------------------------------------------------------------------------------

    fn advance(&mut self) -> IonResult<Event> {
        loop {
            if self.is_positioned_on_value() && !self.skip_current_value()? {
                return Ok(Event::NeedsData);
            }
            if let Some(end) = self.scope_end() {
                if self.checkpoint > end {
                    return decoding_error("Contained values overflowed the parent container length");
                }
                if self.checkpoint == end {
                    if self.checkpoint_location == CheckpointLocation::BeforeAnnotatedTypeId {
                        return decoding_error("an annotation sequence must be followed by a value");
                    }
                    self.clear_value();
                    return Ok(Event::EndContainer);
                }
            }
            let header = match self.read_header()? {
                HeaderRead::Header(header) => header,
                HeaderRead::NeedsData => return Ok(Event::NeedsData),
                HeaderRead::Oversized => {
                    if !self.skip_oversized_header()? {
                        return Ok(Event::NeedsData);
                    }
                    continue;
                }
            };
            if let Some(event) = self.commit_header(header)? {
                return Ok(event);
            }
        }
    }

    /// Reads the unit of header data at the checkpoint, requesting more data as needed.
    fn read_header(&mut self) -> IonResult<HeaderRead> {
        let start = self.checkpoint;
        let context = HeaderContext {
            descriptors: self.descriptors,
            field_names: match self.checkpoint_location {
                CheckpointLocation::BeforeUnannotatedTypeId => self.scope_field_names(),
                _ => None,
            },
            annotated: self.checkpoint_location == CheckpointLocation::BeforeAnnotatedTypeId,
            at_top_level: self.containers.is_empty() && self.innermost_group().is_none(),
        };
        let scope_end = self.scope_end();
        loop {
            let (result, wanted) = match scope_end {
                // Every byte up to the end of the enclosing container is buffered.
                Some(end) if end <= self.source.limit() => {
                    let bytes = self.source.bytes_between(start, end).unwrap_or(&[]);
                    let mut buffer = BinaryBuffer::<Unchecked>::new(bytes, start);
                    (read_token_header(&mut buffer, &context), buffer.wanted())
                }
                _ => {
                    let mut buffer = BinaryBuffer::<Checked>::new(self.source.bytes_from(start), start);
                    (read_token_header(&mut buffer, &context), buffer.wanted())
                }
            };
            match result {
                Ok(header) => return Ok(HeaderRead::Header(header)),
                Err(IonError::Incomplete(_)) => {}
                Err(e) => return Err(e),
            }
            let wanted = match scope_end {
                Some(end) => wanted.min(end - start),
                None => wanted,
            };
            match self.source.fill_at(start, wanted)? {
                FillOutcome::Ready => continue,
                FillOutcome::NeedsData => return Ok(HeaderRead::NeedsData),
                FillOutcome::Oversized => return Ok(HeaderRead::Oversized),
            }
        }
    }

    /// Applies a header that was read at the checkpoint. Returns the event to report, or
    /// `None` if the cursor should keep reading.
    fn commit_header(&mut self, header: TokenHeader) -> IonResult<Option<Event>> {
        let unit_start = self.checkpoint;
        let annotated = self.checkpoint_location == CheckpointLocation::BeforeAnnotatedTypeId;
        if let Some(name) = header.field_name() {
            if name.switched_to_flex_sym {
                self.switch_scope_to_flex_sym();
            }
        }
        match header {
            TokenHeader::IonVersionMarker { major, minor, end } => {
                let version = IonVersion::from_marker(major, minor)?;
                debug!("read an Ion version marker for {version} at offset {unit_start}");
                self.set_version(version);
                if let Some(consumer) = self.ivm_consumer.as_mut() {
                    consumer(major, minor);
                }
                self.consume_through(end)?;
                Ok(None)
            }
            TokenHeader::Nop { end, .. } => {
                self.check_within_scope(end)?;
                if self.consume_through(end)? {
                    Ok(None)
                } else {
                    Ok(Some(Event::NeedsData))
                }
            }
            TokenHeader::DelimitedEnd { end } => {
                if !self.scope_is_delimited() {
                    return decoding_error(format!(
                        "found a delimited end outside of a delimited container at offset {unit_start}"
                    ));
                }
                self.set_scope_end(end);
                self.consume_through(end)?;
                Ok(None)
            }
            TokenHeader::Annotations {
                field_name,
                annotations,
                end,
            } => {
                if let Some(wrapper_end) = annotations.wrapper_end {
                    self.check_within_scope(wrapper_end)?;
                }
                self.field_name = field_name;
                self.annotations = Some(annotations.span);
                self.wrapper_end = annotations.wrapper_end;
                self.value_pre_header = unit_start;
                self.value_header = field_name.map(|name| name.end).unwrap_or(unit_start);
                self.source.set_offset(unit_start);
                self.checkpoint = end;
                self.checkpoint_location = CheckpointLocation::BeforeAnnotatedTypeId;
                Ok(None)
            }
            TokenHeader::Value { field_name, header } => {
                if let Some(end) = header.end {
                    self.check_within_scope(end)?;
                    if let Some(body) = self.source.bytes_between(header.body_start, end) {
                        validate_int_sign(header.descriptor, body)?;
                    }
                }
                if let Some(wrapper_end) = self.wrapper_end {
                    if header.end != Some(wrapper_end) {
                        return decoding_error("Mismatched annotation wrapper length.");
                    }
                }
                if !annotated {
                    self.begin_value(unit_start, field_name);
                }
                let is_container = header.descriptor.is_container();
                self.value = Marker::new(header.body_start, header.end, Some(header.descriptor));
                self.checkpoint = header.body_start;
                self.checkpoint_location = if is_container {
                    CheckpointLocation::AfterContainerHeader
                } else {
                    CheckpointLocation::AfterScalarHeader
                };
                self.is_value_incomplete = matches!(
                    header.end,
                    Some(end) if end > self.source.limit() && self.source.is_final()
                );
                Ok(Some(if is_container {
                    Event::StartContainer
                } else {
                    Event::StartScalar
                }))
            }
            TokenHeader::MacroInvocation {
                field_name,
                descriptor,
                header,
            } => {
                if let Some(end) = header.end {
                    self.check_within_scope(end)?;
                }
                self.begin_value(unit_start, field_name);
                self.value = Marker::new(header.arguments_start, header.end, Some(descriptor));
                self.macro_invocation = Some(header);
                self.checkpoint = header.arguments_start;
                self.checkpoint_location = CheckpointLocation::AfterContainerHeader;
                Ok(Some(Event::NeedsInstruction))
            }
        }
    }

    /// Records the start of a value that has no annotations.
    fn begin_value(&mut self, unit_start: usize, field_name: Option<FieldNameSpan>) {
        self.clear_value();
        self.field_name = field_name;
        self.value_pre_header = unit_start;
        self.value_header = field_name.map(|name| name.end).unwrap_or(unit_start);
        self.source.set_offset(unit_start);
    }

    fn read_tagless_value(&mut self, encoding: PrimitiveEncoding) -> IonResult<Event> {
        let start = self.checkpoint;
        let length = loop {
            let mut buffer = BinaryBuffer::<Checked>::new(self.source.bytes_from(start), start);
            match encoding.read_length(&mut buffer) {
                Ok(length) => break length,
                Err(IonError::Incomplete(_)) => {}
                Err(e) => return Err(e),
            }
            let wanted = buffer.wanted();
            match self.source.fill_at(start, wanted)? {
                FillOutcome::Ready => {}
                FillOutcome::NeedsData | FillOutcome::Oversized => return Ok(Event::NeedsData),
            }
        };
        let end = start + length;
        self.check_within_scope(end)?;
        match self.source.fill_at(start, length)? {
            FillOutcome::Ready => {}
            FillOutcome::NeedsData => {
                if self.source.is_final() {
                    self.is_value_incomplete = true;
                }
                return Ok(Event::NeedsData);
            }
            FillOutcome::Oversized => {
                return match self.handle_oversized_value(start, Some(length))? {
                    OversizedValueAction::Skip => {
                        self.consume_through(end)?;
                        Ok(Event::NeedsInstruction)
                    }
                    OversizedValueAction::Terminate => Ok(Event::NeedsData),
                };
            }
        }
        self.begin_value(start, None);
        self.value = Marker::new(start, Some(end), None);
        self.tagless_encoding = Some(encoding);
        self.checkpoint = start;
        self.checkpoint_location = CheckpointLocation::AfterScalarHeader;
        Ok(Event::ValueReady)
    }

    /// Reads the FlexUInt length that begins an argument group or one of its pages. Returns the
    /// length and the offset just after it.
    fn read_group_length(&mut self, start: usize) -> IonResult<Option<(usize, usize)>> {
        loop {
            let mut buffer = BinaryBuffer::<Checked>::new(self.source.bytes_from(start), start);
            match buffer.read_flex_uint() {
                Ok(flex_uint) => return Ok(Some((flex_uint.as_length()?, buffer.position()))),
                Err(IonError::Incomplete(_)) => {}
                Err(e) => return Err(e),
            }
            let wanted = buffer.wanted();
            match self.source.fill_at(start, wanted)? {
                FillOutcome::Ready => {}
                FillOutcome::NeedsData | FillOutcome::Oversized => return Ok(None),
            }
        }
    }

    /// At the end of a tagless group's page, reads the length of the next page.
    fn read_next_page(&mut self) -> IonResult<bool> {
        let start = self.checkpoint;
        let Some((length, body_start)) = self.read_group_length(start)? else {
            return Ok(false);
        };
        let depth = self.containers.len();
        if let Some(group) = self.argument_groups.last_mut().filter(|g| g.depth == depth) {
            if length == 0 {
                group.exhausted = true;
                group.end = Some(body_start);
            } else {
                group.end = Some(body_start + length);
            }
        }
        self.consume_through(body_start)
    }

    // ---------------------------------------------------------------------------------------
    // Skipping and scanning
    // ---------------------------------------------------------------------------------------

    /// Moves the checkpoint past the current value. Returns `false` if the cursor must wait for
    /// more data before it can get there.
    fn skip_current_value(&mut self) -> IonResult<bool> {
        if let Some(header) = self.macro_invocation {
            if header.end.is_none() {
                return decoding_error(format!(
                    "cannot skip the encoding expression at offset {}: its length depends on its signature",
                    self.value_header
                ));
            }
        }
        match self.value.end() {
            Some(end) => self.consume_through(end),
            None => {
                let frame = ScanFrame::for_container(self.value.ion_type().unwrap_or(IonType::List));
                let scan = DelimitedScan::new(self.scan_version(), self.value.start(), frame);
                Ok(self.run_scan(scan, ScanPurpose::SkipValue, ScanMode::Seek)? == Progress::Done)
            }
        }
    }

    /// Moves the checkpoint to the end of the innermost container, encoding expression or
    /// argument group, finding that end first if it is delimited.
    fn seek_scope_end(&mut self) -> IonResult<bool> {
        if let Some(end) = self.scope_end() {
            if self.checkpoint > end {
                return decoding_error("Contained values overflowed the parent container length");
            }
            return self.consume_through(end);
        }
        let version = self.scan_version();
        let scope_frame = self.scope_scan_frame();
        let scan = match self.checkpoint_location {
            CheckpointLocation::BeforeUnannotatedTypeId => {
                DelimitedScan::new(version, self.checkpoint, scope_frame)
            }
            CheckpointLocation::BeforeAnnotatedTypeId => {
                let frame = match scope_frame {
                    ScanFrame::Struct { .. } => ScanFrame::Struct {
                        expecting_value: true,
                    },
                    other => other,
                };
                DelimitedScan::new(version, self.checkpoint, frame)
            }
            CheckpointLocation::AfterScalarHeader | CheckpointLocation::AfterContainerHeader => {
                if let Some(header) = self.macro_invocation {
                    if header.end.is_none() {
                        return decoding_error(format!(
                            "cannot skip the encoding expression at offset {}: its length depends on its signature",
                            self.value_header
                        ));
                    }
                }
                match self.value.end() {
                    Some(end) => DelimitedScan::new(version, end, scope_frame),
                    None => {
                        let mut scan = DelimitedScan::new(version, self.value.start(), scope_frame);
                        let child = self.value.ion_type().unwrap_or(IonType::List);
                        scan.push(ScanFrame::for_container(child));
                        scan
                    }
                }
            }
        };
        Ok(self.run_scan(scan, ScanPurpose::ScopeEnd, ScanMode::Seek)? == Progress::Done)
    }

    /// Runs a delimited scan until it finishes or runs out of data, in which case it is parked
    /// so that the next operation can resume it.
    fn run_scan(
        &mut self,
        mut scan: DelimitedScan,
        mut purpose: ScanPurpose,
        mut mode: ScanMode,
    ) -> IonResult<Progress> {
        let mut abandoned = false;
        if mode == ScanMode::Fill {
            self.source.pin(self.value_pre_header);
        }
        loop {
            match self.drive_scan(&mut scan, mode)? {
                ScanOutcome::Finished(end) => {
                    let ready = self.complete_scan(purpose, end, scan.switched_to_flex_sym())?;
                    return Ok(match (abandoned, ready) {
                        (true, _) => Progress::Abandoned,
                        (false, true) => Progress::Done,
                        (false, false) => Progress::Suspended,
                    });
                }
                ScanOutcome::NeedsData => {
                    if self.source.is_final() {
                        self.is_value_incomplete = true;
                    }
                    debug!(
                        "delimited scan suspended at offset {} ({} frames open)",
                        scan.position(),
                        scan.depth()
                    );
                    self.source.set_state(match mode {
                        ScanMode::Fill => RefillState::FillDelimited,
                        ScanMode::Seek => RefillState::SeekDelimited,
                    });
                    self.scan = Some(ParkedScan {
                        scan,
                        purpose,
                        mode,
                    });
                    return Ok(if abandoned {
                        Progress::Abandoned
                    } else {
                        Progress::Suspended
                    });
                }
                ScanOutcome::Oversized => {
                    self.source.unpin();
                    match self.handle_oversized_value(self.value_header, None)? {
                        OversizedValueAction::Skip => {
                            // A value that cannot be buffered is skipped instead.
                            if purpose == ScanPurpose::FillValue {
                                abandoned = true;
                                purpose = ScanPurpose::SkipValue;
                            }
                            mode = ScanMode::Seek;
                        }
                        OversizedValueAction::Terminate => return Ok(Progress::Abandoned),
                    }
                }
            }
        }
    }

    fn drive_scan(&mut self, scan: &mut DelimitedScan, mode: ScanMode) -> IonResult<ScanOutcome> {
        loop {
            let position = scan.position();
            if mode == ScanMode::Seek {
                if position > self.source.limit() {
                    if !self.source.seek_to(position)? {
                        return Ok(ScanOutcome::NeedsData);
                    }
                } else {
                    self.source.set_offset(position);
                }
            }
            match scan.step(self.source.bytes_from(position))? {
                ScanProgress::Finished => return Ok(ScanOutcome::Finished(scan.position())),
                ScanProgress::Advanced => {}
                ScanProgress::NeedsBytes(length) => match self.source.fill_at(position, length)? {
                    FillOutcome::Ready => {}
                    FillOutcome::NeedsData => return Ok(ScanOutcome::NeedsData),
                    FillOutcome::Oversized => return Ok(ScanOutcome::Oversized),
                },
            }
        }
    }

    fn complete_scan(&mut self, purpose: ScanPurpose, end: usize, switched: bool) -> IonResult<bool> {
        self.source.unpin();
        self.source.set_state(RefillState::Ready);
        debug!("delimited scan found the end at offset {end}");
        match purpose {
            ScanPurpose::FillValue => {
                self.value.set_end(end);
                Ok(true)
            }
            ScanPurpose::SkipValue => self.consume_through(end),
            ScanPurpose::ScopeEnd => {
                self.set_scope_end(end);
                self.consume_through(end)
            }
            ScanPurpose::Oversize => {
                if switched {
                    self.switch_scope_to_flex_sym();
                }
                self.consume_through(end)
            }
        }
    }

    /// A header at the checkpoint cannot be buffered. Asks the oversized value handler what to
    /// do and, if the value is to be skipped, scans past it without buffering it.
    fn skip_oversized_header(&mut self) -> IonResult<bool> {
        let position = match self.checkpoint_location {
            CheckpointLocation::BeforeAnnotatedTypeId => self.value_header,
            _ => self.checkpoint,
        };
        if self.handle_oversized_value(position, None)? == OversizedValueAction::Terminate {
            return Ok(false);
        }
        let field_name = match self.checkpoint_location {
            CheckpointLocation::BeforeUnannotatedTypeId => self.scope_field_names(),
            _ => None,
        };
        let scan = DelimitedScan::new(
            self.scan_version(),
            self.checkpoint,
            ScanFrame::Single { field_name },
        );
        Ok(self.run_scan(scan, ScanPurpose::Oversize, ScanMode::Seek)? == Progress::Done)
    }

    fn handle_oversized_value(
        &mut self,
        position: usize,
        length: Option<usize>,
    ) -> IonResult<OversizedValueAction> {
        let oversized = OversizedValue {
            position,
            depth: self.containers.len(),
            length,
        };
        let action = match self.oversized_value_handler.as_mut() {
            Some(handler) => handler(oversized)?,
            None if self.maximum_configured => OversizedValueAction::Skip,
            None => {
                return decoding_error(
                    "an oversized value was found even though no maximum size was configured",
                )
            }
        };
        match action {
            OversizedValueAction::Skip => warn!(
                "skipping a value at offset {position} that is larger than the maximum buffer size ({:?} bytes)",
                self.source.maximum_size()
            ),
            OversizedValueAction::Terminate => self.terminate(),
        }
        Ok(action)
    }

    /// The event reported when an operation could not finish because its value was too large.
    fn abandoned_event(&mut self) -> Event {
        if self.is_terminated {
            self.finish(Event::NeedsData)
        } else {
            self.finish(Event::NeedsInstruction)
        }
    }

    // ---------------------------------------------------------------------------------------
    // Buffer and checkpoint bookkeeping
    // ---------------------------------------------------------------------------------------

    /// Finishes whatever a previous operation left pending (a seek or a delimited scan).
    /// Returns `false` if the cursor is still waiting for data.
    fn make_buffer_ready(&mut self, resume: Resume) -> IonResult<bool> {
        if self.is_terminated {
            return Ok(false);
        }
        if let Some(ParkedScan {
            scan,
            mut purpose,
            mut mode,
        }) = self.scan.take()
        {
            if mode == ScanMode::Fill {
                self.source.unpin();
                if resume == Resume::StepInto {
                    debug!("abandoning the delimited fill at offset {}", scan.position());
                    self.source.set_state(RefillState::Ready);
                    return Ok(true);
                }
                purpose = ScanPurpose::SkipValue;
                mode = ScanMode::Seek;
            }
            debug!("resuming delimited scan at offset {}", scan.position());
            if self.run_scan(scan, purpose, mode)? == Progress::Suspended {
                return Ok(false);
            }
        }
        if self.source.state() == RefillState::Seek {
            let target = self.source.target();
            if !self.source.seek_to(target)? {
                return Ok(false);
            }
            self.source.set_state(RefillState::Ready);
        }
        Ok(!self.is_terminated)
    }

    /// Moves the checkpoint to `end`, the end of a token that is now fully consumed. Returns
    /// `false` if the input must be read further before the cursor reaches `end`.
    fn consume_through(&mut self, end: usize) -> IonResult<bool> {
        self.clear_value();
        self.checkpoint = end;
        self.checkpoint_location = CheckpointLocation::BeforeUnannotatedTypeId;
        self.report_consumed(end);
        if end <= self.source.limit() {
            self.source.set_offset(end);
            return Ok(true);
        }
        if self.source.is_final() {
            self.is_value_incomplete = true;
            return Ok(true);
        }
        self.source.seek_to(end)
    }

    fn enter_scope_at(&mut self, start: usize) {
        self.clear_value();
        self.checkpoint = start;
        self.checkpoint_location = CheckpointLocation::BeforeUnannotatedTypeId;
        self.source.set_offset(start);
        self.report_consumed(start);
    }

    fn report_consumed(&mut self, position: usize) {
        if position <= self.reported {
            return;
        }
        if let Some(handler) = self.data_handler.as_mut() {
            handler(position - self.reported);
        }
        self.reported = position;
    }

    fn clear_value(&mut self) {
        self.value = Marker::EMPTY;
        self.field_name = None;
        self.annotations = None;
        self.wrapper_end = None;
        self.macro_invocation = None;
        self.tagless_encoding = None;
    }

    fn set_version(&mut self, version: IonVersion) {
        self.version = Some(version);
        self.descriptors = version.type_descriptors();
    }

    // Delimited tokens only exist in Ion 1.1.
    fn scan_version(&self) -> IonVersion {
        self.version.unwrap_or(IonVersion::V1_1)
    }

    fn finish(&mut self, event: Event) -> Event {
        trace!("{event:?} at offset {} (depth {})", self.checkpoint, self.containers.len());
        self.event = event;
        event
    }

    fn ensure_open(&self) -> IonResult<()> {
        if self.is_closed {
            return illegal_operation("the cursor has been closed");
        }
        Ok(())
    }

    fn is_positioned_on_value(&self) -> bool {
        matches!(
            self.checkpoint_location,
            CheckpointLocation::AfterScalarHeader | CheckpointLocation::AfterContainerHeader
        )
    }

    /// Whether the input holds bytes that the cursor has not consumed, or is missing bytes of a
    /// container the cursor is inside of.
    fn has_unread_bytes(&self) -> bool {
        let limit = self.source.limit();
        if let Some(outermost) = self.containers.first() {
            return outermost.end.map_or(true, |end| end > limit);
        }
        let consumed = match self.checkpoint_location {
            CheckpointLocation::BeforeUnannotatedTypeId => self.checkpoint,
            CheckpointLocation::BeforeAnnotatedTypeId => return true,
            _ => match self.value.end() {
                Some(end) => return end > limit,
                None => return true,
            },
        };
        consumed != limit
    }

    // ---------------------------------------------------------------------------------------
    // The innermost scope: an argument group, a container, an encoding expression or the top
    // level.
    // ---------------------------------------------------------------------------------------

    fn innermost_group(&self) -> Option<&ArgumentGroupFrame> {
        self.argument_groups
            .last()
            .filter(|group| group.depth == self.containers.len())
    }

    fn scope_end(&self) -> Option<usize> {
        match self.innermost_group() {
            Some(group) => group.end,
            None => self.containers.last().and_then(|frame| frame.end),
        }
    }

    fn set_scope_end(&mut self, end: usize) {
        let depth = self.containers.len();
        match self.argument_groups.last_mut().filter(|g| g.depth == depth) {
            Some(group) => group.end = Some(end),
            None => {
                if let Some(frame) = self.containers.last_mut() {
                    frame.end = Some(end);
                }
            }
        }
    }

    fn scope_is_delimited(&self) -> bool {
        match self.innermost_group() {
            Some(group) => group.is_delimited,
            None => self
                .containers
                .last()
                .map(|frame| frame.is_delimited)
                .unwrap_or(false),
        }
    }

    fn scope_field_names(&self) -> Option<FieldNameEncoding> {
        if self.innermost_group().is_some() {
            return None;
        }
        self.containers
            .last()
            .filter(|frame| frame.is_struct())
            .and_then(|frame| frame.field_names)
    }

    fn scope_scan_frame(&self) -> ScanFrame {
        if self.innermost_group().is_some() {
            return ScanFrame::Sequence;
        }
        match self.containers.last().map(|frame| frame.kind) {
            Some(FrameKind::Container(ion_type)) => ScanFrame::for_container(ion_type),
            _ => ScanFrame::Sequence,
        }
    }

    fn switch_scope_to_flex_sym(&mut self) {
        if self.innermost_group().is_some() {
            return;
        }
        if let Some(frame) = self.containers.last_mut() {
            frame.field_names = Some(FieldNameEncoding::FlexSym);
        }
    }

    fn check_within_scope(&self, end: usize) -> IonResult<()> {
        match self.scope_end() {
            Some(scope_end) if end > scope_end => {
                decoding_error("Value exceeds the length of its parent container")
            }
            _ => Ok(()),
        }
    }
}

impl<R: Read> fmt::Debug for BinaryCursor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryCursor")
            .field("version", &self.version)
            .field("event", &self.event)
            .field("checkpoint", &self.checkpoint)
            .field("checkpoint_location", &self.checkpoint_location)
            .field("depth", &self.containers.len())
            .field("value", &self.value)
            .field("is_terminated", &self.is_terminated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::IonError;
    use rstest::rstest;

    const IVM_1_0: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];
    const IVM_1_1: [u8; 4] = [0xE0, 0x01, 0x01, 0xEA];

    fn ion_1_0(body: &[u8]) -> BinaryCursor {
        BinaryCursor::from_bytes([&IVM_1_0[..], body].concat())
    }

    fn ion_1_1(body: &[u8]) -> BinaryCursor {
        BinaryCursor::from_bytes([&IVM_1_1[..], body].concat())
    }

    fn symbol_ids(cursor: &BinaryCursor) -> IonResult<Vec<RawSymbolTokenRef<'_>>> {
        cursor.annotations().collect()
    }

    #[test]
    fn top_level_scalars() -> IonResult<()> {
        let mut cursor = ion_1_0(&[0x21, 0x2A, 0x0F, 0x11]);
        assert_eq!(cursor.ion_version(), (1, 0));
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.version(), Some(IonVersion::V1_0));
        assert_eq!(cursor.ion_type(), Some(IonType::Int));
        assert_eq!(cursor.total_offset(), 4);
        assert_eq!(cursor.value_marker().start(), 5);
        assert_eq!(cursor.value_marker().end(), Some(6));
        assert_eq!(cursor.fill_value()?, Event::ValueReady);
        assert_eq!(cursor.value_bytes(), Some(&[0x2A][..]));

        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert!(cursor.is_null());
        assert_eq!(cursor.typed_null_type(), Some(IonType::Null));

        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.ion_type(), Some(IonType::Bool));
        assert!(!cursor.is_null());

        assert_eq!(cursor.next_value()?, Event::NeedsData);
        assert_eq!(cursor.current_event(), Event::NeedsData);
        assert_eq!(cursor.end_stream()?, Event::NeedsData);
        Ok(())
    }

    #[test]
    fn version_marker_notifications() -> IonResult<()> {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cursor =
            BinaryCursor::from_bytes([&IVM_1_0[..], &IVM_1_1[..], &[0x51, 0x01]].concat());
        let sink = Rc::clone(&seen);
        cursor.register_ivm_notification_consumer(move |major, minor| {
            sink.borrow_mut().push((major, minor))
        });
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.ion_version(), (1, 1));
        assert_eq!(*seen.borrow(), vec![(1, 0), (1, 1)]);
        Ok(())
    }

    #[test]
    fn unsupported_version() {
        let mut cursor = BinaryCursor::from_bytes(&[0xE0, 0x02, 0x00, 0xEA][..]);
        assert!(matches!(cursor.next_value(), Err(IonError::Decoding(_))));
    }

    // {a: 1, b: [2, 3]} with `a` and `b` as symbol IDs 10 and 11
    const STRUCT_1_0: [u8; 10] = [0xD9, 0x8A, 0x21, 0x01, 0x8B, 0xB4, 0x21, 0x02, 0x21, 0x03];

    #[test]
    fn nested_containers() -> IonResult<()> {
        let mut cursor = ion_1_0(&STRUCT_1_0);
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.ion_type(), Some(IonType::Struct));
        assert_eq!(cursor.step_into_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.depth(), 1);

        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.field_name().transpose()?, Some(RawSymbolTokenRef::SymbolId(10)));
        assert_eq!(cursor.fill_value()?, Event::ValueReady);
        assert_eq!(cursor.value_bytes(), Some(&[0x01][..]));

        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.field_name().transpose()?, Some(RawSymbolTokenRef::SymbolId(11)));
        assert_eq!(cursor.ion_type(), Some(IonType::List));
        assert_eq!(cursor.step_into_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.depth(), 2);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.field_name(), None);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.fill_value()?, Event::ValueReady);
        assert_eq!(cursor.value_bytes(), Some(&[0x03][..]));
        assert_eq!(cursor.next_value()?, Event::EndContainer);
        assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::EndContainer);
        assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.depth(), 0);
        assert_eq!(cursor.next_value()?, Event::NeedsData);
        Ok(())
    }

    #[test]
    fn step_out_early_and_skip_containers() -> IonResult<()> {
        let mut cursor = ion_1_0(&[&STRUCT_1_0[..], &[0x21, 0x07]].concat());
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.step_into_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 15);

        let mut cursor = ion_1_0(&[&STRUCT_1_0[..], &[0x21, 0x07]].concat());
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.ion_type(), Some(IonType::Int));
        Ok(())
    }

    #[test]
    fn step_out_at_top_level() {
        let mut cursor = ion_1_0(&[0x21, 0x01]);
        assert!(matches!(
            cursor.step_out_of_container(),
            Err(IonError::IllegalOperation(_))
        ));
    }

    // `depth` lists nested inside one another around the int 7
    fn nested_lists(depth: usize, delimited: bool) -> BinaryCursor {
        if delimited {
            let body = [vec![0xF1; depth], vec![0x51, 0x07], vec![0xF0; depth]].concat();
            return ion_1_1(&body);
        }
        let mut body = vec![0x21, 0x07];
        for _ in 0..depth {
            let length = body.len();
            let header = if length < 14 {
                vec![0xB0 | length as u8]
            } else {
                let mut var_uint = vec![0x80 | (length & 0x7F) as u8];
                let mut rest = length >> 7;
                while rest > 0 {
                    var_uint.insert(0, (rest & 0x7F) as u8);
                    rest >>= 7;
                }
                [vec![0xBE], var_uint].concat()
            };
            body = [header, body].concat();
        }
        ion_1_0(&body)
    }

    #[rstest]
    fn step_out_of_every_level(
        #[values(1, 8, 64)] levels: usize,
        #[values(false, true)] delimited: bool,
    ) -> IonResult<()> {
        let mut cursor = nested_lists(levels, delimited);
        for level in 0..levels {
            assert_eq!(cursor.next_value()?, Event::StartContainer);
            assert_eq!(cursor.ion_type(), Some(IonType::List));
            assert_eq!(cursor.step_into_container()?, Event::NeedsInstruction);
            assert_eq!(cursor.depth(), level + 1);
        }
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.fill_value()?, Event::ValueReady);
        assert_eq!(cursor.value_bytes(), Some(&[0x07][..]));
        for level in (0..levels).rev() {
            assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
            assert_eq!(cursor.depth(), level);
        }
        assert_eq!(cursor.next_value()?, Event::NeedsData);
        assert!(matches!(
            cursor.step_out_of_container(),
            Err(IonError::IllegalOperation(_))
        ));
        assert_eq!(cursor.end_stream()?, Event::NeedsData);
        Ok(())
    }

    #[test]
    fn step_into_a_scalar() -> IonResult<()> {
        let mut cursor = ion_1_0(&[0x21, 0x01]);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert!(matches!(
            cursor.step_into_container(),
            Err(IonError::IllegalOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn annotation_wrapper() -> IonResult<()> {
        let mut cursor = ion_1_0(&[0xE4, 0x81, 0x84, 0x21, 0x01]);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert!(cursor.has_annotations());
        assert_eq!(symbol_ids(&cursor)?, vec![RawSymbolTokenRef::SymbolId(4)]);
        let annotations = cursor.annotation_sequence_marker().map(|m| (m.start(), m.end()));
        assert_eq!(annotations, Some((6, Some(7))));
        assert_eq!(cursor.total_offset(), 4);
        assert_eq!(cursor.value_marker().start(), 8);
        assert_eq!(cursor.next_value()?, Event::NeedsData);
        assert!(!cursor.has_annotations());
        Ok(())
    }

    #[rstest]
    #[case::wrapper_too_long(&[0xE5, 0x81, 0x84, 0x21, 0x01, 0x0F])]
    #[case::negative_zero(&[0x31, 0x00])]
    #[case::child_overflows_list(&[0xB3, 0x21, 0x01, 0x21, 0x02])]
    #[case::empty_ordered_struct(&[0xD1, 0x80])]
    #[case::nested_wrappers(&[0xE7, 0x81, 0x84, 0xE3, 0x81, 0x84, 0x0F])]
    #[case::invalid_type_id(&[0x12])]
    #[case::ivm_in_list(&[0xB4, 0xE0, 0x01, 0x00, 0xEA])]
    fn malformed_ion_1_0(#[case] body: &[u8]) {
        let mut cursor = ion_1_0(body);
        let result = cursor
            .next_value()
            .and_then(|_| cursor.step_into_container())
            .and_then(|_| cursor.next_value())
            .and_then(|_| cursor.next_value());
        assert!(matches!(result, Err(IonError::Decoding(_))), "{result:?}");
    }

    #[test]
    fn truncated_input_is_unexpected_eof() -> IonResult<()> {
        // A string whose length field is missing
        let mut cursor = ion_1_0(&[0x8E]);
        assert_eq!(cursor.next_value()?, Event::NeedsData);
        assert!(matches!(cursor.end_stream(), Err(IonError::Decoding(_))));

        let mut cursor = ion_1_0(&[0x82, b'h']);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.fill_value()?, Event::NeedsData);
        assert!(matches!(cursor.end_stream(), Err(IonError::Decoding(_))));
        Ok(())
    }

    #[test]
    fn delimited_list() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0xF1, 0x51, 0x01, 0x51, 0x02, 0xF0, 0x51, 0x03]);
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert!(cursor.value_marker().is_delimited());
        assert_eq!(cursor.value_marker().end(), None);
        assert_eq!(cursor.fill_value()?, Event::ValueReady);
        assert_eq!(cursor.value_marker().end(), Some(10));
        assert_eq!(cursor.step_into_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.next_value()?, Event::EndContainer);
        assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x03][..]));
        Ok(())
    }

    #[test]
    fn skip_unfilled_delimited_list() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0xF1, 0xF1, 0x51, 0x01, 0xF0, 0xF0, 0x51, 0x03]);
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 11);
        Ok(())
    }

    #[test]
    fn delimited_struct() -> IonResult<()> {
        let data = [0xF3, 0x09, 0x51, 0x01, 0xFB, b'a', b'b', b'c', 0x5E, 0x01, 0xF0, 0x51, 0x03];
        let mut cursor = ion_1_1(&data);
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.step_into_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.field_name().transpose()?, Some(RawSymbolTokenRef::SymbolId(4)));
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.field_name().transpose()?, Some(RawSymbolTokenRef::Text("abc")));
        assert_eq!(cursor.ion_type(), Some(IonType::Bool));
        assert_eq!(cursor.next_value()?, Event::EndContainer);
        assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 16);

        // Stepping out before the end requires a scan for it.
        let mut cursor = ion_1_1(&data);
        cursor.next_value()?;
        cursor.step_into_container()?;
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.step_out_of_container()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 16);
        Ok(())
    }

    #[test]
    fn symbol_address_struct_switches_to_flex_sym() -> IonResult<()> {
        // A struct with a symbol address field name, then a switch to FlexSym names.
        let mut cursor = ion_1_1(&[0xC8, 0x09, 0x51, 0x01, 0x01, 0xFF, b'x', 0x51, 0x02]);
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        cursor.step_into_container()?;
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.field_name().transpose()?, Some(RawSymbolTokenRef::SymbolId(4)));
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.field_name().transpose()?, Some(RawSymbolTokenRef::Text("x")));
        assert_eq!(cursor.next_value()?, Event::EndContainer);
        Ok(())
    }

    #[test]
    fn flex_sym_annotations() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0xE8, 0x09, 0xFF, b'z', 0x51, 0x01]);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(
            symbol_ids(&cursor)?,
            vec![RawSymbolTokenRef::SymbolId(4), RawSymbolTokenRef::Text("z")]
        );
        assert_eq!(cursor.total_offset(), 4);
        Ok(())
    }

    #[test]
    fn encoding_expression_with_unknown_length() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0x05, 0x51, 0x01, 0x51, 0x02]);
        assert_eq!(cursor.next_value()?, Event::NeedsInstruction);
        assert_eq!(cursor.macro_invocation_id(), Some(5));
        assert!(!cursor.is_system_invocation());
        assert!(matches!(cursor.next_value(), Err(IonError::Decoding(_))));

        let mut cursor = ion_1_1(&[0x05, 0x51, 0x01, 0x51, 0x02]);
        assert_eq!(cursor.next_value()?, Event::NeedsInstruction);
        assert_eq!(cursor.step_into_eexp()?, Event::NeedsInstruction);
        assert_eq!(cursor.depth(), 1);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.step_out_of_eexp()?, Event::NeedsInstruction);
        assert_eq!(cursor.depth(), 0);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x02][..]));
        Ok(())
    }

    #[test]
    fn length_prefixed_encoding_expression() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0xF4, 0x0B, 0x05, 0x51, 0x01, 0x51, 0x02]);
        assert_eq!(cursor.next_value()?, Event::NeedsInstruction);
        assert_eq!(cursor.macro_invocation_id(), Some(5));
        assert_eq!(cursor.value_marker().end(), Some(9));
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 10);

        let mut cursor = ion_1_1(&[0xF4, 0x0B, 0x05, 0x51, 0x01, 0x51, 0x02]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        assert_eq!(cursor.step_out_of_eexp()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 10);
        Ok(())
    }

    #[test]
    fn system_macro_invocation() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0xEF, 0x03]);
        assert_eq!(cursor.next_value()?, Event::NeedsInstruction);
        assert!(cursor.is_system_invocation());
        assert_eq!(cursor.macro_invocation_id(), Some(3));
        Ok(())
    }

    #[test]
    fn tagless_arguments() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0x05, 0x2A, 0xFF, 0x34, 0x12]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        assert_eq!(cursor.next_tagless_value(PrimitiveEncoding::UInt8)?, Event::ValueReady);
        assert_eq!(cursor.value_bytes(), Some(&[0x2A][..]));
        assert_eq!(cursor.ion_type(), Some(IonType::Int));
        assert_eq!(cursor.next_tagless_value(PrimitiveEncoding::FlexUInt)?, Event::ValueReady);
        assert_eq!(cursor.value_bytes(), Some(&[0xFF][..]));
        assert_eq!(cursor.next_tagless_value(PrimitiveEncoding::Float16)?, Event::ValueReady);
        assert_eq!(cursor.ion_type(), Some(IonType::Float));
        assert_eq!(cursor.value_bytes(), Some(&[0x34, 0x12][..]));
        assert_eq!(cursor.next_tagless_value(PrimitiveEncoding::UInt8)?, Event::NeedsData);
        Ok(())
    }

    #[test]
    fn tagged_argument_groups() -> IonResult<()> {
        // A length-prefixed group, then a delimited group, then an int.
        let mut cursor = ion_1_1(&[
            0x05, 0x09, 0x51, 0x01, 0x51, 0x02, 0x01, 0x51, 0x03, 0xF0, 0x51, 0x04,
        ]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        assert_eq!(cursor.enter_argument_group(None)?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.next_value()?, Event::EndContainer);
        assert_eq!(cursor.exit_argument_group()?, Event::NeedsInstruction);

        assert_eq!(cursor.enter_argument_group(None)?, Event::NeedsInstruction);
        assert_eq!(cursor.next_grouped_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x03][..]));
        assert_eq!(cursor.next_grouped_value()?, Event::EndContainer);
        assert_eq!(cursor.exit_argument_group()?, Event::NeedsInstruction);

        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x04][..]));
        Ok(())
    }

    #[test]
    fn exit_delimited_group_early() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0x05, 0x01, 0x51, 0x03, 0xF1, 0xF0, 0xF0, 0x51, 0x04]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        cursor.enter_argument_group(None)?;
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.exit_argument_group()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x04][..]));
        Ok(())
    }

    #[test]
    fn tagless_argument_group_pages() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0x05, 0x05, 0xAA, 0xBB, 0x03, 0xCC, 0x01, 0x51, 0x07]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        let encoding = Some(PrimitiveEncoding::UInt8);
        assert_eq!(cursor.enter_argument_group(encoding)?, Event::NeedsInstruction);
        let mut values = Vec::new();
        while cursor.next_grouped_value()? == Event::ValueReady {
            values.extend_from_slice(cursor.value_bytes().unwrap_or(&[]));
        }
        assert_eq!(cursor.current_event(), Event::EndContainer);
        assert_eq!(values, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(cursor.exit_argument_group()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x07][..]));

        // Exiting after the first value skips the remaining pages.
        let mut cursor = ion_1_1(&[0x05, 0x05, 0xAA, 0xBB, 0x03, 0xCC, 0x01, 0x51, 0x07]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        cursor.enter_argument_group(encoding)?;
        assert_eq!(cursor.next_grouped_value()?, Event::ValueReady);
        assert_eq!(cursor.exit_argument_group()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_bytes(), Some(&[0x07][..]));
        Ok(())
    }

    #[test]
    fn empty_tagless_group() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0x05, 0x01, 0x51, 0x07]);
        cursor.next_value()?;
        cursor.step_into_eexp()?;
        cursor.enter_argument_group(Some(PrimitiveEncoding::FlexInt))?;
        assert_eq!(cursor.next_grouped_value()?, Event::EndContainer);
        assert_eq!(cursor.exit_argument_group()?, Event::NeedsInstruction);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        Ok(())
    }

    #[test]
    fn grouped_value_outside_a_group() {
        let mut cursor = ion_1_1(&[0x51, 0x01]);
        assert!(matches!(
            cursor.next_grouped_value(),
            Err(IonError::IllegalOperation(_))
        ));
        assert!(matches!(
            cursor.exit_argument_group(),
            Err(IonError::IllegalOperation(_))
        ));
    }

    #[test]
    fn nop_padding() -> IonResult<()> {
        let mut cursor = ion_1_1(&[0xEC, 0xED, 0x05, 0x00, 0x00, 0x51, 0x01]);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 10);
        let mut cursor = ion_1_0(&[0x01, 0x00, 0x21, 0x01]);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.value_marker().start(), 7);
        Ok(())
    }

    #[test]
    fn slice_a_buffered_range() -> IonResult<()> {
        let mut cursor = ion_1_0(&STRUCT_1_0);
        assert_eq!(cursor.next_value()?, Event::StartContainer);
        assert_eq!(cursor.fill_value()?, Event::ValueReady);
        // Read the struct's body as if it were a stream of its own.
        cursor.slice(6, 8, IonVersion::V1_0)?;
        assert_eq!(cursor.depth(), 0);
        assert_eq!(cursor.next_value()?, Event::StartScalar);
        assert_eq!(cursor.ion_type(), Some(IonType::Int));
        assert_eq!(cursor.next_value()?, Event::NeedsData);
        assert!(cursor.slice(0, 100, IonVersion::V1_0).is_err());
        Ok(())
    }

    #[test]
    fn close_is_idempotent() -> IonResult<()> {
        let mut cursor = ion_1_0(&[0x21, 0x01]);
        cursor.close()?;
        cursor.close()?;
        assert!(matches!(cursor.next_value(), Err(IonError::IllegalOperation(_))));
        Ok(())
    }

    #[test]
    fn terminated_cursor_needs_data() -> IonResult<()> {
        let mut cursor = ion_1_0(&[0x21, 0x01]);
        cursor.terminate();
        assert!(cursor.is_terminated());
        assert_eq!(cursor.next_value()?, Event::NeedsData);
        Ok(())
    }
}
