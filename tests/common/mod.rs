#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;

use ion_cursor::{BinaryCursor, Event, IonResult, IonType, RawSymbolTokenRef};

pub const IVM_1_0: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];
pub const IVM_1_1: [u8; 4] = [0xE0, 0x01, 0x01, 0xEA];

/// An input that only offers the bytes that have been pushed into it so far. A cursor reading
/// from it sees the end of the available data as a temporary condition.
#[derive(Clone, Default)]
pub struct PushInput {
    bytes: Rc<RefCell<VecDeque<u8>>>,
}

impl PushInput {
    pub fn push(&self, bytes: &[u8]) {
        self.bytes.borrow_mut().extend(bytes.iter().copied());
    }
}

impl Read for PushInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut bytes = self.bytes.borrow_mut();
        let count = buf.len().min(bytes.len());
        for (slot, byte) in buf.iter_mut().zip(bytes.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

/// Splits `data` into chunks whose sizes cycle through `sizes`.
pub fn chunks<'a>(data: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut rest = data;
    for size in sizes.iter().cycle() {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at((*size).max(1).min(rest.len()));
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    SymbolId(usize),
    Text(String),
}

impl From<RawSymbolTokenRef<'_>> for Token {
    fn from(token: RawSymbolTokenRef<'_>) -> Self {
        match token {
            RawSymbolTokenRef::SymbolId(sid) => Token::SymbolId(sid),
            RawSymbolTokenRef::Text(text) => Token::Text(text.to_owned()),
        }
    }
}

/// Something the cursor reported while walking a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Scalar {
        depth: usize,
        ion_type: Option<IonType>,
        field_name: Option<Token>,
        annotations: Vec<Token>,
        bytes: Vec<u8>,
    },
    Container {
        depth: usize,
        ion_type: Option<IonType>,
        field_name: Option<Token>,
        annotations: Vec<Token>,
    },
    End {
        depth: usize,
    },
}

#[derive(Debug, Copy, Clone, Default)]
pub struct WalkOptions {
    /// Buffer every container before stepping into it.
    pub fill_containers: bool,
}

/// Repeats `operation` for as long as it needs data and `refill` can supply more.
pub fn retry<R: Read>(
    cursor: &mut BinaryCursor<R>,
    refill: &mut impl FnMut() -> bool,
    mut operation: impl FnMut(&mut BinaryCursor<R>) -> IonResult<Event>,
) -> IonResult<Event> {
    loop {
        let event = operation(cursor)?;
        if event != Event::NeedsData || !refill() {
            return Ok(event);
        }
    }
}

fn field_name<R: Read>(cursor: &BinaryCursor<R>) -> IonResult<Option<Token>> {
    Ok(cursor.field_name().transpose()?.map(Token::from))
}

fn annotations<R: Read>(cursor: &BinaryCursor<R>) -> IonResult<Vec<Token>> {
    cursor
        .annotations()
        .map(|token| token.map(Token::from))
        .collect()
}

/// Reads every value in the stream, stepping into every container, and records what the cursor
/// reports. `refill` is called whenever the cursor needs more data; once it returns `false` the
/// stream is ended.
pub fn walk<R: Read>(
    cursor: &mut BinaryCursor<R>,
    mut refill: impl FnMut() -> bool,
    options: WalkOptions,
) -> IonResult<Vec<Record>> {
    let mut records = Vec::new();
    loop {
        let depth = cursor.depth();
        match retry(cursor, &mut refill, |c| c.next_value())? {
            Event::NeedsData => {
                cursor.end_stream()?;
                return Ok(records);
            }
            Event::StartScalar => {
                let event = retry(cursor, &mut refill, |c| c.fill_value())?;
                if event == Event::NeedsData {
                    cursor.end_stream()?;
                }
                assert_eq!(event, Event::ValueReady);
                records.push(Record::Scalar {
                    depth,
                    ion_type: cursor.ion_type(),
                    field_name: field_name(cursor)?,
                    annotations: annotations(cursor)?,
                    bytes: cursor.value_bytes().unwrap_or(&[]).to_vec(),
                });
            }
            Event::StartContainer => {
                if options.fill_containers {
                    let event = retry(cursor, &mut refill, |c| c.fill_value())?;
                    assert_eq!(event, Event::ValueReady);
                }
                records.push(Record::Container {
                    depth,
                    ion_type: cursor.ion_type(),
                    field_name: field_name(cursor)?,
                    annotations: annotations(cursor)?,
                });
                let event = retry(cursor, &mut refill, |c| c.step_into_container())?;
                assert_eq!(event, Event::NeedsInstruction);
            }
            Event::EndContainer => {
                records.push(Record::End { depth });
                let event = retry(cursor, &mut refill, |c| c.step_out_of_container())?;
                assert_eq!(event, Event::NeedsInstruction);
            }
            other => panic!("unexpected {other:?} at depth {depth}"),
        }
    }
}

/// Walks a complete stream held in memory.
pub fn walk_bytes(data: &[u8], options: WalkOptions) -> IonResult<Vec<Record>> {
    let mut cursor = BinaryCursor::from_bytes(data);
    walk(&mut cursor, || false, options)
}

/// Walks a stream that is delivered to the cursor in the given chunks.
pub fn walk_chunks(chunks: &[&[u8]], options: WalkOptions) -> IonResult<Vec<Record>> {
    let input = PushInput::default();
    let mut cursor = BinaryCursor::from_reader(input.clone())?;
    let mut pending = chunks.iter();
    walk(
        &mut cursor,
        || match pending.next() {
            Some(chunk) => {
                input.push(chunk);
                true
            }
            None => false,
        },
        options,
    )
}

/// Encodes `value` as a FlexUInt.
pub fn flex_uint(value: usize) -> Vec<u8> {
    let mut bits = value.max(1).ilog2() as usize + 1;
    let mut size = 1;
    while bits > 7 * size {
        size += 1;
    }
    bits = size;
    let encoded = ((value as u128) << bits) | (1u128 << (bits - 1));
    encoded.to_le_bytes()[..size].to_vec()
}

/// Encodes `value` as a 1.0 VarUInt.
pub fn var_uint(value: usize) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8 | 0x80];
    let mut rest = value >> 7;
    while rest > 0 {
        bytes.push((rest & 0x7F) as u8);
        rest >>= 7;
    }
    bytes.reverse();
    bytes
}
