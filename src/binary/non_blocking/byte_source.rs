use std::io::{self, Read};

use log::debug;

use crate::result::IonResult;

/// The progress of a stream-backed [`ByteSource`] toward the bytes the cursor last asked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RefillState {
    /// Nothing is pending.
    Ready,
    /// The buffer is waiting for enough bytes to complete a token or value.
    Fill,
    /// Bytes are being discarded up to a known stream offset.
    Seek,
    /// A delimited container's contents are being buffered while its end is located.
    FillDelimited,
    /// A delimited container's contents are being discarded while its end is located.
    SeekDelimited,
    /// No further reads will be attempted.
    Terminated,
}

/// The result of asking a [`ByteSource`] to make a range of bytes available.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FillOutcome {
    Ready,
    /// The input has no more bytes to offer right now.
    NeedsData,
    /// The range cannot be buffered without exceeding the maximum buffer size.
    Oversized,
}

/// The parts of a [`ByteSource`] that only exist when it is backed by an [`io::Read`].
struct Refillable<R> {
    // `None` once the source has been closed.
    input: Option<R>,
    maximum_size: usize,
    state: RefillState,
    // The stream offset that a pending fill or seek is trying to reach.
    target: usize,
}

/// A window of bytes over either a fixed byte array or a growable buffer that is refilled from
/// an [`io::Read`].
///
/// Every position accepted or returned by a `ByteSource` is a stream offset: the number of bytes
/// between the start of the input and the position. The buffer's first byte is at
/// [`start`](Self::start) and its last valid byte is just before [`limit`](Self::limit). When the
/// buffer is compacted, discarded bytes simply advance `start`; positions that callers hold on to
/// remain valid.
pub(crate) struct ByteSource<R> {
    bytes: Box<[u8]>,
    // The stream offset of `bytes[0]`. This is also the total number of bytes discarded so far.
    stream_offset: usize,
    // The number of initialized bytes at the front of `bytes`.
    local_end: usize,
    // Bytes before this stream offset are no longer needed by the cursor.
    offset: usize,
    // While set, bytes at and after this stream offset are retained even if they precede `offset`.
    pin: Option<usize>,
    // When set, the source behaves as if the input ended at this stream offset.
    slice_end: Option<usize>,
    refill: Option<Refillable<R>>,
}

impl ByteSource<io::Empty> {
    /// Constructs a source over a fixed array of bytes. It never grows or refills.
    pub fn from_bytes(bytes: Box<[u8]>) -> Self {
        let local_end = bytes.len();
        ByteSource {
            bytes,
            stream_offset: 0,
            local_end,
            offset: 0,
            pin: None,
            slice_end: None,
            refill: None,
        }
    }
}

impl<R: Read> ByteSource<R> {
    /// Constructs a source that reads from `input` into a buffer that starts with
    /// `initial_size` bytes of capacity and may grow to `maximum_size`.
    pub fn from_reader(input: R, initial_size: usize, maximum_size: usize) -> Self {
        ByteSource {
            bytes: vec![0u8; initial_size].into_boxed_slice(),
            stream_offset: 0,
            local_end: 0,
            offset: 0,
            pin: None,
            slice_end: None,
            refill: Some(Refillable {
                input: Some(input),
                maximum_size,
                state: RefillState::Ready,
                target: 0,
            }),
        }
    }

    pub fn is_byte_backed(&self) -> bool {
        self.refill.is_none()
    }

    /// Whether every byte the input will ever provide has already been buffered.
    pub fn is_final(&self) -> bool {
        self.refill.is_none() || self.slice_end.is_some()
    }

    /// The stream offset of the first buffered byte.
    pub fn start(&self) -> usize {
        self.stream_offset
    }

    /// The stream offset just past the last buffered byte.
    pub fn limit(&self) -> usize {
        let end = self.stream_offset + self.local_end;
        match self.slice_end {
            Some(slice_end) => end.min(slice_end),
            None => end,
        }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn maximum_size(&self) -> Option<usize> {
        self.refill.as_ref().map(|r| r.maximum_size)
    }

    pub fn state(&self) -> RefillState {
        match &self.refill {
            Some(refill) => refill.state,
            None => RefillState::Ready,
        }
    }

    pub fn set_state(&mut self, state: RefillState) {
        if let Some(refill) = self.refill.as_mut() {
            if refill.state != RefillState::Terminated {
                refill.state = state;
            }
        }
    }

    /// The stream offset that a pending fill or seek is trying to reach.
    pub fn target(&self) -> usize {
        self.refill.as_ref().map(|r| r.target).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn is_terminated(&self) -> bool {
        self.state() == RefillState::Terminated
    }

    /// The buffered bytes from `position` to the limit. Empty if `position` is not buffered.
    pub fn bytes_from(&self, position: usize) -> &[u8] {
        self.bytes_between(position, self.limit()).unwrap_or(&[])
    }

    /// The buffered bytes in the stream range `start..end`, if all of them are buffered.
    pub fn bytes_between(&self, start: usize, end: usize) -> Option<&[u8]> {
        if start < self.stream_offset || end > self.limit() || start > end {
            return None;
        }
        let local_start = start - self.stream_offset;
        let local_end = end - self.stream_offset;
        Some(&self.bytes[local_start..local_end])
    }

    #[cfg(test)]
    pub fn byte_at(&self, position: usize) -> Option<u8> {
        if position < self.stream_offset || position >= self.limit() {
            return None;
        }
        Some(self.bytes[position - self.stream_offset])
    }

    /// Declares that the bytes before `position` will not be read again.
    pub fn set_offset(&mut self, position: usize) {
        self.offset = position;
    }

    /// Retains the bytes at and after `position` until [`unpin`](Self::unpin) is called, even
    /// if the offset moves past them.
    pub fn pin(&mut self, position: usize) {
        self.pin = Some(position);
    }

    pub fn unpin(&mut self) {
        self.pin = None;
    }

    /// Treats `end` as the end of the input.
    pub fn slice(&mut self, end: usize) {
        self.slice_end = Some(end);
    }

    #[cfg(test)]
    pub fn unslice(&mut self) {
        self.slice_end = None;
    }

    // The earliest stream offset that must survive compaction.
    fn keep_from(&self, position: usize) -> usize {
        let mut keep_from = self.offset.min(position);
        if let Some(pin) = self.pin {
            keep_from = keep_from.min(pin);
        }
        keep_from.max(self.stream_offset)
    }

    /// Attempts to make the `length` bytes starting at stream offset `position` available,
    /// reading from the input if necessary. `position` may be past the current limit, in which
    /// case the bytes in between are buffered too.
    pub fn fill_at(&mut self, position: usize, length: usize) -> IonResult<FillOutcome> {
        let end = position + length;
        if end <= self.limit() {
            return Ok(FillOutcome::Ready);
        }
        if self.slice_end.is_some() {
            return Ok(FillOutcome::NeedsData);
        }
        match &self.refill {
            None => return Ok(FillOutcome::NeedsData),
            Some(refill) if refill.state == RefillState::Terminated => {
                return Ok(FillOutcome::NeedsData)
            }
            Some(_) => {}
        }
        let keep_from = self.keep_from(position);
        if !self.ensure_capacity(end - keep_from, keep_from) {
            return Ok(FillOutcome::Oversized);
        }
        self.refill(end)?;
        if end <= self.limit() {
            self.set_state(RefillState::Ready);
            Ok(FillOutcome::Ready)
        } else {
            if let Some(refill) = self.refill.as_mut() {
                refill.target = end;
            }
            if self.state() == RefillState::Ready {
                self.set_state(RefillState::Fill);
            }
            Ok(FillOutcome::NeedsData)
        }
    }

    /// Makes room for `required` bytes starting at stream offset `keep_from`, discarding any
    /// buffered bytes before `keep_from`. Returns `false` without changing anything if
    /// `required` is larger than the maximum buffer size.
    pub fn ensure_capacity(&mut self, required: usize, keep_from: usize) -> bool {
        let maximum_size = match &self.refill {
            Some(refill) => refill.maximum_size,
            None => return required <= self.local_end,
        };
        if required > maximum_size {
            return false;
        }
        let local_keep = keep_from.saturating_sub(self.stream_offset).min(self.local_end);
        if self.bytes.len() - local_keep >= required {
            return true;
        }
        let retained = self.local_end - local_keep;
        if required <= self.bytes.len() {
            self.bytes.copy_within(local_keep..self.local_end, 0);
            debug!(
                "compacted buffer: discarded {local_keep} bytes, retained {retained} bytes"
            );
        } else {
            let capacity = self.bytes.len();
            let new_capacity = (capacity * 2)
                .max(required.next_power_of_two())
                .min(maximum_size);
            let mut new_bytes = vec![0u8; new_capacity].into_boxed_slice();
            new_bytes[..retained].copy_from_slice(&self.bytes[local_keep..self.local_end]);
            self.bytes = new_bytes;
            debug!("grew buffer from {capacity} to {new_capacity} bytes");
        }
        self.stream_offset += local_keep;
        self.local_end = retained;
        true
    }

    /// Reads from the input until the buffer reaches stream offset `target_end`, the buffer is
    /// full, or the input has nothing more to offer right now.
    pub fn refill(&mut self, target_end: usize) -> IonResult<()> {
        let Some(refill) = self.refill.as_mut() else {
            return Ok(());
        };
        let Some(input) = refill.input.as_mut() else {
            return Ok(());
        };
        while self.stream_offset + self.local_end < target_end && self.local_end < self.bytes.len()
        {
            match input.read(&mut self.bytes[self.local_end..]) {
                Ok(0) => break,
                Ok(bytes_read) => self.local_end += bytes_read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof
                    ) =>
                {
                    break
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Discards every byte before stream offset `target`, reading and dropping input bytes as
    /// needed. Returns `false` if the input ran out first; calling `seek_to` again with the same
    /// target continues where the previous attempt stopped.
    pub fn seek_to(&mut self, target: usize) -> IonResult<bool> {
        self.offset = self.offset.max(target);
        if target <= self.limit() || self.slice_end.is_some() {
            return Ok(target <= self.limit());
        }
        let Some(refill) = self.refill.as_mut() else {
            return Ok(false);
        };
        // Nothing that is buffered is needed.
        self.stream_offset += self.local_end;
        self.local_end = 0;
        let Some(input) = refill.input.as_mut() else {
            refill.target = target;
            return Ok(false);
        };
        while self.stream_offset < target {
            let wanted = (target - self.stream_offset).min(self.bytes.len());
            match input.read(&mut self.bytes[..wanted]) {
                Ok(0) => break,
                Ok(bytes_read) => self.stream_offset += bytes_read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof
                    ) =>
                {
                    break
                }
                Err(e) => return Err(e.into()),
            }
        }
        if self.stream_offset < target {
            refill.target = target;
            if refill.state == RefillState::Ready || refill.state == RefillState::Fill {
                refill.state = RefillState::Seek;
            }
            return Ok(false);
        }
        if refill.state != RefillState::Terminated {
            refill.state = RefillState::Ready;
        }
        Ok(true)
    }

    /// Stops all further reads. Buffered bytes remain readable.
    pub fn terminate(&mut self) {
        if let Some(refill) = self.refill.as_mut() {
            refill.state = RefillState::Terminated;
        }
    }

    /// Drops the input. Calling this more than once has no further effect.
    pub fn close(&mut self) {
        if let Some(refill) = self.refill.as_mut() {
            refill.input = None;
            refill.state = RefillState::Terminated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns at most `chunk` bytes per call to `read`.
    struct Chunked<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Chunked<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn stream(data: &[u8], chunk: usize, initial: usize, maximum: usize) -> ByteSource<Chunked<'_>> {
        ByteSource::from_reader(Chunked { data, chunk }, initial, maximum)
    }

    #[test]
    fn byte_backed_never_refills() -> IonResult<()> {
        let mut source = ByteSource::from_bytes(vec![1, 2, 3].into_boxed_slice());
        assert!(source.is_byte_backed());
        assert!(source.is_final());
        assert_eq!(source.fill_at(0, 3)?, FillOutcome::Ready);
        assert_eq!(source.fill_at(2, 2)?, FillOutcome::NeedsData);
        assert_eq!(source.bytes_between(1, 3), Some(&[2u8, 3][..]));
        assert_eq!(source.byte_at(3), None);
        Ok(())
    }

    #[test]
    fn fill_loops_over_short_reads() -> IonResult<()> {
        let data: Vec<u8> = (0..20).collect();
        let mut source = stream(&data, 3, 32, 64);
        assert_eq!(source.fill_at(0, 10)?, FillOutcome::Ready);
        assert!(source.limit() >= 10);
        assert_eq!(source.bytes_between(0, 10), Some(&data[..10]));
        assert_eq!(source.fill_at(15, 10)?, FillOutcome::NeedsData);
        assert_eq!(source.state(), RefillState::Fill);
        assert_eq!(source.target(), 25);
        assert_eq!(source.limit(), 20);
        Ok(())
    }

    #[test]
    fn compaction_keeps_stream_offsets() -> IonResult<()> {
        let data: Vec<u8> = (0..40).collect();
        let mut source = stream(&data, 8, 8, 8);
        assert_eq!(source.fill_at(0, 8)?, FillOutcome::Ready);
        source.set_offset(6);
        assert_eq!(source.fill_at(6, 8)?, FillOutcome::Ready);
        assert_eq!(source.start(), 6);
        assert_eq!(source.byte_at(13), Some(13));
        assert_eq!(source.byte_at(5), None);
        Ok(())
    }

    #[test]
    fn growth_is_capped_by_the_maximum() -> IonResult<()> {
        let data: Vec<u8> = (0..100).collect();
        let mut source = stream(&data, 100, 4, 48);
        assert_eq!(source.fill_at(0, 20)?, FillOutcome::Ready);
        assert_eq!(source.capacity(), 32);
        assert_eq!(source.fill_at(0, 40)?, FillOutcome::Ready);
        assert_eq!(source.capacity(), 48);
        assert_eq!(source.fill_at(0, 49)?, FillOutcome::Oversized);
        Ok(())
    }

    #[test]
    fn pinned_bytes_survive_compaction() -> IonResult<()> {
        let data: Vec<u8> = (0..64).collect();
        let mut source = stream(&data, 64, 16, 64);
        assert_eq!(source.fill_at(0, 16)?, FillOutcome::Ready);
        source.pin(4);
        source.set_offset(12);
        assert_eq!(source.fill_at(12, 16)?, FillOutcome::Ready);
        assert_eq!(source.start(), 4);
        source.unpin();
        assert_eq!(source.fill_at(30, 16)?, FillOutcome::Ready);
        assert_eq!(source.start(), 12);
        Ok(())
    }

    #[test]
    fn seek_discards_and_resumes() -> IonResult<()> {
        let data: Vec<u8> = (0..30).collect();
        let mut source = stream(&data[..12], 5, 4, 16);
        assert!(!source.seek_to(20)?);
        assert_eq!(source.state(), RefillState::Seek);
        assert_eq!(source.target(), 20);
        source.refill.as_mut().unwrap().input = Some(Chunked {
            data: &data[12..],
            chunk: 5,
        });
        assert!(source.seek_to(20)?);
        assert_eq!(source.state(), RefillState::Ready);
        assert_eq!(source.fill_at(20, 2)?, FillOutcome::Ready);
        assert_eq!(source.byte_at(20), Some(20));
        Ok(())
    }

    #[test]
    fn slices_end_early() -> IonResult<()> {
        let mut source = ByteSource::from_bytes(vec![0, 1, 2, 3, 4].into_boxed_slice());
        source.slice(3);
        assert_eq!(source.limit(), 3);
        assert_eq!(source.fill_at(2, 2)?, FillOutcome::NeedsData);
        source.unslice();
        assert_eq!(source.fill_at(2, 2)?, FillOutcome::Ready);
        Ok(())
    }

    #[test]
    fn closed_sources_stop_reading() -> IonResult<()> {
        let data = [1u8, 2, 3];
        let mut source = stream(&data, 3, 4, 4);
        source.close();
        source.close();
        assert!(source.is_terminated());
        assert_eq!(source.fill_at(0, 1)?, FillOutcome::NeedsData);
        Ok(())
    }
}
