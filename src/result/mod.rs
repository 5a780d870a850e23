use std::convert::From;
use std::fmt::Debug;
use std::io;

use crate::position::Position;
use crate::result::decoding_error::DecodingError;
use crate::result::illegal_operation::IllegalOperation;
use crate::result::incomplete::IncompleteError;
use io_error::IoError;
use thiserror::Error;

pub mod decoding_error;
pub mod illegal_operation;
pub mod incomplete;
pub mod io_error;

/// A unified Result type representing the outcome of method calls that may fail.
pub type IonResult<T> = Result<T, IonError>;

/// Represents the different types of high-level failures that might occur when reading Ion data.
///
/// Running out of buffered input while the cursor is reading from a refillable source is *not*
/// reported through this type; the cursor returns [`Event::NeedsData`](crate::Event::NeedsData)
/// instead. [`IonError::Incomplete`] is produced by the checked primitive decoders and surfaces
/// to users only when those decoders are called directly.
#[derive(Debug, Error)]
pub enum IonError {
    /// Indicates that an IO error was encountered while reading from the input source.
    #[error("{0}")]
    Io(#[from] IoError),

    /// Indicates that the input buffer did not contain enough data to perform the requested read
    /// operation. If the input source contains more data, the caller can supply it and try again.
    #[error("{0}")]
    Incomplete(#[from] IncompleteError),

    /// Indicates that the data stream being read contained illegal or otherwise unreadable data.
    #[error("{0}")]
    Decoding(#[from] DecodingError),

    /// Returned when the user has performed an illegal operation (for example: calling
    /// `step_out_of_container()` on the cursor at the top level.)
    #[error("{0}")]
    IllegalOperation(#[from] IllegalOperation),
}

impl IonError {
    /// Returns `true` if this error was caused by the input ending before a complete primitive
    /// could be read.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, IonError::Incomplete(_))
    }
}

impl From<io::Error> for IonError {
    fn from(io_error: io::Error) -> Self {
        IoError::from(io_error).into()
    }
}

impl From<io::ErrorKind> for IonError {
    fn from(error_kind: io::ErrorKind) -> Self {
        // io::ErrorKind -> io::Error
        let io_error = io::Error::from(error_kind);
        // io::Error -> IoError -> IonError
        IoError::from(io_error).into()
    }
}

pub(crate) fn incomplete<T>(label: &'static str, position: impl Into<Position>) -> IonResult<T> {
    Err(incomplete_error(label, position))
}

#[inline(never)]
pub(crate) fn incomplete_error(label: &'static str, position: impl Into<Position>) -> IonError {
    IncompleteError::new(label, position).into()
}

/// A convenience method for creating an IonResult containing an IonError::Decoding with the
/// provided description text.
pub fn decoding_error<T, S: Into<String>>(description: S) -> IonResult<T> {
    Err(decoding_error_raw(description))
}

/// A convenience method for creating an IonError::Decoding with the provided description
/// text. Useful for calling Option#ok_or_else.
#[inline(never)]
pub(crate) fn decoding_error_raw<S: Into<String>>(description: S) -> IonError {
    DecodingError::new(description.into()).into()
}

/// A convenience method for creating an IonResult containing an IonError::IllegalOperation with the
/// provided operation text.
pub fn illegal_operation<T, S: Into<String>>(operation: S) -> IonResult<T> {
    Err(illegal_operation_raw(operation))
}

/// A convenience method for creating an IonError::IllegalOperation with the provided operation
/// text. Useful for calling Option#ok_or_else.
#[inline(never)]
pub(crate) fn illegal_operation_raw<S: Into<String>>(operation: S) -> IonError {
    IllegalOperation::new(operation.into()).into()
}
