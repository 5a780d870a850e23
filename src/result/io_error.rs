use std::io;
use thiserror::Error;

/// Wraps an error returned by the cursor's underlying [`io::Read`] implementation.
#[derive(Debug, Error)]
#[error("{source:?}")]
pub struct IoError {
    #[from]
    source: io::Error,
}

impl IoError {
    pub fn source(&self) -> &io::Error {
        &self.source
    }
}
