use std::borrow::Cow;
use thiserror::Error;

/// Indicates that the stream contained data that does not conform to the binary Ion format.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{description}")]
pub struct DecodingError {
    description: Cow<'static, str>,
}

impl DecodingError {
    pub(crate) fn new(description: impl Into<Cow<'static, str>>) -> Self {
        DecodingError {
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        self.description.as_ref()
    }
}
