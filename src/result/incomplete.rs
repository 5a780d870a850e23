use crate::position::Position;
use std::borrow::Cow;
use thiserror::Error;

/// Indicates that there was not enough data available in the input to decode the requested
/// primitive.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("ran out of input while reading {label} at offset {position}")]
pub struct IncompleteError {
    label: Cow<'static, str>,
    position: Position,
}

impl IncompleteError {
    pub(crate) fn new(label: impl Into<Cow<'static, str>>, position: impl Into<Position>) -> Self {
        IncompleteError {
            label: label.into(),
            position: position.into(),
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_ref()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }
}
