use std::borrow::Cow;
use thiserror::Error;

/// Indicates that the caller asked the cursor to do something that is not possible from its
/// current position, such as stepping into a scalar or stepping out at the top level.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("the user has performed an operation that is not legal in the current state: {operation}")]
pub struct IllegalOperation {
    operation: Cow<'static, str>,
}

impl IllegalOperation {
    pub(crate) fn new(operation: impl Into<Cow<'static, str>>) -> Self {
        IllegalOperation {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        self.operation.as_ref()
    }
}
