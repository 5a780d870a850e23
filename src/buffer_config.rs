use std::fmt::{Debug, Formatter};

use crate::result::{illegal_operation, IonResult};

/// Describes a value that could not be buffered because its representation is larger than
/// the configured maximum buffer size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OversizedValue {
    /// The stream offset of the first byte of the value's header (including any field name and
    /// annotations).
    pub position: usize,
    /// The container depth at which the value was found.
    pub depth: usize,
    /// The total length of the value, if it could be determined without reading all of it.
    pub length: Option<usize>,
}

/// What the cursor should do after reporting an [`OversizedValue`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OversizedValueAction {
    /// Discard the value's bytes and continue with the next token.
    Skip,
    /// Stop reading. Every subsequent cursor operation reports
    /// [`Event::NeedsData`](crate::Event::NeedsData).
    Terminate,
}

pub type OversizedValueHandler = Box<dyn FnMut(OversizedValue) -> IonResult<OversizedValueAction>>;

/// Receives the number of bytes the cursor has consumed each time it moves past a token.
pub type DataHandler = Box<dyn FnMut(usize)>;

/// Provides configuration details for cursors that read from an [`io::Read`](std::io::Read).
///
/// ```
/// use ion_cursor::{BufferConfig, OversizedValueAction};
///
/// let config = BufferConfig::default()
///     .with_initial_buffer_size(64)
///     .with_maximum_buffer_size(1024)
///     .with_oversized_value_handler(|_value| Ok(OversizedValueAction::Skip));
/// assert_eq!(config.maximum_buffer_size(), Some(1024));
/// ```
pub struct BufferConfig {
    initial_buffer_size: usize,
    maximum_buffer_size: Option<usize>,
    pub(crate) oversized_value_handler: Option<OversizedValueHandler>,
    pub(crate) data_handler: Option<DataHandler>,
}

impl BufferConfig {
    pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 32 * 1024;

    /// The smallest permitted maximum. Every token header the cursor reads in a single step fits
    /// in a buffer of this size.
    pub const MINIMUM_MAXIMUM_BUFFER_SIZE: usize = 32;

    pub fn new() -> Self {
        BufferConfig {
            initial_buffer_size: Self::DEFAULT_INITIAL_BUFFER_SIZE,
            maximum_buffer_size: None,
            oversized_value_handler: None,
            data_handler: None,
        }
    }

    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    /// Values whose representation would not fit in a buffer of this size are reported to the
    /// oversized value handler instead of being buffered.
    pub fn with_maximum_buffer_size(mut self, size: usize) -> Self {
        self.maximum_buffer_size = Some(size);
        self
    }

    pub fn with_oversized_value_handler(
        mut self,
        handler: impl FnMut(OversizedValue) -> IonResult<OversizedValueAction> + 'static,
    ) -> Self {
        self.oversized_value_handler = Some(Box::new(handler));
        self
    }

    pub fn with_data_handler(mut self, handler: impl FnMut(usize) + 'static) -> Self {
        self.data_handler = Some(Box::new(handler));
        self
    }

    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    pub fn maximum_buffer_size(&self) -> Option<usize> {
        self.maximum_buffer_size
    }

    /// The maximum that the buffer may actually grow to. When no maximum was configured, this is
    /// large enough that no real input will reach it.
    pub(crate) fn effective_maximum(&self) -> usize {
        self.maximum_buffer_size.unwrap_or(isize::MAX as usize)
    }

    pub(crate) fn validate(&self) -> IonResult<()> {
        if self.initial_buffer_size < 1 {
            return illegal_operation("initial buffer size must be at least 1");
        }
        if let Some(maximum) = self.maximum_buffer_size {
            if maximum < Self::MINIMUM_MAXIMUM_BUFFER_SIZE {
                return illegal_operation(format!(
                    "maximum buffer size must be at least {}",
                    Self::MINIMUM_MAXIMUM_BUFFER_SIZE
                ));
            }
            if maximum < self.initial_buffer_size {
                return illegal_operation(
                    "maximum buffer size must not be smaller than the initial buffer size",
                );
            }
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig::new()
    }
}

impl Debug for BufferConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferConfig")
            .field("initial_buffer_size", &self.initial_buffer_size)
            .field("maximum_buffer_size", &self.maximum_buffer_size)
            .field(
                "oversized_value_handler",
                &self.oversized_value_handler.is_some(),
            )
            .field("data_handler", &self.data_handler.is_some())
            .finish()
    }
}
