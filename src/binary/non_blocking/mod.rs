//! A cursor that reads binary Ion incrementally. Every operation either completes or reports
//! that it needs more data; in the latter case it can be retried once the input has more to
//! offer, without losing any progress.

pub mod argument_group;
pub(crate) mod binary_buffer;
pub(crate) mod byte_source;
pub mod cursor;
pub(crate) mod delimited_scan;
pub(crate) mod header;
pub mod marker;
pub mod symbol_tokens;
