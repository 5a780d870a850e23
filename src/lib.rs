//! An incremental, resumable cursor over binary [Amazon Ion](https://amazon-ion.github.io/ion-docs/)
//! streams.
//!
//! [`BinaryCursor`] reports the structure of an Ion 1.0 or Ion 1.1 binary stream as a series of
//! [`Event`]s without materializing values. It can read from a fixed byte array or from any
//! [`std::io::Read`]; when a reader runs dry, operations return [`Event::NeedsData`] and can be
//! repeated once more data is available.

pub mod result;

pub mod binary;
mod buffer_config;
mod position;
mod raw_symbol_token_ref;
pub mod types;

pub use binary::non_blocking::argument_group::PrimitiveEncoding;
pub use binary::non_blocking::cursor::{BinaryCursor, Event};
pub use binary::non_blocking::marker::Marker;
pub use binary::non_blocking::symbol_tokens::Annotations;
pub use binary::IonVersion;
pub use buffer_config::{BufferConfig, OversizedValue, OversizedValueAction};
pub use position::Position;
pub use raw_symbol_token_ref::RawSymbolTokenRef;
pub use result::{IonError, IonResult};
pub use types::{IonType, SymbolId};
