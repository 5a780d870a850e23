use crate::types::SymbolId;

/// A field name or annotation as it appears in the binary stream: either a symbol ID or, in
/// Ion 1.1, inline text. Symbol IDs have not been resolved against any symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSymbolTokenRef<'a> {
    SymbolId(SymbolId),
    Text(&'a str),
}

impl<'a> RawSymbolTokenRef<'a> {
    /// Returns `true` if this token matches either the specified symbol ID or text value.
    /// This is useful for comparing tokens that represent system symbol values of an unknown
    /// encoding.
    pub fn matches_sid_or_text(&self, symbol_id: SymbolId, symbol_text: &str) -> bool {
        match self {
            RawSymbolTokenRef::SymbolId(sid) => symbol_id == *sid,
            RawSymbolTokenRef::Text(text) => symbol_text == *text,
        }
    }

    pub fn local_sid(&self) -> Option<SymbolId> {
        match self {
            RawSymbolTokenRef::SymbolId(sid) => Some(*sid),
            RawSymbolTokenRef::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&'a str> {
        match self {
            RawSymbolTokenRef::SymbolId(_) => None,
            RawSymbolTokenRef::Text(text) => Some(text),
        }
    }
}

impl From<SymbolId> for RawSymbolTokenRef<'_> {
    fn from(value: SymbolId) -> Self {
        RawSymbolTokenRef::SymbolId(value)
    }
}

impl<'a> From<&'a str> for RawSymbolTokenRef<'a> {
    fn from(value: &'a str) -> Self {
        RawSymbolTokenRef::Text(value)
    }
}
