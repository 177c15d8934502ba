//! String Table
//!
//! Append-only interning of repeated literals: tag and attribute names,
//! namespaces, enum keywords, attribute values. The wire transmits each
//! string once; afterwards both sides refer to it by index.

use std::collections::HashMap;

/// Index of an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    /// Position in the table, which is also the wire index.
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Wire value under the reserved-zero convention: `0` = absent,
    /// `N` = the string at index `N - 1`.
    pub const fn value_field(self) -> u32 {
        self.0 + 1
    }
}

/// Wire value for an optional value-bearing field (`0` = absent/removed).
pub(crate) fn value_or_zero(id: Option<StringId>) -> u32 {
    id.map(StringId::value_field).unwrap_or(0)
}

/// Append-only, deduplicated string store shared by the mirrored tree and
/// the encoder. Indices are stable for the lifetime of the document; the
/// delta transmitted per flush is only the suffix appended since the
/// previous flush.
#[derive(Debug, Default)]
pub struct StringTable {
    values: Vec<String>,
    lookup: HashMap<String, u32>,
    /// Everything below this index has already crossed the channel.
    flushed: usize,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its stable index. Idempotent: interning
    /// the same literal twice never appends a second entry.
    pub fn intern(&mut self, value: &str) -> StringId {
        if let Some(&index) = self.lookup.get(value) {
            return StringId(index);
        }
        let index = self.values.len() as u32;
        self.values.push(value.to_string());
        self.lookup.insert(value.to_string(), index);
        StringId(index)
    }

    /// Look up a string without interning it.
    pub fn lookup(&self, value: &str) -> Option<StringId> {
        self.lookup.get(value).map(|&index| StringId(index))
    }

    /// The string at an index. Ids only come from this table, so a miss
    /// means a cross-document mixup; an empty string keeps the read path
    /// total.
    pub fn resolve(&self, id: StringId) -> &str {
        self.values.get(id.0 as usize).map(String::as_str).unwrap_or("")
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Strings appended since the last take. Consuming the delta marks the
    /// suffix as transmitted.
    pub fn take_delta(&mut self) -> Vec<String> {
        let delta = self.values[self.flushed..].to_vec();
        self.flushed = self.values.len();
        delta
    }

    /// Length of the suffix a flush would transmit right now.
    pub fn pending(&self) -> usize {
        self.values.len() - self.flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut table = StringTable::new();
        let a = table.intern("div");
        let b = table.intern("div");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_indices_are_positions() {
        let mut table = StringTable::new();
        assert_eq!(table.intern("one").index(), 0);
        assert_eq!(table.intern("two").index(), 1);
        assert_eq!(table.intern("one").index(), 0);
    }

    #[test]
    fn test_delta_is_suffix_only() {
        let mut table = StringTable::new();
        table.intern("a");
        table.intern("b");
        assert_eq!(table.take_delta(), vec!["a".to_string(), "b".to_string()]);

        table.intern("b"); // already transmitted, must not reappear
        table.intern("c");
        assert_eq!(table.take_delta(), vec!["c".to_string()]);
        assert_eq!(table.take_delta(), Vec::<String>::new());
    }

    #[test]
    fn test_resolve() {
        let mut table = StringTable::new();
        let id = table.intern("class");
        assert_eq!(table.resolve(id), "class");
    }

    #[test]
    fn test_value_field_convention() {
        let mut table = StringTable::new();
        let first = table.intern("x");
        assert_eq!(first.index(), 0);
        assert_eq!(first.value_field(), 1);
        assert_eq!(value_or_zero(None), 0);
        assert_eq!(value_or_zero(Some(first)), 1);
    }
}
