//! Tagged metadata values with defensive numeric accessors.
//!
//! EXIF-style metadata is loosely typed: the same field may arrive as a
//! number, a space-separated string ("64 64 64 64"), or a list. The
//! tagged union keeps that mess in one place instead of scattering
//! string-splitting through calibration logic.

use std::collections::BTreeMap;

/// A single metadata field value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// A plain numeric value.
    Number(f64),
    /// A free-form string, possibly holding space-separated numbers.
    Text(String),
    /// A list of numeric values (e.g. per-channel levels).
    List(Vec<f64>),
}

impl MetaValue {
    /// Interprets the value as a single number.
    ///
    /// Text values are split on whitespace and the first token parsed;
    /// lists yield their first element. Returns `None` when nothing
    /// parses, so callers can fall through to the next source.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            MetaValue::Text(s) => s.split_whitespace().next()?.parse().ok(),
            MetaValue::List(values) => values.first().copied(),
        }
    }

    /// Returns the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Number(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

/// A flat map of dotted-namespace metadata keys to values.
///
/// Absent keys are simply missing from the map, never null placeholders.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    values: BTreeMap<String, MetaValue>,
}

impl Metadata {
    /// Creates an empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.values.get(key)
    }

    /// Returns the first key (in the given order) that parses as a number.
    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .find_map(|key| self.values.get(*key).and_then(MetaValue::as_number))
    }

    /// Returns the first key (in the given order) holding text.
    pub fn text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.values.get(*key).and_then(MetaValue::as_text))
    }

    /// Returns the number of fields present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no fields are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_passthrough() {
        assert_eq!(MetaValue::Number(64.0).as_number(), Some(64.0));
    }

    #[test]
    fn test_text_first_token() {
        let value = MetaValue::Text("64 64 64 64".to_string());
        assert_eq!(value.as_number(), Some(64.0));
    }

    #[test]
    fn test_unparsable_text_is_none() {
        let value = MetaValue::Text("n/a".to_string());
        assert_eq!(value.as_number(), None);
    }

    #[test]
    fn test_list_first_element() {
        let value = MetaValue::List(vec![512.0, 512.0]);
        assert_eq!(value.as_number(), Some(512.0));
    }

    #[test]
    fn test_metadata_fallback_order() {
        let mut meta = Metadata::new();
        meta.insert("SubIFD.WhiteLevel", 16383.0);
        // First listed key missing: falls through to the second
        assert_eq!(
            meta.number(&["EXIF.WhiteLevel", "SubIFD.WhiteLevel"]),
            Some(16383.0)
        );
        assert_eq!(meta.number(&["EXIF.Nonexistent"]), None);
    }
}
