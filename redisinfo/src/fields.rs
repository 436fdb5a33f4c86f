use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered string mapping, serialized as a JSON object in insertion order.
///
/// Used for hash values and client records, where the order the store
/// returned the entries in is kept for display.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<(String, String)>,
    /// Position of each name in `entries`.
    index: HashMap<String, usize>,
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Fields {}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. An existing field keeps its position and takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut fields = Fields {
            entries: Vec::with_capacity(lower),
            index: HashMap::with_capacity(lower),
        };
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_keeps_position() {
        let fields: Fields = vec![("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("a"), Some("3"));
        let names: Vec<&str> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_large_hash() {
        let n = 200_000;
        let fields: Fields = (0..n)
            .map(|i| (format!("field:{}", i), i.to_string()))
            .chain(std::iter::once(("field:7".to_string(), "seven".to_string())))
            .collect();

        assert_eq!(fields.len(), n);
        assert_eq!(fields.get("field:7"), Some("seven"));
        assert_eq!(fields.get("field:199999"), Some("199999"));
        assert_eq!(fields.get("field:200000"), None);
        assert_eq!(fields.iter().nth(7), Some(("field:7", "seven")));
        assert_eq!(fields.iter().last(), Some(("field:199999", "199999")));
    }

    #[test]
    fn test_serializes_in_order() {
        let fields: Fields = vec![("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }
}
