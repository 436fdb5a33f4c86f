use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Metrics of a single INFO section, metric name to raw value.
pub type Section = BTreeMap<String, String>;

const SECTION_PREFIX: &str = "# ";
const KEY_COUNT_FIELD: &str = "keyCount";

/// The INFO report split into sections.
///
/// Serializes as `{ "<section>": { "<metric>": "<value>" }, ..., "keyCount": n }`,
/// the `keyCount` entry only being present once a count was injected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInfo {
    sections: BTreeMap<String, Section>,
    key_count: Option<usize>,
}

impl ParsedInfo {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Look up a single metric value.
    pub fn get(&self, section: &str, metric: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(metric))
            .map(String::as_str)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn key_count(&self) -> Option<usize> {
        self.key_count
    }

    pub fn set_key_count(&mut self, count: usize) {
        self.key_count = Some(count);
    }

    pub fn with_key_count(mut self, count: usize) -> Self {
        self.set_key_count(count);
        self
    }
}

impl Serialize for ParsedInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.sections.len() + usize::from(self.key_count.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, section) in &self.sections {
            map.serialize_entry(name, section)?;
        }
        if let Some(count) = self.key_count {
            map.serialize_entry(KEY_COUNT_FIELD, &count)?;
        }
        map.end()
    }
}

/// Parse the text returned by `INFO`.
///
/// Header lines (`# Name`) open a section, `key:value` lines are added to the
/// open section, split on the first colon only so values such as timestamps
/// stay whole. A header without a name is recorded as an empty section but
/// does not open it: metric lines after it are skipped until the next header.
/// Anything before the first header, and any line without a colon, is ignored.
pub fn parse_info(text: &str) -> ParsedInfo {
    let mut parsed = ParsedInfo::default();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if let Some(name) = line.strip_prefix(SECTION_PREFIX) {
            parsed.sections.insert(name.to_string(), Section::new());
            current = if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            };
            continue;
        }

        let Some(section) = current.as_ref() else {
            continue;
        };
        if let Some((key, value)) = line.split_once(':') {
            if let Some(metrics) = parsed.sections.get_mut(section) {
                metrics.insert(key.to_string(), value.to_string());
            }
        }
    }

    parsed
}
