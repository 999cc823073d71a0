use serde::Serialize;
use std::collections::BTreeMap;

/// Key/value pairs reported by one STATUS or RESULT group.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Bundle(BTreeMap<String, String>);

impl Bundle {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bundle {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Accumulates value fragments per key until the group is closed.
///
/// Multi-line values arrive as a first fragment on the tagged line followed by
/// raw continuation lines; `finish` joins them with `\n`.
#[derive(Debug, Default)]
pub(crate) struct BundleBuilder {
    fragments: BTreeMap<String, Vec<String>>,
}

impl BundleBuilder {
    /// Start (or restart) `key` with its first fragment.
    pub(crate) fn start_key(&mut self, key: &str, value: &str) {
        self.fragments
            .insert(key.to_string(), vec![value.to_string()]);
    }

    pub(crate) fn append(&mut self, key: &str, line: &str) {
        self.fragments
            .entry(key.to_string())
            .or_default()
            .push(line.to_string());
    }

    /// Join all fragments and reset the builder to empty.
    pub(crate) fn finish(&mut self) -> Bundle {
        let fragments = std::mem::take(&mut self.fragments);
        Bundle(
            fragments
                .into_iter()
                .map(|(key, parts)| (key, parts.join("\n")))
                .collect(),
        )
    }
}
