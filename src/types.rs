//! Record type shared by every extraction strategy and sink

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "name";
pub const URL: &str = "url";
pub const DETAIL_URL: &str = "detail_url";
pub const FULL_TEXT: &str = "full_text";

/// One candidate product, as a flat field-name to value mapping.
///
/// The field set is not fixed: table rows carry whatever headers the table
/// had, cards carry `name`/`url`/`full_text` plus any auxiliary fields found.
/// Fields keep their insertion order for display and export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert or overwrite a field. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copy every field of `other` into this record, `other` winning on conflicts
    pub fn merge(&mut self, other: Record) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME)
    }

    /// The record's own link: `url`, else `detail_url`
    pub fn link(&self) -> Option<&str> {
        self.get(URL).or_else(|| self.get(DETAIL_URL))
    }

    /// Best page to fetch for more detail about this record.
    ///
    /// Table rows have no reserved link key, so the first `<column>_url`
    /// companion is used for them.
    pub fn detail_link(&self) -> Option<&str> {
        self.get(DETAIL_URL)
            .or_else(|| self.get(URL))
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(key, _)| key.ends_with("_url"))
                    .map(|(_, value)| value.as_str())
            })
            .filter(|link| !link.is_empty())
    }

    /// `name` followed by `url`/`detail_url`, each empty when missing
    pub fn identity_key(&self) -> String {
        format!("{}{}", self.name().unwrap_or(""), self.link().unwrap_or(""))
    }

    /// True if at least one field has a non-empty value
    pub fn has_content(&self) -> bool {
        self.0.values().any(|value| !value.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
