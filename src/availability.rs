//! Available / discontinued classification from free-text field values

use crate::types::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Discontinued,
}

/// Flags a record as discontinued when any field value contains a
/// discontinuation keyword, case-insensitively.
///
/// A record with no status information at all counts as available. That is
/// a known source of false positives and is kept deliberately.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
}

impl Classifier {
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// First keyword found in any field value
    pub fn matched_keyword(&self, record: &Record) -> Option<&str> {
        record.values().find_map(|value| {
            let lower = value.to_lowercase();
            self.keywords
                .iter()
                .find(|keyword| lower.contains(keyword.as_str()))
                .map(String::as_str)
        })
    }

    pub fn classify(&self, record: &Record) -> Availability {
        match self.matched_keyword(record) {
            Some(_) => Availability::Discontinued,
            None => Availability::Available,
        }
    }

    pub fn is_available(&self, record: &Record) -> bool {
        self.classify(record) == Availability::Available
    }

    /// Keep only available records, in order
    pub fn filter_available(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| {
                let keep = self.is_available(record);
                if !keep {
                    tracing::debug!(
                        name = record.name().unwrap_or(""),
                        keyword = self.matched_keyword(record).unwrap_or(""),
                        "Dropping discontinued record"
                    );
                }
                keep
            })
            .collect()
    }
}
