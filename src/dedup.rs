use std::collections::HashSet;

use crate::types::Record;

/// Keep the first record for each identity key, in first-seen order.
///
/// Records with an empty identity (no `name`, no link) never match each
/// other and are all kept.
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<String> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let identity = record.identity_key();
            identity.is_empty() || seen.insert(identity)
        })
        .collect()
}
