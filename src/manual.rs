//! Records typed or pasted by hand, one per line

use crate::types::{Record, NAME};

const POSITIONAL: [&str; 3] = [NAME, "manufacturer", "model"];

/// Parse `Name | Manufacturer | Model | ...` lines.
///
/// `|` is preferred over tab as delimiter. Fields past the third become
/// `field_<n>` (n being the zero-based position). A line without delimiter is
/// a bare name. Blank lines are ignored.
pub fn parse_manual_input(text: &str) -> Vec<Record> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<Record> {
    let separator = if line.contains('|') {
        '|'
    } else if line.contains('\t') {
        '\t'
    } else {
        let mut record = Record::new();
        record.insert(NAME, line);
        return Some(record);
    };

    let mut record = Record::new();
    for (i, part) in line.split(separator).map(str::trim).enumerate() {
        match POSITIONAL.get(i) {
            Some(key) => record.insert(*key, part),
            None => record.insert(format!("field_{}", i), part),
        }
    }
    record.has_content().then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_line() {
        let records = parse_manual_input("Alpha | Acme | A10");
        assert_eq!(records.len(), 1);
        let fields: Vec<_> = records[0].fields().collect();
        assert_eq!(
            fields,
            vec![("name", "Alpha"), ("manufacturer", "Acme"), ("model", "A10")]
        );
    }

    #[test]
    fn test_extra_fields_and_tabs() {
        let records = parse_manual_input("Beta\tBolt\tB12\t12\"\t400 W\n\n  Gamma  \n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("model"), Some("B12"));
        assert_eq!(records[0].get("field_3"), Some("12\""));
        assert_eq!(records[0].get("field_4"), Some("400 W"));
        let bare: Vec<_> = records[1].fields().collect();
        assert_eq!(bare, vec![("name", "Gamma")]);
    }

    #[test]
    fn test_pipe_wins_over_tab() {
        let records = parse_manual_input("Alpha\tA | Acme");
        assert_eq!(records[0].name(), Some("Alpha\tA"));
        assert_eq!(records[0].get("manufacturer"), Some("Acme"));
    }

    #[test]
    fn test_short_and_empty_lines() {
        let records = parse_manual_input("Alpha |\n | \n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), Some("Alpha"));
        assert_eq!(records[0].get("manufacturer"), Some(""));
        assert!(parse_manual_input("").is_empty());
    }
}
