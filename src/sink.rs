//! JSON and CSV export of record sequences

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::types::Record;
use crate::utils::osc8_file_link;

pub const AVAILABLE_STEM: &str = "subwoofers_available";
pub const ALL_STEM: &str = "subwoofers_all";
pub const MANUAL_STEM: &str = "subwoofers_manual";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    NothingToSave,
    Saved(Vec<PathBuf>),
}

/// Pretty-printed JSON array, non-ASCII kept as-is
pub fn save_json(records: &[Record], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Vec<Record>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Header is the sorted union of all keys; missing fields are left empty
pub fn save_csv(records: &[Record], path: &Path) -> Result<()> {
    let columns: BTreeSet<&str> = records.iter().flat_map(|r| r.keys()).collect();

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|col| record.get(col).unwrap_or("")))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn save_with(
    records: &[Record],
    path: PathBuf,
    save: fn(&[Record], &Path) -> Result<()>,
    saved: &mut Vec<PathBuf>,
) {
    match save(records, &path) {
        Ok(()) => {
            let shown = path.display().to_string();
            println!("Saved {} records to {}", records.len(), osc8_file_link(&path, &shown));
            saved.push(path);
        }
        Err(e) => eprintln!("Error saving {}: {:#}", path.display(), e),
    }
}

/// Write `<stem>.json` and `<stem>.csv` under `dir`.
///
/// An empty sequence writes nothing. A failing file is reported and skipped;
/// the other one is still written.
pub fn save_records(records: &[Record], dir: &Path, stem: &str) -> SaveOutcome {
    if records.is_empty() {
        println!("Nothing to save.");
        return SaveOutcome::NothingToSave;
    }
    let mut saved = Vec::new();
    save_with(records, dir.join(format!("{}.json", stem)), save_json, &mut saved);
    save_with(records, dir.join(format!("{}.csv", stem)), save_csv, &mut saved);
    SaveOutcome::Saved(saved)
}

/// JSON only, for the unfiltered result
pub fn save_records_json(records: &[Record], dir: &Path, stem: &str) -> SaveOutcome {
    if records.is_empty() {
        println!("Nothing to save.");
        return SaveOutcome::NothingToSave;
    }
    let mut saved = Vec::new();
    save_with(records, dir.join(format!("{}.json", stem)), save_json, &mut saved);
    SaveOutcome::Saved(saved)
}
