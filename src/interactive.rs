//! Menu-driven session for pasting HTML or typing records by hand

use anyhow::Result;
use scraper::Html;
use std::fs;
use std::io::{BufRead, ErrorKind, Write};
use std::path::Path;
use tracing::info;

use crate::availability::Classifier;
use crate::dedup::dedupe;
use crate::extract::{Extractor, PageContext};
use crate::manual::parse_manual_input;
use crate::sink::{save_records, MANUAL_STEM};
use crate::types::Record;

const RULE_WIDTH: usize = 70;
const SAMPLE_SIZE: usize = 3;
const SAMPLE_FIELDS: usize = 5;
const SAMPLE_VALUE_MAX: usize = 100;
pub const FAREWELL: &str = "Goodbye!";

pub struct Session<'a, R, W> {
    input: R,
    out: W,
    extractor: &'a Extractor,
    classifier: &'a Classifier,
    ctx: &'a PageContext,
    output_dir: &'a Path,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(
        input: R,
        out: W,
        extractor: &'a Extractor,
        classifier: &'a Classifier,
        ctx: &'a PageContext,
        output_dir: &'a Path,
    ) -> Self {
        Self {
            input,
            out,
            extractor,
            classifier,
            ctx,
            output_dir,
        }
    }

    /// Loop until the user quits or input runs out
    pub fn run(&mut self) -> Result<()> {
        self.print_header()?;

        loop {
            self.print_menu()?;
            let Some(choice) = self.prompt("Your choice (1-4): ")? else {
                writeln!(self.out, "\n{}", FAREWELL)?;
                break;
            };

            match choice.trim() {
                "1" => {
                    let html = self.read_block("Paste the HTML here:")?;
                    if !html.trim().is_empty() {
                        let records = self.parse_html(&html);
                        self.review(records, "No data extracted. Check the HTML.")?;
                    }
                }
                "2" => {
                    let text = self.read_block("Enter the data (format: Name | Manufacturer | Model):")?;
                    if !text.trim().is_empty() {
                        let records = parse_manual_input(&text);
                        self.review(records, "No data extracted.")?;
                    }
                }
                "3" => {
                    let Some(path) = self.prompt("HTML file path: ")? else {
                        continue;
                    };
                    let path = path.trim();
                    match fs::read_to_string(path) {
                        Ok(html) => {
                            let records = self.parse_html(&html);
                            self.review(records, "No data extracted. Check the file.")?;
                        }
                        Err(e) if e.kind() == ErrorKind::NotFound => {
                            writeln!(self.out, "\nFile not found: {}", path)?;
                        }
                        Err(e) => writeln!(self.out, "\nError reading {}: {}", path, e)?,
                    }
                }
                "4" => {
                    writeln!(self.out, "\n{}", FAREWELL)?;
                    break;
                }
                _ => writeln!(self.out, "\nInvalid choice. Try again.")?,
            }

            writeln!(self.out, "\n{}", "=".repeat(RULE_WIDTH))?;
        }
        Ok(())
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "  Manual subwoofer extractor")?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out)?;
        writeln!(self.out, "Copy the page (or just its <table>) as outer HTML from the")?;
        writeln!(self.out, "browser inspector and paste it, or type records line by line.")?;
        writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out, "\nOPTIONS:")?;
        writeln!(self.out, "  1 - Paste HTML")?;
        writeln!(self.out, "  2 - Manual entry (format: Name | Manufacturer | Model)")?;
        writeln!(self.out, "  3 - Load from an HTML file")?;
        writeln!(self.out, "  4 - Quit")?;
        writeln!(self.out)?;
        Ok(())
    }

    /// One line of input, `None` at end of input
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.out, "{}", message)?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Lines up to an `END` line or end of input
    fn read_block(&mut self, message: &str) -> Result<String> {
        writeln!(self.out, "\n{}", message)?;
        writeln!(self.out, "(Type END on its own line to finish)")?;
        writeln!(self.out)?;
        self.out.flush()?;

        let mut lines = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let content = line.trim_end_matches(['\r', '\n']);
            if content.trim().eq_ignore_ascii_case("END") {
                break;
            }
            lines.push(content.to_string());
        }
        Ok(lines.join("\n"))
    }

    fn parse_html(&self, html: &str) -> Vec<Record> {
        let doc = Html::parse_document(html);
        let records = dedupe(self.extractor.extract(Some(&doc), self.ctx));
        info!(records = records.len(), "Parsed pasted HTML");
        records
    }

    /// Show counts and a sample, then offer to save. When nothing survives
    /// the filter the unfiltered records are shown and saved instead.
    fn review(&mut self, records: Vec<Record>, empty_message: &str) -> Result<()> {
        if records.is_empty() {
            writeln!(self.out, "\n{}", empty_message)?;
            return Ok(());
        }
        writeln!(self.out, "\nRecords extracted: {}", records.len())?;

        let available = self.classifier.filter_available(records.clone());
        writeln!(self.out, "Still available: {}", available.len())?;
        let shown = if available.is_empty() { records } else { available };

        self.display_sample(&shown)?;

        let answer = self.prompt("\nSave results? (y/n): ")?.unwrap_or_default();
        if matches!(answer.trim().to_lowercase().as_str(), "y" | "o") {
            save_records(&shown, self.output_dir, MANUAL_STEM);
        }
        Ok(())
    }

    fn display_sample(&mut self, records: &[Record]) -> Result<()> {
        let count = records.len().min(SAMPLE_SIZE);
        writeln!(self.out, "\nSample (first {}):", count)?;
        for (i, record) in records.iter().take(SAMPLE_SIZE).enumerate() {
            writeln!(self.out, "\n  [{}] {}", i + 1, record.name().unwrap_or("N/A"))?;
            for (key, value) in record.fields().take(SAMPLE_FIELDS) {
                if value.chars().count() < SAMPLE_VALUE_MAX {
                    writeln!(self.out, "      - {}: {}", key, value)?;
                }
            }
        }
        Ok(())
    }
}
