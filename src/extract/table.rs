//! Records from `<table>` markup, one per data row, keyed by inferred headers

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use super::text::{element_text, link_href};
use super::{PageContext, Strategy};
use crate::types::Record;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

pub struct TableStrategy;

impl Strategy for TableStrategy {
    fn name(&self) -> &'static str {
        "table"
    }

    fn extract(&self, doc: &Html, ctx: &PageContext) -> Vec<Record> {
        let mut records = Vec::new();
        for (idx, table) in doc.select(&TABLE_SEL).enumerate() {
            let rows = extract_table(table, ctx);
            debug!(table = idx + 1, rows = rows.len(), "Parsed table");
            records.extend(rows);
        }
        records
    }
}

/// Parse one table. The header row is the first row of `<thead>` if the
/// table has one, else its first row; every other row becomes a record.
pub fn extract_table(table: ElementRef, ctx: &PageContext) -> Vec<Record> {
    // (row, inside thead) for rows owned by this table, not by nested tables
    let rows: Vec<(ElementRef, bool)> = table
        .select(&ROW_SEL)
        .filter_map(|row| row_placement(row, table).map(|in_head| (row, in_head)))
        .collect();

    let Some(&(first_row, _)) = rows.first() else {
        return Vec::new();
    };

    let has_head = rows.iter().any(|&(_, in_head)| in_head);
    let (header_row, data_rows): (ElementRef, Vec<ElementRef>) = if has_head {
        let header = rows
            .iter()
            .find(|&&(_, in_head)| in_head)
            .map(|&(row, _)| row)
            .unwrap_or(first_row);
        let body = rows
            .iter()
            .filter(|&&(_, in_head)| !in_head)
            .map(|&(row, _)| row)
            .collect();
        (header, body)
    } else {
        (first_row, rows.iter().skip(1).map(|&(row, _)| row).collect())
    };

    let headers = header_list(header_row);
    debug!(?headers, "Inferred table headers");

    data_rows
        .into_iter()
        .filter_map(|row| parse_row(row, &headers, ctx))
        .collect()
}

/// Header cell texts in column order
pub fn header_list(row: ElementRef) -> Vec<String> {
    cells(row).map(element_text).collect()
}

/// Cells are matched to headers by position. Cells past the header list, or
/// under a blank header, get a `column_<i>` key. Missing cells are just absent.
fn parse_row(row: ElementRef, headers: &[String], ctx: &PageContext) -> Option<Record> {
    let mut record = Record::new();
    for (i, cell) in cells(row).enumerate() {
        let key = match headers.get(i) {
            Some(header) if !header.is_empty() => header.clone(),
            _ => format!("column_{}", i),
        };
        let link = link_href(cell).map(|href| ctx.resolve(href));
        record.insert(key.clone(), element_text(cell));
        if let Some(link) = link {
            record.insert(format!("{}_url", key), link);
        }
    }
    record.has_content().then_some(record)
}

fn cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
}

/// `Some(in_thead)` if the closest enclosing table of `row` is `table`
fn row_placement(row: ElementRef, table: ElementRef) -> Option<bool> {
    let mut in_head = false;
    for ancestor in row.ancestors().filter_map(ElementRef::wrap) {
        match ancestor.value().name() {
            "thead" => in_head = true,
            "table" => return (ancestor.id() == table.id()).then_some(in_head),
            _ => {}
        }
    }
    None
}
