//! Result formatting for the `score` command.

use anyhow::Result;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use lofstream_core::LofScore;
use serde::Serialize;
use std::io::Write;

use crate::import::Record;

/// LOF values at or above this are highlighted in tables.
const HIGHLIGHT_LOF: f64 = 1.5;

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub id: u64,
    pub line: u64,
    pub label: String,
    pub lof: f64,
}

/// Joins scores with their input records.
///
/// Without `top`, rows keep input order. With `top`, the `top` highest
/// scores are returned in descending order, ties by id.
pub fn rank(records: &[Record], scores: &[LofScore], top: Option<usize>) -> Vec<ScoredRecord> {
    let mut rows: Vec<ScoredRecord> = scores
        .iter()
        .filter_map(|score| {
            let record = usize::try_from(score.id).ok().and_then(|i| records.get(i))?;
            Some(ScoredRecord {
                id: score.id,
                line: record.line,
                label: record.label.clone(),
                lof: score.lof,
            })
        })
        .collect();

    if let Some(top) = top {
        rows.sort_by(|a, b| b.lof.total_cmp(&a.lof).then(a.id.cmp(&b.id)));
        rows.truncate(top);
    }
    rows
}

/// Builds a formatted table.
pub fn render_table(rows: &[ScoredRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = ["id", "line", "label", "lof"]
        .iter()
        .map(|c| Cell::new(c).fg(Color::Cyan))
        .collect();
    table.set_header(header);

    for row in rows {
        let label = if row.label.is_empty() {
            "-".to_string()
        } else {
            row.label.clone()
        };
        let mut lof = Cell::new(format!("{:.6}", row.lof)).set_alignment(CellAlignment::Right);
        if row.lof >= HIGHLIGHT_LOF {
            lof = lof.fg(Color::Red);
        }
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(row.line),
            Cell::new(label),
            lof,
        ]);
    }
    table
}

/// Writes rows as a pretty-printed JSON array.
///
/// JSON has no infinity; infinite scores are written as `null`.
pub fn write_json<W: Write>(mut out: W, rows: &[ScoredRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, rows)?;
    writeln!(out)?;
    Ok(())
}

/// Writes rows as CSV with a header line.
pub fn write_csv<W: Write>(out: W, rows: &[ScoredRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
