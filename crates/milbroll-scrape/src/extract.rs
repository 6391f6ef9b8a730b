// Game-log "Total" row extraction.
//
// The player game-log page renders one `<tr>` per game plus a synthetic
// summary row whose Date cell reads "Total". Every cell carries its column
// key in a `data-stat` attribute.

use std::sync::LazyLock;

use milbroll_core::model::{RowKind, StatRow};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

const DATE_KEY: &str = "Date";
const DIVIDER_KEY: &str = "divider";
const TOTAL_MARKER: &str = "Total";

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("static row selector is valid"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("static cell selector is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Total row not found ({kind})")]
    TotalRowMissing { kind: RowKind },
}

/// Cell text with each text node trimmed and the pieces joined.
fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

/// Only the row's first Date cell is consulted.
fn is_total_row(row: &ElementRef<'_>) -> bool {
    row.select(&CELL)
        .find(|cell| cell.value().attr("data-stat") == Some(DATE_KEY))
        .is_some_and(|cell| cell_text(&cell) == TOTAL_MARKER)
}

/// Extract the "Total" row of a game-log page as column → raw text.
///
/// Cells without a `data-stat` key, the `divider` placeholder, and the Date
/// cell holding the marker are skipped. The first matching row wins.
pub fn extract_total_row(html: &str, kind: RowKind) -> Result<StatRow, ExtractError> {
    let document = Html::parse_document(html);

    let row = document
        .select(&ROW)
        .find(is_total_row)
        .ok_or(ExtractError::TotalRowMissing { kind })?;

    let mut stats = StatRow::new();
    for cell in row.select(&CELL) {
        let Some(key) = cell.value().attr("data-stat") else {
            continue;
        };
        if key.is_empty() || key == DIVIDER_KEY || key == DATE_KEY {
            continue;
        }
        stats.insert(key, cell_text(&cell));
    }
    Ok(stats)
}
