use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use shared::models::TimeSeriesPoint;

use crate::parse::{parse_date, parse_number};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("valid selector"));

/// Collects `date, value` rows from every table whose first row labels a
/// date or time column. The value is read from the column right after it.
pub fn extract(document: &Html) -> Option<Vec<TimeSeriesPoint>> {
    let points: Vec<_> = document
        .select(&TABLE)
        .flat_map(table_points)
        .collect();
    (!points.is_empty()).then_some(points)
}

fn table_points(table: ElementRef<'_>) -> Vec<TimeSeriesPoint> {
    let mut rows = table.select(&ROW);
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let Some(date_column) = header
        .select(&CELL)
        .position(|cell| is_date_label(&cell_text(cell)))
    else {
        return Vec::new();
    };

    rows.filter_map(|row| {
        let cells: Vec<_> = row.select(&CELL).map(cell_text).collect();
        let timestamp = parse_date(cells.get(date_column)?)?;
        let value = parse_number(cells.get(date_column + 1)?)?;
        Some(TimeSeriesPoint::new(timestamp, value))
    })
    .collect()
}

fn is_date_label(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("date") || text.contains("time")
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
