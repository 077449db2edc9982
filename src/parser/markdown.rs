use crate::models::Row;

/// Rows from a two-column markdown table.
///
/// Needs at least three piped lines. Separator lines are dropped, the first two
/// non-empty cells of every other line become a row, and lines with fewer than
/// two cells are skipped.
pub(super) fn parse_table_rows(text: &str) -> Option<Vec<Row>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains('|'))
        .collect();

    if lines.len() < 3 {
        return None;
    }

    let rows: Vec<Row> = lines
        .into_iter()
        .filter(|line| !is_separator(line))
        .filter_map(|line| {
            let mut cells = line.split('|').map(str::trim).filter(|cell| !cell.is_empty());
            match (cells.next(), cells.next()) {
                (Some(label), Some(value)) => Some(Row::new(label, value)),
                _ => None,
            }
        })
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(rows)
    }
}

/// `|---|:---:|` style header separator
fn is_separator(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}
