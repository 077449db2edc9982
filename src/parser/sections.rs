use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Row;

/// "Payment Terms:" / "Term of Agreement:" style heading lines
static CAPITALIZED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][\w&/'()-]*(?:\s+(?:[A-Z0-9][\w&/'()-]*|of|and|or|the|for|to|in|on|&))*:$")
        .expect("heading pattern is valid")
});

/// Leading list markers: "-", "*", "•", "1.", "2)"
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]\s+|\d{1,3}[.)]\s+)").expect("list marker pattern is valid"));

struct Section {
    title: Option<String>,
    rows: Vec<Row>,
}

/// Rows from headed sections of `Label: value` lines.
///
/// Returns `None` when the text has neither a heading nor a label/value pair.
pub(super) fn parse_section_rows(text: &str) -> Option<Vec<Row>> {
    let mut sections = vec![Section {
        title: None,
        rows: Vec::new(),
    }];
    let mut structured = false;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(title) = heading(line) {
            sections.push(Section {
                title: Some(title),
                rows: Vec::new(),
            });
            structured = true;
            continue;
        }

        let row = match split_pair(line) {
            Some((label, value)) => {
                structured = true;
                Row::new(label, value)
            }
            None => Row::detail(strip_list_marker(line)),
        };
        if let Some(current) = sections.last_mut() {
            current.rows.push(row);
        }
    }

    if !structured {
        return None;
    }

    let titled = sections.iter().filter(|s| s.title.is_some()).count();
    let entries: usize = sections.iter().map(|s| s.rows.len()).sum();

    let mut rows = Vec::with_capacity(entries + titled + 1);
    if titled > 0 {
        rows.push(Row::new(
            "Summary",
            format!("{} sections, {} entries", titled, entries),
        ));
    }
    for section in sections {
        if let Some(title) = section.title {
            rows.push(Row::header(title));
        }
        rows.extend(section.rows);
    }

    Some(rows)
}

/// Heading title if `line` is a `#` heading, a standalone bold span, or "Capitalized Words:".
fn heading(line: &str) -> Option<String> {
    if line.starts_with('#') {
        return clean_title(line.trim_start_matches('#'));
    }

    if let Some(rest) = line.strip_prefix("**") {
        return match rest.find("**") {
            // "**Title**" or "**Title:**" with nothing after the span
            Some(end) if rest[end + 2..].trim().is_empty() => clean_title(&rest[..end]),
            // "**Label:** value" is a pair, not a heading
            Some(_) => None,
            None => clean_title(rest),
        };
    }

    if CAPITALIZED_HEADING.is_match(line) {
        return clean_title(line);
    }

    None
}

fn clean_title(raw: &str) -> Option<String> {
    let title = raw
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(marker) => &line[marker.end()..],
        None => line,
    }
}

/// Split on the first colon into (label, value). A colon followed by `//` is a URL scheme.
fn split_pair(line: &str) -> Option<(String, String)> {
    let line = strip_list_marker(line);
    let colon = line.find(':')?;
    let (label, value) = (&line[..colon], &line[colon + 1..]);

    if value.starts_with("//") {
        return None;
    }

    let label = label.replace("**", "");
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    let value = value.trim().trim_start_matches("**").trim();
    Some((label.to_string(), value.to_string()))
}
