pub mod date;
pub mod name;

use serde::Serialize;

/// Placeholder written for a field the heuristics could not find.
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFields {
    pub name: Option<String>,
    pub date: Option<String>,
}

/// What one scanned image yields: best-guess fields plus the lines they
/// were picked from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub name: String,
    pub date: String,
    pub lines: Vec<String>,
}

impl ScanResult {
    pub fn from_lines(lines: Vec<String>) -> Self {
        let fields = extract_all(&lines);
        ScanResult {
            name: fields.name.unwrap_or_else(|| NOT_FOUND.to_string()),
            date: fields.date.unwrap_or_else(|| NOT_FOUND.to_string()),
            lines,
        }
    }
}

pub fn extract_all(lines: &[String]) -> CardFields {
    CardFields {
        name: name::extract(lines),
        date: date::extract(lines),
    }
}

// ── Tests ──
