use std::sync::LazyLock;

use regex::Regex;

// ASCII word boundaries: a year glued to CJK text ("1999年") still counts
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)(19|20)[0-9]{2}(?-u:\b)").unwrap());
static CARD_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+/[0-9]+").unwrap());

/// Date/copyright text for a card.
///
/// Cards print the illustrator credit just above the copyright and set
/// number, so when an `illus` line exists it anchors a window of up to three
/// lines. The copyright fallback is only consulted when there is no credit
/// line at all; a credit line with nothing usable after it still wins.
pub fn extract(lines: &[String]) -> Option<String> {
    match lines
        .iter()
        .position(|l| l.to_lowercase().contains("illus"))
    {
        Some(idx) => Some(credit_window(lines, idx)),
        None => lines.iter().find(|l| is_copyright_line(l)).cloned(),
    }
}

fn credit_window(lines: &[String], idx: usize) -> String {
    let mut parts = vec![lines[idx].as_str()];

    // Year/copyright directly under the credit
    if let Some(next) = lines.get(idx + 1) {
        if YEAR_RE.is_match(next) || next.contains('©') {
            parts.push(next);
        }
    }

    // Set number two lines down, checked whether or not the year matched
    if let Some(card) = lines.get(idx + 2) {
        if card.contains('/') || card.contains('*') || CARD_NUMBER_RE.is_match(card) {
            parts.push(card);
        }
    }

    parts.join(" ")
}

fn is_copyright_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains('©') || lower.contains("copyright") || YEAR_RE.is_match(line)
}
