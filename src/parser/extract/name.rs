use std::sync::LazyLock;

use regex::Regex;

/// Substrings marking rules text, attack names and card furniture rather
/// than the card's name. Compared against the lowercased line.
const SKIP_WORDS: &[&str] = &[
    "evolves",
    "stage",
    "hp",
    "pokémon",
    "power:",
    "weakness",
    "resistance",
    "retreat",
    "illus",
    "does nothing",
    "fire spin",
    "energy burn",
];

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());
static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+*/#]").unwrap());

/// First line that looks like a card name. Earlier lines win.
pub fn extract(lines: &[String]) -> Option<String> {
    lines.iter().find(|l| is_name_candidate(l)).cloned()
}

fn is_name_candidate(line: &str) -> bool {
    let clean = line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let lower = clean.to_lowercase();

    if SKIP_WORDS.iter().any(|w| lower.contains(w)) {
        return false;
    }

    // UTF-16 code units: astral chars such as emoji count twice
    let len = clean.encode_utf16().count();
    if len <= 2 || len >= 20 {
        return false;
    }

    if !clean.starts_with(|c: char| c.is_ascii_uppercase()) {
        return false;
    }

    !DIGITS_RE.is_match(clean) && !SYMBOL_RE.is_match(clean)
}
