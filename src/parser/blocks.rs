use anyhow::{Context, Result};
use serde::Deserialize;

/// Block categories reported by the OCR service. Only `Line` carries text
/// the classifier looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Page,
    Line,
    Word,
    Other(String),
}

impl BlockKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PAGE" => BlockKind::Page,
            "LINE" => BlockKind::Line,
            "WORD" => BlockKind::Word,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrBlock {
    pub kind: BlockKind,
    pub text: Option<String>,
}

impl OcrBlock {
    pub fn line(text: impl Into<String>) -> Self {
        OcrBlock {
            kind: BlockKind::Line,
            text: Some(text.into()),
        }
    }
}

// Saved `DetectDocumentText` response, as written by `aws textract` or the SDKs.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SavedResponse {
    #[serde(default)]
    blocks: Vec<SavedBlock>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SavedBlock {
    block_type: Option<String>,
    text: Option<String>,
}

/// Parse a saved Textract JSON response into blocks, preserving order.
pub fn parse_textract_json(json: &str) -> Result<Vec<OcrBlock>> {
    let response: SavedResponse =
        serde_json::from_str(json).context("Invalid Textract response JSON")?;

    Ok(response
        .blocks
        .into_iter()
        .map(|b| OcrBlock {
            kind: BlockKind::from_tag(b.block_type.as_deref().unwrap_or_default()),
            text: b.text,
        })
        .collect())
}

/// Plain text transcript: every row is one recognized line.
pub fn parse_plain_lines(text: &str) -> Vec<OcrBlock> {
    text.lines().map(OcrBlock::line).collect()
}

/// Text of the LINE blocks in reading order. Blocks without text and empty
/// strings are dropped; everything else is kept verbatim.
pub fn collect_lines(blocks: &[OcrBlock]) -> Vec<String> {
    blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Line)
        .filter_map(|b| b.text.as_deref())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charizard_lines_only() {
        let json = std::fs::read_to_string("tests/fixtures/charizard.json").unwrap();
        let blocks = parse_textract_json(&json).unwrap();
        assert_eq!(blocks[0].kind, BlockKind::Page);

        let lines = collect_lines(&blocks);
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "Stage 2");
        assert_eq!(lines[2], "Charizard");
        // WORD block duplicating "Charizard" is not a line
        assert_eq!(lines.iter().filter(|l| *l == "Charizard").count(), 1);
        assert_eq!(lines.last().map(String::as_str), Some("4/102 *"));
    }

    #[test]
    fn empty_and_missing_text_dropped() {
        let blocks = vec![
            OcrBlock::line("Mew"),
            OcrBlock::line(""),
            OcrBlock {
                kind: BlockKind::Line,
                text: None,
            },
            OcrBlock::line(" "),
        ];
        assert_eq!(collect_lines(&blocks), vec!["Mew", " "]);
    }

    #[test]
    fn unknown_block_types_kept_as_other() {
        let json = r#"{"Blocks":[{"BlockType":"KEY_VALUE_SET"},{"BlockType":"LINE","Text":"Onix"}]}"#;
        let blocks = parse_textract_json(json).unwrap();
        assert_eq!(blocks[0].kind, BlockKind::Other("KEY_VALUE_SET".into()));
        assert_eq!(collect_lines(&blocks), vec!["Onix"]);
    }

    #[test]
    fn response_without_blocks() {
        let blocks = parse_textract_json(r#"{"DocumentMetadata":{"Pages":1}}"#).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(parse_textract_json("{\"Blocks\": [").is_err());
    }

    #[test]
    fn plain_transcript_keeps_row_order() {
        let lines = collect_lines(&parse_plain_lines("Scyther\n\n70 HP\n"));
        assert_eq!(lines, vec!["Scyther", "70 HP"]);
    }
}
