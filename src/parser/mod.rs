pub mod blocks;
pub mod extract;

use blocks::OcrBlock;
use extract::ScanResult;

/// Two-pass pipeline: OCR blocks → lines → card fields.
pub fn process_blocks(blocks: &[OcrBlock]) -> ScanResult {
    let lines = blocks::collect_lines(blocks);
    ScanResult::from_lines(lines)
}
