use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ocr::OcrEngine;
use crate::parser::blocks::{self, OcrBlock};
use crate::parser::extract::ScanResult;
use crate::upload;

/// One input file and what came of it.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub file: String,
    pub scanned_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Scanned(ScanResult),
    Failed { error: String },
}

impl ScanReport {
    fn new(path: &Path, outcome: Result<ScanResult>) -> Self {
        let outcome = match outcome {
            Ok(result) => Outcome::Scanned(result),
            Err(e) => {
                warn!("{}: {:#}", path.display(), e);
                Outcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        };
        ScanReport {
            file: path.display().to_string(),
            scanned_at: Utc::now(),
            outcome,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// OCR each image in turn. A failing image is reported and the batch goes on.
pub async fn scan_images<E: OcrEngine>(engine: &E, paths: &[PathBuf]) -> Result<Vec<ScanReport>> {
    if paths.is_empty() {
        bail!("No cards to scan!");
    }

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let outcome = scan_one(engine, path).await;
        reports.push(ScanReport::new(path, outcome));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let failed = reports.iter().filter(|r| r.is_failed()).count();
    info!(
        "Scanned {} images ({} ok, {} errors)",
        reports.len(),
        reports.len() - failed,
        failed
    );
    Ok(reports)
}

async fn scan_one<E: OcrEngine>(engine: &E, path: &Path) -> Result<ScanResult> {
    let image = upload::load(path).await?;
    info!(
        "Received {} ({:?}, {} bytes)",
        image.file_name,
        image.format,
        image.bytes.len()
    );

    let blocks = engine
        .detect_blocks(&image.bytes)
        .await
        .with_context(|| format!("OCR failed for {}", image.file_name))?;

    let result = crate::parser::process_blocks(&blocks);
    debug!(
        "{}: {} lines, name={:?}, date={:?}",
        image.file_name,
        result.lines.len(),
        result.name,
        result.date
    );
    Ok(result)
}

/// Classify saved OCR output without calling the service. Files are read
/// first, then classified in parallel.
pub fn classify_files(paths: &[PathBuf]) -> Result<Vec<ScanReport>> {
    if paths.is_empty() {
        bail!("No OCR files to classify");
    }

    let loaded: Vec<(&PathBuf, Result<Vec<OcrBlock>>)> =
        paths.iter().map(|p| (p, read_blocks(p))).collect();

    let reports: Vec<ScanReport> = loaded
        .into_par_iter()
        .map(|(path, blocks)| {
            let outcome = blocks.map(|b| crate::parser::process_blocks(&b));
            ScanReport::new(path, outcome)
        })
        .collect();

    info!("Classified {} files", reports.len());
    Ok(reports)
}

/// `.json` is a saved Textract response, anything else a plain transcript.
fn read_blocks(path: &Path) -> Result<Vec<OcrBlock>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        blocks::parse_textract_json(&raw).with_context(|| format!("In {}", path.display()))
    } else {
        Ok(blocks::parse_plain_lines(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::NOT_FOUND;
    use anyhow::anyhow;
    use std::cell::Cell;

    /// Returns canned lines; fails on the n-th call if asked to.
    struct FakeEngine {
        lines: Vec<&'static str>,
        fail_on: Option<usize>,
        calls: Cell<usize>,
    }

    impl FakeEngine {
        fn new(lines: Vec<&'static str>) -> Self {
            FakeEngine {
                lines,
                fail_on: None,
                calls: Cell::new(0),
            }
        }
    }

    impl OcrEngine for FakeEngine {
        async fn detect_blocks(&self, _image: &[u8]) -> Result<Vec<OcrBlock>> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if self.fail_on == Some(n) {
                return Err(anyhow!("ThrottlingException"));
            }
            Ok(self.lines.iter().map(|l| OcrBlock::line(*l)).collect())
        }
    }

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(format!("tests/fixtures/{}", name))
    }

    #[tokio::test]
    async fn empty_batch_rejected() {
        let engine = FakeEngine::new(vec![]);
        let err = scan_images(&engine, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "No cards to scan!");
    }

    #[tokio::test]
    async fn scans_in_order() {
        let engine = FakeEngine::new(vec!["HP 60", "Pikachu", "Illus. Ken Sugimori", "1999 Wizards", "4/102"]);
        let paths = vec![fixture("blank_card.png"), fixture("blank_card.png")];
        let reports = scan_images(&engine, &paths).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(engine.calls.get(), 2);
        match &reports[0].outcome {
            Outcome::Scanned(r) => {
                assert_eq!(r.name, "Pikachu");
                assert_eq!(r.date, "Illus. Ken Sugimori 1999 Wizards 4/102");
                assert_eq!(r.lines.len(), 5);
            }
            Outcome::Failed { error } => panic!("unexpected failure: {}", error),
        }
    }

    #[tokio::test]
    async fn failure_does_not_stop_batch() {
        let mut engine = FakeEngine::new(vec!["Mew"]);
        engine.fail_on = Some(0);
        let paths = vec![
            fixture("blank_card.png"),
            fixture("missing.png"),
            fixture("blank_card.png"),
        ];
        let reports = scan_images(&engine, &paths).await.unwrap();

        assert!(reports[0].is_failed());
        assert!(reports[1].is_failed());
        assert!(!reports[2].is_failed());
        // Missing file never reaches the OCR engine
        assert_eq!(engine.calls.get(), 2);

        match &reports[0].outcome {
            Outcome::Failed { error } => {
                assert!(error.contains("OCR failed for blank_card.png"));
                assert!(error.contains("ThrottlingException"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn no_lines_gives_sentinels() {
        let engine = FakeEngine::new(vec![]);
        let reports = scan_images(&engine, &[fixture("blank_card.png")]).await.unwrap();
        match &reports[0].outcome {
            Outcome::Scanned(r) => {
                assert_eq!(r.name, NOT_FOUND);
                assert_eq!(r.date, NOT_FOUND);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn classify_mixed_files() {
        let paths = vec![
            fixture("charizard.json"),
            fixture("scyther.txt"),
            fixture("missing.json"),
        ];
        let reports = classify_files(&paths).unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].file, "tests/fixtures/charizard.json");
        match &reports[1].outcome {
            Outcome::Scanned(r) => assert_eq!(r.name, "Scyther"),
            _ => panic!("expected scan"),
        }
        assert!(reports[2].is_failed());
    }

    #[test]
    fn report_json_shape() {
        let ok = ScanReport::new(
            Path::new("a.jpg"),
            Ok(ScanResult::from_lines(vec!["Ditto".into()])),
        );
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["file"], "a.jpg");
        assert!(v["scanned_at"].as_str().is_some_and(|t| t.ends_with('Z')));
        assert_eq!(v["name"], "Ditto");
        assert_eq!(v["date"], NOT_FOUND);
        assert!(v.get("error").is_none());

        let failed = ScanReport::new(Path::new("b.heic"), Err(anyhow!("unsupported")));
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["error"], "unsupported");
        assert!(v["scanned_at"].is_string());
        assert!(v.get("name").is_none());
    }
}
