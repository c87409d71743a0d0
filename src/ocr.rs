use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use aws_config::BehaviorVersion;
use aws_sdk_textract::config::Region;
use aws_sdk_textract::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_textract::operation::detect_document_text::DetectDocumentTextError;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::Document;
use aws_sdk_textract::Client;
use tracing::{debug, warn};

use crate::parser::blocks::{BlockKind, OcrBlock};

pub const DEFAULT_REGION: &str = "us-east-1";

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const RETRYABLE_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
    "InternalServerError",
];

/// 1x1 PNG used to probe credentials without sending a real card.
const PROBE_IMAGE: &[u8] = include_bytes!("../assets/probe.png");

/// Anything that turns image bytes into ordered OCR blocks.
pub trait OcrEngine {
    async fn detect_blocks(&self, image: &[u8]) -> Result<Vec<OcrBlock>>;
}

pub struct TextractEngine {
    client: Client,
}

impl TextractEngine {
    /// Build a client for `region`, credentials from the default AWS chain.
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        TextractEngine {
            client: Client::new(&config),
        }
    }

    async fn detect_once(
        &self,
        image: &[u8],
    ) -> std::result::Result<Vec<OcrBlock>, SdkError<DetectDocumentTextError>> {
        let document = Document::builder().bytes(Blob::new(image.to_vec())).build();
        let output = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await?;

        let blocks: Vec<OcrBlock> = output
            .blocks()
            .iter()
            .map(|b| OcrBlock {
                kind: BlockKind::from_tag(b.block_type().map(|t| t.as_str()).unwrap_or_default()),
                text: b.text().map(str::to_string),
            })
            .collect();
        debug!("Textract returned {} blocks", blocks.len());
        Ok(blocks)
    }

    /// Send the probe image once, no retries.
    pub async fn probe(&self) -> std::result::Result<usize, RequestFailure> {
        self.detect_once(PROBE_IMAGE)
            .await
            .map(|blocks| blocks.len())
            .map_err(|e| RequestFailure::from_sdk(&e))
    }
}

impl OcrEngine for TextractEngine {
    async fn detect_blocks(&self, image: &[u8]) -> Result<Vec<OcrBlock>> {
        with_retries(move || async move {
            self.detect_once(image)
                .await
                .map_err(|e| RequestFailure::from_sdk(&e))
        })
        .await
    }
}

/// Run `attempt_fn` until it succeeds, fails with a non-retryable code, or
/// `MAX_RETRIES` retries are used up.
async fn with_retries<T, F, Fut>(mut attempt_fn: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestFailure>>,
{
    let mut attempt = 0;
    loop {
        let failure = match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(f) => f,
        };

        let code = failure.code.as_deref().unwrap_or("unknown");
        if !is_retryable(code) || attempt == MAX_RETRIES {
            return Err(anyhow!(
                "Textract request failed ({}): {}",
                code,
                failure.message
            ));
        }

        let wait = backoff(attempt);
        warn!(
            "Textract {} (attempt {}/{}), backing off {:.1}s",
            code,
            attempt + 1,
            MAX_RETRIES,
            wait.as_secs_f64()
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

/// A failed Textract call: service error code, if any, and the full message.
#[derive(Debug)]
pub struct RequestFailure {
    pub code: Option<String>,
    pub message: String,
}

impl RequestFailure {
    fn from_sdk(err: &SdkError<DetectDocumentTextError>) -> Self {
        RequestFailure {
            code: error_code(err).map(str::to_string),
            message: DisplayErrorContext(err).to_string(),
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self.code.as_deref()? {
            "UnrecognizedClientException" => Some(
                "Credentials are invalid or expired. Create new access keys in the IAM console, \
                 make sure the user has AmazonTextractFullAccess, and update .env.local.",
            ),
            "AccessDeniedException" => Some(
                "The user has no Textract permission. In IAM, open the user's permissions \
                 and attach the AmazonTextractFullAccess policy.",
            ),
            _ => None,
        }
    }
}

fn error_code(err: &SdkError<DetectDocumentTextError>) -> Option<&str> {
    err.as_service_error().and_then(|e| e.code())
}

fn is_retryable(code: &str) -> bool {
    RETRYABLE_CODES.contains(&code)
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))
}
