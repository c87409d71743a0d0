use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

/// Largest file accepted from the user.
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;
/// Textract's limit for synchronous requests with inline bytes.
pub const MAX_OCR_BYTES: usize = 5 * 1024 * 1024;

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// An image that passed intake checks and can be sent as-is.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

pub async fn load(path: &Path) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    from_bytes(&file_name, bytes)
}

pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<ImageUpload> {
    if bytes.is_empty() {
        bail!("{} is empty", file_name);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        bail!(
            "{} is {} bytes, over the {} MB upload limit",
            file_name,
            bytes.len(),
            MAX_UPLOAD_BYTES / (1024 * 1024)
        );
    }

    let format = format_from_extension(file_name)
        .or_else(|| sniff_format(&bytes))
        .ok_or_else(|| anyhow!("{}: unsupported image format (expected JPEG or PNG)", file_name))?;

    if bytes.len() > MAX_OCR_BYTES {
        bail!(
            "{} is {} bytes, over Textract's {} MB limit",
            file_name,
            bytes.len(),
            MAX_OCR_BYTES / (1024 * 1024)
        );
    }

    Ok(ImageUpload {
        file_name: file_name.to_string(),
        format,
        bytes,
    })
}

fn format_from_extension(file_name: &str) -> Option<ImageFormat> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    match ext.as_str() {
        "png" => Some(ImageFormat::Png),
        _ => Some(ImageFormat::Jpeg),
    }
}

fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    match bytes {
        [0xff, 0xd8, 0xff, ..] => Some(ImageFormat::Jpeg),
        [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, ..] => Some(ImageFormat::Png),
        _ => None,
    }
}
