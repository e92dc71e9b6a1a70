pub mod reader;
pub mod upload;

pub use reader::{FileKind, FileReader};
pub use upload::{ExtractedText, UploadedFile};

use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Decode a batch of uploads, preserving input order.
pub fn extract_batch(files: &[UploadedFile]) -> Vec<ExtractedText> {
    let texts: Vec<ExtractedText> = files.iter().map(FileReader::extract).collect();

    let degraded = texts.iter().filter(|t| t.is_degraded()).count();
    info!(files = texts.len(), degraded, "Extracted text from uploads");

    texts
}

/// Ingest entire directory
pub async fn ingest_directory(dir_path: &Path) -> Result<Vec<ExtractedText>> {
    let files = FileReader::read_directory(dir_path).await?;
    Ok(extract_batch(&files))
}
