//! Reading attachment files before a ticket is issued.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::errors::AppError;
use crate::models::AttachmentUpload;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Read every file in `paths` and encode it as a `data:` URL.
///
/// Fails on the first unreadable file; no partial batch is returned.
pub async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<AttachmentUpload>, AppError> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        uploads.push(read_one(path).await?);
    }
    Ok(uploads)
}

async fn read_one(path: &Path) -> Result<AttachmentUpload, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), "Attachment could not be read: {}", e);
        AppError::Validation(format!("Could not read attachment {}", path.display()))
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_for(path).to_string();
    let content = format!("data:{};base64,{}", mime_type, STANDARD.encode(&bytes));

    Ok(AttachmentUpload {
        name,
        mime_type,
        size: bytes.len() as u64,
        content,
    })
}

/// MIME type guessed from the file extension.
pub fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => FALLBACK_MIME,
    }
}
