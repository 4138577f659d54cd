//! Local filesystem storage for cover images and PDF files

use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LibraryError, LibraryResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Which kind of file is attached to a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Cover,
    Pdf,
}

impl BlobKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            BlobKind::Cover => "covers",
            BlobKind::Pdf => "pdfs",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            BlobKind::Cover => IMAGE_EXTENSIONS,
            BlobKind::Pdf => DOCUMENT_EXTENSIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open the store, creating the per-kind directories if needed
    pub async fn init(root: impl Into<PathBuf>) -> LibraryResult<Self> {
        let root = root.into();
        for kind in [BlobKind::Cover, BlobKind::Pdf] {
            tokio::fs::create_dir_all(root.join(kind.dir_name())).await?;
        }
        info!(root = %root.display(), "Upload directory ready");
        Ok(Self { root })
    }

    /// Write an upload and return the name it was stored under
    pub async fn save(&self, kind: BlobKind, original_name: &str, bytes: &[u8]) -> LibraryResult<String> {
        let clean = sanitize_filename(original_name);
        let extension = extension_of(&clean);
        let allowed = extension
            .as_deref()
            .is_some_and(|ext| kind.allowed_extensions().contains(&ext));
        if !allowed {
            return Err(LibraryError::Validation(vec![format!(
                "Allowed file types: {}.",
                kind.allowed_extensions().join(", ")
            )]));
        }
        if bytes.is_empty() {
            return Err(LibraryError::Validation(vec!["Uploaded file is empty.".to_string()]));
        }

        let stored_name = format!("{}_{}", Uuid::new_v4().simple(), clean);
        tokio::fs::write(self.root.join(kind.dir_name()).join(&stored_name), bytes).await?;
        Ok(stored_name)
    }

    /// Resolve a stored name, refusing anything that is not a bare file name
    pub fn path_for(&self, kind: BlobKind, stored_name: &str) -> Option<PathBuf> {
        if stored_name.is_empty() || sanitize_filename(stored_name) != stored_name {
            return None;
        }
        Some(self.root.join(kind.dir_name()).join(stored_name))
    }

    pub async fn read(&self, kind: BlobKind, stored_name: &str) -> LibraryResult<Vec<u8>> {
        let path = self
            .path_for(kind, stored_name)
            .ok_or(LibraryError::NotFound("File"))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LibraryError::NotFound("File")),
            Err(e) => Err(e.into()),
        }
    }

    /// Best effort removal of a file that is no longer referenced
    pub async fn remove(&self, kind: BlobKind, stored_name: &str) {
        let Some(path) = self.path_for(kind, stored_name) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove stored file");
        }
    }
}

/// Strip directories and keep only ASCII alphanumerics, `.`, `-` and `_`
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type served for a stored file
pub fn content_type(stored_name: &str) -> &'static str {
    match extension_of(stored_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
