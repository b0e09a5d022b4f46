//! Plain-text document loading.
//!
//! Only plain-text formats are handled here; binary formats (PDF, Word)
//! belong to an external extraction collaborator that yields the same
//! `(text, metadata)` pairs.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{RagError, Result};
use crate::types::{Document, DocumentMetadata};

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Loads plain-text documents and stamps them with provenance metadata.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` when the path's extension is a supported text format.
    pub fn supports(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Loads a single file as one [`Document`].
    ///
    /// Unsupported extensions are rejected with
    /// [`RagError::UnsupportedInput`] before any file access.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        if !Self::supports(path) {
            return Err(RagError::UnsupportedInput(format!(
                "unsupported file type: {} (supported: {})",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let text = fs::read_to_string(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();

        info!(path = %path.display(), "loaded document");
        Ok(Document::new(
            text,
            DocumentMetadata {
                source: path.to_string_lossy().into_owned(),
                file_name,
                file_type,
                loaded_at: Utc::now(),
            },
        ))
    }

    /// Loads every supported file under `dir`, recursing into
    /// subdirectories. Files that fail to load are skipped with a warning
    /// rather than aborting the walk.
    pub async fn load_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut pending: Vec<PathBuf> = vec![dir.as_ref().to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if Self::supports(&path) {
                    match self.load_file(&path).await {
                        Ok(document) => documents.push(document),
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "skipping document");
                        }
                    }
                }
            }
        }

        documents.sort_by(|a, b| a.metadata.source.cmp(&b.metadata.source));
        info!(
            dir = %dir.as_ref().display(),
            documents = documents.len(),
            "loaded directory"
        );
        Ok(documents)
    }
}
