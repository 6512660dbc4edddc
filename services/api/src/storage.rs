//! Document storage on the private local disk
//!
//! Attachments never leave the server's filesystem; records only carry
//! paths relative to the storage root and downloads are streamed back
//! through the API.

use anyhow::{Context, Result};
use std::path::PathBuf;
use uuid::Uuid;

/// Largest accepted upload
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for stored documents
    pub root: PathBuf,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `DOCUMENT_STORAGE_ROOT`: directory for uploaded documents (default: "./storage/documents")
    pub fn from_env() -> Self {
        let root = std::env::var("DOCUMENT_STORAGE_ROOT")
            .unwrap_or_else(|_| "./storage/documents".to_string());

        Self {
            root: PathBuf::from(root),
        }
    }
}

/// Filesystem-backed store for record attachments
#[derive(Clone)]
pub struct DocumentStorage {
    root: PathBuf,
}

impl DocumentStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    /// Saves a document under a collision-free name and returns the
    /// relative path to persist on the record
    pub async fn save(&self, subdir: &str, original_name: &str, bytes: &[u8]) -> Result<String> {
        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let relative = format!("{}/{}", subdir, file_name);
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create storage directory {}", parent.display())
            })?;
        }

        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("Failed to write document {}", target.display()))?;

        Ok(relative)
    }

    /// Reads a stored document, `Ok(None)` when the file is gone
    pub async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let target = self.root.join(relative);
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read document {}", target.display()))
            }
        }
    }

    /// Best-effort delete. A missing or undeletable file is logged and
    /// never fails the caller; the database row is the source of truth.
    pub async fn delete(&self, relative: &str) {
        let target = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&target).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to delete document {}: {}", target.display(), e);
            }
        }
    }
}

/// Keeps only the final path segment and replaces anything outside a
/// conservative character set
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("document");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> DocumentStorage {
        let root = std::env::temp_dir().join(format!("academy-docs-{}", Uuid::new_v4()));
        DocumentStorage::new(&StorageConfig { root })
    }

    #[test]
    fn file_names_are_stripped_of_path_segments() {
        assert_eq!(
            sanitize_file_name("../../etc/passwd"),
            "passwd".to_string()
        );
        assert_eq!(
            sanitize_file_name("incident report.pdf"),
            "incident_report.pdf".to_string()
        );
        assert_eq!(sanitize_file_name("///"), "document".to_string());
    }

    #[tokio::test]
    async fn save_read_delete_round_trip() {
        let storage = temp_storage();

        let path = storage
            .save("discipline_documents", "report.pdf", b"evidence")
            .await
            .unwrap();
        assert!(path.starts_with("discipline_documents/"));
        assert!(path.ends_with("_report.pdf"));

        let bytes = storage.read(&path).await.unwrap();
        assert_eq!(bytes.as_deref(), Some(b"evidence".as_ref()));

        storage.delete(&path).await;
        assert!(storage.read(&path).await.unwrap().is_none());

        // Deleting again must stay silent.
        storage.delete(&path).await;
    }

    #[tokio::test]
    async fn two_saves_of_the_same_name_never_collide() {
        let storage = temp_storage();

        let first = storage
            .save("discipline_documents", "report.pdf", b"one")
            .await
            .unwrap();
        let second = storage
            .save("discipline_documents", "report.pdf", b"two")
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(
            storage.read(&first).await.unwrap().as_deref(),
            Some(b"one".as_ref())
        );
    }
}
