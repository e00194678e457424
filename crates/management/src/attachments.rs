//! Attachment file storage.

use mailer_core::{MailerError, MailerResult};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// An uploaded file as received from the transport layer.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub trait AttachmentStorage: Send + Sync {
    /// Persist `bytes` and return the storage key. Fails with `StorageError`.
    fn store(&self, bytes: &[u8], suggested_name: &str) -> MailerResult<String>;
}

/// Stores files flat under a root directory. Keys are
/// `<uuid>_<sanitised name>` so two uploads never collide.
pub struct FsAttachmentStorage {
    root: PathBuf,
}

impl FsAttachmentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AttachmentStorage for FsAttachmentStorage {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> MailerResult<String> {
        let key = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(suggested_name));
        std::fs::create_dir_all(&self.root)
            .and_then(|_| std::fs::write(self.root.join(&key), bytes))
            .map_err(|e| MailerError::StorageError(e.to_string()))?;
        debug!(key = %key, size = bytes.len(), "Attachment stored");
        Ok(key)
    }
}

/// Keep letters, digits, dot, dash and underscore; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
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
    if cleaned.trim_matches('.').is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

/// Storage that always fails. Exercises the write-before-metadata ordering.
#[cfg(test)]
pub struct FailingStorage;

#[cfg(test)]
impl AttachmentStorage for FailingStorage {
    fn store(&self, _bytes: &[u8], _suggested_name: &str) -> MailerResult<String> {
        Err(MailerError::StorageError("disk full".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Q3 plan (final).pdf"), "Q3_plan__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\memo.docx"), "memo.docx");
        assert_eq!(sanitize_file_name(".."), "attachment");
        assert_eq!(sanitize_file_name(""), "attachment");
    }

    #[test]
    fn test_fs_storage_writes_unique_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsAttachmentStorage::new(dir.path().join("attachments"));

        let a = storage.store(b"hello", "memo.txt").unwrap();
        let b = storage.store(b"world", "memo.txt").unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("_memo.txt"));
        assert_eq!(std::fs::read(storage.root().join(&a)).unwrap(), b"hello");
    }

    #[test]
    fn test_fs_storage_reports_storage_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // Root is a regular file, so the directory cannot be created.
        let storage = FsAttachmentStorage::new(file.path());
        let err = storage.store(b"x", "a.txt").unwrap_err();
        assert!(matches!(err, MailerError::StorageError(_)));
    }
}
