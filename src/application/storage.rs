//! Storage port used by the report services.
//!
//! Keys are relative, `/`-separated paths such as `reports/{id}/meta.json`.
//! Adapters live in `infra::storage`.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key `{key}`")]
    InvalidKey { key: String },
    #[error("object `{key}` not found")]
    NotFound { key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("remote storage request failed: {message}")]
    Remote { message: String },
}

impl StorageError {
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;

    /// Write `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Every key beginning with `prefix`, in ascending order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

pub async fn put_text(
    store: &dyn ObjectStore,
    key: &str,
    content: &str,
    content_type: &str,
) -> Result<(), StorageError> {
    store
        .put(key, Bytes::copy_from_slice(content.as_bytes()), content_type)
        .await
}

/// Reject keys that are empty, absolute, or escape the storage root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let escapes = key
        .split(['/', '\\'])
        .any(|segment| segment == "..");
    if key.trim().is_empty() || key.starts_with('/') || key.starts_with('\\') || escapes {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_keys_are_accepted() {
        validate_key("reports/abc-20240101/meta.json").expect("valid");
        validate_key("index.html").expect("valid");
    }

    #[test]
    fn escaping_keys_are_rejected() {
        for key in ["", "/etc/passwd", "reports/../../secret", "..\\windows"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey { .. })),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn dotted_names_are_not_parent_segments() {
        validate_key("reports/v1..2/meta.json").expect("valid");
    }
}
