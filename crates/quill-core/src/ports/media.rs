//! Storage for uploaded media (avatars).

use async_trait::async_trait;

/// Stores files under a media root and maps stored paths to public URLs.
///
/// Paths handed out and accepted are relative to the root, `/`-separated.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Write `bytes` to `dir/name`, returning the stored relative path.
    async fn save(&self, dir: &str, name: &str, bytes: &[u8]) -> Result<String, MediaError>;

    /// Remove a stored file. Removing a missing file is not an error.
    async fn delete(&self, path: &str) -> Result<(), MediaError>;

    /// Public URL for a stored path.
    fn url(&self, path: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Media I/O failed: {0}")]
    Io(String),
}
