//! Filesystem-backed media store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use quill_core::ports::{MediaError, MediaStore};

/// Where uploads live and how they are addressed.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory uploads are written under.
    pub root: PathBuf,
    /// Public URL prefix the root is served from.
    pub url_prefix: String,
    /// Largest accepted avatar, in decoded bytes.
    pub max_avatar_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            url_prefix: "/media".to_string(),
            max_avatar_bytes: 2 * 1024 * 1024,
        }
    }
}

impl MediaConfig {
    /// Read `MEDIA_ROOT`, `MEDIA_URL` and `MAX_AVATAR_BYTES`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            url_prefix: std::env::var("MEDIA_URL").unwrap_or(defaults.url_prefix),
            max_avatar_bytes: std::env::var("MAX_AVATAR_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_avatar_bytes),
        }
    }
}

/// Stores media as plain files below a root directory.
pub struct LocalMediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a relative path below the root, refusing anything that could escape it.
    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);
        let clean = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean || relative.contains('\\') {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, dir: &str, name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        if name.contains('/') {
            return Err(MediaError::InvalidPath(name.to_string()));
        }
        let relative = format!("{dir}/{name}");
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;

        tracing::debug!(path = %relative, size = bytes.len(), "Stored media file");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e.to_string())),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.url_prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> LocalMediaStore {
        LocalMediaStore::new(&MediaConfig {
            root: dir.path().to_path_buf(),
            url_prefix: "/media/".to_string(),
            ..MediaConfig::default()
        })
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let path = store.save("profile_pics", "a.png", b"png").await.unwrap();
        assert_eq!(path, "profile_pics/a.png");
        assert_eq!(
            std::fs::read(dir.path().join("profile_pics/a.png")).unwrap(),
            b"png"
        );

        store.delete(&path).await.unwrap();
        assert!(!dir.path().join("profile_pics/a.png").exists());
        // Already gone is fine.
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(matches!(
            store.save("..", "x.png", b"x").await,
            Err(MediaError::InvalidPath(_))
        ));
        assert!(matches!(
            store.save("profile_pics", "../x.png", b"x").await,
            Err(MediaError::InvalidPath(_))
        ));
        assert!(matches!(
            store.delete("/etc/passwd").await,
            Err(MediaError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_url_joins_prefix() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).url("default.jpg"), "/media/default.jpg");
    }
}
