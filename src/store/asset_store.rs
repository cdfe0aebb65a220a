//! File-per-asset cache directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::core::error::StorageError;

/// Owns the cache directory and maps file names to paths inside it
#[derive(Debug, Clone)]
pub struct AssetStore {
    /// Cache root; created lazily on first write
    root: PathBuf,
}

impl AssetStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the configured cache directory
    pub fn from_config(config: &crate::config::ResolvedConfig) -> Self {
        Self::new(config.cache_dir.clone())
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a cached file name
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Whether a cached file currently exists.
    ///
    /// A concurrent purge may remove the file right after this returns true,
    /// so readers must still handle a failed read.
    pub fn exists(&self, file_name: &str) -> bool {
        self.path_for(file_name).is_file()
    }

    /// Read a cached file
    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(file_name);
        fs::read(&path)
            .await
            .map_err(|source| StorageError::Read { path, source })
    }

    /// Persist bytes under `file_name`, replacing any existing file.
    ///
    /// The bytes land in a temporary file inside the cache root and are
    /// renamed into place, so `exists` never reports a half-written asset.
    pub async fn write(&self, file_name: &str, bytes: Vec<u8>) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let root = self.root.clone();
        let path = self.path_for(file_name);
        let target = path.clone();

        tokio::task::spawn_blocking(move || persist(&root, &target, &bytes))
            .await
            .map_err(|e| StorageError::Write {
                path: path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })??;

        debug!(path = %path.display(), "Stored asset");
        Ok(path)
    }

    /// Remove every cached file directly under the cache root.
    ///
    /// Subdirectories are left alone, since the engine never creates them.
    /// Best effort: stops at the first failure and leaves already-removed
    /// files removed. A missing root counts as already purged. Returns the
    /// number of files removed.
    pub async fn purge_all(&self) -> Result<usize, StorageError> {
        let purge_err = |path: &Path, source: std::io::Error| StorageError::Purge {
            path: path.to_path_buf(),
            source,
        };

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(purge_err(&self.root, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| purge_err(&self.root, e))?
        {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| purge_err(&path, e))?;

            if file_type.is_dir() {
                debug!(path = %path.display(), "Skipping directory during purge");
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // Raced with another remover; the entry is gone either way
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(purge_err(&path, e)),
            }
        }

        debug!(root = %self.root.display(), removed, "Purged cache");
        Ok(removed)
    }
}

/// Write to a temp file in `root`, then rename it onto `path`
fn persist(root: &Path, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let write_err = |source: std::io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(root).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_path_for_joins_root() {
        let store = AssetStore::new("/var/cache/imgfetch");
        assert_eq!(
            store.path_for("THUMB_a.png"),
            PathBuf::from("/var/cache/imgfetch/THUMB_a.png")
        );
    }

    #[tokio::test]
    async fn test_write_creates_root_and_file() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path().join("nested").join("images"));

        assert!(!store.exists("a.png"));

        let path = assert_ok!(store.write("a.png", b"bytes".to_vec()).await);
        assert_eq!(path, store.path_for("a.png"));
        assert!(store.exists("a.png"));
        assert_eq!(store.read("a.png").await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_write_overwrites_existing() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path());

        store.write("a.png", b"first".to_vec()).await.unwrap();
        store.write("a.png", b"second".to_vec()).await.unwrap();

        assert_eq!(store.read("a.png").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path());

        store.write("a.png", b"x".to_vec()).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_write_fails_when_root_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = AssetStore::new(blocker.join("images"));
        let err = assert_err!(store.write("a.png", b"x".to_vec()).await);

        assert!(matches!(err, StorageError::CreateDir { .. }));
    }

    #[tokio::test]
    async fn test_exists_ignores_directories() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("dir.png")).unwrap();

        let store = AssetStore::new(temp.path());
        assert!(!store.exists("dir.png"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path());

        let err = store.read("missing.png").await.unwrap_err();
        assert!(matches!(err, StorageError::Read { .. }));
    }

    #[tokio::test]
    async fn test_purge_all_removes_everything() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path().join("images"));

        store.write("a.png", b"a".to_vec()).await.unwrap();
        store.write("THUMB_a.png", b"b".to_vec()).await.unwrap();

        let removed = store.purge_all().await.unwrap();
        assert_eq!(removed, 2);
        assert!(!store.exists("a.png"));
        assert!(!store.exists("THUMB_a.png"));
    }

    #[tokio::test]
    async fn test_purge_all_leaves_subdirectories() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path());

        store.write("a.png", b"a".to_vec()).await.unwrap();
        let nested = temp.path().join("keep");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("inner.png"), b"x").unwrap();

        assert_eq!(assert_ok!(store.purge_all().await), 1);
        assert!(!store.exists("a.png"));
        assert!(nested.join("inner.png").is_file());
    }

    #[tokio::test]
    async fn test_purge_missing_root_is_ok() {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(temp.path().join("never-created"));

        assert_eq!(store.purge_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_root_that_is_a_file_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let store = AssetStore::new(&blocker);
        assert!(matches!(
            store.purge_all().await,
            Err(StorageError::Purge { .. })
        ));
    }
}
