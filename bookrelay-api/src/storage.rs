/// Cover asset store
///
/// Covers live on the local filesystem under a configured root,
/// partitioned by the uploading user's ID. The database only keeps
/// the opaque reference this store hands back, so the storage layout
/// can change without touching book rows.
///
/// References have the shape `<uploader_id>/<asset_id>` and are
/// validated on read so a crafted reference cannot escape the root.

use std::path::{Component, Path, PathBuf};
use tokio::io::ErrorKind;
use uuid::Uuid;

/// Filesystem-backed cover store
#[derive(Clone)]
pub struct CoverStore {
    root: PathBuf,
}

impl CoverStore {
    /// Creates a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Stores a cover upload and returns its reference
    ///
    /// The file lands under a per-uploader directory which is created
    /// on first use.
    pub async fn store(&self, uploader_id: Uuid, bytes: &[u8]) -> std::io::Result<String> {
        let asset_id = Uuid::new_v4();
        let dir = self.root.join(uploader_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(asset_id.to_string());
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(uploader = %uploader_id, asset = %asset_id, "Stored cover asset");
        Ok(format!("{}/{}", uploader_id, asset_id))
    }

    /// Reads a cover by reference
    ///
    /// Returns None when the reference is malformed or the file is
    /// gone; both read as "no cover" to clients.
    pub async fn read(&self, reference: &str) -> std::io::Result<Option<Vec<u8>>> {
        let Some(relative) = sanitize_reference(reference) else {
            return Ok(None);
        };

        match tokio::fs::read(self.root.join(relative)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Validates a stored reference before touching the filesystem
///
/// Only plain two-segment relative paths pass; anything with parent
/// components, absolute roots, or extra separators is rejected.
fn sanitize_reference(reference: &str) -> Option<&Path> {
    let path = Path::new(reference);

    let mut segments = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => segments += 1,
            _ => return None,
        }
    }

    (segments == 2).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_reference_accepts_store_shape() {
        let reference = format!("{}/{}", Uuid::new_v4(), Uuid::new_v4());
        assert!(sanitize_reference(&reference).is_some());
    }

    #[test]
    fn test_sanitize_reference_rejects_traversal() {
        assert!(sanitize_reference("../etc/passwd").is_none());
        assert!(sanitize_reference("/etc/passwd").is_none());
        assert!(sanitize_reference("a/../../b").is_none());
        assert!(sanitize_reference("single-segment").is_none());
        assert!(sanitize_reference("a/b/c").is_none());
    }

    #[tokio::test]
    async fn test_store_and_read_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CoverStore::new(dir.path());
        let uploader = Uuid::new_v4();

        let reference = store.store(uploader, b"cover bytes").await.expect("store");
        let read = store.read(&reference).await.expect("read");

        assert_eq!(read.as_deref(), Some(b"cover bytes".as_slice()));
    }

    #[tokio::test]
    async fn test_read_missing_reference_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CoverStore::new(dir.path());

        let reference = format!("{}/{}", Uuid::new_v4(), Uuid::new_v4());
        let read = store.read(&reference).await.expect("read");
        assert!(read.is_none());
    }
}
