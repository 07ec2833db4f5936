//! Content digests for stored files.

use crate::StorageBackend;
use crate::error::Result;
use std::path::Path;

/// Hex-encoded BLAKE3 digest of some bytes (always 64 lowercase characters).
pub fn digest_bytes(data: impl AsRef<[u8]>) -> String {
    blake3::hash(data.as_ref()).to_string()
}

/// Hex-encoded BLAKE3 digest of a file's full contents.
///
/// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file does
/// not exist.
pub async fn digest(backend: &dyn StorageBackend, path: &Path) -> Result<String> {
    let bytes = backend.read(path).await?;
    tracing::trace!(path = %path.display(), bytes = bytes.len(), "Hashing file contents");
    Ok(digest_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;

    #[test]
    fn test_digest_bytes_is_stable() {
        let a = digest_bytes(b"cover bytes");
        let b = digest_bytes(b"cover bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, digest_bytes(b"other bytes"));
    }

    #[tokio::test]
    async fn test_digest_matches_bytes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        backend.write(Path::new("s123.jpg"), b"\xff\xd8\xff\xe0 jpeg").await.unwrap();
        let hash = digest(&backend, Path::new("s123.jpg")).await.unwrap();
        assert_eq!(hash, digest_bytes(b"\xff\xd8\xff\xe0 jpeg"));
    }

    #[tokio::test]
    async fn test_digest_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        let err = digest(&backend, Path::new("missing.jpg")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
