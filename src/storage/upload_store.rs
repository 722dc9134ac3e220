use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("upload write failed: {0}")]
    Io(#[from] io::Error),
}

/// Writes raw uploads under a fixed directory, keyed by sanitized client
/// filename. A repeat upload with the same sanitized name overwrites the
/// previous bytes; last writer wins, also across concurrent requests.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Client filenames reach the filesystem, so everything up to the final
    /// path component is dropped and the rest is reduced to a conservative
    /// character set. Whitespace becomes underscores; leading dots are
    /// stripped so no dotfile or traversal remnant survives.
    pub fn sanitize(filename: &str) -> String {
        let leaf = filename.rsplit(['/', '\\']).next().unwrap_or("");
        let cleaned: String = leaf
            .chars()
            .filter_map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    Some(c)
                } else if c.is_whitespace() {
                    Some('_')
                } else {
                    None
                }
            })
            .collect();
        let cleaned = cleaned.trim_start_matches('.').to_string();
        if cleaned.is_empty() {
            "upload".to_string()
        } else {
            cleaned
        }
    }

    /// Durably writes `bytes` before returning. The returned name is the key
    /// the file stays reachable under.
    pub fn store(&self, filename: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let stored = Self::sanitize(filename);
        fs::write(self.dir.join(&stored), bytes)?;
        Ok(stored)
    }

    pub fn path_of(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(UploadStore::sanitize("../../etc/passwd"), "passwd");
        assert_eq!(UploadStore::sanitize("..\\..\\scan.png"), "scan.png");
        assert_eq!(UploadStore::sanitize("eye.jpg"), "eye.jpg");
    }

    #[test]
    fn sanitize_replaces_whitespace_and_drops_unsafe_chars() {
        assert_eq!(UploadStore::sanitize("my eye scan.jpg"), "my_eye_scan.jpg");
        assert_eq!(UploadStore::sanitize("sc@n!#.png"), "scn.png");
        assert_eq!(UploadStore::sanitize(".hidden"), "hidden");
    }

    #[test]
    fn sanitize_falls_back_when_nothing_survives() {
        assert_eq!(UploadStore::sanitize("???"), "upload");
        assert_eq!(UploadStore::sanitize(""), "upload");
    }

    #[test]
    fn same_name_overwrites_prior_bytes() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path()).unwrap();

        let first = store.store("eye.jpg", b"first bytes").unwrap();
        let second = store.store("eye.jpg", b"second bytes").unwrap();
        assert_eq!(first, second);

        let on_disk = fs::read(store.path_of(&second)).unwrap();
        assert_eq!(on_disk, b"second bytes");
    }

    #[test]
    fn unwritable_target_is_an_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = UploadStore::new(blocker.join("uploads")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
