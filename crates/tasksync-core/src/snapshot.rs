use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::cache::Mirror;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Snapshot cursor is empty: {0}")]
    EmptyCursor(String),
}

impl SnapshotError {
    pub fn is_missing(&self) -> bool {
        matches!(self, SnapshotError::Io(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Two files per session under the cache directory: `<key>.json` holds the
/// mirror, `<key>.sync` holds the raw cursor.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    key: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, token: &str) -> Self {
        Self {
            dir: dir.into(),
            key: session_key(token),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.dir.join(format!("{}.sync", self.key))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.key))
    }

    pub fn load(&self) -> Result<(Mirror, String), SnapshotError> {
        let text = fs::read_to_string(self.mirror_path())?;
        let mirror: Mirror = serde_json::from_str(&text)?;
        let cursor_path = self.cursor_path();
        let cursor = fs::read_to_string(&cursor_path)?.trim().to_string();
        if cursor.is_empty() {
            return Err(SnapshotError::EmptyCursor(
                cursor_path.to_string_lossy().to_string(),
            ));
        }
        Ok((mirror, cursor))
    }

    pub fn save(&self, mirror: &Mirror, cursor: &str) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;
        let body = serde_json::to_vec_pretty(mirror)?;
        let written = write_atomic(&self.mirror_path(), &body)
            .and_then(|_| write_atomic(&self.cursor_path(), cursor.as_bytes()));
        lock.unlock()?;
        written?;
        Ok(())
    }
}

/// Hex SHA-256 of the API token; keeps the token itself out of file names.
pub fn session_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::id::Id;
    use crate::model::{Item, Project};

    fn sample_mirror() -> Mirror {
        let mut mirror = Mirror::default();
        mirror.projects.store(Project {
            id: Id::new("1").expect("id"),
            name: "Inbox".to_string(),
            inbox_project: true,
            ..Project::default()
        });
        mirror.items.store(Item {
            id: Id::new("10").expect("id"),
            project_id: Id::new("1").expect("id"),
            content: "Buy milk".to_string(),
            labels: vec![Id::new("5").expect("id")],
            ..Item::default()
        });
        mirror.items.store(Item {
            id: Id::generate_temp(),
            content: "Pending".to_string(),
            ..Item::default()
        });
        mirror
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(temp.path(), "secret-token");
        let mirror = sample_mirror();
        store.save(&mirror, "cursor-1").expect("save");

        let (loaded, cursor) = store.load().expect("load");
        assert_eq!(loaded, mirror);
        assert_eq!(cursor, "cursor-1");
    }

    #[test]
    fn file_names_do_not_contain_the_token() {
        let temp = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(temp.path(), "secret-token");
        store.save(&Mirror::default(), "*").expect("save");
        for entry in fs::read_dir(temp.path()).expect("read dir") {
            let name = entry.expect("entry").file_name();
            assert!(!name.to_string_lossy().contains("secret-token"));
        }
        assert!(store.mirror_path().is_file());
        assert!(store.cursor_path().is_file());
    }

    #[test]
    fn missing_files_report_missing() {
        let temp = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(temp.path(), "token");
        let err = store.load().expect_err("nothing saved");
        assert!(err.is_missing());
    }

    #[test]
    fn corrupt_mirror_is_a_parse_error() {
        let temp = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(temp.path(), "token");
        fs::write(store.mirror_path(), "{not json").expect("write");
        fs::write(store.cursor_path(), "abc").expect("write");
        assert!(matches!(store.load(), Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn empty_cursor_is_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(temp.path(), "token");
        store.save(&Mirror::default(), "").expect("save");
        assert!(matches!(store.load(), Err(SnapshotError::EmptyCursor(_))));
    }
}
