//! Temp-file-then-rename writes.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AtomicWriteError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("atomic rename from {temp_path} to {target_path} failed: {source}")]
    RenameFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Sibling temp path used while `path` is being written.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to `path` so readers see either the old file or the new
/// one, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AtomicWriteError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| AtomicWriteError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = temp_path_for(path);
    let io_error = |operation: &'static str| {
        let temp_path = temp_path.clone();
        move |source| AtomicWriteError::Io {
            operation,
            path: temp_path,
            source,
        }
    };

    let mut file = File::create(&temp_path).map_err(io_error("create"))?;
    file.write_all(bytes).map_err(io_error("write"))?;
    file.sync_all().map_err(io_error("sync"))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|source| AtomicWriteError::RenameFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_is_a_sibling() {
        let temp = temp_path_for(Path::new("/jobs/a/logs/artifact.json"));
        assert_eq!(temp, PathBuf::from("/jobs/a/logs/artifact.json.tmp"));
    }

    #[test]
    fn replaces_existing_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("out.json");
        write_atomic(&path, b"{\"v\":1}").expect("first write");
        write_atomic(&path, b"{\"v\":2}").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{\"v\":2}");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn stale_temp_file_never_replaces_target() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("artifact.json");
        write_atomic(&path, b"{\"snapshot\":1}").expect("write");
        // Simulate a crash between writing the temp file and renaming it.
        fs::write(temp_path_for(&path), b"{\"snaps").expect("partial temp");
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "{\"snapshot\":1}"
        );
        write_atomic(&path, b"{\"snapshot\":2}").expect("recover");
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "{\"snapshot\":2}"
        );
    }
}
