// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem helpers shared by every operation.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use docwerk_core::error::{DocwerkError, Result};
use tracing::debug;

/// Read a source file, mapping missing/unreadable paths to `NotFound` and
/// rejecting files larger than `max_file_size`.
pub fn read_source(path: &Path, max_file_size: u64) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path).map_err(|e| DocwerkError::from_io(path, e))?;
    if meta.is_dir() {
        return Err(DocwerkError::NotFound(format!(
            "{} is a directory",
            path.display()
        )));
    }
    if meta.len() > max_file_size {
        return Err(DocwerkError::Validation(format!(
            "{} is {} bytes, above the {} byte limit",
            path.display(),
            meta.len(),
            max_file_size
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| DocwerkError::from_io(path, e))?;
    debug!(path = %path.display(), len = bytes.len(), "source read");
    Ok(bytes)
}

/// Write an output file, creating missing parent directories.
///
/// Bytes go to a uniquely named sibling first and are renamed into place, so
/// readers never observe a partial file and concurrent writers of the same
/// path each leave a complete one.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = temp_sibling(path);
    std::fs::write(&temp_path, bytes)?;
    if let Err(err) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err.into());
    }
    debug!(path = %path.display(), len = bytes.len(), "output written");
    Ok(())
}

/// `.<name>.<pid>.<thread>.<nanos>.tmp` in the same directory as `path`.
fn temp_sibling(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let thread = format!("{:?}", std::thread::current().id());
    let thread: String = thread.chars().filter(char::is_ascii_digit).collect();
    let name = format!(
        ".{}.{}.{thread}.{nanos}.tmp",
        file_name_of(path),
        std::process::id()
    );
    path.with_file_name(name)
}

/// Lowercase extension of `path`, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Final path component as a display string.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// File stem used as a document title.
pub fn title_of(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Docwerk Document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_source_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 64]).unwrap();

        let err = read_source(&path, 16).unwrap_err();
        assert!(matches!(err, DocwerkError::Validation(_)));
        assert_eq!(read_source(&path, 64).unwrap().len(), 64);
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(dir.path(), u64::MAX).unwrap_err();
        assert!(matches!(err, DocwerkError::NotFound(_)));
    }

    #[test]
    fn write_output_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/out.txt");
        write_output(&path, b"x").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn write_output_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(&path, b"first version").unwrap();
        write_output(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.txt")]);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of(Path::new("/x/Photo.JPG")).as_deref(), Some("jpg"));
        assert_eq!(extension_of(Path::new("/x/README")), None);
    }
}
