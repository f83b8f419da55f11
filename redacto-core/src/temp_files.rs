//! Temporary file management utilities.
//!
//! Helpers for creating uniquely named temporary directories and files with
//! the tempfile crate. Both are removed when their handles are dropped,
//! unless explicitly kept or persisted.

use crate::error::CoreResult;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, TempDir, TempPath};

/// Creates a temporary directory with prefix inside `base`. Auto-cleaned when dropped.
pub fn create_temp_dir(base: &Path, prefix: &str) -> CoreResult<TempDir> {
    std::fs::create_dir_all(base)?;

    Ok(TempFileBuilder::new().prefix(prefix).tempdir_in(base)?)
}

/// Reserves a hidden temporary file next to `target`, keeping its extension.
///
/// The returned path is deleted on drop unless persisted, so a failed write
/// never leaves anything at or beside `target`.
pub fn create_sibling_temp_path(target: &Path, prefix: &str) -> CoreResult<TempPath> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let suffix = target
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let temp_file = TempFileBuilder::new()
        .prefix(prefix)
        .suffix(&suffix)
        .tempfile_in(dir)?;

    Ok(temp_file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let dir = create_temp_dir(&base.path().join("nested"), "redacto_frames_").unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("redacto_frames_"));
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_sibling_temp_path_keeps_extension_and_directory() {
        let base = tempfile::tempdir().unwrap();
        let target = base.path().join("out.mp4");
        let temp = create_sibling_temp_path(&target, ".redacto_").unwrap();
        assert_eq!(temp.parent(), Some(base.path()));
        assert_eq!(temp.extension().unwrap(), "mp4");
        let path = temp.to_path_buf();
        drop(temp);
        assert!(!path.exists());
        assert!(!target.exists());
    }
}
