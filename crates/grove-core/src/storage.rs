//! On-disk storage namespace for persisted explorer state

use std::path::{Path, PathBuf};

/// Storage directory: .grove/
pub const STORAGE_DIR: &str = ".grove";

/// Bookmark document inside the storage directory
pub const BOOKMARKS_FILE: &str = "bookmarks.json";

/// Get storage directory path
pub fn storage_dir(root: &Path) -> PathBuf {
    root.join(STORAGE_DIR)
}

/// Get bookmark file path
pub fn bookmarks_path(root: &Path) -> PathBuf {
    storage_dir(root).join(BOOKMARKS_FILE)
}

/// Ensure storage directory exists
pub fn ensure_storage_dir(root: &Path) -> std::io::Result<()> {
    let dir = storage_dir(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(())
}

/// Remove everything Grove persisted under `root`
pub fn clear_storage(root: &Path) -> std::io::Result<()> {
    let dir = storage_dir(root);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_lifecycle() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        assert_eq!(bookmarks_path(root), root.join(".grove").join("bookmarks.json"));

        ensure_storage_dir(root).unwrap();
        assert!(storage_dir(root).is_dir());

        clear_storage(root).unwrap();
        assert!(!storage_dir(root).exists());
        // Clearing twice is fine.
        clear_storage(root).unwrap();
    }
}
