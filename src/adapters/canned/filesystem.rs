//! Canned adapter for the `FileSystem` port.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::PortError;
use crate::ports::filesystem::FileSystem;

/// In-memory filesystem.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, returning `self` for chaining.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.lock().expect("files lock poisoned").insert(path.into(), contents.into());
        self
    }

    /// Current contents of `path`, if it exists.
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().expect("files lock poisoned").get(path).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        self.contents(path).ok_or_else(|| format!("No such file: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        self.files
            .lock()
            .expect("files lock poisoned")
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock poisoned").contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let fs = MemoryFileSystem::new().with_file("/a.json", "{}");
        assert!(fs.exists(Path::new("/a.json")));
        assert!(!fs.exists(Path::new("/b.json")));

        fs.write(Path::new("/b.json"), "[]").unwrap();
        assert_eq!(fs.read_to_string(Path::new("/b.json")).unwrap(), "[]");
        assert!(fs.read_to_string(Path::new("/c.json")).is_err());
    }
}
