//! Filesystem port for cache and manifest I/O.

use std::path::Path;

use crate::error::PortError;

/// Provides filesystem access for reading and writing files.
///
/// Cache files and manifests are read through this port so the whole
/// collection flow can run against an in-memory filesystem.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, PortError>;

    /// Writes the given contents to a file, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;
}

impl<T: FileSystem + ?Sized> FileSystem for std::sync::Arc<T> {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        (**self).read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        (**self).write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}
