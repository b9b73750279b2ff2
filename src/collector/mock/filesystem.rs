//! In-memory mock filesystem for testing collectors without real `/proc`.

use crate::collector::traits::{FileSystem, FsUsage};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// `/proc`, `/sys` and `/etc` states, including files that disappear or
/// change between sampling cycles. Mount points answer `statvfs` from a
/// separate usage table.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Parents of every added file, so `exists` sees directories.
    directories: HashSet<PathBuf>,
    /// `statvfs` answers per mount point.
    usage: HashMap<PathBuf, FsUsage>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Sets the usage reported for the filesystem mounted at `path`.
    pub fn add_usage(&mut self, path: impl AsRef<Path>, usage: FsUsage) {
        self.usage.insert(path.as_ref().to_path_buf(), usage);
    }

    /// Removes a file, returning its previous content.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> Option<String> {
        self.files.remove(path.as_ref())
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn statvfs(&self, path: &Path) -> io::Result<FsUsage> {
        self.usage.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem mounted at {:?}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_replace_and_remove() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/stat", "old");
        fs.add_file("/proc/stat", "new");
        assert_eq!(fs.read_to_string(Path::new("/proc/stat")).unwrap(), "new");

        assert_eq!(fs.remove_file("/proc/stat").as_deref(), Some("new"));
        assert!(!fs.exists(Path::new("/proc/stat")));
    }

    #[test]
    fn test_mock_fs_statvfs() {
        let mut fs = MockFs::new();
        let usage = FsUsage {
            block_size: 4096,
            blocks: 1000,
            blocks_free: 250,
            ..Default::default()
        };
        fs.add_usage("/data", usage);

        assert_eq!(fs.statvfs(Path::new("/data")).unwrap(), usage);
        let err = fs.statvfs(Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
