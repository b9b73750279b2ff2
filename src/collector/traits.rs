//! Abstractions for filesystem and command access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the collector read the real `/proc` on Linux
//! (and query mounted filesystems with `statvfs`) or an in-memory tree in
//! tests. `CommandRunner` does the same for the
//! external programs used for device discovery and hardware inventory.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::Command;

/// Size and inode counts of a mounted filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsUsage {
    /// Block size in bytes; every block count below is in these units.
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    /// Free blocks available to unprivileged users.
    pub blocks_avail: u64,
    pub files: u64,
    pub files_free: u64,
    /// Maximum filename length.
    pub name_max: u64,
}

/// Abstraction for filesystem operations.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Queries usage of the filesystem mounted at `path`.
    fn statvfs(&self, path: &Path) -> io::Result<FsUsage>;
}

/// Real filesystem implementation over `std::fs` and `libc::statvfs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    #[allow(clippy::unnecessary_cast)]
    fn statvfs(&self, path: &Path) -> io::Result<FsUsage> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        // SAFETY: `c_path` is a valid NUL-terminated string and `stat` is a
        // plain C struct that statvfs fully initializes on success.
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(FsUsage {
            block_size: stat.f_bsize as u64,
            blocks: stat.f_blocks as u64,
            blocks_free: stat.f_bfree as u64,
            blocks_avail: stat.f_bavail as u64,
            files: stat.f_files as u64,
            files_free: stat.f_ffree as u64,
            name_max: stat.f_namemax as u64,
        })
    }
}

/// Abstraction for running external programs.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and returns its standard output.
    ///
    /// A program that cannot be started or exits unsuccessfully is an error.
    fn run(&self, program: &str, args: &[String]) -> io::Result<Vec<u8>>;
}

/// Runs commands with `std::process::Command`.
///
/// No timeout is applied; a hung command blocks the cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealCommands;

impl RealCommands {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for RealCommands {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Vec<u8>> {
        let output = Command::new(program).args(args).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {}",
                program, output.status
            )));
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_real_fs_read_to_string() {
        let fs = RealFs::new();
        // Read Cargo.toml which should exist in project root
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        let content = fs.read_to_string(&cargo_toml).unwrap();
        assert!(content.contains("[package]"));
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        assert!(fs.exists(&cargo_toml));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_statvfs() {
        let fs = RealFs::new();
        let usage = fs.statvfs(&env::current_dir().unwrap()).unwrap();
        assert!(usage.block_size > 0);
        assert!(usage.blocks_free <= usage.blocks);
        assert!(fs.statvfs(Path::new("/nonexistent/path/12345")).is_err());
    }

    #[test]
    fn test_real_commands_missing_program() {
        let runner = RealCommands::new();
        assert!(runner.run("/nonexistent/statstream-test-bin", &[]).is_err());
    }
}
