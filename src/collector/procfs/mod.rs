//! Collectors for Linux `/proc` filesystem.
//!
//! This module provides parsers and a collector for reading system
//! information from the `/proc` virtual filesystem and a few neighbours
//! (`/sys` identity files, `/etc/os-release`, `/etc/passwd`, the mount
//! table).

pub mod parser;
pub mod system;

pub use parser::ParseError;
pub use system::{CollectError, Filesystem, Identity, SystemCollector, UserIdentity};
