//! Sampler configuration.
//!
//! Values only: the daemon builds a `SamplerConfig` from its command line and
//! the collector consumes it. Everything is serializable so the effective
//! configuration can be dumped with `--print-config`.

use serde::{Deserialize, Serialize};

use crate::output::DEFAULT_CAPACITY;
use crate::sampler::{CpuFilter, DEFAULT_MAX_CPUS};

/// External program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Drop the first output line (column header) when listing entities.
    #[serde(default)]
    pub skip_header: bool,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str], skip_header: bool) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            skip_header,
        }
    }

    /// Command line as a single string, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Interval must be at least one second.
    InvalidInterval(u64),
    /// Per-CPU table must hold at least one CPU.
    InvalidMaxCpus(usize),
    /// Sink buffer must hold at least one byte.
    InvalidBufferSize(usize),
    /// Restricted CPU filter with no CPUs.
    EmptyCpuFilter,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidInterval(secs) => {
                write!(f, "interval must be positive, got {}", secs)
            }
            ConfigError::InvalidMaxCpus(n) => write!(f, "max cpus must be positive, got {}", n),
            ConfigError::InvalidBufferSize(n) => {
                write!(f, "buffer size must be positive, got {}", n)
            }
            ConfigError::EmptyCpuFilter => write!(f, "allowed cpu list is empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the collector needs to know about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds between cycles.
    pub interval_secs: u64,
    /// Number of documents to emit; 0 runs until interrupted.
    pub count: u64,
    /// Root of the proc filesystem.
    pub proc_path: String,
    pub cpu_filter: CpuFilter,
    /// Capacity of the per-CPU baseline table.
    pub max_cpus: usize,
    /// Disk name prefixes that are never tracked.
    pub disk_exclude: Vec<String>,
    /// Interface name prefixes that are never tracked.
    pub net_exclude: Vec<String>,
    pub disk_discovery: CommandSpec,
    pub net_discovery: CommandSpec,
    /// Interface addresses for the `identity` section.
    pub addresses: CommandSpec,
    pub lscpu: CommandSpec,
    pub lshw: CommandSpec,
    /// Splice `lshw -json` output into every document.
    pub collect_lshw: bool,
    /// Output sink buffer capacity in bytes.
    pub buffer_size: usize,
    /// Command line reported in the `sampler` section.
    pub command_line: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            count: 0,
            proc_path: "/proc".to_string(),
            cpu_filter: CpuFilter::All,
            max_cpus: DEFAULT_MAX_CPUS,
            disk_exclude: vec!["loop".to_string()],
            net_exclude: vec!["veth".to_string()],
            disk_discovery: CommandSpec::new(
                "lsblk",
                &["--nodeps", "--output", "NAME,TYPE", "--raw"],
                true,
            ),
            net_discovery: CommandSpec::new("ip", &["-brief", "link"], false),
            addresses: CommandSpec::new("ip", &["-brief", "address"], false),
            lscpu: CommandSpec::new("lscpu", &[], false),
            lshw: CommandSpec::new("lshw", &["-json"], false),
            collect_lshw: false,
            buffer_size: DEFAULT_CAPACITY,
            command_line: String::new(),
        }
    }
}

impl SamplerConfig {
    /// Checks values the collector cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidInterval(self.interval_secs));
        }
        if self.max_cpus == 0 {
            return Err(ConfigError::InvalidMaxCpus(self.max_cpus));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize(self.buffer_size));
        }
        if let CpuFilter::Only(set) = &self.cpu_filter
            && set.is_empty()
        {
            return Err(ConfigError::EmptyCpuFilter);
        }
        Ok(())
    }

    pub fn is_pseudo_disk(&self, name: &str) -> bool {
        self.disk_exclude.iter().any(|p| name.starts_with(p.as_str()))
    }

    pub fn is_pseudo_interface(&self, name: &str) -> bool {
        self.net_exclude.iter().any(|p| name.starts_with(p.as_str()))
    }
}
