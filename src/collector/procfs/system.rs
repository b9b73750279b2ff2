//! System collector for reading raw metric sources from `/proc`, `/sys` and `/etc`.

use std::io;
use std::net::IpAddr;
use std::path::Path;

use tracing::{debug, warn};

use crate::collector::procfs::parser::{
    CpuInfoProcessor, DiskStats, GlobalStat, LoadAvg, MountEntry, NetDevStats, OsRelease,
    ParsedTable, Uptime, parse_cpuinfo, parse_diskstats, parse_global_stat, parse_hosts,
    parse_key_values, parse_loadavg, parse_mounts, parse_net_dev, parse_os_release,
    parse_passwd, parse_status_euid, parse_uptime, parse_version,
};
use crate::collector::traits::{FileSystem, FsUsage};
use crate::sampler::CpuFilter;

const OS_RELEASE_PATH: &str = "/etc/os-release";
const DMI_PATH: &str = "/sys/devices/virtual/dmi/id";
const HOSTS_PATH: &str = "/etc/hosts";
const PASSWD_PATH: &str = "/etc/passwd";
const MTAB_PATH: &str = "/etc/mtab";

/// Device-tree files (POWER, ARM) and the identity keys they fill.
const DEVICE_TREE_FIELDS: &[(&str, &str)] = &[
    ("compatible", "compatible"),
    ("model", "model"),
    ("part-number", "part_number"),
    ("serial-number", "serial_number"),
    ("system-id", "system_id"),
    ("vendor", "vendor"),
];

/// DMI files (x86) and the identity keys they fill.
const DMI_FIELDS: &[(&str, &str)] = &[
    ("product_serial", "serial_number"),
    ("product_name", "model"),
    ("sys_vendor", "vendor"),
];

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// Source file or command could not be read; its section is omitted.
    SourceUnavailable { source: String, error: io::Error },
    /// A line had the wrong shape and was skipped.
    MalformedRecord { source: String, line: String },
    /// Source content could not be parsed at all.
    Parse(String),
}

impl CollectError {
    pub fn unavailable(source: impl Into<String>, error: io::Error) -> Self {
        CollectError::SourceUnavailable {
            source: source.into(),
            error,
        }
    }
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::SourceUnavailable { source, error } => {
                write!(f, "{} unavailable: {}", source, error)
            }
            CollectError::MalformedRecord { source, line } => {
                write!(f, "malformed record in {}: {:?}", source, line)
            }
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::SourceUnavailable { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Host identity strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub hostname: String,
    pub short_hostname: String,
    /// Canonical names of the host, reported as `fullhostname1..N`.
    pub full_hostnames: Vec<String>,
    /// `<iface>_IP4` / `<iface>_IP6` keys, one address per key.
    pub addresses: Vec<(String, String)>,
    /// Hardware fields in discovery order, one value per key.
    pub hardware: Vec<(&'static str, String)>,
}

impl Identity {
    /// Adds interface addresses; the first address of each family per
    /// interface wins.
    pub fn add_addresses(&mut self, addresses: Vec<(String, IpAddr)>) {
        for (interface, ip) in addresses {
            let family = if ip.is_ipv4() { "IP4" } else { "IP6" };
            let key = format!("{}_{}", interface, family);
            if !self.addresses.iter().any(|(k, _)| *k == key) {
                self.addresses.push((key, ip.to_string()));
            }
        }
    }
}

/// Effective user of the sampler process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: u32,
    pub name: String,
}

/// A mounted block-device filesystem and its usage.
#[derive(Debug, Clone, PartialEq)]
pub struct Filesystem {
    pub mount: MountEntry,
    /// `None` when `statvfs` failed for the mount point.
    pub usage: Option<FsUsage>,
}

/// Reads raw metric sources.
///
/// Owns the filesystem handle; every method re-reads its source so values
/// always reflect the current cycle.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    fn proc_file(&self, name: &str) -> String {
        format!("{}/{}", self.proc_path, name)
    }

    /// Reads a whole source file.
    pub fn read_source(&self, path: &str) -> Result<String, CollectError> {
        self.fs
            .read_to_string(Path::new(path))
            .map_err(|e| CollectError::unavailable(path, e))
    }

    /// Reads the first line of a file, trimmed of whitespace and NULs.
    fn read_first_line(&self, path: &str) -> Option<String> {
        let content = self.fs.read_to_string(Path::new(path)).ok()?;
        let line = content
            .lines()
            .next()?
            .trim_matches(|c: char| c == '\0' || c.is_whitespace());
        (!line.is_empty()).then(|| line.to_string())
    }

    /// Collects CPU and scheduler counters from `/proc/stat`.
    pub fn collect_stat(&self) -> Result<GlobalStat, CollectError> {
        let path = self.proc_file("stat");
        let content = self.read_source(&path)?;
        let mut stat = parse_global_stat(&content).map_err(|e| CollectError::Parse(e.message))?;
        log_malformed(&path, std::mem::take(&mut stat.malformed));
        Ok(stat)
    }

    /// Collects `/proc/meminfo` as normalized key/value pairs.
    pub fn collect_meminfo(&self) -> Result<Vec<(String, i64)>, CollectError> {
        self.collect_key_values("meminfo")
    }

    /// Collects `/proc/vmstat` as normalized key/value pairs.
    pub fn collect_vmstat(&self) -> Result<Vec<(String, i64)>, CollectError> {
        self.collect_key_values("vmstat")
    }

    fn collect_key_values(&self, name: &str) -> Result<Vec<(String, i64)>, CollectError> {
        let path = self.proc_file(name);
        let content = self.read_source(&path)?;
        Ok(skip_malformed(&path, parse_key_values(&content)))
    }

    /// Collects load average from `/proc/loadavg`.
    pub fn collect_loadavg(&self) -> Result<LoadAvg, CollectError> {
        let content = self.read_source(&self.proc_file("loadavg"))?;
        parse_loadavg(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Collects uptime from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<Uptime, CollectError> {
        let content = self.read_source(&self.proc_file("uptime"))?;
        parse_uptime(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Collects disk I/O statistics from `/proc/diskstats`.
    pub fn collect_diskstats(&self) -> Result<Vec<DiskStats>, CollectError> {
        let path = self.proc_file("diskstats");
        let content = self.read_source(&path)?;
        Ok(skip_malformed(&path, parse_diskstats(&content)))
    }

    /// Collects network device statistics from `/proc/net/dev`.
    pub fn collect_net_dev(&self) -> Result<Vec<NetDevStats>, CollectError> {
        let path = self.proc_file("net/dev");
        let content = self.read_source(&path)?;
        Ok(skip_malformed(&path, parse_net_dev(&content)))
    }

    /// Collects processor descriptions from `/proc/cpuinfo`.
    pub fn collect_cpuinfo(&self) -> Result<Vec<CpuInfoProcessor>, CollectError> {
        let content = self.read_source(&self.proc_file("cpuinfo"))?;
        Ok(parse_cpuinfo(&content))
    }

    /// Collects the kernel banner from `/proc/version`.
    pub fn collect_version(&self) -> Result<String, CollectError> {
        let content = self.read_source(&self.proc_file("version"))?;
        parse_version(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Collects distribution info from `/etc/os-release`.
    pub fn collect_os_release(&self) -> Result<OsRelease, CollectError> {
        let content = self.read_source(OS_RELEASE_PATH)?;
        Ok(parse_os_release(&content))
    }

    /// Collects hostname, canonical names from `/etc/hosts` and hardware
    /// identity. Interface addresses are added by the caller.
    ///
    /// Hardware fields come from the device tree when present, then DMI;
    /// the first source to provide a key wins.
    pub fn collect_identity(&self) -> Result<Identity, CollectError> {
        let hostname_path = self.proc_file("sys/kernel/hostname");
        let hostname = self.read_source(&hostname_path)?.trim().to_string();
        if hostname.is_empty() {
            return Err(CollectError::Parse("empty hostname".to_string()));
        }
        let short_hostname = hostname.split('.').next().unwrap_or(&hostname).to_string();

        let mut hardware: Vec<(&'static str, String)> = Vec::new();
        let device_tree = self.proc_file("device-tree");
        let sources = [
            (device_tree.as_str(), DEVICE_TREE_FIELDS),
            (DMI_PATH, DMI_FIELDS),
        ];
        for (dir, fields) in sources {
            if !self.fs.exists(Path::new(dir)) {
                continue;
            }
            for &(file, key) in fields {
                if hardware.iter().any(|(k, _)| *k == key) {
                    continue;
                }
                if let Some(value) = self.read_first_line(&format!("{}/{}", dir, file)) {
                    hardware.push((key, value));
                }
            }
        }

        let full_hostnames = self
            .fs
            .read_to_string(Path::new(HOSTS_PATH))
            .map(|hosts| parse_hosts(&hosts, &hostname))
            .unwrap_or_default();

        Ok(Identity {
            hostname,
            short_hostname,
            full_hostnames,
            addresses: Vec::new(),
            hardware,
        })
    }

    /// Resolves the effective uid of this process to a user name.
    pub fn collect_user(&self) -> Result<UserIdentity, CollectError> {
        let status = self.read_source(&self.proc_file("self/status"))?;
        let uid = parse_status_euid(&status).map_err(|e| CollectError::Parse(e.message))?;
        let passwd = self.read_source(PASSWD_PATH)?;
        let name = parse_passwd(&passwd)
            .remove(&uid)
            .ok_or_else(|| CollectError::Parse(format!("uid {} not in {}", uid, PASSWD_PATH)))?;
        Ok(UserIdentity { uid, name })
    }

    /// Collects mounted block-device filesystems with their usage.
    ///
    /// Reads `/etc/mtab`, falling back to `<proc>/self/mounts`. Only
    /// entries whose device is a path are kept, excluding `/dev/loop*`
    /// (snap images). A device mounted twice is reported once.
    pub fn collect_filesystems(&self) -> Result<Vec<Filesystem>, CollectError> {
        let (path, content) = match self.read_source(MTAB_PATH) {
            Ok(content) => (MTAB_PATH.to_string(), content),
            Err(e) => {
                debug!("{}, trying mounts", e);
                let path = self.proc_file("self/mounts");
                let content = self.read_source(&path)?;
                (path, content)
            }
        };

        let mut filesystems: Vec<Filesystem> = Vec::new();
        for mount in skip_malformed(&path, parse_mounts(&content)) {
            if !mount.fsname.starts_with('/')
                || mount.fsname.starts_with("/dev/loop")
                || filesystems.iter().any(|f| f.mount.fsname == mount.fsname)
            {
                continue;
            }
            let usage = match self.fs.statvfs(Path::new(&mount.dir)) {
                Ok(usage) => Some(usage),
                Err(e) => {
                    warn!("statvfs {} failed: {}", mount.dir, e);
                    None
                }
            };
            filesystems.push(Filesystem { mount, usage });
        }
        Ok(filesystems)
    }

    /// Reads an allowed-CPU list such as `cpuset.cpus.effective`.
    pub fn collect_cpuset(&self, path: &str) -> Result<CpuFilter, CollectError> {
        let content = self.read_source(path)?;
        CpuFilter::from_list(content.trim())
            .map_err(|e| CollectError::Parse(format!("{}: {}", path, e.message)))
    }
}

fn log_malformed(source: &str, lines: Vec<String>) {
    for line in lines {
        let err = CollectError::MalformedRecord {
            source: source.to_string(),
            line,
        };
        warn!("{}", err);
    }
}

fn skip_malformed<T>(source: &str, table: ParsedTable<T>) -> Vec<T> {
    log_malformed(source, table.malformed);
    table.records
}
