//! Parsers for `/proc` files and external command output.
//!
//! These are pure functions that parse the content of various sources into
//! structured data. They are designed to be easily testable with string inputs.

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Records parsed from a line-oriented source, plus lines that did not fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable<T> {
    pub records: Vec<T>,
    /// Raw lines that had the wrong shape.
    pub malformed: Vec<String>,
}

impl<T> Default for ParsedTable<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: Vec::new(),
        }
    }
}

// ============ /proc/stat ============

/// One `cpu` / `cpuN` line from `/proc/stat`, in jiffies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    pub cpu_id: Option<u32>, // None for aggregate "cpu" line
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

/// Global stats from `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalStat {
    pub cpus: Vec<CpuStat>,
    pub ctxt: Option<u64>,
    pub btime: Option<u64>,
    pub processes: Option<u64>,
    pub procs_running: Option<u64>,
    pub procs_blocked: Option<u64>,
    /// CPU lines with a non-numeric or missing core column.
    pub malformed: Vec<String>,
}

/// Columns of a `cpu` line; older kernels stop after `idle`.
const CPU_COLUMNS: usize = 10;
const CPU_MIN_COLUMNS: usize = 4;

/// Parses every token as a counter, `None` if any of them is not a number.
fn parse_counters(tokens: &[&str]) -> Option<Vec<u64>> {
    tokens.iter().map(|s| s.parse().ok()).collect()
}

/// Parses `/proc/stat` content.
///
/// CPU lines with an unparsable index are skipped. Missing trailing columns
/// (older kernels) read as zero; a column that is present but not a number
/// makes the whole line malformed.
pub fn parse_global_stat(content: &str) -> Result<GlobalStat, ParseError> {
    let mut stat = GlobalStat::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&label) = parts.first() else {
            continue;
        };

        let value = || parts.get(1).and_then(|s| s.parse::<u64>().ok());

        if let Some(suffix) = label.strip_prefix("cpu") {
            let cpu_id = if suffix.is_empty() {
                None
            } else if let Ok(id) = suffix.parse() {
                Some(id)
            } else {
                continue;
            };

            let columns = &parts[1..parts.len().min(CPU_COLUMNS + 1)];
            let counters = match parse_counters(columns) {
                Some(c) if c.len() >= CPU_MIN_COLUMNS => c,
                _ => {
                    stat.malformed.push(line.to_string());
                    continue;
                }
            };
            let get_val = |idx: usize| counters.get(idx).copied().unwrap_or(0);

            stat.cpus.push(CpuStat {
                cpu_id,
                user: get_val(0),
                nice: get_val(1),
                system: get_val(2),
                idle: get_val(3),
                iowait: get_val(4),
                irq: get_val(5),
                softirq: get_val(6),
                steal: get_val(7),
                guest: get_val(8),
                guest_nice: get_val(9),
            });
        } else {
            match label {
                "ctxt" => stat.ctxt = value(),
                "btime" => stat.btime = value(),
                "processes" => stat.processes = value(),
                "procs_running" => stat.procs_running = value(),
                "procs_blocked" => stat.procs_blocked = value(),
                _ => {}
            }
        }
    }

    if stat.cpus.is_empty() {
        return Err(ParseError::new("no cpu lines in stat"));
    }

    Ok(stat)
}

// ============ /proc/loadavg, /proc/uptime ============

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load1 = parts[0]
        .parse()
        .map_err(|_| ParseError::new("invalid load1"))?;
    let load5 = parts[1]
        .parse()
        .map_err(|_| ParseError::new("invalid load5"))?;
    let load15 = parts[2]
        .parse()
        .map_err(|_| ParseError::new("invalid load15"))?;

    Ok(LoadAvg {
        load1,
        load5,
        load15,
    })
}

/// Parsed data from `/proc/uptime`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uptime {
    pub total_seconds: u64,
}

impl Uptime {
    pub fn days(&self) -> u64 {
        self.total_seconds / 86_400
    }

    /// Hours past the last whole day.
    pub fn hours(&self) -> u64 {
        (self.total_seconds % 86_400) / 3_600
    }
}

/// Parses `/proc/uptime` content (`12345.67 54321.00`).
pub fn parse_uptime(content: &str) -> Result<Uptime, ParseError> {
    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?;
    let whole = first.split('.').next().unwrap_or(first);
    let total_seconds = whole
        .parse()
        .map_err(|_| ParseError::new(format!("invalid uptime: {}", first)))?;
    Ok(Uptime { total_seconds })
}

// ============ /proc/meminfo, /proc/vmstat ============

/// Parses `name value` / `name: value kB` files into normalized keys.
///
/// Keys are lowercased, `(` becomes `_` and `)` is dropped, so
/// `Active(anon):` turns into `active_anon`. Values are kept as reported
/// (kB for meminfo, counts for vmstat).
pub fn parse_key_values(content: &str) -> ParsedTable<(String, i64)> {
    let mut table = ParsedTable::default();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let normalized: String = line
            .chars()
            .filter(|c| *c != ')')
            .map(|c| match c {
                '(' => '_',
                ':' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let mut parts = normalized.split_whitespace();
        match (parts.next(), parts.next().and_then(|v| v.parse().ok())) {
            (Some(key), Some(value)) => table.records.push((key.to_string(), value)),
            _ => table.malformed.push(line.to_string()),
        }
    }

    table
}

// ============ /proc/diskstats ============

/// Parsed data from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    /// Block device major number.
    pub major: u32,
    /// Block device minor number.
    pub minor: u32,
    /// Device name (sda, nvme0n1, etc.)
    pub device: String,
    /// Number of reads completed
    pub reads: u64,
    /// Number of read requests merged
    pub r_merged: u64,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Time spent reading (ms)
    pub read_time: u64,
    /// Number of writes completed
    pub writes: u64,
    /// Number of write requests merged
    pub w_merged: u64,
    /// Number of sectors written
    pub write_sectors: u64,
    /// Time spent writing (ms)
    pub write_time: u64,
    /// Number of I/Os currently in progress
    pub io_in_progress: u64,
    /// Time spent doing I/Os (ms)
    pub io_time: u64,
    /// Weighted time spent doing I/Os (ms)
    pub io_weighted_time: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
///
/// Old-style partition lines carry only `reads r_sectors writes w_sectors`.
/// Lines of any other width are reported as malformed.
pub fn parse_diskstats(content: &str) -> ParsedTable<DiskStats> {
    let mut table = ParsedTable::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() != 7 && parts.len() < 14 {
            table.malformed.push(line.to_string());
            continue;
        }

        let width = if parts.len() == 7 { 7 } else { 14 };
        let (Ok(major), Ok(minor), Some(v)) = (
            parts[0].parse::<u32>(),
            parts[1].parse::<u32>(),
            parse_counters(&parts[3..width]),
        ) else {
            table.malformed.push(line.to_string());
            continue;
        };

        let disk = if width == 7 {
            DiskStats {
                major,
                minor,
                device: parts[2].to_string(),
                reads: v[0],
                read_sectors: v[1],
                writes: v[2],
                write_sectors: v[3],
                ..Default::default()
            }
        } else {
            DiskStats {
                major,
                minor,
                device: parts[2].to_string(),
                reads: v[0],
                r_merged: v[1],
                read_sectors: v[2],
                read_time: v[3],
                writes: v[4],
                w_merged: v[5],
                write_sectors: v[6],
                write_time: v[7],
                io_in_progress: v[8],
                io_time: v[9],
                io_weighted_time: v[10],
            }
        };
        table.records.push(disk);
    }

    table
}

// ============ /proc/net/dev ============

/// Parsed data from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub rx_fifo: u64,
    pub rx_frame: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
    pub tx_fifo: u64,
    pub tx_colls: u64,
    pub tx_carrier: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> ParsedTable<NetDevStats> {
    let mut table = ParsedTable::default();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, counters)) = line.split_once(':') else {
            table.malformed.push(line.to_string());
            continue;
        };

        let values: Vec<u64> = counters
            .split_whitespace()
            .map_while(|s| s.parse().ok())
            .collect();
        if values.len() < 16 {
            table.malformed.push(line.to_string());
            continue;
        }

        table.records.push(NetDevStats {
            interface: name.trim().to_string(),
            rx_bytes: values[0],
            rx_packets: values[1],
            rx_errs: values[2],
            rx_drop: values[3],
            rx_fifo: values[4],
            rx_frame: values[5],
            tx_bytes: values[8],
            tx_packets: values[9],
            tx_errs: values[10],
            tx_drop: values[11],
            tx_fifo: values[12],
            tx_colls: values[13],
            tx_carrier: values[14],
        });
    }

    table
}

// ============ Static header sources ============

/// Selected fields of `/etc/os-release`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsRelease {
    pub name: Option<String>,
    pub version: Option<String>,
    pub pretty_name: Option<String>,
    pub version_id: Option<String>,
}

/// Parses `/etc/os-release` content; surrounding quotes are stripped.
pub fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "NAME" => release.name = Some(value),
            "VERSION" => release.version = Some(value),
            "PRETTY_NAME" => release.pretty_name = Some(value),
            "VERSION_ID" => release.version_id = Some(value),
            _ => {}
        }
    }

    release
}

/// One processor block of `/proc/cpuinfo`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuInfoProcessor {
    pub processor: u32,
    pub vendor_id: Option<String>,
    pub cpu_mhz: Option<f64>,
    /// Leading number of `cache size` (normally KB).
    pub cache_size: Option<f64>,
    pub physical_id: Option<i64>,
    pub siblings: Option<i64>,
    pub core_id: Option<i64>,
    pub cpu_cores: Option<i64>,
    pub model_name: Option<String>,
    /// POWER `clock` line.
    pub mhz_clock: Option<f64>,
}

/// Parses `/proc/cpuinfo` content into processor blocks.
///
/// Lines before the first `processor` line are ignored.
pub fn parse_cpuinfo(content: &str) -> Vec<CpuInfoProcessor> {
    let mut processors: Vec<CpuInfoProcessor> = Vec::new();

    fn leading_f64(value: &str) -> Option<f64> {
        value
            .split_whitespace()
            .next()
            .and_then(|v| v.trim_end_matches("MHz").parse().ok())
    }

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key == "processor" {
            if let Ok(processor) = value.parse() {
                processors.push(CpuInfoProcessor {
                    processor,
                    ..Default::default()
                });
            }
            continue;
        }

        let Some(current) = processors.last_mut() else {
            continue;
        };
        match key {
            "vendor_id" => current.vendor_id = Some(value.to_string()),
            "cpu MHz" => current.cpu_mhz = leading_f64(value),
            "cache size" => current.cache_size = leading_f64(value),
            "physical id" => current.physical_id = value.parse().ok(),
            "siblings" => current.siblings = value.parse().ok(),
            "core id" => current.core_id = value.parse().ok(),
            "cpu cores" => current.cpu_cores = value.parse().ok(),
            "model name" => current.model_name = Some(value.to_string()),
            "clock" => current.mhz_clock = leading_f64(value),
            _ => {}
        }
    }

    processors
}

/// `lscpu` labels and the keys they are reported under.
const LSCPU_FIELDS: &[(&str, &str)] = &[
    ("Architecture", "architecture"),
    ("Byte Order", "byte_order"),
    ("CPU(s)", "cpus"),
    ("On-line CPU(s) list", "online_cpu_list"),
    ("Off-line CPU(s) list", "offline_cpu_list"),
    ("Model", "model"),
    ("Model name", "model_name"),
    ("Thread(s) per core", "threads_per_core"),
    ("Core(s) per socket", "cores_per_socket"),
    ("Socket(s)", "sockets"),
    ("NUMA node(s)", "numa_nodes"),
    ("CPU MHz", "cpu_mhz"),
    ("CPU max MHz", "cpu_max_mhz"),
    ("CPU min MHz", "cpu_min_mhz"),
    ("BogoMIPS", "bogomips"),
    ("Vendor ID", "vendor_id"),
    ("CPU family", "cpu_family"),
    ("Stepping", "stepping"),
];

/// Parses `lscpu` output, keeping the known labels in output order.
///
/// Labels repeated per CPU cluster (big.LITTLE) keep their first value.
pub fn parse_lscpu(content: &str) -> Vec<(&'static str, String)> {
    let mut fields: Vec<(&'static str, String)> = Vec::new();

    for line in content.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim();
        if let Some(&(_, key)) = LSCPU_FIELDS.iter().find(|(l, _)| *l == label)
            && !fields.iter().any(|(k, _)| *k == key)
        {
            fields.push((key, value.trim().to_string()));
        }
    }

    fields
}

/// First line of `/proc/version`.
pub fn parse_version(content: &str) -> Result<String, ParseError> {
    content
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ParseError::new("empty version"))
}

// ============ Mounts and accounts ============

/// One entry of a mount table (`/etc/mtab`, `/proc/self/mounts`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountEntry {
    pub fsname: String,
    pub dir: String,
    pub fs_type: String,
    pub opts: String,
    pub freq: i64,
    pub passno: i64,
}

/// Undoes the octal escapes (`\040` for space) used in mount tables.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(code) = bytes
                .get(i + 1..i + 4)
                .and_then(|d| std::str::from_utf8(d).ok())
                .and_then(|d| u8::from_str_radix(d, 8).ok())
        {
            out.push(code);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parses mount table content.
///
/// Format: fsname dir type options freq passno. Missing `freq`/`passno`
/// read as zero; fewer than four fields or a non-numeric `freq`/`passno`
/// make the line malformed.
pub fn parse_mounts(content: &str) -> ParsedTable<MountEntry> {
    let mut table = ParsedTable::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || parts.len() > 6 {
            table.malformed.push(line.to_string());
            continue;
        }
        let number = |idx: usize| parts.get(idx).map_or(Some(0), |s| s.parse::<i64>().ok());
        let (Some(freq), Some(passno)) = (number(4), number(5)) else {
            table.malformed.push(line.to_string());
            continue;
        };

        table.records.push(MountEntry {
            fsname: unescape_mount_field(parts[0]),
            dir: unescape_mount_field(parts[1]),
            fs_type: parts[2].to_string(),
            opts: parts[3].to_string(),
            freq,
            passno,
        });
    }

    table
}

/// Parses `/etc/passwd` content into a uid to name map.
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3
            && let Ok(uid) = parts[2].parse::<u32>()
        {
            map.entry(uid).or_insert_with(|| parts[0].to_string());
        }
    }
    map
}

/// Effective uid from `/proc/<pid>/status` (`Uid: real effective saved fs`).
pub fn parse_status_euid(content: &str) -> Result<u32, ParseError> {
    let line = content
        .lines()
        .find_map(|l| l.strip_prefix("Uid:"))
        .ok_or_else(|| ParseError::new("no Uid line in status"))?;
    line.split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new(format!("invalid Uid line: {}", line.trim())))
}

/// Canonical names of `hostname` from `/etc/hosts` content.
///
/// Every line listing `hostname` (or its short form) contributes the first
/// name on that line, once.
pub fn parse_hosts(content: &str, hostname: &str) -> Vec<String> {
    let short = hostname.split('.').next().unwrap_or(hostname);
    let mut names: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("");
        let mut fields = line.split_whitespace();
        if fields.next().is_none() {
            continue;
        }
        let aliases: Vec<&str> = fields.collect();
        let Some(canonical) = aliases.first() else {
            continue;
        };
        if aliases.iter().any(|a| *a == hostname || *a == short)
            && !names.iter().any(|n| n == canonical)
        {
            names.push(canonical.to_string());
        }
    }

    names
}

// ============ Command output ============

/// Extracts entity names from tabular command output.
///
/// Takes the first column of each line; `name@peer` (as printed by
/// `ip -brief link` for veth pairs) is cut at the `@`.
pub fn parse_entity_listing(content: &str, skip_header: bool) -> Vec<String> {
    content
        .lines()
        .skip(usize::from(skip_header))
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.split('@').next().unwrap_or(name).to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parses `ip -brief address` output into `(interface, address)` pairs.
///
/// The prefix length is dropped; `name@peer` is cut at the `@`. Interfaces
/// without addresses are skipped.
pub fn parse_ip_addresses(content: &str) -> Vec<(String, IpAddr)> {
    let mut addresses = Vec::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(_state)) = (fields.next(), fields.next()) else {
            continue;
        };
        let name = name.split('@').next().unwrap_or(name);
        for field in fields {
            let addr = field.split('/').next().unwrap_or(field);
            if let Ok(ip) = addr.parse::<IpAddr>() {
                addresses.push((name.to_string(), ip));
            }
        }
    }

    addresses
}

/// Highest CPU number accepted in a CPU list.
pub const MAX_CPU_ID: u32 = 65535;

/// Parses a kernel CPU list (`0-3,8,10-11`).
///
/// CPU numbers above [`MAX_CPU_ID`] are rejected.
pub fn parse_cpu_list(list: &str) -> Result<BTreeSet<u32>, ParseError> {
    let mut cpus = BTreeSet::new();

    for item in list.trim().split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let parse = |s: &str| -> Result<u32, ParseError> {
            match s.trim().parse::<u32>() {
                Ok(cpu) if cpu <= MAX_CPU_ID => Ok(cpu),
                Ok(_) => Err(ParseError::new(format!("cpu number out of range: {}", item))),
                Err(_) => Err(ParseError::new(format!("invalid cpu list item: {}", item))),
            }
        };
        match item.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(ParseError::new(format!("invalid cpu range: {}", item)));
                }
                cpus.extend(start..=end);
            }
            None => {
                cpus.insert(parse(item)?);
            }
        }
    }

    if cpus.is_empty() {
        return Err(ParseError::new("empty cpu list"));
    }
    Ok(cpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_stat() {
        let content = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
intr 123456 0 0
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
";
        let stat = parse_global_stat(content).unwrap();

        assert_eq!(stat.cpus.len(), 3); // cpu + cpu0 + cpu1
        assert_eq!(stat.cpus[0].cpu_id, None); // aggregate
        assert_eq!(stat.cpus[0].user, 10000);
        assert_eq!(stat.cpus[1].cpu_id, Some(0));
        assert_eq!(stat.cpus[2].cpu_id, Some(1));
        assert_eq!(stat.cpus[2].softirq, 25);
        assert_eq!(stat.ctxt, Some(500000));
        assert_eq!(stat.btime, Some(1700000000));
        assert_eq!(stat.processes, Some(10000));
        assert_eq!(stat.procs_running, Some(2));
        assert_eq!(stat.procs_blocked, Some(0));
    }

    #[test]
    fn test_parse_global_stat_short_cpu_lines() {
        let stat = parse_global_stat("cpu 1 2 3 4\ncpu0 1 2 3 4\n").unwrap();
        assert_eq!(stat.cpus[1].idle, 4);
        assert_eq!(stat.cpus[1].steal, 0);
        assert_eq!(stat.ctxt, None);
    }

    #[test]
    fn test_parse_global_stat_garbled_cpu_line() {
        let content = "\
cpu  4000 0 0 0
cpu0 10?1 0 0 0
cpu1 1000 0 0 0 x
cpu2 1000 0
cpu3 1000 0 0 0
";
        let stat = parse_global_stat(content).unwrap();

        let ids: Vec<_> = stat.cpus.iter().map(|c| c.cpu_id).collect();
        assert_eq!(ids, vec![None, Some(3)]);
        assert_eq!(stat.malformed.len(), 3);
        assert!(stat.malformed[0].starts_with("cpu0"));
    }

    #[test]
    fn test_parse_global_stat_without_cpus() {
        assert!(parse_global_stat("ctxt 1\n").is_err());
    }

    #[test]
    fn test_parse_loadavg() {
        let content = "0.15 0.10 0.05 1/150 1234\n";
        let load = parse_loadavg(content).unwrap();

        assert!((load.load1 - 0.15).abs() < 0.001);
        assert!((load.load5 - 0.10).abs() < 0.001);
        assert!((load.load15 - 0.05).abs() < 0.001);
        assert!(parse_loadavg("0.1 x").is_err());
    }

    #[test]
    fn test_parse_uptime() {
        let uptime = parse_uptime("200000.53 790000.10\n").unwrap();
        assert_eq!(uptime.total_seconds, 200000);
        assert_eq!(uptime.days(), 2);
        assert_eq!(uptime.hours(), 7);
        assert!(parse_uptime("").is_err());
    }

    #[test]
    fn test_parse_key_values() {
        let content = "\
MemTotal:       16384000 kB
Active(anon):    1024000 kB
HugePages_Total:       0
garbage line
";
        let table = parse_key_values(content);

        assert_eq!(
            table.records,
            vec![
                ("memtotal".to_string(), 16384000),
                ("active_anon".to_string(), 1024000),
                ("hugepages_total".to_string(), 0),
            ]
        );
        assert_eq!(table.malformed, vec!["garbage line".to_string()]);
    }

    #[test]
    fn test_parse_diskstats() {
        let content = "\
   8       0 sda 1234 0 56789 100 5678 0 98765 200 0 150 300 0 0 0 0
   8       1 sda1 1000 50000 5000 90000
 259       0 nvme0n1 9999 0 123456 500 8888 0 654321 400 5 1000 2000 0 0 0 0
   8      16 sdb 1 2 3
";
        let table = parse_diskstats(content);
        let disks = &table.records;

        assert_eq!(disks.len(), 3);

        assert_eq!(disks[0].major, 8);
        assert_eq!(disks[0].minor, 0);
        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].reads, 1234);
        assert_eq!(disks[0].read_sectors, 56789);
        assert_eq!(disks[0].writes, 5678);
        assert_eq!(disks[0].write_sectors, 98765);
        assert_eq!(disks[0].io_time, 150);
        assert_eq!(disks[0].io_weighted_time, 300);

        // Short partition line is shuffled into place.
        assert_eq!(disks[1].device, "sda1");
        assert_eq!(disks[1].reads, 1000);
        assert_eq!(disks[1].read_sectors, 50000);
        assert_eq!(disks[1].writes, 5000);
        assert_eq!(disks[1].write_sectors, 90000);
        assert_eq!(disks[1].r_merged, 0);

        assert_eq!(disks[2].device, "nvme0n1");
        assert_eq!(disks[2].io_in_progress, 5);

        assert_eq!(table.malformed.len(), 1);
        assert!(table.malformed[0].contains("sdb"));
    }

    #[test]
    fn test_parse_diskstats_garbled_counter() {
        let content = "\
   8       0 sda 1000 x 20000 100 500 0 9000 50 0 70 150 0 0 0 0
   8       1 sda1 1000 ?? 5000 90000
   x      16 sdb 1 0 2 0 1 0 2 0 0 1 1
   8      32 sdc 1 0 2 0 1 0 2 0 0 1 1
";
        let table = parse_diskstats(content);

        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].device, "sdc");
        assert_eq!(table.malformed.len(), 3);
    }

    #[test]
    fn test_parse_net_dev() {
        let content = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
  eth0: 9876543     5678    1    2    3     4          0        10 87654321     4321    5    6    7     8       9          0
  bad0: 1 2 3
";
        let table = parse_net_dev(content);
        let devices = &table.records;

        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].interface, "lo");
        assert_eq!(devices[0].rx_bytes, 1234567);
        assert_eq!(devices[0].tx_packets, 1234);

        assert_eq!(devices[1].interface, "eth0");
        assert_eq!(devices[1].rx_errs, 1);
        assert_eq!(devices[1].rx_drop, 2);
        assert_eq!(devices[1].rx_fifo, 3);
        assert_eq!(devices[1].rx_frame, 4);
        assert_eq!(devices[1].tx_bytes, 87654321);
        assert_eq!(devices[1].tx_errs, 5);
        assert_eq!(devices[1].tx_drop, 6);
        assert_eq!(devices[1].tx_fifo, 7);
        assert_eq!(devices[1].tx_colls, 8);
        assert_eq!(devices[1].tx_carrier, 9);

        assert_eq!(table.malformed.len(), 1);
    }

    #[test]
    fn test_parse_os_release() {
        let content = "\
NAME=\"Ubuntu\"
VERSION=\"22.04.3 LTS (Jammy Jellyfish)\"
ID=ubuntu
PRETTY_NAME=\"Ubuntu 22.04.3 LTS\"
VERSION_ID=\"22.04\"
";
        let release = parse_os_release(content);
        assert_eq!(release.name.as_deref(), Some("Ubuntu"));
        assert_eq!(release.version.as_deref(), Some("22.04.3 LTS (Jammy Jellyfish)"));
        assert_eq!(release.pretty_name.as_deref(), Some("Ubuntu 22.04.3 LTS"));
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
    }

    #[test]
    fn test_parse_cpuinfo() {
        let content = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU @ 2.20GHz
cpu MHz\t\t: 2200.000
cache size\t: 56320 KB
physical id\t: 0
siblings\t: 2
core id\t\t: 0
cpu cores\t: 1

processor\t: 1
vendor_id\t: GenuineIntel
cpu MHz\t\t: 2199.998
";
        let procs = parse_cpuinfo(content);

        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0].processor, 0);
        assert_eq!(procs[0].vendor_id.as_deref(), Some("GenuineIntel"));
        assert_eq!(
            procs[0].model_name.as_deref(),
            Some("Intel(R) Xeon(R) CPU @ 2.20GHz")
        );
        assert_eq!(procs[0].cpu_mhz, Some(2200.0));
        assert_eq!(procs[0].cache_size, Some(56320.0));
        assert_eq!(procs[0].siblings, Some(2));
        assert_eq!(procs[0].cpu_cores, Some(1));
        assert_eq!(procs[1].processor, 1);
        assert_eq!(procs[1].model_name, None);
    }

    #[test]
    fn test_parse_lscpu() {
        let content = "\
Architecture:            x86_64
  CPU op-mode(s):        32-bit, 64-bit
Byte Order:              Little Endian
CPU(s):                  4
  On-line CPU(s) list:   0-3
Vendor ID:               GenuineIntel
  Model name:            Intel(R) Xeon(R) CPU @ 2.20GHz
    Thread(s) per core:  2
";
        let fields = parse_lscpu(content);

        assert_eq!(fields[0], ("architecture", "x86_64".to_string()));
        assert_eq!(fields[1], ("byte_order", "Little Endian".to_string()));
        assert_eq!(fields[2], ("cpus", "4".to_string()));
        assert_eq!(fields[3], ("online_cpu_list", "0-3".to_string()));
        assert_eq!(fields[4], ("vendor_id", "GenuineIntel".to_string()));
        assert_eq!(fields[5].0, "model_name");
        assert_eq!(fields[6], ("threads_per_core", "2".to_string()));
        assert_eq!(fields.len(), 7);
    }

    #[test]
    fn test_parse_version() {
        let version = parse_version("Linux version 6.1.0 (gcc 12.2)\n").unwrap();
        assert_eq!(version, "Linux version 6.1.0 (gcc 12.2)");
        assert!(parse_version("\n").is_err());
    }

    #[test]
    fn test_parse_entity_listing() {
        let lsblk = "NAME TYPE\nsda disk\nsdb disk\nloop0 loop\n";
        assert_eq!(
            parse_entity_listing(lsblk, true),
            vec!["sda", "sdb", "loop0"]
        );

        let ip = "lo UNKNOWN 00:00:00:00:00:00\neth0 UP 52:54:00:12:34:56\nveth1a2b@if4 UP aa:bb\n";
        assert_eq!(
            parse_entity_listing(ip, false),
            vec!["lo", "eth0", "veth1a2b"]
        );
    }

    #[test]
    fn test_parse_cpu_list() {
        let cpus = parse_cpu_list("0-3,8,10-11\n").unwrap();
        assert_eq!(
            cpus.into_iter().collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 8, 10, 11]
        );
        assert!(parse_cpu_list("").is_err());
        assert!(parse_cpu_list("3-1").is_err());
        assert!(parse_cpu_list("a").is_err());
    }

    #[test]
    fn test_parse_cpu_list_rejects_huge_ranges() {
        let err = parse_cpu_list("0-4294967295").unwrap_err();
        assert!(err.message.contains("out of range"));
        assert!(parse_cpu_list("65536").is_err());
        assert_eq!(parse_cpu_list("65535").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_lscpu_repeated_labels_keep_first() {
        let content = "\
Architecture:            aarch64
Vendor ID:               ARM
  Model name:            Cortex-A55
    Thread(s) per core:  1
  Model name:            Cortex-A76
    Thread(s) per core:  1
";
        let fields = parse_lscpu(content);

        assert_eq!(
            fields,
            vec![
                ("architecture", "aarch64".to_string()),
                ("vendor_id", "ARM".to_string()),
                ("model_name", "Cortex-A55".to_string()),
                ("threads_per_core", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_mounts() {
        let content = "\
/dev/sda1 / ext4 rw,relatime 0 1
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/sdb1 /mnt/backup\\040disk xfs rw 0 2
/dev/sdc1 /data ext4 rw
/dev/sdd1 /bad ext4 rw x 0
short line
";
        let table = parse_mounts(content);

        assert_eq!(table.records.len(), 4);
        assert_eq!(
            table.records[0],
            MountEntry {
                fsname: "/dev/sda1".to_string(),
                dir: "/".to_string(),
                fs_type: "ext4".to_string(),
                opts: "rw,relatime".to_string(),
                freq: 0,
                passno: 1,
            }
        );
        assert_eq!(table.records[2].dir, "/mnt/backup disk");
        assert_eq!(table.records[3].passno, 0);
        assert_eq!(table.malformed.len(), 2);
    }

    #[test]
    fn test_parse_passwd() {
        let content = "\
# system accounts
root:x:0:0:root:/root:/bin/bash
toor:x:0:0:duplicate:/root:/bin/sh
postgres:x:999:999::/var/lib/postgresql:/bin/bash
broken:x:notanumber:0::/:/bin/false
";
        let users = parse_passwd(content);

        assert_eq!(users.len(), 2);
        assert_eq!(users.get(&0).map(String::as_str), Some("root"));
        assert_eq!(users.get(&999).map(String::as_str), Some("postgres"));
    }

    #[test]
    fn test_parse_status_euid() {
        let content = "Name:\tstatstreamd\nUid:\t1000\t0\t0\t0\nGid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(parse_status_euid(content).unwrap(), 0);
        assert!(parse_status_euid("Name:\tx\n").is_err());
        assert!(parse_status_euid("Uid:\t1000\n").is_err());
    }

    #[test]
    fn test_parse_hosts() {
        let content = "\
127.0.0.1   localhost
10.0.0.5    db01.example.com db01   # primary
10.0.1.5    db01-mgmt.example.com db01
fe80::5     db01.example.com db01
";
        assert_eq!(
            parse_hosts(content, "db01.example.com"),
            vec![
                "db01.example.com".to_string(),
                "db01-mgmt.example.com".to_string(),
            ]
        );
        assert!(parse_hosts(content, "web01").is_empty());
    }

    #[test]
    fn test_parse_ip_addresses() {
        let content = "\
lo               UNKNOWN        127.0.0.1/8 ::1/128
eth0             UP             10.0.0.5/24 fe80::5054:ff:fe12:3456/64
eth1             DOWN
veth1a2b@if4     UP             fe80::a8bb:ccff:fedd:eeff/64
";
        let addresses = parse_ip_addresses(content);

        assert_eq!(addresses.len(), 5);
        assert_eq!(addresses[0], ("lo".to_string(), "127.0.0.1".parse().unwrap()));
        assert_eq!(addresses[2].0, "eth0");
        assert!(addresses[3].1.is_ipv6());
        assert_eq!(addresses[4].0, "veth1a2b");
    }
}
