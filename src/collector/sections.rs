//! Section writers.
//!
//! Each function emits one complete top-level section from already collected
//! and sampled data. None of them read sources or touch rate state.

use std::io::Write;

use chrono::{DateTime, Local, Utc};

use crate::collector::procfs::{Filesystem, Identity, UserIdentity};
use crate::collector::procfs::parser::{CpuInfoProcessor, LoadAvg, OsRelease, Uptime};
use crate::config::SamplerConfig;
use crate::output::{JsonError, JsonWriter};
use crate::sampler::{CpuFilter, CpuReport, RateRecord};

/// Per-cycle values that do not come from a metric source.
#[derive(Debug, Clone, Copy)]
pub struct CycleContext {
    /// Seconds since the previous cycle.
    pub elapsed: f64,
    /// Zero-based index of this document.
    pub loop_index: u64,
    pub now: DateTime<Utc>,
}

/// Scalar `/proc/stat` values for the `counters` subsection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatCounters {
    pub ctxt: Option<f64>,
    pub btime: Option<u64>,
    pub processes_forks: Option<f64>,
    pub procs_running: Option<u64>,
    pub procs_blocked: Option<u64>,
}

/// Rates and gauges for one tracked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySample {
    pub name: String,
    pub rates: RateRecord,
    pub gauges: Vec<(&'static str, u64)>,
}

fn write_record<W: Write>(w: &mut JsonWriter<W>, record: &RateRecord) -> Result<(), JsonError> {
    for (field, rate) in record.iter() {
        w.write_float(field, rate)?;
    }
    Ok(())
}

pub fn write_timestamp<W: Write>(
    w: &mut JsonWriter<W>,
    ctx: &CycleContext,
    config: &SamplerConfig,
) -> Result<(), JsonError> {
    let local: DateTime<Local> = ctx.now.with_timezone(&Local);

    w.open_section("timestamp")?;
    w.write_string("datetime", &local.format("%Y-%m-%dT%H:%M:%S").to_string())?;
    w.write_string("utc", &ctx.now.format("%Y-%m-%dT%H:%M:%S").to_string())?;
    w.write_uint("snapshot_seconds", config.interval_secs)?;
    w.write_uint("snapshot_maxloops", config.count)?;
    w.write_uint("snapshot_loop", ctx.loop_index)?;
    w.close_section()
}

pub fn write_sampler<W: Write>(
    w: &mut JsonWriter<W>,
    config: &SamplerConfig,
    collecting: &str,
    user: Option<&UserIdentity>,
) -> Result<(), JsonError> {
    w.open_section("sampler")?;
    w.write_string("command", &config.command_line)?;
    w.write_uint("sample_interval_seconds", config.interval_secs)?;
    w.write_uint("sample_num", config.count)?;
    w.write_string("version", env!("CARGO_PKG_VERSION"))?;
    w.write_string("collecting", collecting)?;
    match user {
        Some(user) => {
            w.write_string("username", &user.name)?;
            w.write_uint("userid", u64::from(user.uid))?;
        }
        None => w.write_string("username", "unknown")?,
    }
    w.close_section()
}

pub fn write_identity<W: Write>(
    w: &mut JsonWriter<W>,
    identity: &Identity,
) -> Result<(), JsonError> {
    w.open_section("identity")?;
    w.write_string("hostname", &identity.hostname)?;
    w.write_string("shorthostname", &identity.short_hostname)?;
    for (i, name) in identity.full_hostnames.iter().enumerate() {
        w.write_string(&format!("fullhostname{}", i + 1), name)?;
    }
    for (key, value) in &identity.addresses {
        w.write_string(key, value)?;
    }
    for (key, value) in &identity.hardware {
        w.write_string(key, value)?;
    }
    w.close_section()
}

pub fn write_os_release<W: Write>(
    w: &mut JsonWriter<W>,
    release: &OsRelease,
) -> Result<(), JsonError> {
    w.open_section("os_release")?;
    let fields = [
        ("name", &release.name),
        ("version", &release.version),
        ("pretty_name", &release.pretty_name),
        ("version_id", &release.version_id),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            w.write_string(key, value)?;
        }
    }
    w.close_section()
}

pub fn write_proc_version<W: Write>(w: &mut JsonWriter<W>, version: &str) -> Result<(), JsonError> {
    w.open_section("proc_version")?;
    w.write_string("version", version)?;
    w.close_section()
}

/// Writes one `procN` subsection per allowed processor.
pub fn write_cpuinfo<W: Write>(
    w: &mut JsonWriter<W>,
    processors: &[CpuInfoProcessor],
    filter: &CpuFilter,
) -> Result<(), JsonError> {
    w.open_section("cpuinfo")?;
    for p in processors.iter().filter(|p| filter.is_allowed(p.processor)) {
        w.open_subsection(&format!("proc{}", p.processor))?;
        if let Some(v) = &p.vendor_id {
            w.write_string("vendor_id", v)?;
        }
        if let Some(v) = p.cpu_mhz {
            w.write_float("cpu_mhz", v)?;
        }
        if let Some(v) = p.cache_size {
            w.write_float("cache_size", v)?;
        }
        if let Some(v) = p.physical_id {
            w.write_int("physical_id", v)?;
        }
        if let Some(v) = p.siblings {
            w.write_int("siblings", v)?;
        }
        if let Some(v) = p.core_id {
            w.write_int("core_id", v)?;
        }
        if let Some(v) = p.cpu_cores {
            w.write_int("cpu_cores", v)?;
        }
        if let Some(v) = &p.model_name {
            w.write_string("model_name", v)?;
        }
        if let Some(v) = p.mhz_clock {
            w.write_float("mhz_clock", v)?;
        }
        w.close_subsection()?;
    }
    w.close_section()
}

pub fn write_lscpu<W: Write>(
    w: &mut JsonWriter<W>,
    fields: &[(&'static str, String)],
) -> Result<(), JsonError> {
    w.open_section("lscpu")?;
    for (key, value) in fields {
        w.write_string(key, value)?;
    }
    w.close_section()
}

/// Splices `lshw -json` output as the value of the top-level `lshw` key.
pub fn write_lshw<W: Write>(w: &mut JsonWriter<W>, blob: &[u8]) -> Result<(), JsonError> {
    w.write_raw_value("lshw", blob)
}

pub fn write_stat<W: Write>(
    w: &mut JsonWriter<W>,
    cpus: &CpuReport,
    counters: &StatCounters,
) -> Result<(), JsonError> {
    w.open_section("stat")?;

    if let Some((scope, record)) = &cpus.total {
        w.open_subsection(scope.section_name())?;
        write_record(w, record)?;
        w.close_subsection()?;
    }
    for (id, record) in &cpus.cpus {
        w.open_subsection(&format!("cpu{}", id))?;
        write_record(w, record)?;
        w.close_subsection()?;
    }

    w.open_subsection("counters")?;
    if let Some(v) = counters.ctxt {
        w.write_float("ctxt", v)?;
    }
    if let Some(v) = counters.btime {
        w.write_uint("btime", v)?;
    }
    if let Some(v) = counters.processes_forks {
        w.write_float("processes_forks", v)?;
    }
    if let Some(v) = counters.procs_running {
        w.write_uint("procs_running", v)?;
    }
    if let Some(v) = counters.procs_blocked {
        w.write_uint("procs_blocked", v)?;
    }
    w.close_subsection()?;

    w.close_section()
}

/// Writes `name value` pairs as integers (`proc_meminfo`, `proc_vmstat`).
pub fn write_key_values<W: Write>(
    w: &mut JsonWriter<W>,
    section: &str,
    values: &[(String, i64)],
) -> Result<(), JsonError> {
    w.open_section(section)?;
    for (key, value) in values {
        w.write_int(key, *value)?;
    }
    w.close_section()
}

pub fn write_uptime<W: Write>(w: &mut JsonWriter<W>, uptime: &Uptime) -> Result<(), JsonError> {
    w.open_section("proc_uptime")?;
    w.write_uint("total_seconds", uptime.total_seconds)?;
    w.write_uint("days", uptime.days())?;
    w.write_uint("hours", uptime.hours())?;
    w.close_section()
}

pub fn write_loadavg<W: Write>(w: &mut JsonWriter<W>, load: &LoadAvg) -> Result<(), JsonError> {
    w.open_section("proc_loadavg")?;
    w.write_float("load_avg_1min", load.load1)?;
    w.write_float("load_avg_5min", load.load5)?;
    w.write_float("load_avg_15min", load.load15)?;
    w.close_section()
}

/// Writes one subsection per entity (`disks`, `network_interfaces`).
pub fn write_entities<W: Write>(
    w: &mut JsonWriter<W>,
    section: &str,
    entities: &[EntitySample],
) -> Result<(), JsonError> {
    w.open_section(section)?;
    for entity in entities {
        w.open_subsection(&entity.name)?;
        write_record(w, &entity.rates)?;
        for (key, value) in &entity.gauges {
            w.write_uint(key, *value)?;
        }
        w.close_subsection()?;
    }
    w.close_section()
}

const MIB: u64 = 1024 * 1024;

fn blocks_to_mib(blocks: u64, block_size: u64) -> u64 {
    blocks.saturating_mul(block_size) / MIB
}

/// Writes one subsection per mounted device, keyed by device path.
///
/// Sizes are in MiB. Usage fields are left out when `statvfs` failed, and
/// `fs_full_percent` when the filesystem reports no blocks.
pub fn write_filesystems<W: Write>(
    w: &mut JsonWriter<W>,
    filesystems: &[Filesystem],
) -> Result<(), JsonError> {
    w.open_section("filesystems")?;
    for fs in filesystems {
        let mount = &fs.mount;
        w.open_subsection(&mount.fsname)?;
        w.write_string("fs_dir", &mount.dir)?;
        w.write_string("fs_type", &mount.fs_type)?;
        w.write_string("fs_opts", &mount.opts)?;
        w.write_int("fs_freqs", mount.freq)?;
        w.write_int("fs_passno", mount.passno)?;
        if let Some(usage) = &fs.usage {
            let size = blocks_to_mib(usage.blocks, usage.block_size);
            let free = blocks_to_mib(usage.blocks_free, usage.block_size);
            w.write_uint("fs_bsize", usage.block_size)?;
            w.write_uint("fs_size_mb", size)?;
            w.write_uint("fs_free_mb", free)?;
            w.write_uint("fs_used_mb", size.saturating_sub(free))?;
            if usage.blocks > 0 {
                let used = usage.blocks.saturating_sub(usage.blocks_free) as f64;
                w.write_float("fs_full_percent", used / usage.blocks as f64 * 100.0)?;
            }
            w.write_uint("fs_avail", blocks_to_mib(usage.blocks_avail, usage.block_size))?;
            w.write_uint("fs_files", usage.files)?;
            w.write_uint("fs_files_free", usage.files_free)?;
            w.write_uint("fs_namelength", usage.name_max)?;
        }
        w.close_subsection()?;
    }
    w.close_section()
}
