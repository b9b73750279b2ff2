//! Sampling orchestrator.
//!
//! The `Collector` owns every piece of rate state and drives one cycle:
//! read sources, turn counters into rates, write one JSON document.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::collector::external::{
    collect_addresses, collect_lscpu, enumerate_entities, raw_json_blob,
};
use crate::collector::procfs::parser::{DiskStats, GlobalStat, NetDevStats};
use crate::collector::procfs::{CollectError, SystemCollector, UserIdentity};
use crate::collector::records::StatCounter;
use crate::collector::sections::{self, CycleContext, EntitySample, StatCounters};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::config::SamplerConfig;
use crate::output::{JsonError, JsonWriter};
use crate::sampler::{
    CounterRecord, CpuReport, CpuSampler, EntityTracker, EntityUpdate, RateSampler, SampleError,
    validate_elapsed,
};

/// Elapsed time used while priming; rates computed then are discarded.
const PRIME_ELAPSED: f64 = 1.0;

/// Fatal failure of one sampling cycle. The document is aborted.
#[derive(Debug)]
pub enum CycleError {
    Json(JsonError),
    Sample(SampleError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Json(e) => write!(f, "JSON writer error: {}", e),
            CycleError::Sample(e) => write!(f, "sampling error: {}", e),
        }
    }
}

impl std::error::Error for CycleError {}

impl CycleError {
    /// True when the output's reader has gone away; further cycles cannot
    /// succeed.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, CycleError::Json(JsonError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

impl From<JsonError> for CycleError {
    fn from(e: JsonError) -> Self {
        CycleError::Json(e)
    }
}

impl From<SampleError> for CycleError {
    fn from(e: SampleError) -> Self {
        CycleError::Sample(e)
    }
}

/// Timing information for each cycle phase.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total cycle time.
    pub total: Duration,
    /// Entity discovery (first cycle only).
    pub discovery: Duration,
    /// Static header sections, including external commands.
    pub headers: Duration,
    pub stat: Duration,
    pub meminfo: Duration,
    pub vmstat: Duration,
    pub uptime: Duration,
    pub loadavg: Duration,
    pub diskstats: Duration,
    pub netdev: Duration,
    pub filesystems: Duration,
}

/// Main collector that produces one document per cycle.
pub struct Collector<F: FileSystem, C: CommandRunner> {
    system: SystemCollector<F>,
    commands: C,
    config: SamplerConfig,
    cpu: CpuSampler,
    counters: RateSampler<StatCounter>,
    disks: EntityTracker,
    interfaces: EntityTracker,
    /// Resolved once; `None` reports `unknown`.
    user: Option<UserIdentity>,
    last_timing: Option<CollectorTiming>,
}

impl<F: FileSystem, C: CommandRunner> Collector<F, C> {
    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `commands` - External command runner (real or mock)
    /// * `config` - Sampler configuration
    pub fn new(fs: F, commands: C, config: SamplerConfig) -> Self {
        let system = SystemCollector::new(fs, config.proc_path.clone());
        let user = available(system.collect_user());

        Self {
            system,
            commands,
            cpu: CpuSampler::new(config.cpu_filter.clone(), config.max_cpus),
            counters: RateSampler::new(),
            disks: EntityTracker::new("disk"),
            interfaces: EntityTracker::new("interface"),
            user,
            last_timing: None,
            config,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Mutable access to the filesystem, e.g. to advance a mock between cycles.
    pub fn fs_mut(&mut self) -> &mut F {
        self.system.fs_mut()
    }

    pub fn commands(&self) -> &C {
        &self.commands
    }

    pub fn disks(&self) -> &EntityTracker {
        &self.disks
    }

    pub fn interfaces(&self) -> &EntityTracker {
        &self.interfaces
    }

    /// Returns timing information from the last completed cycle.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    /// Comma-separated list of the sections this collector emits.
    pub fn collecting(&self) -> String {
        let mut sections = vec![
            "identity",
            "os_release",
            "proc_version",
            "cpuinfo",
            "lscpu",
        ];
        if self.config.collect_lshw {
            sections.push("lshw");
        }
        sections.extend([
            "stat",
            "proc_meminfo",
            "proc_vmstat",
            "proc_uptime",
            "proc_loadavg",
            "disks",
            "network_interfaces",
            "filesystems",
        ]);
        sections.join(",")
    }

    /// Discovers disks and interfaces once; later calls do nothing.
    ///
    /// When a discovery command fails, names are taken from the current raw
    /// table instead (still filtered by the pseudo-device prefixes).
    pub fn discover(&mut self) {
        if !self.disks.is_discovered() {
            let names = match enumerate_entities(&self.commands, &self.config.disk_discovery) {
                Ok(names) => names,
                Err(e) => {
                    warn!("Disk discovery failed, using /proc/diskstats: {}", e);
                    self.system
                        .collect_diskstats()
                        .map(|disks| disks.into_iter().map(|d| d.device).collect())
                        .unwrap_or_default()
                }
            };
            let config = &self.config;
            if let Err(e) = self.disks.discover(names, |n| config.is_pseudo_disk(n)) {
                warn!("{}", e);
            }
        }

        if !self.interfaces.is_discovered() {
            let names = match enumerate_entities(&self.commands, &self.config.net_discovery) {
                Ok(names) => names,
                Err(e) => {
                    warn!("Interface discovery failed, using /proc/net/dev: {}", e);
                    self.system
                        .collect_net_dev()
                        .map(|nets| nets.into_iter().map(|n| n.interface).collect())
                        .unwrap_or_default()
                }
            };
            let config = &self.config;
            if let Err(e) = self
                .interfaces
                .discover(names, |n| config.is_pseudo_interface(n))
            {
                warn!("{}", e);
            }
        }
    }

    /// Reads every counter source once to establish baselines.
    ///
    /// Nothing is written; the next cycle then carries rates.
    pub fn prime(&mut self) -> Result<(), SampleError> {
        self.discover();

        if let Some(stat) = available(self.system.collect_stat()) {
            self.sample_stat(&stat, PRIME_ELAPSED)?;
        }
        if let Some(disks) = available(self.system.collect_diskstats()) {
            self.sample_disks(&disks, PRIME_ELAPSED)?;
        }
        if let Some(nets) = available(self.system.collect_net_dev()) {
            self.sample_interfaces(&nets, PRIME_ELAPSED)?;
        }

        debug!(
            "Primed baselines: {} disk(s), {} interface(s)",
            self.disks.len(),
            self.interfaces.len()
        );
        Ok(())
    }

    /// Writes one complete document.
    ///
    /// Unavailable sources only drop their section. Writer and sampling
    /// errors abort the document and are returned; baselines already
    /// updated this cycle stay updated.
    pub fn collect_cycle<W: Write>(
        &mut self,
        writer: &mut JsonWriter<W>,
        ctx: &CycleContext,
    ) -> Result<(), CycleError> {
        validate_elapsed(ctx.elapsed)?;

        let start = Instant::now();
        let mut timing = CollectorTiming::default();

        let t = Instant::now();
        self.discover();
        timing.discovery = t.elapsed();

        writer.open_document()?;
        if let Err(e) = self.write_document(writer, ctx, &mut timing) {
            match writer.abort_document() {
                Ok(true) => warn!("Cycle {} aborted: {}", ctx.loop_index, e),
                Ok(false) => warn!(
                    "Cycle {} aborted after partial output: {}",
                    ctx.loop_index, e
                ),
                Err(abort) => warn!("Cycle {} abort failed: {}", ctx.loop_index, abort),
            }
            return Err(e);
        }
        writer.flush()?;

        timing.total = start.elapsed();
        debug!(
            "Cycle {} collected in {:?} (headers {:?}, stat {:?}, disks {:?}, net {:?})",
            ctx.loop_index, timing.total, timing.headers, timing.stat, timing.diskstats, timing.netdev
        );
        self.last_timing = Some(timing);
        Ok(())
    }

    fn write_document<W: Write>(
        &mut self,
        w: &mut JsonWriter<W>,
        ctx: &CycleContext,
        timing: &mut CollectorTiming,
    ) -> Result<(), CycleError> {
        sections::write_timestamp(w, ctx, &self.config)?;
        sections::write_sampler(w, &self.config, &self.collecting(), self.user.as_ref())?;

        let t = Instant::now();
        self.write_headers(w)?;
        timing.headers = t.elapsed();

        let t = Instant::now();
        if let Some(stat) = available(self.system.collect_stat()) {
            let (cpus, counters) = self.sample_stat(&stat, ctx.elapsed)?;
            sections::write_stat(w, &cpus, &counters)?;
        }
        timing.stat = t.elapsed();

        let t = Instant::now();
        if let Some(values) = available(self.system.collect_meminfo()) {
            sections::write_key_values(w, "proc_meminfo", &values)?;
        }
        timing.meminfo = t.elapsed();

        let t = Instant::now();
        if let Some(values) = available(self.system.collect_vmstat()) {
            sections::write_key_values(w, "proc_vmstat", &values)?;
        }
        timing.vmstat = t.elapsed();

        let t = Instant::now();
        if let Some(uptime) = available(self.system.collect_uptime()) {
            sections::write_uptime(w, &uptime)?;
        }
        timing.uptime = t.elapsed();

        let t = Instant::now();
        if let Some(load) = available(self.system.collect_loadavg()) {
            sections::write_loadavg(w, &load)?;
        }
        timing.loadavg = t.elapsed();

        let t = Instant::now();
        if let Some(disks) = available(self.system.collect_diskstats()) {
            let samples = self.sample_disks(&disks, ctx.elapsed)?;
            if !self.disks.is_empty() {
                sections::write_entities(w, "disks", &samples)?;
            }
        }
        timing.diskstats = t.elapsed();

        let t = Instant::now();
        if let Some(nets) = available(self.system.collect_net_dev()) {
            let samples = self.sample_interfaces(&nets, ctx.elapsed)?;
            if !self.interfaces.is_empty() {
                sections::write_entities(w, "network_interfaces", &samples)?;
            }
        }
        timing.netdev = t.elapsed();

        let t = Instant::now();
        if let Some(filesystems) = available(self.system.collect_filesystems()) {
            sections::write_filesystems(w, &filesystems)?;
        }
        timing.filesystems = t.elapsed();

        w.close_document()?;
        Ok(())
    }

    fn write_headers<W: Write>(&mut self, w: &mut JsonWriter<W>) -> Result<(), JsonError> {
        if let Some(mut identity) = available(self.system.collect_identity()) {
            if let Some(addresses) =
                available(collect_addresses(&self.commands, &self.config.addresses))
            {
                identity.add_addresses(addresses);
            }
            sections::write_identity(w, &identity)?;
        }
        if let Some(release) = available(self.system.collect_os_release()) {
            sections::write_os_release(w, &release)?;
        }
        if let Some(version) = available(self.system.collect_version()) {
            sections::write_proc_version(w, &version)?;
        }
        if let Some(processors) = available(self.system.collect_cpuinfo()) {
            sections::write_cpuinfo(w, &processors, self.cpu.filter())?;
        }
        if let Some(fields) = available(collect_lscpu(&self.commands, &self.config.lscpu)) {
            sections::write_lscpu(w, &fields)?;
        }
        if self.config.collect_lshw
            && let Some(blob) = available(raw_json_blob(&self.commands, &self.config.lshw))
        {
            sections::write_lshw(w, &blob)?;
        }
        Ok(())
    }

    fn sample_stat(
        &mut self,
        stat: &GlobalStat,
        elapsed: f64,
    ) -> Result<(CpuReport, StatCounters), SampleError> {
        let cpus = self.cpu.update(&stat.cpus, elapsed)?;

        let ctxt = stat
            .ctxt
            .map(|v| self.counters.sample(StatCounter::ContextSwitches, v, elapsed))
            .transpose()?
            .flatten();
        let processes_forks = stat
            .processes
            .map(|v| self.counters.sample(StatCounter::Forks, v, elapsed))
            .transpose()?
            .flatten();

        let counters = StatCounters {
            ctxt,
            btime: stat.btime,
            processes_forks,
            procs_running: stat.procs_running,
            procs_blocked: stat.procs_blocked,
        };
        Ok((cpus, counters))
    }

    fn sample_disks(
        &mut self,
        disks: &[DiskStats],
        elapsed: f64,
    ) -> Result<Vec<EntitySample>, SampleError> {
        let mut samples = Vec::new();
        for disk in disks {
            if let Some(sample) = track(&mut self.disks, &disk.device, disk, elapsed)? {
                samples.push(EntitySample {
                    gauges: disk.gauges(),
                    ..sample
                });
            }
        }
        Ok(samples)
    }

    fn sample_interfaces(
        &mut self,
        nets: &[NetDevStats],
        elapsed: f64,
    ) -> Result<Vec<EntitySample>, SampleError> {
        let mut samples = Vec::new();
        for net in nets {
            if let Some(sample) = track(&mut self.interfaces, &net.interface, net, elapsed)? {
                samples.push(sample);
            }
        }
        Ok(samples)
    }
}

fn track<R: CounterRecord>(
    tracker: &mut EntityTracker,
    name: &str,
    record: &R,
    elapsed: f64,
) -> Result<Option<EntitySample>, SampleError> {
    match tracker.update(name, record, elapsed)? {
        EntityUpdate::Rates(rates) => Ok(Some(EntitySample {
            name: name.to_string(),
            rates,
            gauges: Vec::new(),
        })),
        EntityUpdate::Untracked | EntityUpdate::NoBaseline => Ok(None),
    }
}

/// Turns a source error into an omitted section.
fn available<T>(result: Result<T, CollectError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e @ CollectError::SourceUnavailable { .. }) => {
            debug!("{}", e);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
