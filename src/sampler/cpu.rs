//! Per-CPU rates and the (optionally filtered) all-CPU aggregate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::RateRecord;
use super::entity::CounterRecord;
use super::rate::{RateSampler, SampleError, validate_elapsed};
use crate::collector::procfs::parser::{CpuStat, ParseError, parse_cpu_list};

/// Default size of the per-CPU baseline table.
pub const DEFAULT_MAX_CPUS: usize = 256;

/// Which logical CPUs contribute to the aggregate and per-CPU output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuFilter {
    #[default]
    All,
    Only(BTreeSet<u32>),
}

impl CpuFilter {
    /// Builds a restricted filter from a kernel-style list (`0-3,8`).
    pub fn from_list(list: &str) -> Result<Self, ParseError> {
        Ok(CpuFilter::Only(parse_cpu_list(list)?))
    }

    pub fn is_allowed(&self, cpu: u32) -> bool {
        match self {
            CpuFilter::All => true,
            CpuFilter::Only(set) => set.contains(&cpu),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, CpuFilter::Only(_))
    }
}

/// Baseline namespace for aggregate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateScope {
    /// Kernel's own `cpu` line.
    AllCpus,
    /// Sum over allowed per-CPU lines.
    AllowedCpus,
}

impl AggregateScope {
    /// Subsection name used for the aggregate in `stat`.
    pub fn section_name(self) -> &'static str {
        match self {
            AggregateScope::AllCpus => "cpu_total",
            AggregateScope::AllowedCpus => "cpu_total_allowed",
        }
    }
}

impl CounterRecord for CpuStat {
    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("user", self.user),
            ("nice", self.nice),
            ("sys", self.system),
            ("idle", self.idle),
            ("iowait", self.iowait),
            ("hardirq", self.irq),
            ("softirq", self.softirq),
            ("steal", self.steal),
            ("guest", self.guest),
            ("guestnice", self.guest_nice),
        ]
    }
}

/// Output of one CPU sampling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuReport {
    /// Aggregate record, absent on the first sample.
    pub total: Option<(AggregateScope, RateRecord)>,
    /// Per-CPU records for allowed CPUs that have a baseline, by CPU index.
    pub cpus: Vec<(u32, RateRecord)>,
}

/// Rate state for `/proc/stat` CPU lines.
#[derive(Debug)]
pub struct CpuSampler {
    filter: CpuFilter,
    max_cpus: usize,
    aggregate: RateSampler<(AggregateScope, &'static str)>,
    per_cpu: Vec<Option<RateSampler<&'static str>>>,
    overflow_warned: bool,
}

impl CpuSampler {
    pub fn new(filter: CpuFilter, max_cpus: usize) -> Self {
        Self {
            filter,
            max_cpus,
            aggregate: RateSampler::new(),
            per_cpu: (0..max_cpus).map(|_| None).collect(),
            overflow_warned: false,
        }
    }

    pub fn filter(&self) -> &CpuFilter {
        &self.filter
    }

    pub fn max_cpus(&self) -> usize {
        self.max_cpus
    }

    /// Scope the aggregate is reported under for the current filter.
    pub fn scope(&self) -> AggregateScope {
        if self.filter.is_restricted() {
            AggregateScope::AllowedCpus
        } else {
            AggregateScope::AllCpus
        }
    }

    /// Feeds one `/proc/stat` CPU block (aggregate line plus per-CPU lines).
    ///
    /// Rates are jiffies per second per contributing CPU. Unrestricted, the
    /// kernel's aggregate line is divided by the number of CPUs present;
    /// restricted, the allowed CPUs are summed and divided by their count.
    pub fn update(&mut self, stats: &[CpuStat], elapsed: f64) -> Result<CpuReport, SampleError> {
        validate_elapsed(elapsed)?;

        let total = match self.scope() {
            AggregateScope::AllCpus => self.update_all(stats, elapsed)?,
            AggregateScope::AllowedCpus => self.update_allowed(stats, elapsed)?,
        };

        let mut cpus = Vec::new();
        for stat in stats {
            let Some(id) = stat.cpu_id else {
                continue;
            };
            if !self.filter.is_allowed(id) {
                continue;
            }
            let Some(slot) = self.per_cpu.get_mut(id as usize) else {
                if !self.overflow_warned {
                    warn!(
                        "cpu{} exceeds max tracked CPUs ({}), skipping",
                        id, self.max_cpus
                    );
                    self.overflow_warned = true;
                } else {
                    debug!("Skipping cpu{}", id);
                }
                continue;
            };

            let first = slot.is_none();
            let baselines = slot.get_or_insert_with(RateSampler::new);
            let record = sample_record(baselines, stat, elapsed)?;
            if !first {
                cpus.push((id, record));
            }
        }

        Ok(CpuReport { total, cpus })
    }

    fn update_all(
        &mut self,
        stats: &[CpuStat],
        elapsed: f64,
    ) -> Result<Option<(AggregateScope, RateRecord)>, SampleError> {
        let Some(line) = stats.iter().find(|s| s.cpu_id.is_none()) else {
            return Ok(None);
        };
        let present = stats.iter().filter(|s| s.cpu_id.is_some()).count().max(1);
        self.sample_aggregate(AggregateScope::AllCpus, line, present, elapsed)
    }

    fn update_allowed(
        &mut self,
        stats: &[CpuStat],
        elapsed: f64,
    ) -> Result<Option<(AggregateScope, RateRecord)>, SampleError> {
        let mut sum = CpuStat::default();
        let mut allowed = 0usize;
        for stat in stats {
            let Some(id) = stat.cpu_id else {
                continue;
            };
            if !self.filter.is_allowed(id) {
                continue;
            }
            allowed += 1;
            sum.user += stat.user;
            sum.nice += stat.nice;
            sum.system += stat.system;
            sum.idle += stat.idle;
            sum.iowait += stat.iowait;
            sum.irq += stat.irq;
            sum.softirq += stat.softirq;
            sum.steal += stat.steal;
            sum.guest += stat.guest;
            sum.guest_nice += stat.guest_nice;
        }
        if allowed == 0 {
            return Ok(None);
        }
        self.sample_aggregate(AggregateScope::AllowedCpus, &sum, allowed, elapsed)
    }

    fn sample_aggregate(
        &mut self,
        scope: AggregateScope,
        stat: &CpuStat,
        divisor: usize,
        elapsed: f64,
    ) -> Result<Option<(AggregateScope, RateRecord)>, SampleError> {
        let first = self.aggregate.baseline(&(scope, "user")).is_none();
        let mut record = RateRecord::default();
        for (field, value) in stat.counters() {
            let rate = self.aggregate.sample((scope, field), value, elapsed)?;
            record.push(field, rate.map(|r| r / divisor as f64));
        }
        Ok((!first).then_some((scope, record)))
    }
}

fn sample_record(
    baselines: &mut RateSampler<&'static str>,
    stat: &CpuStat,
    elapsed: f64,
) -> Result<RateRecord, SampleError> {
    let mut record = RateRecord::default();
    for (field, value) in stat.counters() {
        record.push(field, baselines.sample(field, value, elapsed)?);
    }
    Ok(record)
}
