//! Delta/rate sampling engine.
//!
//! - `rate` - per-key baselines and the rate computation
//! - `entity` - named entity populations (disks, interfaces)
//! - `cpu` - per-CPU table and the filtered aggregate

pub mod cpu;
pub mod entity;
pub mod rate;

pub use cpu::{AggregateScope, CpuFilter, CpuReport, CpuSampler, DEFAULT_MAX_CPUS};
pub use entity::{CounterRecord, EntityTracker, EntityUpdate, TrackerError};
pub use rate::{RateSampler, SampleError, counter_delta, validate_elapsed};

/// Per-field rates for one record, in field order.
///
/// A field whose counter was reset this cycle is kept with a `None` value so
/// writers can skip it while preserving order for the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateRecord {
    fields: Vec<(&'static str, Option<f64>)>,
}

impl RateRecord {
    pub fn push(&mut self, field: &'static str, rate: Option<f64>) {
        self.fields.push((field, rate));
    }

    /// Rate of `field`, `None` if unknown or reset.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, rate)| *rate)
    }

    /// Fields that carry a rate, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.fields
            .iter()
            .filter_map(|(name, rate)| rate.map(|r| (*name, r)))
    }

    /// Number of fields that carry a rate.
    pub fn available(&self) -> usize {
        self.fields.iter().filter(|(_, rate)| rate.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_record_skips_reset_fields() {
        let mut record = RateRecord::default();
        record.push("reads", Some(2.0));
        record.push("writes", None);
        record.push("xfers", Some(3.5));

        assert_eq!(record.len(), 3);
        assert_eq!(record.available(), 2);
        assert_eq!(
            record.iter().collect::<Vec<_>>(),
            vec![("reads", 2.0), ("xfers", 3.5)]
        );
        assert_eq!(record.get("writes"), None);
        assert_eq!(record.get("missing"), None);
    }
}
