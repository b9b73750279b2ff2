//! Rate tracking for dynamically discovered named entities.
//!
//! Disks and network interfaces are enumerated once, filtered against
//! pseudo-device patterns, and then matched by exact name on every cycle.
//! Each tracked entity owns its own per-field baselines.

use tracing::debug;

use super::RateRecord;
use super::rate::{RateSampler, SampleError, validate_elapsed};

/// A fixed-shape record of monotonic counters for one entity.
pub trait CounterRecord {
    /// Counter fields in output order.
    fn counters(&self) -> Vec<(&'static str, u64)>;
}

/// Result of feeding one entity's raw record to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityUpdate {
    /// Name was never discovered (or was filtered out); nothing to emit.
    Untracked,
    /// First observation of this entity; baselines recorded.
    NoBaseline,
    /// Per-field rates; a field is `None` if its counter went backwards.
    Rates(RateRecord),
}

/// Error type for tracker misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// `discover` may only run once per tracker.
    AlreadyDiscovered,
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::AlreadyDiscovered => write!(f, "entities already discovered"),
        }
    }
}

impl std::error::Error for TrackerError {}

#[derive(Debug)]
struct TrackedEntity {
    name: String,
    seen: bool,
    baselines: RateSampler<&'static str>,
}

/// Ordered population of tracked entities.
#[derive(Debug)]
pub struct EntityTracker {
    kind: &'static str,
    entities: Vec<TrackedEntity>,
    discovered: bool,
}

impl EntityTracker {
    /// Creates an empty tracker; `kind` ("disk", "interface") is used in logs.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entities: Vec::new(),
            discovered: false,
        }
    }

    /// Sets the tracked population. May be called once.
    ///
    /// Names for which `is_pseudo` returns `true` are dropped, as are
    /// duplicates; order is preserved. Returns the number of tracked entities.
    pub fn discover<I, S, P>(&mut self, names: I, is_pseudo: P) -> Result<usize, TrackerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: Fn(&str) -> bool,
    {
        if self.discovered {
            return Err(TrackerError::AlreadyDiscovered);
        }

        for name in names {
            let name = name.as_ref();
            if is_pseudo(name) {
                debug!("Discarding {} {}", self.kind, name);
                continue;
            }
            if self.is_tracked(name) {
                continue;
            }
            self.entities.push(TrackedEntity {
                name: name.to_string(),
                seen: false,
                baselines: RateSampler::new(),
            });
        }
        self.discovered = true;
        self.entities.shrink_to_fit();

        debug!("Tracking {} {}(s)", self.entities.len(), self.kind);
        Ok(self.entities.len())
    }

    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.entities.iter().any(|e| e.name == name)
    }

    /// Tracked names in discovery order.
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Feeds one raw record and returns per-field rates.
    pub fn update<R: CounterRecord>(
        &mut self,
        name: &str,
        record: &R,
        elapsed: f64,
    ) -> Result<EntityUpdate, SampleError> {
        validate_elapsed(elapsed)?;

        let Some(entity) = self.entities.iter_mut().find(|e| e.name == name) else {
            return Ok(EntityUpdate::Untracked);
        };

        let first = !entity.seen;
        entity.seen = true;

        let mut rates = RateRecord::default();
        for (field, value) in record.counters() {
            rates.push(field, entity.baselines.sample(field, value, elapsed)?);
        }

        if first {
            Ok(EntityUpdate::NoBaseline)
        } else {
            Ok(EntityUpdate::Rates(rates))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reads(u64);

    impl CounterRecord for Reads {
        fn counters(&self) -> Vec<(&'static str, u64)> {
            vec![("reads", self.0)]
        }
    }

    struct Pair {
        rx: u64,
        tx: u64,
    }

    impl CounterRecord for Pair {
        fn counters(&self) -> Vec<(&'static str, u64)> {
            vec![("ibytes", self.rx), ("obytes", self.tx)]
        }
    }

    fn is_loop(name: &str) -> bool {
        name.starts_with("loop")
    }

    #[test]
    fn test_discover_filters_pseudo_devices() {
        let mut tracker = EntityTracker::new("disk");
        let n = tracker.discover(["sda", "sdb", "loop0"], is_loop).unwrap();

        assert_eq!(n, 2);
        assert_eq!(tracker.tracked().collect::<Vec<_>>(), vec!["sda", "sdb"]);
    }

    #[test]
    fn test_disk_scenario() {
        let mut tracker = EntityTracker::new("disk");
        tracker.discover(["sda", "sdb", "loop0"], is_loop).unwrap();

        assert_eq!(
            tracker.update("loop0", &Reads(7), 1.0).unwrap(),
            EntityUpdate::Untracked
        );
        assert_eq!(
            tracker.update("sda", &Reads(100), 1.0).unwrap(),
            EntityUpdate::NoBaseline
        );
        let EntityUpdate::Rates(rates) = tracker.update("sda", &Reads(150), 1.0).unwrap() else {
            panic!("expected rates");
        };
        assert_eq!(rates.get("reads"), Some(50.0));
    }

    #[test]
    fn test_filtered_name_never_reported() {
        let mut tracker = EntityTracker::new("disk");
        tracker.discover(["loop0"], is_loop).unwrap();

        for value in [1, 2, 3] {
            assert_eq!(
                tracker.update("loop0", &Reads(value), 1.0).unwrap(),
                EntityUpdate::Untracked
            );
        }
    }

    #[test]
    fn test_undiscovered_name_is_untracked() {
        let mut tracker = EntityTracker::new("interface");
        tracker.discover(["eth0"], |_| false).unwrap();

        assert_eq!(
            tracker
                .update("wlan0", &Pair { rx: 1, tx: 2 }, 1.0)
                .unwrap(),
            EntityUpdate::Untracked
        );
        assert!(!tracker.is_tracked("wlan0"));
    }

    #[test]
    fn test_second_discover_fails() {
        let mut tracker = EntityTracker::new("disk");
        tracker.discover(["sda"], is_loop).unwrap();

        assert_eq!(
            tracker.discover(["sdc"], is_loop),
            Err(TrackerError::AlreadyDiscovered)
        );
        assert_eq!(tracker.tracked().collect::<Vec<_>>(), vec!["sda"]);
    }

    #[test]
    fn test_field_reset_only_drops_that_field() {
        let mut tracker = EntityTracker::new("interface");
        tracker.discover(["eth0"], |_| false).unwrap();
        tracker
            .update("eth0", &Pair { rx: 1000, tx: 1000 }, 2.0)
            .unwrap();

        let EntityUpdate::Rates(rates) = tracker
            .update("eth0", &Pair { rx: 3000, tx: 10 }, 2.0)
            .unwrap()
        else {
            panic!("expected rates");
        };
        assert_eq!(rates.get("ibytes"), Some(1000.0));
        assert_eq!(rates.get("obytes"), None);
        assert_eq!(rates.available(), 1);
    }

    #[test]
    fn test_absent_entity_keeps_baseline() {
        let mut tracker = EntityTracker::new("disk");
        tracker.discover(["sda", "sdb"], is_loop).unwrap();
        tracker.update("sda", &Reads(10), 1.0).unwrap();
        tracker.update("sdb", &Reads(10), 1.0).unwrap();

        // sdb missing from this cycle's raw data; only sda is updated.
        tracker.update("sda", &Reads(20), 1.0).unwrap();

        let EntityUpdate::Rates(rates) = tracker.update("sdb", &Reads(40), 2.0).unwrap() else {
            panic!("expected rates");
        };
        assert_eq!(rates.get("reads"), Some(15.0));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_duplicates_ignored() {
        let mut tracker = EntityTracker::new("disk");
        tracker.discover(["sda", "sda", "sdb"], is_loop).unwrap();
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_invalid_elapsed_rejected() {
        let mut tracker = EntityTracker::new("disk");
        tracker.discover(["sda"], is_loop).unwrap();
        assert!(tracker.update("sda", &Reads(1), 0.0).is_err());
    }
}
