//! Per-key counter rate computation.

use std::collections::HashMap;
use std::hash::Hash;

/// Error type for rate computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleError {
    /// Elapsed time was zero, negative or not finite.
    InvalidElapsed(f64),
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::InvalidElapsed(secs) => {
                write!(f, "invalid elapsed time: {} seconds", secs)
            }
        }
    }
}

impl std::error::Error for SampleError {}

/// Compute counter delta, returning `None` on regression (counter reset or wrap).
pub fn counter_delta(curr: u64, prev: u64) -> Option<u64> {
    (curr >= prev).then(|| curr - prev)
}

/// Checks that `elapsed` is usable as a rate divisor.
pub fn validate_elapsed(elapsed: f64) -> Result<(), SampleError> {
    if elapsed.is_finite() && elapsed > 0.0 {
        Ok(())
    } else {
        Err(SampleError::InvalidElapsed(elapsed))
    }
}

/// Converts monotonically increasing counters into per-second rates.
///
/// Keeps exactly one baseline per key. The first sample of a key, and the
/// first sample after a reset, yield no rate.
#[derive(Debug, Clone)]
pub struct RateSampler<K> {
    previous: HashMap<K, u64>,
}

impl<K> Default for RateSampler<K> {
    fn default() -> Self {
        Self {
            previous: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> RateSampler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `raw` for `key` and returns the rate since the previous sample.
    ///
    /// Returns `Ok(None)` when there is no baseline yet or the counter went
    /// backwards; in both cases `raw` becomes the new baseline. An invalid
    /// `elapsed` leaves the baseline untouched.
    pub fn sample(&mut self, key: K, raw: u64, elapsed: f64) -> Result<Option<f64>, SampleError> {
        validate_elapsed(elapsed)?;
        let Some(prev) = self.previous.insert(key, raw) else {
            return Ok(None);
        };
        Ok(counter_delta(raw, prev).map(|d| d as f64 / elapsed))
    }

    /// Current baseline for `key`.
    pub fn baseline(&self, key: &K) -> Option<u64> {
        self.previous.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_has_no_rate() {
        let mut sampler = RateSampler::new();
        assert_eq!(sampler.sample("ctxt", 1000, 1.0), Ok(None));
        assert_eq!(sampler.baseline(&"ctxt"), Some(1000));
    }

    #[test]
    fn test_second_sample_returns_rate() {
        let mut sampler = RateSampler::new();
        sampler.sample("ctxt", 1000, 2.0).unwrap();
        assert_eq!(sampler.sample("ctxt", 1500, 2.0), Ok(Some(250.0)));
        assert_eq!(sampler.sample("ctxt", 1500, 0.5), Ok(Some(0.0)));
    }

    #[test]
    fn test_counter_reset_rebases() {
        let mut sampler = RateSampler::new();
        sampler.sample("processes", 5000, 1.0).unwrap();
        assert_eq!(sampler.sample("processes", 10, 1.0), Ok(None));
        assert_eq!(sampler.baseline(&"processes"), Some(10));
        assert_eq!(sampler.sample("processes", 40, 3.0), Ok(Some(10.0)));
    }

    #[test]
    fn test_invalid_elapsed() {
        let mut sampler = RateSampler::new();
        sampler.sample("k", 1, 1.0).unwrap();

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                sampler.sample("k", 100, bad),
                Err(SampleError::InvalidElapsed(_))
            ));
        }
        // Baseline untouched by rejected samples.
        assert_eq!(sampler.baseline(&"k"), Some(1));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut sampler: RateSampler<String> = RateSampler::new();
        sampler.sample("a".to_string(), 10, 1.0).unwrap();
        assert_eq!(sampler.sample("b".to_string(), 10, 1.0), Ok(None));
        assert_eq!(sampler.sample("a".to_string(), 30, 1.0), Ok(Some(20.0)));
        assert_eq!(sampler.len(), 2);
    }

    #[test]
    fn test_counter_delta() {
        assert_eq!(counter_delta(10, 3), Some(7));
        assert_eq!(counter_delta(3, 3), Some(0));
        assert_eq!(counter_delta(3, 10), None);
    }
}
