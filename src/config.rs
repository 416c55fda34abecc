//! Configuration types for the concurrent scheduler

use serde::{Deserialize, Serialize};

/// Limits applied by every concurrent composition node built with this config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ceiling on workers the demand-driven (async) controller may fork
    pub max_workers: usize,
    /// Ceiling on workers a parallel composition may run at once.
    /// Asking for more fails the run with `ResourceExhausted`.
    pub max_parallel_workers: usize,
    /// Capacity of the output channel workers push into
    pub buffer_size: usize,
    /// The async controller forks another worker when fewer than this many
    /// values are buffered for the consumer
    pub fork_threshold: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 1500,
            max_parallel_workers: 1500,
            buffer_size: 1500,
            fork_threshold: 1,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for CPU-bound steps: one async worker per core
    pub fn cpu_bound() -> Self {
        Self {
            max_workers: num_cpus::get(),
            ..Self::default()
        }
    }

    /// Set the async worker ceiling
    pub fn max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    /// Set the parallel worker ceiling
    pub fn max_parallel_workers(mut self, n: usize) -> Self {
        self.max_parallel_workers = n;
        self
    }

    /// Set the output channel capacity
    pub fn buffer_size(mut self, n: usize) -> Self {
        self.buffer_size = n;
        self
    }

    /// Set the under-served threshold of the async controller
    pub fn fork_threshold(mut self, n: usize) -> Self {
        self.fork_threshold = n;
        self
    }

    /// Zero limits would deadlock the scheduler, so they count as one.
    pub(crate) fn normalized(&self) -> Self {
        Self {
            max_workers: self.max_workers.max(1),
            max_parallel_workers: self.max_parallel_workers.max(1),
            buffer_size: self.buffer_size.max(1),
            fork_threshold: self.fork_threshold.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = SchedulerConfig::new().max_workers(4).buffer_size(16);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.buffer_size, 16);
        assert_eq!(config.max_parallel_workers, 1500);
        assert_eq!(config.fork_threshold, 1);
    }

    #[test]
    fn zero_limits_are_clamped() {
        let config = SchedulerConfig::new()
            .max_workers(0)
            .max_parallel_workers(0)
            .buffer_size(0)
            .fork_threshold(0)
            .normalized();
        assert_eq!(config, SchedulerConfig::new()
            .max_workers(1)
            .max_parallel_workers(1)
            .buffer_size(1)
            .fork_threshold(1));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"max_workers": 8}"#).unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.buffer_size, 1500);
    }
}
