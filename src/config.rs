//! Engine configuration.

use std::path::PathBuf;

/// Construction-time configuration for an [`crate::Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Vector dimension every add/search must match.
    pub dim: usize,
    /// Filesystem path for the write-ahead log. `None` disables
    /// durability entirely: nothing is persisted and nothing is
    /// replayed on the next `open`.
    pub wal_path: Option<PathBuf>,
    /// Size of the worker pool. `None` defaults to hardware
    /// parallelism, floored at 1.
    pub worker_threads: Option<usize>,
    /// Cap on Lloyd iterations during k-means training.
    pub kmeans_max_iter: usize,
    /// PRNG seed for centroid initialization.
    pub kmeans_seed: u64,
}

impl EngineConfig {
    /// Starts from the documented defaults (`kmeans_max_iter = 20`,
    /// `kmeans_seed = 42`, hardware-parallelism worker pool, no WAL)
    /// for the given dimension.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            wal_path: None,
            worker_threads: None,
            kmeans_max_iter: 20,
            kmeans_seed: 42,
        }
    }

    /// Sets the WAL path, enabling durability.
    #[must_use]
    pub fn with_wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wal_path = Some(path.into());
        self
    }

    /// Overrides the worker pool size.
    #[must_use]
    pub fn with_worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n);
        self
    }

    /// Overrides the k-means iteration cap.
    #[must_use]
    pub fn with_kmeans_max_iter(mut self, n: usize) -> Self {
        self.kmeans_max_iter = n;
        self
    }

    /// Overrides the k-means PRNG seed.
    #[must_use]
    pub fn with_kmeans_seed(mut self, seed: u64) -> Self {
        self.kmeans_seed = seed;
        self
    }

    pub(crate) fn resolved_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::new(128);
        assert_eq!(cfg.dim, 128);
        assert!(cfg.wal_path.is_none());
        assert_eq!(cfg.kmeans_max_iter, 20);
        assert_eq!(cfg.kmeans_seed, 42);
    }

    #[test]
    fn explicit_worker_threads_override_is_honored() {
        let cfg = EngineConfig::new(8).with_worker_threads(3);
        assert_eq!(cfg.resolved_worker_threads(), 3);
    }

    #[test]
    fn default_worker_threads_is_at_least_one() {
        let cfg = EngineConfig::new(8);
        assert!(cfg.resolved_worker_threads() >= 1);
    }
}
