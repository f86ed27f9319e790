//! The engine façade: the only entity in this crate that mutates state.
//!
//! `add` appends to the WAL, then the dataset, under the exclusive
//! lock. `build` runs IVF training under the exclusive lock and
//! checkpoints the WAL on success. `search` delegates to IVF search
//! under the shared lock. The façade never acquires the WAL's internal
//! lock while already holding another lock in the opposite order —
//! "engine lock → WAL lock" is the only nesting this code performs.

use std::path::Path;

use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::ivf::{Hit, IvfIndex};
use crate::pool::WorkerPool;
use crate::rwlock::RwLock;
use crate::wal::{self, WriteAheadLog, OP_ADD_VECTOR};

struct Core {
    dataset: Dataset,
    index: IvfIndex,
}

/// Top-level vector search engine: owns the dataset, the IVF index, the
/// WAL handle, and the worker pool. Clients never receive references
/// into engine state, only owned values.
pub struct Engine {
    config: EngineConfig,
    core: RwLock<Core>,
    wal: Option<WriteAheadLog>,
    pool: WorkerPool,
}

impl Engine {
    /// Opens an engine with the given configuration.
    ///
    /// If `config.wal_path` is set and the log already holds records
    /// from a prior process, they are replayed into the dataset before
    /// this function returns — `count()` afterward reflects every
    /// successful `add` that preceded the last checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] if the WAL cannot be opened, or
    /// propagates a replay failure.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let dim = config.dim;
        let mut dataset = Dataset::new(dim);

        let wal = match &config.wal_path {
            Some(path) => Some(open_wal_with_replay(path, &mut dataset)?),
            None => None,
        };

        let pool = WorkerPool::new(config.resolved_worker_threads());

        Ok(Self {
            config,
            core: RwLock::new(Core {
                dataset,
                index: IvfIndex::new(),
            }),
            wal,
            pool,
        })
    }

    /// Appends `vector` to the dataset, returning its newly assigned
    /// id.
    ///
    /// The dimension check happens before the WAL append (not after),
    /// so a rejected add never leaves a WAL record behind that a future
    /// replay would turn into a phantom insert. If the WAL append
    /// itself fails, the dataset is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] or [`Error::IoError`].
    pub fn add(&self, vector: &[f32]) -> Result<u64> {
        if vector.len() != self.config.dim {
            return Err(Error::DimensionMismatch {
                expected: self.config.dim,
                actual: vector.len(),
            });
        }

        let mut core = self.core.write();

        if let Some(wal) = &self.wal {
            wal.append(OP_ADD_VECTOR, &wal::render_vector(vector))?;
        }

        // Infallible past this point: dimension already checked above.
        let id = core.dataset.add(vector).expect("dimension checked above");
        Ok(id)
    }

    /// Builds (or rebuilds — not supported by the core contract, so
    /// this transitions `Empty -> Built` once) the IVF index over the
    /// current dataset, then checkpoints the WAL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] when fewer vectors than
    /// `n_lists` have been added, or when `n_lists == 0`.
    pub fn build(&self, n_lists: usize) -> Result<()> {
        let mut guard = self.core.write();
        let core = &mut *guard;
        core.index.build(
            &core.dataset,
            n_lists,
            self.config.kmeans_max_iter,
            self.config.kmeans_seed,
            &self.pool,
        )?;

        if let Some(wal) = &self.wal {
            wal.checkpoint()?;
        }

        Ok(())
    }

    /// Searches for the `k` nearest neighbors of `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotBuilt`] if called before [`Engine::build`],
    /// or [`Error::DimensionMismatch`] if `query.len()` does not match
    /// the configured dimension.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        probe_ratio: f32,
        max_nprobe: usize,
        refine_factor: usize,
    ) -> Result<Vec<Hit>> {
        if query.len() != self.config.dim {
            return Err(Error::DimensionMismatch {
                expected: self.config.dim,
                actual: query.len(),
            });
        }

        let core = self.core.read();
        core.index
            .search(&core.dataset, query, k, probe_ratio, max_nprobe, refine_factor)
    }

    /// Number of vectors currently stored.
    #[must_use]
    pub fn count(&self) -> usize {
        self.core.read().dataset.count()
    }

    /// Configured vector dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.config.dim
    }

    /// True once [`Engine::build`] has completed successfully.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.core.read().index.is_built()
    }

    /// Number of inverted lists (0 before [`Engine::build`]).
    #[must_use]
    pub fn n_lists(&self) -> usize {
        self.core.read().index.n_lists()
    }

    /// Returns a bit-identical copy of vector `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.count()` — see [`Dataset::get`].
    #[must_use]
    pub fn get(&self, id: u64) -> Vec<f32> {
        self.core.read().dataset.get(id).to_vec()
    }
}

fn open_wal_with_replay(path: &Path, dataset: &mut Dataset) -> Result<WriteAheadLog> {
    // `replay` runs synchronously inside `WriteAheadLog::open`, before
    // this function (and therefore `Engine::open`) returns — recovery
    // is complete by construction.
    WriteAheadLog::open(path, |op, payload| {
        if op != OP_ADD_VECTOR {
            return;
        }
        match wal::parse_vector(payload) {
            Some(v) => {
                if let Err(e) = dataset.add(&v) {
                    tracing::warn!(error = %e, "skipping unreplayable WAL record");
                }
            }
            None => tracing::warn!("skipping unparseable ADD_VECTOR payload"),
        }
    })
}
