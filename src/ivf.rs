//! IVF (inverted-file) index: centroid training + bucket assignment,
//! and the two-stage probe-and-refine search.

use std::collections::BinaryHeap;

use crate::dataset::Dataset;
use crate::distance::l2_distance;
use crate::error::{Error, Result};
use crate::kmeans::{self, Centroids};
use crate::pool::WorkerPool;

/// One ranked search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Id of the matching vector.
    pub id: u64,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

/// `Empty → Built → (immutable)` — search is only valid once built, and
/// rebuilding an already-built index is not part of the core contract.
enum State {
    Empty,
    Built {
        centroids: Centroids,
        /// `lists[j]` holds every id whose nearest centroid is `j`.
        lists: Vec<Vec<u64>>,
    },
}

/// Inverted-file index over a [`Dataset`].
///
/// The index holds no reference to the dataset between calls — `build`
/// and `search` both take it as a parameter, borrowed only for the
/// duration of the call, so the ownership graph stays a tree rather
/// than a shared-ownership graph requiring reference counting or
/// interior mutability.
pub struct IvfIndex {
    state: State,
}

impl Default for IvfIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IvfIndex {
    /// A fresh, empty index.
    #[must_use]
    pub fn new() -> Self {
        Self { state: State::Empty }
    }

    /// True once [`IvfIndex::build`] has succeeded.
    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(self.state, State::Built { .. })
    }

    /// Number of inverted lists (0 before build).
    #[must_use]
    pub fn n_lists(&self) -> usize {
        match &self.state {
            State::Empty => 0,
            State::Built { centroids, .. } => centroids.len(),
        }
    }

    /// Trains `n_lists` centroids over `dataset` (phase 1, k-means) and
    /// assigns every vector to its nearest centroid's bucket (phase 2,
    /// parallelized over `pool`). Transitions `Empty -> Built`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] when `dataset.count() <
    /// n_lists`, or when `n_lists == 0`.
    pub fn build(
        &mut self,
        dataset: &Dataset,
        n_lists: usize,
        kmeans_max_iter: usize,
        kmeans_seed: u64,
        pool: &WorkerPool,
    ) -> Result<()> {
        let centroids = kmeans::train(dataset, n_lists, kmeans_max_iter, kmeans_seed, pool)?;

        let count = dataset.count();
        let centroids_ptr = CentroidsPtr(&centroids as *const Centroids);
        let dataset_ptr = DatasetPtr(dataset as *const Dataset);

        let per_chunk: Vec<Vec<(usize, u64)>> = pool.map_chunks(count, move |range| {
            // SAFETY: `dataset` and `centroids` outlive this call — the
            // closure is only ever invoked synchronously from within
            // `map_chunks`, which joins every task before returning.
            let dataset = unsafe { &*dataset_ptr.0 };
            let centroids = unsafe { &*centroids_ptr.0 };
            range
                .map(|i| (centroids.nearest(dataset.get(i as u64)), i as u64))
                .collect()
        });

        let mut lists = vec![Vec::new(); centroids.len()];
        for chunk in per_chunk {
            for (bucket, id) in chunk {
                lists[bucket].push(id);
            }
        }

        tracing::debug!(n_lists, count, "IVF build complete");
        self.state = State::Built { centroids, lists };
        Ok(())
    }

    /// Two-stage probe-and-refine search for the `k` nearest neighbors
    /// of `query` under squared L2.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotBuilt`] if called before `build`, or a
    /// distance error if `query.len()` does not match the dataset's
    /// dimension.
    pub fn search(
        &self,
        dataset: &Dataset,
        query: &[f32],
        k: usize,
        probe_ratio: f32,
        max_nprobe: usize,
        refine_factor: usize,
    ) -> Result<Vec<Hit>> {
        let (centroids, lists) = match &self.state {
            State::Empty => return Err(Error::NotBuilt),
            State::Built { centroids, lists } => (centroids, lists),
        };

        if k == 0 {
            return Ok(Vec::new());
        }

        const EPSILON: f32 = 1e-6;

        let mut by_distance: Vec<(usize, f32)> = (0..centroids.len())
            .map(|j| Ok((j, l2_distance(query, centroids.row(j))?)))
            .collect::<Result<_>>()?;
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));

        let threshold = by_distance[0].1 * (1.0 + probe_ratio) + EPSILON;

        let pool_size = (k * refine_factor.max(1)).max(1);
        // Max-heap on distance: popping removes the *worst* survivor,
        // which is exactly what a fixed-size "keep the best N" pool
        // needs.
        let mut coarse: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(pool_size + 1);

        for (probed, &(list_idx, d_c)) in by_distance.iter().enumerate() {
            if probed >= max_nprobe {
                break;
            }
            if probed > 0 && d_c > threshold {
                break;
            }

            for &id in &lists[list_idx] {
                let d = l2_distance(query, dataset.get(id))?;
                if coarse.len() < pool_size {
                    coarse.push(HeapEntry { distance: d, id });
                } else if let Some(worst) = coarse.peek() {
                    if d < worst.distance || (d == worst.distance && id < worst.id) {
                        coarse.pop();
                        coarse.push(HeapEntry { distance: d, id });
                    }
                }
            }
        }

        let mut candidates: Vec<Hit> = coarse
            .into_iter()
            .map(|e| Hit {
                id: e.id,
                distance: e.distance,
            })
            .collect();

        // Refine: deterministic ascending sort, ties broken by id. With
        // squared L2 the coarse pool already holds true distances, so
        // this stage is the tie-break/ordering guarantee rather than a
        // re-ranking under a different metric (that hook is left for a
        // future metric that needs it).
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        candidates.truncate(k);

        Ok(candidates)
    }
}

// SAFETY: see the matching comment in kmeans.rs — `map_chunks` shares the
// closure holding these across worker threads by reference, requiring
// `Sync` as well as `Send`, even though each chunk only reads a disjoint
// sub-range through its own copy of the pointer.
struct CentroidsPtr(*const Centroids);
unsafe impl Send for CentroidsPtr {}
unsafe impl Sync for CentroidsPtr {}
struct DatasetPtr(*const Dataset);
unsafe impl Send for DatasetPtr {}
unsafe impl Sync for DatasetPtr {}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance: f32,
    id: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.id == other.id
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// Ascending-distance max-heap ordering: the heap's "greatest"
    /// element is the one we want evicted first when the coarse pool is
    /// full, i.e. the largest distance (ties broken by largest id, so
    /// the lowest id is preferred to survive — matching the ascending
    /// distance / ascending id tie-break the final sort also applies).
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}
