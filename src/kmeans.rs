//! Lloyd's k-means trainer producing `k` centroids over a [`Dataset`].
//!
//! The PRNG used for centroid initialization is owned by the trainer
//! and seeded from an explicit, caller-supplied value — determinism is
//! a contract here, not an accident of whatever global RNG state
//! happened to exist. Making the seed a first-class parameter keeps
//! repeated training runs over the same dataset bit-identical.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::distance::l2_distance;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;

/// `k` contiguous `dim`-wide centroid rows, row-major.
#[derive(Debug, Clone)]
pub struct Centroids {
    dim: usize,
    data: Vec<f32>,
}

impl Centroids {
    fn new(dim: usize, k: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * k],
        }
    }

    /// Number of centroids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim.max(1)
    }

    /// Returns true if there are no centroids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row `j`.
    #[must_use]
    pub fn row(&self, j: usize) -> &[f32] {
        let base = j * self.dim;
        &self.data[base..base + self.dim]
    }

    fn row_mut(&mut self, j: usize) -> &mut [f32] {
        let dim = self.dim;
        let base = j * dim;
        &mut self.data[base..base + dim]
    }

    /// Index of the centroid nearest `v` under squared L2, ties broken
    /// by lowest index.
    #[must_use]
    pub fn nearest(&self, v: &[f32]) -> usize {
        let mut best = 0usize;
        let mut best_d = f32::INFINITY;
        for j in 0..self.len() {
            // SAFETY of the `expect`: `v` and every centroid row share
            // `dim` by construction (both came from the same dataset).
            let d = l2_distance(v, self.row(j)).expect("dimension invariant violated");
            if d < best_d {
                best_d = d;
                best = j;
            }
        }
        best
    }
}

/// Runs Lloyd's algorithm over `dataset`, producing `k` centroids.
///
/// Assignment (the distance-to-every-centroid pass) is parallelized
/// over `pool`; the update step runs on the calling thread since it is
/// a cheap reduction once assignments are known.
///
/// # Errors
///
/// Returns [`Error::InsufficientData`] when `dataset.count() < k`, or
/// when `k == 0` (training zero centroids is never meaningful,
/// regardless of how much data is present).
pub fn train(
    dataset: &Dataset,
    k: usize,
    max_iter: usize,
    seed: u64,
    pool: &WorkerPool,
) -> Result<Centroids> {
    let count = dataset.count();
    if k == 0 || count < k {
        return Err(Error::InsufficientData { k, count });
    }

    let dim = dataset.dim();
    let mut rng = StdRng::seed_from_u64(seed);
    let initial = sample(&mut rng, count, k);

    let mut centroids = Centroids::new(dim, k);
    for (j, idx) in initial.iter().enumerate() {
        centroids.row_mut(j).copy_from_slice(dataset.get(idx as u64));
    }

    let mut assignments = vec![0usize; count];

    for iter in 0..max_iter {
        let changed = assign(dataset, &centroids, pool, &mut assignments);

        if iter > 0 && changed == 0 {
            tracing::debug!(iter, "k-means converged");
            break;
        }

        update(dataset, &assignments, &mut centroids);
    }

    Ok(centroids)
}

/// Assignment step: for every vector, the argmin centroid (lowest index
/// wins ties). Returns how many assignments changed since the previous
/// call. Parallelized over `pool` by splitting the dataset into
/// contiguous chunks, one task per chunk.
fn assign(
    dataset: &Dataset,
    centroids: &Centroids,
    pool: &WorkerPool,
    assignments: &mut [usize],
) -> usize {
    let count = dataset.count();

    // SAFETY of the raw pointers below: each chunk task writes only to
    // its own disjoint `start..end` sub-range of `assignments`, and the
    // `map_chunks` partition guarantees chunks never overlap, so there
    // is no data race even though every task captures the same base
    // pointer.
    let assignments_ptr = AssignmentsPtr(assignments.as_mut_ptr());
    let dataset_ptr = DatasetPtr(dataset as *const Dataset);
    let centroids_ptr = CentroidsPtr(centroids as *const Centroids);

    let per_chunk_changed = pool.map_chunks(count, move |range| {
        // SAFETY: see comment above `assignments_ptr`.
        let dataset = unsafe { &*dataset_ptr.0 };
        let centroids = unsafe { &*centroids_ptr.0 };
        let mut changed = 0usize;
        for i in range {
            let nearest = centroids.nearest(dataset.get(i as u64));
            unsafe {
                let slot = assignments_ptr.0.add(i);
                if *slot != nearest {
                    changed += 1;
                    *slot = nearest;
                }
            }
        }
        changed
    });

    per_chunk_changed.into_iter().sum()
}

// SAFETY: these wrap plain addresses captured once and never reassigned;
// `map_chunks` shares the closure holding them across worker threads by
// reference (it calls `Fn`, not `FnOnce`), which additionally requires
// `Sync` even though each chunk only ever dereferences into its own
// disjoint sub-range.
struct AssignmentsPtr(*mut usize);
unsafe impl Send for AssignmentsPtr {}
unsafe impl Sync for AssignmentsPtr {}
struct DatasetPtr(*const Dataset);
unsafe impl Send for DatasetPtr {}
unsafe impl Sync for DatasetPtr {}
struct CentroidsPtr(*const Centroids);
unsafe impl Send for CentroidsPtr {}
unsafe impl Sync for CentroidsPtr {}

/// Update step: each centroid becomes the mean of its assigned vectors.
/// Empty-cluster policy: retain the previous centroid value rather than
/// zeroing it or re-seeding it — a later IVF build pass will still place
/// every vector into *some* bucket regardless of how this centroid
/// looks this iteration.
fn update(dataset: &Dataset, assignments: &[usize], centroids: &mut Centroids) {
    let dim = dataset.dim();
    let k = centroids.len();

    let mut sums = vec![0.0f32; dim * k];
    let mut counts = vec![0u64; k];

    for (i, &c) in assignments.iter().enumerate() {
        let v = dataset.get(i as u64);
        let base = c * dim;
        for d in 0..dim {
            sums[base + d] += v[d];
        }
        counts[c] += 1;
    }

    for c in 0..k {
        if counts[c] == 0 {
            continue;
        }
        let base = c * dim;
        let row = centroids.row_mut(c);
        let n = counts[c] as f32;
        for d in 0..dim {
            row[d] = sums[base + d] / n;
        }
    }
}
