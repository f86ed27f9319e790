//! Append-only, dimension-checked flat vector storage.
//!
//! Contiguous layout is mandatory, not incidental: the inner loops of
//! both k-means and IVF search stream centroid rows and vector rows
//! through the kernels in [`crate::distance`] back to back. Any layout
//! that fragments rows across separate heap allocations breaks that
//! cost model.

use crate::error::{Error, Result};

/// Flat, append-only storage for `dim`-wide `f32` vectors.
///
/// `storage.len() == dim * count` and ids are the dense range
/// `0..count`, assigned in insertion order.
#[derive(Debug, Default)]
pub struct Dataset {
    dim: usize,
    data: Vec<f32>,
    count: usize,
}

impl Dataset {
    /// Creates an empty dataset fixed at `dim` dimensions.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
            count: 0,
        }
    }

    /// Creates an empty dataset, pre-reserving storage for `capacity`
    /// vectors. Avoids the reallocate-and-copy churn a `build` over a
    /// large corpus would otherwise trigger.
    #[must_use]
    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self {
            dim,
            data: Vec::with_capacity(dim * capacity),
            count: 0,
        }
    }

    /// Appends `v` and returns its newly assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] when `v.len() != self.dim()`;
    /// the dataset is left unmodified.
    pub fn add(&mut self, v: &[f32]) -> Result<u64> {
        if v.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: v.len(),
            });
        }
        self.data.extend_from_slice(v);
        let id = self.count as u64;
        self.count += 1;
        Ok(id)
    }

    /// Returns an immutable view of vector `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.count()`. Out-of-range access is a
    /// programming error, not a reportable condition — callers only
    /// ever hold ids this dataset itself assigned.
    #[must_use]
    pub fn get(&self, i: u64) -> &[f32] {
        let i = i as usize;
        assert!(i < self.count, "vector id {i} out of bounds ({} stored)", self.count);
        let base = i * self.dim;
        &self.data[base..base + self.dim]
    }

    /// Dimensionality every stored vector shares.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of vectors currently stored.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Iterates over `(id, vector)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> {
        (0..self.count as u64).map(move |id| (id, self.get(id)))
    }
}
