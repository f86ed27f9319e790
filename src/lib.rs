//! # ivfdb — A Miniature IVF Approximate-Nearest-Neighbor Engine
//!
//! ## Architecture Overview
//!
//! ### Memory Layout: Structure of Arrays (SoA)
//!
//! The naive "Array of Structures" layout stores each vector as its own
//! heap allocation (`Vec<Vec<f32>>`). Each search iteration chases a
//! pointer to a random heap address, thrashing the L1/L2 cache with TLB
//! misses.
//!
//! [`Dataset`] instead uses a **flat, contiguous `Vec<f32>`** where
//! vector `i` occupies `data[i*dim .. (i+1)*dim]`. Both the k-means
//! trainer and the IVF search loop walk this buffer sequentially,
//! loading 256-bit (32-byte) cache lines that feed directly into AVX2
//! YMM registers. Bandwidth from L2 → L1 is ~512 GB/s on modern server
//! CPUs; pointer chasing throttles that to ~20 GB/s.
//!
//! ### Why `unsafe` get_unchecked in the Hot Path
//!
//! Every `slice[i]` access in safe Rust emits a bounds check: a cmp +
//! jae. Over a 10k-vector bucket scan at dim=128, that is well over a
//! million extra branches per query. With branch prediction most are
//! free — but they still consume micro-op buffer slots and prevent the
//! compiler from fully unrolling. `get_unchecked` removes them entirely
//! where we can *prove* bounds safety at the call site — see
//! [`distance::l2_distance`] and [`distance::ip_distance`].
//!
//! ### Loop Unrolling and LLVM Auto-Vectorization
//!
//! The distance kernels manually process 8 `f32` values per loop
//! iteration, matching one 256-bit AVX2 `VFMADD231PS` instruction.
//! LLVM's auto-vectorizer further combines these into the widest SIMD
//! width available (AVX-512 on supporting CPUs) without requiring
//! nightly-only intrinsics or `#[target_feature]` gating.
//!
//! ## Component Map
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`distance`] | L2²/inner-product kernels |
//! | [`dataset`] | Append-only flat vector storage |
//! | [`wal`] | Write-ahead log + crash recovery |
//! | [`rwlock`] | Writer-preferring reader/writer lock |
//! | [`pool`] | Fixed-size FIFO worker pool |
//! | [`kmeans`] | Lloyd's-algorithm centroid trainer |
//! | [`ivf`] | IVF index: build + probe-and-refine search |
//! | [`engine`] | Façade gluing the above under WAL + lock |
//!
//! ## Quick Start
//!
//! ```
//! use ivfdb::{Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::new(3)).unwrap();
//! engine.add(&[1.0, 2.0, 3.0]).unwrap();
//! engine.add(&[4.0, 5.0, 6.0]).unwrap();
//! engine.build(1).unwrap();
//!
//! let hits = engine.search(&[1.0, 2.0, 3.0], 1, 0.2, 20, 5).unwrap();
//! assert_eq!(hits[0].id, 0);
//! ```

// Global allocator: mimalloc.
//
// Per-thread "heaps" with size-segregated free lists make small
// allocations O(1) and nearly contention-free. Declared at the crate
// root so it applies to every allocation in this process, including
// those made by parking_lot and the worker pool's channels.
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod config;
pub mod dataset;
pub mod distance;
pub mod engine;
pub mod error;
pub mod ivf;
pub mod kmeans;
pub mod pool;
pub mod rwlock;
pub mod wal;

pub use config::EngineConfig;
pub use dataset::Dataset;
pub use engine::Engine;
pub use error::{Error, Result};
pub use ivf::{Hit, IvfIndex};
