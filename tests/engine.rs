//! Integration-level end-to-end scenarios exercising the public `Engine`
//! API only — no access to crate-internal types.

use ivfdb::{Engine, EngineConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

/// 100 Gaussian blobs in 128 dimensions, clustered around well-separated
/// centers.
fn clustered_dataset(rng: &mut StdRng, n_centers: usize, per_center: usize, dim: usize) -> Vec<Vec<f32>> {
    let centers: Vec<Vec<f32>> = (0..n_centers)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>() * 100.0).collect())
        .collect();

    let mut out = Vec::with_capacity(n_centers * per_center);
    for center in &centers {
        for _ in 0..per_center {
            let v: Vec<f32> = center.iter().map(|&c| c + rng.gen::<f32>() - 0.5).collect();
            out.push(v);
        }
    }
    out
}

fn brute_force_top_k(data: &[Vec<f32>], query: &[f32], k: usize) -> Vec<u64> {
    let mut ranked: Vec<(u64, f32)> = data
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let d: f32 = v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
            (i as u64, d)
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked.into_iter().map(|(id, _)| id).collect()
}

#[test]
fn clustered_data_achieves_recall_above_point_eight() {
    let dim = 128;
    let mut rng = StdRng::seed_from_u64(7);
    let data = clustered_dataset(&mut rng, 100, 10, dim);

    let engine = Engine::open(EngineConfig::new(dim)).unwrap();
    for v in &data {
        engine.add(v).unwrap();
    }
    engine.build(1000).unwrap();

    let mut query_rng = StdRng::seed_from_u64(99);
    let n_queries = 100;
    let k = 10;
    let mut total_hits = 0usize;

    for _ in 0..n_queries {
        let query: Vec<f32> = (0..dim).map(|_| query_rng.gen::<f32>() * 100.0).collect();

        let ivf: Vec<u64> = engine
            .search(&query, k, 0.2, 20, 5)
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        let truth = brute_force_top_k(&data, &query, k);

        total_hits += ivf.iter().filter(|id| truth.contains(id)).count();
    }

    let recall = total_hits as f64 / (n_queries * k) as f64;
    assert!(recall >= 0.8, "recall@10 was {recall}, expected >= 0.8");
}

#[test]
fn n_lists_one_with_unbounded_probe_achieves_perfect_recall() {
    let dim = 8;
    let mut rng = StdRng::seed_from_u64(3);
    let data: Vec<Vec<f32>> = (0..1000)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect())
        .collect();

    let engine = Engine::open(EngineConfig::new(dim)).unwrap();
    for v in &data {
        engine.add(v).unwrap();
    }
    engine.build(1).unwrap();

    let query: Vec<f32> = (0..dim).map(|_| rng.gen::<f32>()).collect();
    let ivf: Vec<u64> = engine
        .search(&query, 10, f32::INFINITY, 1, 1)
        .unwrap()
        .into_iter()
        .map(|h| h.id)
        .collect();
    let truth = brute_force_top_k(&data, &query, 10);

    assert_eq!(ivf, truth);
}

#[test]
fn add_build_search_survives_a_simulated_process_restart() {
    let dim = 4;
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join("restart.wal");

    {
        let engine = Engine::open(EngineConfig::new(dim).with_wal_path(&wal_path)).unwrap();
        engine.add(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        engine.add(&[0.0, 1.0, 0.0, 0.0]).unwrap();
        engine.add(&[0.0, 0.0, 1.0, 0.0]).unwrap();
        // No build: the WAL is never checkpointed, so all three records
        // must survive the simulated crash below.
    }

    let engine = Engine::open(EngineConfig::new(dim).with_wal_path(&wal_path)).unwrap();
    assert_eq!(engine.count(), 3);
    assert!(!engine.is_built());

    engine.build(1).unwrap();
    let hits = engine.search(&[1.0, 0.0, 0.0, 0.0], 1, 0.2, 20, 5).unwrap();
    assert_eq!(hits[0].id, 0);
    assert_eq!(hits[0].distance, 0.0);
}
