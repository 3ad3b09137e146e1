use pvf_core::rng::{derive_substream_seed, RngHandle};

fn draws(master_seed: u64, replica: u64, count: usize) -> Vec<f64> {
    let mut rng = RngHandle::for_replica(master_seed, replica);
    (0..count).map(|_| rng.standard_normal()).collect()
}

#[test]
fn replica_histories_replay_from_the_master_seed() {
    assert_eq!(draws(1234, 0, 100), draws(1234, 0, 100));
    assert_eq!(draws(1234, 3, 100), draws(1234, 3, 100));
    assert_ne!(draws(1234, 0, 100), draws(1235, 0, 100));
}

#[test]
fn replicas_draw_from_independent_substreams() {
    let first = draws(7, 0, 50);
    let second = draws(7, 1, 50);
    assert_ne!(first, second);
    assert_ne!(derive_substream_seed(7, 0), derive_substream_seed(7, 1));
    assert_ne!(derive_substream_seed(7, 1), derive_substream_seed(8, 1));
}

#[test]
fn normal_draws_have_unit_variance() {
    let samples = draws(42, 0, 20_000);
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    assert!(mean.abs() < 0.05, "mean {mean}");
    assert!((variance - 1.0).abs() < 0.05, "variance {variance}");

    let mut rng = RngHandle::for_replica(42, 1);
    assert!((0..1000).map(|_| rng.uniform()).all(|u| (0.0..1.0).contains(&u)));
}
