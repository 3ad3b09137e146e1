//! Seeded random streams for synthetic Monte Carlo histories.

use std::f64::consts::PI;
use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;

/// Random stream of one replica of a synthetic ensemble.
///
/// Replica streams are seeded from `(master_seed, replica)` through
/// SipHash-1-3 with zero keys, so adding a replica leaves the histories of
/// the others unchanged.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Stream of replica `replica` of the ensemble seeded by `master_seed`.
    pub fn for_replica(master_seed: u64, replica: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(derive_substream_seed(master_seed, replica)),
        }
    }

    /// Uniform draw from `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Standard normal draw (Box-Muller).
    pub fn standard_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

/// Seed of substream `substream` under `master_seed`.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
