// src/rng.rs
//! Random Number Generation for SDE Trajectories
//!
//! # Design Philosophy
//!
//! Every solver in this crate is generic over `R: Rng + ?Sized`, so the
//! Wiener increments always come from a generator the caller owns:
//! 1. **Reproducibility**: Same seed → bit-identical trajectories
//! 2. **Parallel safety**: Each trajectory of an ensemble gets its own stream
//! 3. **No hidden globals**: Nothing here touches a process-wide generator
//!
//! # Counter-Based RNG
//!
//! Ensembles use a counter-based generator similar to Philox/Threefry:
//! - Each trajectory gets a unique stream id
//! - Deterministic mapping: (seed, stream, counter) → random value
//! - Identical results for any rayon thread count
//!
//! Normal variates are drawn through `rand_distr::StandardNormal`.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Counter-based RNG for reproducible parallel simulations
///
/// # Algorithm
///
/// splitmix64 over a per-stream offset:
/// ```text
/// z = base_seed + stream * φ + counter
/// z = (z ⊕ (z >> 30)) * 0xbf58476d1ce4e5b9
/// z = (z ⊕ (z >> 27)) * 0x94d049bb133111eb
/// output = z ⊕ (z >> 31)
/// ```
///
/// Implements [`RngCore`], so it plugs into every solver directly.
#[derive(Debug, Clone)]
pub struct CounterRng {
    base: u64,
    counter: u64,
}

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

impl CounterRng {
    pub fn new(base_seed: u64, stream: u64) -> Self {
        // decorrelate neighbouring stream ids before mixing
        let base = base_seed ^ stream.wrapping_mul(GOLDEN_GAMMA).rotate_left(32);
        Self { base, counter: 0 }
    }

    fn mix(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1);
        let mut z = self
            .base
            .wrapping_add(self.counter.wrapping_mul(GOLDEN_GAMMA));
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9u64);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111ebu64);
        z ^ (z >> 31)
    }

    pub fn uniform(&mut self) -> f64 {
        (self.mix() >> 11) as f64 * (1.0 / 9007199254740992.0) // 2^53
    }
}

impl RngCore for CounterRng {
    fn next_u32(&mut self) -> u32 {
        (self.mix() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.mix()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.mix().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// RNG factory for reproducible ensembles
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// Create a counter RNG for a specific trajectory
    pub fn create_counter_rng(&self, trajectory_id: u64) -> CounterRng {
        CounterRng::new(self.base_seed, trajectory_id)
    }
}

pub fn seed_rng_from_u64(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// One standard-normal draw Z ~ N(0, 1)
pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

/// Column of `m` independent Wiener increments ΔW ~ N(0, h), given √h
pub fn wiener_increments<R: Rng + ?Sized>(rng: &mut R, m: usize, sqrt_h: f64) -> Array1<f64> {
    Array1::from_shape_fn(m, |_| sqrt_h * get_normal_draw(rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_rng_reproducibility() {
        let factory = RngFactory::new(42);

        let mut rng1 = factory.create_counter_rng(0);
        let mut rng2 = factory.create_counter_rng(0);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_counter_rng_different_streams() {
        let factory = RngFactory::new(42);

        let mut rng1 = factory.create_counter_rng(0);
        let mut rng2 = factory.create_counter_rng(1);

        let vals1: Vec<u64> = (0..10).map(|_| rng1.next_u64()).collect();
        let vals2: Vec<u64> = (0..10).map(|_| rng2.next_u64()).collect();

        assert_ne!(vals1, vals2);
    }

    #[test]
    fn test_uniform_range() {
        let mut rng = CounterRng::new(7, 3);
        for _ in 0..10_000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_normal_distribution() {
        let factory = RngFactory::new(42);
        let mut rng = factory.create_counter_rng(0);

        let samples: Vec<f64> = (0..20_000).map(|_| get_normal_draw(&mut rng)).collect();

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;

        assert!(mean.abs() < 0.05, "Mean should be close to 0, got {}", mean);
        assert!(
            (variance - 1.0).abs() < 0.05,
            "Variance should be close to 1, got {}",
            variance
        );
    }

    #[test]
    fn test_wiener_increment_scaling() {
        let mut rng = seed_rng_from_u64(11);
        let h: f64 = 0.04;
        let dw = wiener_increments(&mut rng, 20_000, h.sqrt());

        let variance = dw.iter().map(|x| x * x).sum::<f64>() / dw.len() as f64;
        assert!(
            (variance - h).abs() < 0.1 * h,
            "Increment variance should be close to h = {}, got {}",
            h,
            variance
        );
    }
}
