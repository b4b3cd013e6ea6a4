// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Seeded PRNG & Distribution Samplers

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Lower clamp for the first Box–Muller uniform, keeps `ln(u1)` finite.
pub const MIN_UNIFORM: f64 = 1e-10;

// ─── SeededRng ──────────────────────────────────────────────────────────────

/// Deterministic uniform stream. Identical seed ⇒ identical stream on any thread.
#[derive(Debug, Clone)]
pub struct SeededRng {
    inner: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn next_uniform(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Standard normal via Box–Muller (cosine branch, one sample per two draws).
    pub fn standard_normal(&mut self) -> f64 {
        let u1 = self.next_uniform().max(MIN_UNIFORM);
        let u2 = self.next_uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }

    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_uniform()
    }

    /// Triangular sample by inverse CDF.
    pub fn triangular(&mut self, min: f64, mode: f64, max: f64) -> f64 {
        let span = max - min;
        if span <= 0.0 {
            return min;
        }
        let u = self.next_uniform();
        let split = (mode - min) / span;
        if u < split {
            min + (u * span * (mode - min)).sqrt()
        } else {
            max - ((1.0 - u) * span * (max - mode)).sqrt()
        }
    }

    /// Log-normal sample whose arithmetic mean and std match `mean`/`std_dev`.
    pub fn log_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let (mu, sigma) = log_normal_params(mean, std_dev);
        (mu + sigma * self.standard_normal()).exp()
    }
}

/// Moment-matched `(mu, sigma)` of the underlying normal.
pub fn log_normal_params(mean: f64, std_dev: f64) -> (f64, f64) {
    let variance_ratio = (std_dev * std_dev) / (mean * mean);
    let sigma_sq = (1.0 + variance_ratio).ln();
    let mu = mean.ln() - sigma_sq / 2.0;
    (mu, sigma_sq.sqrt())
}

// ─── Parameterized Distributions ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    Uniform { min: f64, max: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    LogNormal { mean: f64, std_dev: f64 },
}

impl Distribution {
    pub fn sample(&self, rng: &mut SeededRng) -> f64 {
        match *self {
            Self::Normal { mean, std_dev } => rng.normal(mean, std_dev),
            Self::Uniform { min, max } => rng.uniform(min, max),
            Self::Triangular { min, mode, max } => rng.triangular(min, mode, max),
            Self::LogNormal { mean, std_dev } => rng.log_normal(mean, std_dev),
        }
    }

    /// Analytical mean, used by tests and sanity checks.
    pub fn mean(&self) -> f64 {
        match *self {
            Self::Normal { mean, .. } | Self::LogNormal { mean, .. } => mean,
            Self::Uniform { min, max } => (min + max) / 2.0,
            Self::Triangular { min, mode, max } => (min + mode + max) / 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_mean_std(n: usize, mut f: impl FnMut() -> f64) -> (f64, f64) {
        let xs: Vec<f64> = (0..n).map(|_| f()).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        (mean, var.sqrt())
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng::new(7);
        let mut b = SeededRng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_uniform().to_bits(), b.next_uniform().to_bits());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRng::new(7);
        let mut b = SeededRng::new(1007);
        let same = (0..32).filter(|_| a.next_uniform() == b.next_uniform()).count();
        assert!(same < 32);
    }

    #[test]
    fn uniform_stays_in_unit_interval() {
        let mut rng = SeededRng::new(1);
        for _ in 0..10_000 {
            let u = rng.next_uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn standard_normal_moments() {
        let mut rng = SeededRng::new(42);
        let (mean, std) = sample_mean_std(50_000, || rng.standard_normal());
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.02);
        assert_abs_diff_eq!(std, 1.0, epsilon = 0.02);
    }

    #[test]
    fn triangular_respects_bounds_and_mean() {
        let mut rng = SeededRng::new(3);
        let dist = Distribution::Triangular { min: 2.0, mode: 3.0, max: 7.0 };
        let xs: Vec<f64> = (0..20_000).map(|_| dist.sample(&mut rng)).collect();
        assert!(xs.iter().all(|&x| (2.0..=7.0).contains(&x)));
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert_abs_diff_eq!(mean, dist.mean(), epsilon = 0.05);
    }

    #[test]
    fn triangular_degenerate_span_returns_min() {
        let mut rng = SeededRng::new(3);
        assert_eq!(rng.triangular(4.0, 4.0, 4.0), 4.0);
    }

    #[test]
    fn log_normal_matches_requested_moments() {
        let mut rng = SeededRng::new(11);
        let (mean, std) = sample_mean_std(100_000, || rng.log_normal(1.0, 0.2));
        assert_abs_diff_eq!(mean, 1.0, epsilon = 0.01);
        assert_abs_diff_eq!(std, 0.2, epsilon = 0.01);
    }

    #[test]
    fn log_normal_params_zero_std_is_point_mass() {
        let (mu, sigma) = log_normal_params(2.0, 0.0);
        assert_abs_diff_eq!(mu, 2.0_f64.ln(), epsilon = 1e-12);
        assert_eq!(sigma, 0.0);
    }

    #[test]
    fn uniform_distribution_mean() {
        let mut rng = SeededRng::new(5);
        let dist = Distribution::Uniform { min: -1.0, max: 3.0 };
        let (mean, _) = sample_mean_std(20_000, || dist.sample(&mut rng));
        assert_abs_diff_eq!(mean, 1.0, epsilon = 0.05);
    }
}
