//! Seedable uniform source plus the derived distributions the rest of the
//! simulator draws from (exponential inter-arrival times, Gaussian efficacy
//! samples, Bernoulli trial counts).
//!
//! The reference simulator keeps two independent scalar generator states —
//! one advanced while building/evolving neurons, one for synapses — so that
//! re-seeding either stream in isolation is reproducible. [`Streams`] models
//! that with two independently seeded [`rand::rngs::StdRng`] instances.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A single named, seedable uniform-[0,1) source plus its derived distributions.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: StdRng,
    /// Cached second deviate from the polar Box-Muller transform; mirrors the
    /// reference `NormDev` implementation, which emits Gaussian samples two
    /// at a time and caches the spare one.
    spare_gaussian: Option<f64>,
}

impl RandomStream {
    /// Builds a stream seeded from `seed`.
    pub fn new(seed: u64) -> Self {
        RandomStream { rng: StdRng::seed_from_u64(seed), spare_gaussian: None }
    }

    /// Draws `U ~ Uniform[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws a uniform index in `[0, n)`.
    pub fn uniform_index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Draws `Exp ~ Exponential(rate = 1)`, i.e. `-ln(U)` for `U` uniform and
    /// strictly positive (retried on the zero draw, as the reference
    /// `ExpDev` does).
    pub fn exponential(&mut self) -> f64 {
        loop {
            let u = self.uniform();
            if u != 0.0 {
                return -u.ln();
            }
        }
    }

    /// Draws `N ~ Normal(0, 1)` via the polar (Marsaglia) Box-Muller method,
    /// caching every second deviate.
    pub fn gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare_gaussian.take() {
            return spare;
        }
        loop {
            let v1 = 2.0 * self.uniform() - 1.0;
            let v2 = 2.0 * self.uniform() - 1.0;
            let r = v1 * v1 + v2 * v2;
            if r < 1.0 && r != 0.0 {
                let fac = (-2.0 * r.ln() / r).sqrt();
                self.spare_gaussian = Some(v1 * fac);
                return v2 * fac;
            }
        }
    }

    /// Draws `N ~ Normal(mean, stddev)`.
    pub fn gaussian_with(&mut self, mean: f64, stddev: f64) -> f64 {
        mean + stddev * self.gaussian()
    }

    /// Draws the number of "successes" in `n` independent Bernoulli(`p`)
    /// trials by scanning the cumulative binomial distribution, matching the
    /// reference `BernDev`.
    pub fn binomial(&mut self, n: u32, p: f64) -> u32 {
        if n == 0 || p <= 0.0 {
            return 0;
        }
        let q = 1.0 - p;
        let precision = 0.00001;
        let mut pmf = (n as f64 * q.ln()).exp();
        let mut cdf = pmf;
        let mut r = self.uniform();
        if (1.0 - r) < precision {
            r = 1.0 - precision;
        }
        let mut k = 0u32;
        while r >= cdf {
            k += 1;
            pmf *= (n - k + 1) as f64 / k as f64 * p / q;
            cdf += pmf;
        }
        k
    }

    /// Draws `k` distinct indices from `0..n` without replacement, via a
    /// partial Fisher-Yates shuffle (reservoir of the first `k` slots of a
    /// lazily-shuffled `0..n` array).
    pub fn sample_without_replacement(&mut self, n: usize, k: usize) -> Vec<u32> {
        let k = k.min(n);
        let mut pool: Vec<u32> = (0..n as u32).collect();
        for i in 0..k {
            let j = i + self.uniform_index(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

/// The two independent random streams used throughout a simulation: one
/// driving neuron-level draws (external spike recipients, LUT indices), one
/// driving synapse construction and plastic-state initialization.
#[derive(Debug, Clone)]
pub struct Streams {
    /// Stream used for neuron-related draws.
    pub neurons: RandomStream,
    /// Stream used for synapse-related draws.
    pub synapses: RandomStream,
}

impl Streams {
    /// Builds the pair of streams from their seeds.
    pub fn new(neurons_seed: u64, synapses_seed: u64) -> Self {
        Streams { neurons: RandomStream::new(neurons_seed), synapses: RandomStream::new(synapses_seed) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_draws_stay_in_range() {
        let mut s = RandomStream::new(1);
        for _ in 0..1000 {
            let u = s.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn reseeding_reproduces_the_same_sequence() {
        let mut a = RandomStream::new(42);
        let mut b = RandomStream::new(42);
        let seq_a: Vec<f64> = (0..50).map(|_| a.gaussian()).collect();
        let seq_b: Vec<f64> = (0..50).map(|_| b.gaussian()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn gaussian_mean_and_stddev_are_approximately_right() {
        let mut s = RandomStream::new(7);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| s.gaussian_with(10.0, 2.0)).collect();
        let mean: f64 = samples.iter().sum::<f64>() / n as f64;
        let var: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 10.0).abs() < 0.1);
        assert!((var.sqrt() - 2.0).abs() < 0.1);
    }

    #[test]
    fn binomial_zero_probability_is_always_zero() {
        let mut s = RandomStream::new(3);
        for _ in 0..100 {
            assert_eq!(s.binomial(50, 0.0), 0);
        }
    }

    #[test]
    fn sample_without_replacement_has_no_duplicates() {
        let mut s = RandomStream::new(11);
        let sample = s.sample_without_replacement(100, 20);
        assert_eq!(sample.len(), 20);
        let mut sorted = sample.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
    }

    proptest::proptest! {
        #[test]
        fn uniform_stays_in_unit_range_for_any_seed(seed in 0u64..u64::MAX) {
            let mut s = RandomStream::new(seed);
            let u = s.uniform();
            prop_assert!((0.0..1.0).contains(&u));
        }

        #[test]
        fn sample_without_replacement_never_exceeds_the_pool(seed in 0u64..10_000, n in 1usize..200, k in 0usize..250) {
            let mut s = RandomStream::new(seed);
            let sample = s.sample_without_replacement(n, k);
            prop_assert_eq!(sample.len(), k.min(n));
            prop_assert!(sample.iter().all(|&v| (v as usize) < n));
        }
    }
}
