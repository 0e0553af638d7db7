// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use rand::Rng;
use rand_distr::StandardNormal;

/// Moving average over a ring of scaled gaussian samples, a cheap low pass
/// filtered white noise.
#[derive(Debug, Clone)]
pub struct SmoothJitter {
    data: Vec<f64>,
    bandwidth: f64,
    idx: usize,
    sum: f64,
}

impl SmoothJitter {
    /// Fills all samples slots up front. A zero sized ring is treated as one slot.
    pub fn new<R: Rng + ?Sized>(rng: &mut R, values: usize, bandwidth: f64) -> Self {
        let data: Vec<f64> = (0..values.max(1))
            .map(|_| rng.sample::<f64, _>(StandardNormal) * bandwidth)
            .collect();
        let sum = data.iter().sum();
        Self {
            data,
            bandwidth,
            idx: 0,
            sum,
        }
    }

    /// Replaces the sample after the cursor and returns the new mean.
    /// The cursor moves first, so slot 0 survives the first call.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.idx = (self.idx + 1) % self.data.len();

        self.sum -= self.data[self.idx];
        self.data[self.idx] = rng.sample::<f64, _>(StandardNormal) * self.bandwidth;
        self.sum += self.data[self.idx];

        self.sum / self.data.len() as f64
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn index(&self) -> usize {
        self.idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sum_tracks_samples() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut jitter = SmoothJitter::new(&mut rng, 30, 0.5);
        for _ in 0..1000 {
            let mean = jitter.next(&mut rng);
            let total: f64 = jitter.data().iter().sum();
            assert!((jitter.sum() - total).abs() < 1e-9);
            assert!((mean - total / 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn first_call_replaces_slot_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut jitter = SmoothJitter::new(&mut rng, 4, 0.5);
        let before = jitter.data().to_vec();
        jitter.next(&mut rng);
        assert_eq!(jitter.index(), 1);
        assert_eq!(jitter.data()[0], before[0]);
        assert_eq!(jitter.data()[2], before[2]);
        assert_eq!(jitter.data()[3], before[3]);
        assert!(jitter.data()[1] != before[1]);
        for _ in 0..3 {
            jitter.next(&mut rng);
        }
        // wrapped around
        assert_eq!(jitter.index(), 0);
    }

    #[test]
    fn mean_stays_small() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut jitter = SmoothJitter::new(&mut rng, 30, 0.5);
        for _ in 0..500 {
            // sigma of the mean is 0.5 / sqrt(30) ~ 0.09
            assert!(jitter.next(&mut rng).abs() < 1.0);
        }
    }
}
