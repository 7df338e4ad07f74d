//! Deterministic pseudo-random source for round advancement.
//!
//! The contract is the determinism, not the algorithm: identical internal
//! state always produces an identical subsequent output sequence. Round
//! instances derive from the run's base seed mixed with the round number,
//! so every team sharing a seed sees the same draw sequence for the same
//! round while different rounds stay decorrelated.

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 generator with a cached Gaussian spare.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
    spare_gaussian: Option<f64>,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed,
            spare_gaussian: None,
        }
    }

    /// Round-scoped instance: the base seed mixed with the round number
    /// through a fixed avalanche, so (seed, round) fully determines the
    /// sequence regardless of team or replay count.
    pub fn for_round(seed: u64, round: u32) -> Self {
        let mut z = seed ^ u64::from(round).wrapping_mul(GOLDEN_GAMMA);
        z = (z ^ (z >> 33)).wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        z = (z ^ (z >> 33)).wrapping_mul(0xC4CE_B9FE_1A85_EC53);
        z ^= z >> 33;
        Self::new(z)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform float in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in [min, max], inclusive. Degenerate ranges collapse
    /// to `min`.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as u64;
        min + (self.next_u64() % span) as i64
    }

    /// Normal draw via Box-Muller; the spare is cached so consecutive calls
    /// consume uniform draws in pairs.
    pub fn next_gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        if let Some(spare) = self.spare_gaussian.take() {
            return mean + spare * std_dev;
        }
        let mut u = self.next_f64();
        if u <= f64::EPSILON {
            u = f64::EPSILON;
        }
        let v = self.next_f64();
        let radius = (-2.0 * u.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * v;
        self.spare_gaussian = Some(radius * angle.sin());
        mean + radius * angle.cos() * std_dev
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.next_int(0, items.len() as i64 - 1) as usize;
        items.get(index)
    }

    /// Fisher-Yates, high index down, one `next_int` draw per swap.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_int(0, i as i64) as usize;
            items.swap(i, j);
        }
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn reset(&mut self, seed: u64) {
        self.state = seed;
        self.spare_gaussian = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_state_yields_identical_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn round_derivation_is_team_independent() {
        let mut first = SeededRng::for_round(1337, 3);
        let mut second = SeededRng::for_round(1337, 3);
        let draws_first: Vec<u64> = (0..16).map(|_| first.next_u64()).collect();
        let draws_second: Vec<u64> = (0..16).map(|_| second.next_u64()).collect();
        assert_eq!(draws_first, draws_second);
    }

    #[test]
    fn adjacent_rounds_decorrelate() {
        let mut r1 = SeededRng::for_round(1337, 1);
        let mut r2 = SeededRng::for_round(1337, 2);
        assert_ne!(r1.next_u64(), r2.next_u64());
    }

    #[test]
    fn next_f64_stays_in_unit_interval() {
        let mut rng = SeededRng::new(7);
        for _ in 0..1_000 {
            let draw = rng.next_f64();
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn next_int_respects_inclusive_bounds() {
        let mut rng = SeededRng::new(9);
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..2_000 {
            let draw = rng.next_int(2, 5);
            assert!((2..=5).contains(&draw));
            seen_lo |= draw == 2;
            seen_hi |= draw == 5;
        }
        assert!(seen_lo && seen_hi);
    }

    #[test]
    fn degenerate_int_range_returns_min() {
        let mut rng = SeededRng::new(11);
        assert_eq!(rng.next_int(4, 4), 4);
        assert_eq!(rng.next_int(9, 2), 9);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = SeededRng::new(5);
        let mut items: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
    }

    #[test]
    fn pick_returns_none_on_empty_and_in_bounds_otherwise() {
        let mut rng = SeededRng::new(13);
        let empty: [u32; 0] = [];
        assert_eq!(rng.pick(&empty), None);

        let items = [10_u32, 20, 30];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let picked = *rng.pick(&items).unwrap();
            let index = items.iter().position(|item| *item == picked).unwrap();
            seen[index] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn reset_rewinds_the_sequence() {
        let mut rng = SeededRng::new(77);
        let first: Vec<u64> = (0..8).map(|_| rng.next_u64()).collect();
        rng.reset(77);
        let second: Vec<u64> = (0..8).map(|_| rng.next_u64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn gaussian_centers_near_mean() {
        let mut rng = SeededRng::new(123);
        let total: f64 = (0..4_000).map(|_| rng.next_gaussian(10.0, 2.0)).sum();
        let mean = total / 4_000.0;
        assert!((mean - 10.0).abs() < 0.25, "observed mean {mean}");
    }
}
