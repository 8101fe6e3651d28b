use rand::Rng;

/// Fixed-capacity uniform sample over a stream of unknown length
/// (Algorithm R).
///
/// After `seen` offers, each offered value is present with probability
/// `capacity / seen` once `seen > capacity`.
#[derive(Debug, Clone)]
pub struct Reservoir {
    capacity: usize,
    seen: u64,
    samples: Vec<f64>,
}

impl Reservoir {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            seen: 0,
            samples: Vec::with_capacity(capacity.min(1024)),
        }
    }

    /// Offer one observation. Fills until full, then replaces slot `j` for
    /// `j` drawn uniformly from `0..seen` whenever `j < capacity`.
    pub fn offer<R: Rng + ?Sized>(&mut self, value: f64, rng: &mut R) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(value);
            return;
        }
        let j = rng.gen_range(0..self.seen);
        if j < self.capacity as u64 {
            self.samples[j as usize] = value;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn median(&self) -> f64 {
        median(&self.samples)
    }
}

/// Median of `samples`: middle element for odd lengths, mean of the two
/// middle elements for even lengths, `0.0` when empty.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn median_known_values() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[5.0]), 5.0);
        assert_eq!(median(&[1.0, 3.0, 2.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[10.0, 15.0]), 12.5);
    }

    #[test]
    fn fills_before_replacing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut r = Reservoir::new(4);
        for v in [1.0, 2.0, 3.0] {
            r.offer(v, &mut rng);
        }
        assert_eq!(r.samples(), &[1.0, 2.0, 3.0]);
        assert_eq!(r.seen(), 3);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut r = Reservoir::new(10);
        for i in 0..5_000 {
            r.offer(i as f64, &mut rng);
        }
        assert_eq!(r.len(), 10);
        assert_eq!(r.seen(), 5_000);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut r = Reservoir::new(0);
        r.offer(7.0, &mut rng);
        assert_eq!(r.capacity(), 1);
        assert_eq!(r.samples(), &[7.0]);
    }

    #[test]
    fn retention_is_uniform_across_the_stream() {
        const K: usize = 10;
        const N: usize = 100;
        const TRIALS: u64 = 2_000;

        let mut kept = [0u32; N];
        for seed in 0..TRIALS {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut r = Reservoir::new(K);
            for i in 0..N {
                r.offer(i as f64, &mut rng);
            }
            for &v in r.samples() {
                kept[v as usize] += 1;
            }
        }

        // Expected K/N * TRIALS = 200 per position, sd ~13.4.
        for (i, &count) in kept.iter().enumerate() {
            assert!(
                (120..=280).contains(&count),
                "position {i} kept {count} times"
            );
        }
        let early: u32 = kept[..N / 2].iter().sum();
        let late: u32 = kept[N / 2..].iter().sum();
        let total = (K as u64 * TRIALS) as f64;
        assert!((early as f64 / total - 0.5).abs() < 0.03);
        assert!((late as f64 / total - 0.5).abs() < 0.03);
    }

    proptest! {
        #[test]
        fn median_ignores_insertion_order(mut values in prop::collection::vec(0.0f64..1e6, 0..64)) {
            let forward = median(&values);
            values.reverse();
            prop_assert_eq!(forward, median(&values));
        }

        #[test]
        fn median_lies_within_extrema(values in prop::collection::vec(0.0f64..1e6, 1..64)) {
            let m = median(&values);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(min <= m && m <= max);
        }
    }
}
