//! Seeded random number generator.
//!
//! A lightweight xorshift PRNG: weight initialisation and dropout masks are
//! reproducible for a given configuration seed.

/// Xorshift generator with 64 bits of state.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Convert to [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / (u32::MAX as f32 + 1.0)
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Derive an independent generator, e.g. for a dropout layer's masks.
    pub fn fork(&mut self) -> SimpleRng {
        let high = self.next_u32() as u64;
        let low = self.next_u32() as u64;
        SimpleRng::new((high << 32) | low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(42);
        let mut rng2 = SimpleRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_next_f32_range() {
        let mut rng = SimpleRng::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f32();
            assert!((0.0..1.0).contains(&val));
        }
    }

    #[test]
    fn test_rng_gen_range_f32() {
        let mut rng = SimpleRng::new(67890);

        for _ in 0..1000 {
            let val = rng.gen_range_f32(-1.0, 1.0);
            assert!((-1.0..1.0).contains(&val));
        }
    }

    #[test]
    fn test_fork_is_deterministic_and_distinct() {
        let mut parent1 = SimpleRng::new(9);
        let mut parent2 = SimpleRng::new(9);
        let mut child1 = parent1.fork();
        let mut child2 = parent2.fork();

        assert_eq!(child1.next_u32(), child2.next_u32());
        assert_ne!(child1.next_u32(), parent1.next_u32());
    }
}
