//! Deterministic randomness for card sampling and shuffling.
//!
//! Everything in this module is a pure function of its seed: the same seed
//! always produces the same float or the same permutation. That lets a test
//! harness (or a reference client) reproduce an exact card layout from a
//! single integer instead of the full card list. Nothing here is
//! cryptographic; statistical quality only has to be good enough for
//! shuffling a handful of cards.

/// Hash a seed to a float in `[0, 1)`.
///
/// SplitMix64 finalizer, top 53 bits mapped onto the unit interval.
/// Distinct seeds produce uncorrelated-looking values; equal seeds produce
/// equal values.
pub fn random(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}

/// Deterministically permute `items` with a Fisher-Yates pass driven by
/// [`random`].
///
/// For any seed the result is a bijection: every input element appears
/// exactly once in the output. Shuffling `Vec::from_iter(0..n)` therefore
/// yields a permutation of `[0, n)`.
pub fn shuffle<T>(mut items: Vec<T>, seed: u64) -> Vec<T> {
    for i in (1..items.len()).rev() {
        // random() < 1.0, so j <= i after the floor.
        let j = (random(seed.wrapping_add(i as u64)) * (i as f64 + 1.0)) as usize;
        items.swap(i, j);
    }
    items
}

/// Take a seeded circular slice of `count` elements from `pool`.
///
/// The start index is derived from the seed; a slice that would run past
/// the end wraps around by concatenating the head slice onto the tail
/// slice instead of erroring, so a small pool still yields a full draw.
/// `count` is clamped to the pool size.
pub fn sample_circular<T: Clone>(pool: &[T], seed: u64, count: usize) -> Vec<T> {
    let pool_len = pool.len();
    if pool_len == 0 || count == 0 {
        return Vec::new();
    }
    let count = count.min(pool_len);

    let start = (pool_len as f64 * random(seed)) as usize;
    let end = start + count;

    if end > pool_len - 1 {
        let mut sampled = pool[..end % pool_len].to_vec();
        sampled.extend_from_slice(&pool[start..]);
        sampled
    } else {
        pool[start..end].to_vec()
    }
}

/// A lazily advancing seed source.
///
/// Each session owns one of these; every new game or per-set reshuffle draws
/// the next integer. Seeds start at the configured initial value, increment
/// by one per draw, and never repeat within a process lifetime.
#[derive(Debug, Clone)]
pub struct SeedSequence {
    next: u64,
}

impl SeedSequence {
    pub fn new(initial: u64) -> Self {
        Self { next: initial }
    }

    /// Return the current seed and advance to the next one.
    pub fn advance(&mut self) -> u64 {
        let seed = self.next;
        self.next += 1;
        seed
    }

    /// Peek at the next seed without consuming it.
    pub fn peek(&self) -> u64 {
        self.next
    }
}
