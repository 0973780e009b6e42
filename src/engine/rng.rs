// src/engine/rng.rs

//! Seeded pseudo-randomness. The generator and the shuffle are a frozen
//! contract: stored sessions are reproduced bit-for-bit from their seed.

use serde::Deserialize;

/// Mulberry32: 32-bit state, one `u32` mutation per draw.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(1 | t);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(61 | r));
        f64::from(r ^ (r >> 14)) / 4_294_967_296.0
    }

    /// Uniform integer in `[min, max]` (inclusive).
    pub fn pick_int(&mut self, min: i64, max: i64) -> i64 {
        let span = (max - min + 1) as f64;
        (self.next_f64() * span).floor() as i64 + min
    }

    /// Fisher-Yates from the back, consuming one draw per swap.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_f64() * (i + 1) as f64).floor() as usize;
            items.swap(i, j);
        }
    }

    pub fn shuffled<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        self.shuffle(&mut out);
        out
    }
}

/// Folds a string into a non-zero seed: `hash = hash * 31 + code_unit`,
/// wrapping at 32 bits.
pub fn hash_string_to_seed(value: &str) -> u32 {
    let hash = value
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)));
    if hash == 0 { 1 } else { hash }
}

/// Seed as supplied by a caller: an integer, or a string hashed to one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedInput {
    Number(u32),
    Text(String),
}

impl SeedInput {
    pub fn resolve(&self) -> u32 {
        match self {
            SeedInput::Number(n) => *n,
            SeedInput::Text(s) => hash_string_to_seed(s),
        }
    }
}

/// Process randomness for sessions created without an explicit seed.
pub fn fresh_seed() -> u32 {
    loop {
        let seed = rand::random::<u32>();
        if seed != 0 {
            return seed;
        }
    }
}
