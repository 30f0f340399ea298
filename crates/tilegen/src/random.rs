//! Shared pseudo-random stream, seed mixing, and normalized Perlin sampling.

use noise::{NoiseFn, Perlin};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

/// The single random stream every generator in one run draws from.
///
/// All draws are made once per logical unit of work so batch sizes never
/// change the sequence.
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform draw in `[min, max]`. A degenerate range returns `min` without
    /// consuming a draw.
    pub fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (i64::from(max) - i64::from(min) + 1) as u64;
        (i64::from(min) + (self.rng.next_u64() % span) as i64) as i32
    }

    /// Uniform draw in `[min, max)`.
    pub fn range_exclusive(&mut self, min: i32, max: i32) -> i32 {
        self.range_inclusive(min, max - 1)
    }

    pub fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.rng.next_u64() % len as u64) as usize
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit_f32(&mut self) -> f32 {
        (self.rng.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.unit_f32()
    }

    pub fn chance(&mut self, probability: f32) -> bool {
        self.unit_f32() < probability
    }

    pub fn coin(&mut self) -> bool {
        self.rng.next_u32() & 1 == 1
    }

    /// Forward Fisher-Yates: slot `i` swaps with a draw from `[i, len)`.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let len = items.len();
        for i in 0..len {
            let pick = i + self.index(len - i);
            items.swap(i, pick);
        }
    }
}

pub fn mix_seed_stream(seed: u64, stream: u64) -> u64 {
    let mut mixed = seed ^ stream.wrapping_mul(0xD6E8_FD9A_5B89_7A4D);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    mixed ^ (mixed >> 33)
}

/// Seed for one macro-tile, independent of the order tiles are initialized in.
pub fn derive_tile_seed(world_seed: u64, x: i32, y: i32) -> u64 {
    let mut mixed = world_seed ^ 0x9E37_79B9_7F4A_7C15;
    mixed ^= (x as u32 as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= (y as u32 as u64).wrapping_mul(0x94D0_49BB_1331_11EB);
    mixed ^= mixed >> 30;
    mixed = mixed.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 27;
    mixed = mixed.wrapping_mul(0x94D0_49BB_1331_11EB);
    mixed ^ (mixed >> 31)
}

#[derive(Clone, Debug)]
pub struct NoiseSource {
    perlin: Perlin,
}

impl NoiseSource {
    pub fn new(seed: u32) -> Self {
        Self { perlin: Perlin::new(seed) }
    }

    /// Perlin noise remapped from `[-1, 1]` into `[0, 1]`.
    pub fn sample01(&self, x: f64, y: f64) -> f32 {
        let value = self.perlin.get([x, y]);
        ((value + 1.0) * 0.5).clamp(0.0, 1.0) as f32
    }
}
