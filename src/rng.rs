//! Uniform Random Sources
//!
//! The shift register draws one uniform `[0, 1)` sample per tick to decide
//! whether the edge bit flips. The engine only depends on the
//! [`UniformSource`] trait; this module provides a fast seedable Xorshift128+
//! generator as the default source and, with the `rand` feature, an adapter
//! for any `rand::RngCore`.

/// A source of uniformly distributed samples in `[0.0, 1.0)`.
pub trait UniformSource {
    /// Draw the next sample in `[0.0, 1.0)`.
    fn next_uniform(&mut self) -> f64;
}

/// A seedable random number generator using Xorshift128+.
///
/// This RNG is fast, has a period of 2^128 - 1, and is `Copy`, so it can live
/// inside a module without allocation.
#[derive(Debug, Clone, Copy)]
pub struct Rng {
    s0: u64,
    s1: u64,
}

impl Rng {
    /// Create a new RNG with the given seed values.
    ///
    /// The seeds should not both be zero.
    #[inline]
    pub const fn new(s0: u64, s1: u64) -> Self {
        // Ensure at least one seed is non-zero
        let s0 = if s0 == 0 && s1 == 0 { 1 } else { s0 };
        Self { s0, s1 }
    }

    /// Create a new RNG from a single 64-bit seed.
    ///
    /// The seed is split into two state values using a mixing function.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        let s0 = splitmix64(seed);
        let s1 = splitmix64(seed.wrapping_add(0x9e3779b97f4a7c15));
        Self::new(s0, s1)
    }

    /// Create a new RNG seeded from system time (std only).
    #[cfg(feature = "std")]
    pub fn from_system_time() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Self::from_seed(duration.as_nanos() as u64)
    }

    /// Generate the next u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);

        result
    }

    /// Generate a random f64 in the range [0.0, 1.0).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // Upper 53 bits fill the mantissa
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl Default for Rng {
    fn default() -> Self {
        #[cfg(feature = "std")]
        {
            Self::from_system_time()
        }
        #[cfg(not(feature = "std"))]
        {
            Self::new(0x853c49e6748fea9b, 0xda3e39cb94b95bdb)
        }
    }
}

impl UniformSource for Rng {
    #[inline]
    fn next_uniform(&mut self) -> f64 {
        self.next_f64()
    }
}

/// Splitmix64 mixing function for deriving state from seeds.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Adapter that draws uniform samples from any `rand` generator.
#[cfg(feature = "rand")]
#[derive(Debug, Clone)]
pub struct RandSource<R>(pub R);

#[cfg(feature = "rand")]
impl<R: rand::RngCore> UniformSource for RandSource<R> {
    #[inline]
    fn next_uniform(&mut self) -> f64 {
        use rand::Rng as _;
        self.0.gen::<f64>()
    }
}
