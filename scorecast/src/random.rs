//! Continuous variates drawn from a [`Rand`] source.

use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use tinyrand::Rand;

const INV_2_POW_53: f64 = 1.0 / (1u64 << 53) as f64;

/// Uniform on `[0, 1)`, using the top 53 bits of the next word.
#[inline]
pub fn uniform(rand: &mut impl Rand) -> f64 {
    (rand.next_u64() >> 11) as f64 * INV_2_POW_53
}

/// Uniform on `(0, 1]`; safe to take the logarithm of.
#[inline]
pub fn uniform_open_zero(rand: &mut impl Rand) -> f64 {
    1.0 - uniform(rand)
}

/// Standard normal variate by the Box–Muller transform.
#[inline]
pub fn standard_normal(rand: &mut impl Rand) -> f64 {
    let radius = (-2.0 * uniform_open_zero(rand).ln()).sqrt();
    let angle = 2.0 * PI * uniform(rand);
    radius * angle.cos()
}

/// A seed derived from the wall clock, for callers that did not ask for reproducibility.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos() as u64)
        .unwrap_or_default()
}
