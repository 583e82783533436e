//! Shared numeric helpers for the curve catalog and ramp machine.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Shape polynomials are plain arithmetic, so trajectories are
//!   bit-reproducible on every backend
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_ln(x: f32) -> f32 { x.ln() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] fn m_ln(x: f32) -> f32 { libm::logf(x) }
    // std backend
    } else {
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_ln(x: f32) -> f32 { x.ln() }
    }
}

// --------------------------------- Constants -------------------------------------

/// A very small epsilon used in safe divisions and silence floors.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// --------------------------------- dB / linear -----------------------------------

/// Convert dB to linear gain: lin = 10^(db/20).
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    if db <= -120.0 { 0.0 } else { m_exp(0.11512925464970229_f32 * db) } // ln(10)/20 ≈ 0.115129...
}

/// Convert linear gain to dB: db = 20*log10(lin).
#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    if lin <= EPS_SMALL { -120.0 }
    else { 8.685889638065036553_f32 * m_ln(lin) } // 20/ln(10)
}

// --------------------------------- Time conversion -------------------------------

/// Convert a duration in milliseconds to whole samples at `sr` Hz.
///
/// Rounds to nearest and never returns 0; a goal activated through the ramp
/// machine must span at least one sample.
#[inline]
pub fn ms_to_samples(ms: f32, sr: f32) -> u32 {
    let n = (ms * 0.001 * sr + 0.5) as u32;
    if n < 1 { 1 } else { n }
}

// --------------------------------- Shape polynomials -----------------------------

/// Half-amplitude sine: ½·sin(πt) for t in [-0.5, 0.5].
///
/// Odd degree-5 minimax polynomial, pinned exact at t = ±0.5 so curve
/// endpoints land on their targets; |error| < 1e-4 over the working range.
#[inline]
pub fn half_sine(t: f32) -> f32 {
    let u = PI * t;
    let u2 = u * u;
    0.5 * (u * (0.999_647_667_7 + u2 * (-0.165_569_292_2 + u2 * 0.007_473_299_7)))
}

/// Steep unit rise: 0.2x³ + 0.8x⁵ ≈ e^(6(x-1)) for x in [0, 1].
///
/// Ear-tuned; hits 0 at x=0, 1 at x=1, and ~0.05 at the midpoint like the
/// downscaled exponential it stands in for.
#[inline]
pub fn exp_unit(x: f32) -> f32 {
    let x2 = x * x;
    x2 * x * (0.2 + 0.8 * x2)
}

/// Quintic smoothstep 6x⁵ - 15x⁴ + 10x³; zero 1st and 2nd derivative at 0 and 1.
#[inline]
pub fn smoothstep5(x: f32) -> f32 {
    x * x * x * (x * (x * 6.0 - 15.0) + 10.0)
}

// --------------------------------- Index noise -----------------------------------

/// Stateless uniform noise in [-1, 1), hashed from an absolute sample index.
///
/// SplitMix-style integer scramble; no generator state, so any two calls with
/// the same index agree no matter how the surrounding block was split.
#[inline]
pub fn index_noise(i: u64) -> f32 {
    let mut z = i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    // top 24 bits → [0, 2) → [-1, 1)
    ((z >> 40) as f32) * (1.0 / 8_388_608.0) - 1.0
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_lin_roundtrip() {
        for db in [-60.0, -20.0, -6.0, 0.0, 6.0, 12.0, 24.0] {
            let lin = db_to_lin(db);
            let back = lin_to_db(lin);
            assert!((db - back).abs() < 0.1, "db={}, back={}", db, back);
        }
    }

    #[test]
    fn ms_conversion_rounds_and_floors_at_one() {
        assert_eq!(ms_to_samples(10.0, 48_000.0), 480);
        assert_eq!(ms_to_samples(1000.0, 44_100.0), 44_100);
        // sub-sample durations still span one sample
        assert_eq!(ms_to_samples(0.001, 48_000.0), 1);
        assert_eq!(ms_to_samples(0.0, 48_000.0), 1);
    }

    #[test]
    fn half_sine_tracks_reference() {
        let mut worst = 0.0f32;
        for k in 0..=1000 {
            let t = -0.5 + k as f32 * 0.001;
            let err = (half_sine(t) - 0.5 * (PI * t).sin()).abs();
            if err > worst { worst = err; }
        }
        assert!(worst < 1e-4, "worst={worst}");
    }

    #[test]
    fn exp_unit_endpoints_and_midpoint() {
        assert!(exp_unit(0.0).abs() < 1e-7);
        assert!((exp_unit(1.0) - 1.0).abs() < 1e-6);
        // ~e^-3 at the midpoint
        assert!((exp_unit(0.5) - 0.05).abs() < 1e-3);
    }

    #[test]
    fn smoothstep5_is_flat_at_ends() {
        assert!(smoothstep5(0.0).abs() < 1e-7);
        assert!((smoothstep5(1.0) - 1.0).abs() < 1e-6);
        let d0 = smoothstep5(1e-3) / 1e-3;
        let d1 = (1.0 - smoothstep5(1.0 - 1e-3)) / 1e-3;
        assert!(d0 < 1e-4, "d0={d0}");
        assert!(d1 < 1e-4, "d1={d1}");
    }

    #[test]
    fn index_noise_is_deterministic_and_bounded() {
        for i in [0u64, 1, 2, 63, 1_000_003, u64::MAX] {
            let a = index_noise(i);
            let b = index_noise(i);
            assert!(a == b, "i={i}");
            assert!((-1.0..1.0).contains(&a), "i={i} a={a}");
        }
        // neighbours decorrelate
        assert!((index_noise(7) - index_noise(8)).abs() > 1e-6);
    }
}
