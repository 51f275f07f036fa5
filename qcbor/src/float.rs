//! Half-precision (binary16) bit-pattern conversions and preferred-float reduction.
//!
//! These are pure bit manipulations so the crate never needs an FPU capable of `f16`
//! (Rust has no native `f16` type) and never depends on a software-float crate: every
//! conversion here operates on the IEEE-754 bit patterns directly.

/// Convert a binary16 bit pattern to `f32`, widening exactly (binary16 is a strict
/// subset of binary32's range/precision once exponent bias is rebased).
#[must_use]
pub fn half_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15) << 31;
    let exp = u32::from((bits >> 10) & 0x1f);
    let frac = u32::from(bits & 0x3ff);

    let bits32 = if exp == 0 {
        if frac == 0 {
            sign
        } else {
            // Subnormal half -> normalized f32.
            let mut e = -1i32;
            let mut f = frac;
            loop {
                f <<= 1;
                e += 1;
                if f & 0x400 != 0 {
                    break;
                }
            }
            let f = f & 0x3ff;
            let exp32 = (127 - 15 - e) as u32;
            sign | (exp32 << 23) | (f << 13)
        }
    } else if exp == 0x1f {
        // Inf / NaN.
        sign | (0xff << 23) | (frac << 13)
    } else {
        let exp32 = exp + (127 - 15);
        sign | (exp32 << 23) | (frac << 13)
    };
    f32::from_bits(bits32)
}

/// Attempt to convert an `f32` to a binary16 bit pattern, returning `None` if the value
/// cannot be represented exactly (this crate only ever downgrades floats when the
/// narrower form round-trips bit-for-bit).
#[must_use]
pub fn f32_to_half_exact(value: f32) -> Option<u16> {
    let bits = value.to_bits();
    let sign = (bits >> 31) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let frac = bits & 0x7f_ffff;

    if exp == 0xff {
        // Inf / NaN: representable only if the (truncated) mantissa fits in 10 bits
        // without losing set bits, which for canonical infinities/qNaN it does.
        let half_frac = frac >> 13;
        if half_frac << 13 == frac {
            return Some((sign << 15) | (0x1f << 10) | half_frac as u16);
        }
        return None;
    }

    if exp == 0 && frac == 0 {
        return Some(sign << 15);
    }

    let unbiased = exp - 127;
    if !(-24..=15).contains(&unbiased) {
        return None;
    }

    if unbiased >= -14 {
        // Representable as a normal half, if the low mantissa bits are all zero.
        if frac & 0x1fff != 0 {
            return None;
        }
        let half_exp = (unbiased + 15) as u16;
        let half_frac = (frac >> 13) as u16;
        Some((sign << 15) | (half_exp << 10) | half_frac)
    } else {
        // Subnormal half: shift the implicit 1 bit down; only exact if the bits that
        // fall off the bottom are all zero.
        let shift = 13 + (-14 - unbiased);
        if shift >= 32 {
            return if frac == 0 && unbiased == -24 {
                Some(sign << 15)
            } else {
                None
            };
        }
        let full = (1u32 << 23) | frac;
        if full & ((1u32 << shift) - 1) != 0 {
            return None;
        }
        let half_frac = (full >> shift) as u16;
        if half_frac > 0x3ff {
            return None;
        }
        Some((sign << 15) | half_frac)
    }
}

/// Attempt to convert an `f64` to an `f32` bit pattern, returning `None` unless the
/// round trip back to `f64` is bit-exact.
#[must_use]
pub fn f64_to_f32_exact(value: f64) -> Option<f32> {
    let narrowed = value as f32;
    if f64::from(narrowed).to_bits() == value.to_bits() {
        Some(narrowed)
    } else {
        None
    }
}

/// Returns `true` if `value` is a NaN with the non-canonical sign bit or payload that
/// `dCBOR`'s restricted-simple-values rule still allows to pass through unchanged.
/// (`qcbor` does not canonicalize NaN payloads; this is a hook point for callers that
/// need to recognize non-canonical NaNs.)
#[must_use]
pub fn is_non_canonical_nan(bits_f64: u64) -> bool {
    let exp = (bits_f64 >> 52) & 0x7ff;
    let frac = bits_f64 & 0xf_ffff_ffff_ffff;
    exp == 0x7ff && frac != 0 && bits_f64 != f64::NAN.to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_round_trip_common_values() {
        for &bits in &[0x0000u16, 0x3c00, 0xbc00, 0x7bff, 0xfbff, 0x0001, 0x8000] {
            let f = half_to_f32(bits);
            assert_eq!(f32_to_half_exact(f), Some(bits), "bits={bits:#06x}");
        }
    }

    #[test]
    fn half_to_f32_known_values() {
        assert_eq!(half_to_f32(0x3c00), 1.0f32);
        assert_eq!(half_to_f32(0xc000), -2.0f32);
        assert_eq!(half_to_f32(0x0000), 0.0f32);
        assert!(half_to_f32(0x7c01).is_nan());
    }

    #[test]
    fn f32_to_half_rejects_lossy() {
        assert_eq!(f32_to_half_exact(1.0001f32), None);
        assert_eq!(f32_to_half_exact(1.0f32), Some(0x3c00));
    }

    #[test]
    fn f64_to_f32_exact_checks_round_trip() {
        assert_eq!(f64_to_f32_exact(1.5f64), Some(1.5f32));
        assert_eq!(f64_to_f32_exact(core::f64::consts::PI), None);
    }
}
