//! CBOR tag numbers and the content formats of RFC 8949 §3.4's standard tags.
//!
//! These helpers sit on top of [`crate::encode::Encoder`]/[`crate::decode::Decoder`]
//! rather than inside them: a tag number is just a `u64` preceding an ordinary item,
//! so encoding/decoding the tag content itself reuses the regular encoder/decoder
//! operations. What this module adds is the shape each tag's content must take, and
//! the big-number "preferred" reduction the dCBOR concrete scenario calls for.

use crate::decode::{Decoder, Item, Source};
use crate::encode::Encoder;
use crate::error::ErrorCode;

/// Standard tag numbers from RFC 8949 §3.4 and RFC 9052.
#[allow(missing_docs)]
pub mod tag {
    pub const DATE_STRING: u64 = 0;
    pub const EPOCH_SECONDS: u64 = 1;
    pub const POSITIVE_BIGNUM: u64 = 2;
    pub const NEGATIVE_BIGNUM: u64 = 3;
    pub const DECIMAL_FRACTION: u64 = 4;
    pub const BIGFLOAT: u64 = 5;
    pub const BASE64URL_HINT: u64 = 21;
    pub const BASE64_HINT: u64 = 22;
    pub const BASE16_HINT: u64 = 23;
    pub const ENCODED_CBOR: u64 = 24;
    pub const URI: u64 = 32;
    pub const BASE64URL_TEXT: u64 = 33;
    pub const BASE64_TEXT: u64 = 34;
    pub const REGEX: u64 = 35;
    pub const MIME: u64 = 36;
    pub const UUID: u64 = 37;
    pub const CWT: u64 = 61;
    pub const EPOCH_DAYS: u64 = 100;
    pub const DATE_ONLY_STRING: u64 = 1004;
    pub const MIME_257: u64 = 257;
    pub const SELF_DESCRIBED_CBOR: u64 = 55799;

    pub const COSE_SIGN1: u64 = 18;
    pub const COSE_SIGN: u64 = 98;
    pub const COSE_MAC0: u64 = 17;
    pub const COSE_MAC: u64 = 97;
    pub const COSE_ENCRYPT0: u64 = 16;
    pub const COSE_ENCRYPT: u64 = 96;
}

/// A big number: sign plus a big-endian, minimum-length magnitude (tags 2/3).
///
/// On this no-alloc decode path the magnitude is a slice borrowed from the input (or
/// mem pool); `t-cose` and other alloc-enabled callers may copy it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigNum<'a> {
    /// `true` for tag 3 (negated: the value is `-1 - magnitude`), `false` for tag 2.
    pub negative: bool,
    /// Big-endian magnitude bytes, minimum length (no leading zero byte).
    pub magnitude: &'a [u8],
}

/// Add tag 2 or 3 followed by the big-endian minimum-length magnitude as a byte
/// string. Does not attempt the "preferred" reduction to a plain integer — see
/// [`add_bignum_preferred`] for that.
pub fn add_bignum_raw(enc: &mut Encoder<'_>, value: BigNum<'_>) {
    enc.add_tag_number(if value.negative {
        tag::NEGATIVE_BIGNUM
    } else {
        tag::POSITIVE_BIGNUM
    });
    enc.add_bytes(value.magnitude);
}

/// Add a big number, first checking whether its magnitude fits in a `u64` — if so,
/// emit it as a plain (possibly negative) CBOR integer instead of a tagged byte
/// string, since RFC 8949's preferred serialization never uses tag 2/3 when a
/// standard integer would do. A negative value of magnitude 1 (i.e. −1) therefore
/// encodes to the single byte `0x20`, not a tag-3 wrapper.
pub fn add_bignum_preferred(enc: &mut Encoder<'_>, value: BigNum<'_>) {
    if let Some(magnitude) = magnitude_as_u64(value.magnitude) {
        if value.negative {
            // Magnitude m (m >= 1) represents -m; CBOR negative integers encode
            // -(1+n), so n = m - 1.
            enc.add_negative_uint64(magnitude - 1);
        } else {
            enc.add_uint64(magnitude);
        }
        return;
    }
    add_bignum_raw(enc, value);
}

fn magnitude_as_u64(be_bytes: &[u8]) -> Option<u64> {
    let trimmed = strip_leading_zeros(be_bytes);
    if trimmed.len() > 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    buf[8 - trimmed.len()..].copy_from_slice(trimmed);
    Some(u64::from_be_bytes(buf))
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < bytes.len() && bytes[i] == 0 {
        i += 1;
    }
    &bytes[i..]
}

/// A decimal fraction or bigfloat: `[exponent, mantissa]`, tags 4/5 (RFC 8949 §3.4.4).
/// The mantissa may itself be a plain integer or a tagged big number; this decoder
/// only reads the plain-integer mantissa case, since big-number mantissas need an
/// alloc-enabled caller to hold the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpMantissa {
    /// Base-10 (decimal fraction) or base-2 (bigfloat) exponent.
    pub exponent: i64,
    /// Mantissa; this decoder only supports the plain-integer mantissa form.
    pub mantissa: i64,
}

/// Add a decimal-fraction (tag 4) or bigfloat (tag 5) value as `[exponent, mantissa]`.
pub fn add_exp_mantissa(enc: &mut Encoder<'_>, tag_number: u64, value: ExpMantissa) {
    enc.add_tag_number(tag_number);
    enc.open_array();
    enc.add_int64(value.exponent);
    enc.add_int64(value.mantissa);
    enc.close_array();
}

/// Decode the `[exponent, mantissa]` pair following a tag-4/5 content item. `item`
/// must be the `Item::ArrayStart(2)` already returned by `get_next` for the tag's
/// content.
pub fn decode_exp_mantissa(dec: &mut Decoder<'_>, item: &Item<'_>) -> Result<ExpMantissa, ErrorCode> {
    let Item::ArrayStart(2) = *item else {
        return Err(ErrorCode::BadExpAndMantissa);
    };
    dec.enter_array(item).map_err(|e| e.code)?;
    let exponent = require_int(dec)?;
    let mantissa = require_int(dec)?;
    dec.exit_array().map_err(|e| e.code)?;
    Ok(ExpMantissa { exponent, mantissa })
}

fn require_int(dec: &mut Decoder<'_>) -> Result<i64, ErrorCode> {
    let tagged = dec.get_next().map_err(|e| e.code)?;
    match tagged.item {
        Item::UInt(v) => i64::try_from(v).map_err(|_| ErrorCode::IntOverflow),
        Item::NInt(v) => {
            let n = i64::try_from(v).map_err(|_| ErrorCode::IntOverflow)?;
            Ok(-1 - n)
        }
        _ => Err(ErrorCode::BadExpAndMantissa),
    }
}

/// Add tag 0: an RFC 3339 date-time string.
pub fn add_date_string(enc: &mut Encoder<'_>, rfc3339: &str) {
    enc.add_tag_number(tag::DATE_STRING);
    enc.add_text(rfc3339);
}

/// Add tag 1: seconds since the Unix epoch, as an integer or float depending on the
/// caller's already-chosen representation.
pub fn add_epoch_seconds_int(enc: &mut Encoder<'_>, seconds: i64) {
    enc.add_tag_number(tag::EPOCH_SECONDS);
    enc.add_int64(seconds);
}

/// Add tag 1 with a fractional-second float payload.
pub fn add_epoch_seconds_float(enc: &mut Encoder<'_>, seconds: f64) {
    enc.add_tag_number(tag::EPOCH_SECONDS);
    enc.add_double(seconds);
}

/// Add tag 100: days since the Unix epoch.
pub fn add_epoch_days(enc: &mut Encoder<'_>, days: i64) {
    enc.add_tag_number(tag::EPOCH_DAYS);
    enc.add_int64(days);
}

/// Decode a tag-1 epoch timestamp's content item into seconds, accepting either an
/// integer or floating-point representation and failing with `DateOverflow` if an
/// integer payload doesn't fit `i64`.
pub fn decode_epoch_seconds(item: &Item<'_>) -> Result<i64, ErrorCode> {
    match *item {
        Item::UInt(v) => i64::try_from(v).map_err(|_| ErrorCode::DateOverflow),
        Item::NInt(v) => {
            let n = i64::try_from(v).map_err(|_| ErrorCode::DateOverflow)?;
            Ok(-1 - n)
        }
        Item::Half(f) | Item::Single(f) => {
            if f.fract() != 0.0 {
                return Err(ErrorCode::DateOverflow);
            }
            Ok(f as i64)
        }
        Item::Double(d) => {
            if d.fract() != 0.0 {
                return Err(ErrorCode::DateOverflow);
            }
            Ok(d as i64)
        }
        _ => Err(ErrorCode::UnexpectedType),
    }
}

/// Decode a tag-2/3 content item (a byte string) into a [`BigNum`], given which tag
/// number preceded it.
pub fn decode_bignum<'de>(tag_number: u64, item: &Item<'de>) -> Result<BigNum<'de>, ErrorCode> {
    let Item::Bytes(magnitude, _source) = *item else {
        return Err(ErrorCode::BadOptionalTagContent);
    };
    match tag_number {
        tag::POSITIVE_BIGNUM => Ok(BigNum {
            negative: false,
            magnitude,
        }),
        tag::NEGATIVE_BIGNUM => Ok(BigNum {
            negative: true,
            magnitude,
        }),
        _ => Err(ErrorCode::BadOptionalTagContent),
    }
}

/// Wrap `Source` so callers pulling bignum content out of a decoder can tell borrowed-
/// from-input and borrowed-from-pool magnitudes apart, mirroring ordinary string
/// items.
#[must_use]
pub fn bignum_source(item: &Item<'_>) -> Option<Source> {
    match *item {
        Item::Bytes(_, s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_one_big_number_prefers_plain_integer() {
        let mut storage = [0u8; 8];
        let mut enc = Encoder::new(&mut storage);
        add_bignum_preferred(
            &mut enc,
            BigNum {
                negative: true,
                magnitude: &[0x01],
            },
        );
        let len = enc.finish().unwrap();
        assert_eq!(&enc.as_bytes()[..len], &[0x20]);
    }

    #[test]
    fn big_number_raw_keeps_tag_wrapper() {
        let mut storage = [0u8; 8];
        let mut enc = Encoder::new(&mut storage);
        add_bignum_raw(
            &mut enc,
            BigNum {
                negative: true,
                magnitude: &[0x00],
            },
        );
        let len = enc.finish().unwrap();
        assert_eq!(&enc.as_bytes()[..len], &[0xC3, 0x41, 0x00]);
    }

    #[test]
    fn exp_mantissa_round_trip() {
        let mut storage = [0u8; 16];
        let mut enc = Encoder::new(&mut storage);
        add_exp_mantissa(
            &mut enc,
            tag::DECIMAL_FRACTION,
            ExpMantissa {
                exponent: -2,
                mantissa: 27315,
            },
        );
        let len = enc.finish().unwrap();
        let bytes = &enc.as_bytes()[..len];

        let mut dec = Decoder::new(bytes);
        let tagged = dec.get_next().unwrap();
        assert_eq!(tagged.tags.as_slice(), &[tag::DECIMAL_FRACTION]);
        let got = decode_exp_mantissa(&mut dec, &tagged.item).unwrap();
        assert_eq!(
            got,
            ExpMantissa {
                exponent: -2,
                mantissa: 27315
            }
        );
    }
}
