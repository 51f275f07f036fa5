//! Encode/decode the "head" of a CBOR data item: the initial byte plus its 0/1/2/4/8
//! byte big-endian argument. This is the atomic unit every other component builds on.

use crate::buf::{InBuf, OutBuf};
use crate::error::{ErrorCode, QcborError};

/// CBOR major types (upper 3 bits of the head byte).
#[allow(missing_docs)]
pub mod major {
    pub const UNSIGNED: u8 = 0;
    pub const NEGATIVE: u8 = 1;
    pub const BYTES: u8 = 2;
    pub const TEXT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MAP: u8 = 5;
    pub const TAG: u8 = 6;
    pub const SIMPLE_FLOAT: u8 = 7;
}

/// Additional-information value denoting an indefinite-length container/string, or,
/// on major type 7, the `break` stop code.
pub const AI_INDEFINITE_OR_BREAK: u8 = 31;

/// Write the head byte plus minimal-width argument for `(major, value)` into `out`,
/// always choosing the smallest of the 0/1/2/4/8-byte encodings that represents
/// `value` ("preferred serialization" for integers and lengths).
pub fn encode_head(out: &mut OutBuf<'_>, major: u8, value: u64) {
    debug_assert!(major <= 7);
    if value < 24 {
        out.append_u8((major << 5) | value as u8);
    } else if value <= 0xff {
        out.append_u8((major << 5) | 24);
        out.append_u8(value as u8);
    } else if value <= 0xffff {
        out.append_u8((major << 5) | 25);
        out.append(&(value as u16).to_be_bytes());
    } else if value <= 0xffff_ffff {
        out.append_u8((major << 5) | 26);
        out.append(&(value as u32).to_be_bytes());
    } else {
        out.append_u8((major << 5) | 27);
        out.append(&value.to_be_bytes());
    }
}

/// Write a head byte whose additional-information field is the literal `ai` (used for
/// simple values, `break`, and indefinite-length container/string openers, none of
/// which carry a following argument).
pub fn encode_head_ai(out: &mut OutBuf<'_>, major: u8, ai: u8) {
    debug_assert!(major <= 7 && ai <= 31);
    out.append_u8((major << 5) | ai);
}

/// The decoded head of one CBOR data item: major type, raw additional-information
/// field, and (for AI 0..27) the reconstructed argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHead {
    /// The major type (upper 3 bits).
    pub major: u8,
    /// The raw additional-information field (lower 5 bits).
    pub ai: u8,
    /// Byte offset the head byte itself started at.
    pub offset: usize,
}

/// Read one head byte and, if AI is 24..27, its trailing argument bytes. Does not
/// reconstruct the argument value for AI 31 (indefinite/break) or reject AI 28..30 —
/// callers branch on `ai` first and call `read_argument` only when an argument is
/// expected.
pub fn decode_head(inp: &mut InBuf<'_>) -> Result<DecodedHead, QcborError> {
    let offset = inp.position();
    let byte = inp.read_u8()?;
    Ok(DecodedHead {
        major: byte >> 5,
        ai: byte & 0x1f,
        offset,
    })
}

/// Read the argument that follows a head byte with the given `ai`, without checking
/// for non-minimal encodings.
pub fn read_argument(inp: &mut InBuf<'_>, ai: u8, offset: usize) -> Result<u64, QcborError> {
    match ai {
        0..=23 => Ok(u64::from(ai)),
        24 => Ok(u64::from(inp.read_u8()?)),
        25 => {
            let b = inp.read_exact(2)?;
            Ok(u64::from(u16::from_be_bytes([b[0], b[1]])))
        }
        26 => {
            let b = inp.read_exact(4)?;
            Ok(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
        }
        27 => {
            let b = inp.read_exact(8)?;
            Ok(u64::from_be_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ]))
        }
        28..=30 => Err(QcborError::new(ErrorCode::UnsupportedReservedAi, offset)),
        _ => Err(QcborError::new(ErrorCode::BadIntegerLength, offset)),
    }
}

/// Same as [`read_argument`], but additionally rejects non-minimal (non-shortest)
/// encodings, for `DISALLOW_NON_PREFERRED_NUMBERS`/CDE/dCBOR decoding.
pub fn read_argument_checked(
    inp: &mut InBuf<'_>,
    ai: u8,
    offset: usize,
) -> Result<u64, QcborError> {
    let v = read_argument(inp, ai, offset)?;
    match ai {
        0..=23 => Ok(v),
        24 if v < 24 => Err(QcborError::new(ErrorCode::BadIntegerLength, offset)),
        25 if v <= u64::from(u8::MAX) => {
            Err(QcborError::new(ErrorCode::BadIntegerLength, offset))
        }
        26 if v <= u64::from(u16::MAX) => {
            Err(QcborError::new(ErrorCode::BadIntegerLength, offset))
        }
        27 if v <= u64::from(u32::MAX) => {
            Err(QcborError::new(ErrorCode::BadIntegerLength, offset))
        }
        _ => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(major: u8, value: u64) -> [u8; 9] {
        let mut storage = [0u8; 9];
        let mut out = OutBuf::new(&mut storage);
        encode_head(&mut out, major, value);
        storage
    }

    #[test]
    fn boundary_widths() {
        assert_eq!(&encode(0, 23)[..1], &[0x17]);
        assert_eq!(&encode(0, 24)[..2], &[0x18, 24]);
        assert_eq!(&encode(0, 255)[..2], &[0x18, 0xff]);
        assert_eq!(&encode(0, 256)[..3], &[0x19, 0x01, 0x00]);
        assert_eq!(&encode(0, 65535)[..3], &[0x19, 0xff, 0xff]);
        assert_eq!(&encode(0, 65536)[..5], &[0x1a, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            &encode(0, 0xffff_ffff)[..5],
            &[0x1a, 0xff, 0xff, 0xff, 0xff]
        );
        assert_eq!(
            &encode(0, 0x1_0000_0000)[..9],
            &[0x1b, 0, 0, 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn round_trip() {
        for &v in &[0u64, 1, 23, 24, 255, 256, 65535, 65536, u32::MAX as u64, u64::MAX] {
            let mut storage = [0u8; 9];
            let mut out = OutBuf::new(&mut storage);
            encode_head(&mut out, major::UNSIGNED, v);
            let len = out.finish().unwrap();
            let mut inp = InBuf::new(&storage[..len]);
            let head = decode_head(&mut inp).unwrap();
            assert_eq!(head.major, major::UNSIGNED);
            let got = read_argument(&mut inp, head.ai, head.offset).unwrap();
            assert_eq!(got, v);
        }
    }
}
