//! Protected and unprotected header parameter buckets (RFC 9052 §3.1), and the
//! `crit` critical-parameter check (RFC 9052 §3.1 paragraph 5).

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::iana::header;

/// The maximum encoded size this crate budgets for one header bucket. Generous
/// enough for any realistic set of COSE header parameters; [`HeaderMap::encode_map`]
/// and [`HeaderMap::encode_protected`] report [`CoseErrorCode::TooSmall`] rather than
/// silently truncating if exceeded.
const HEADER_BUF_CAP: usize = 4096;

/// A header parameter this crate does not interpret: a label plus its already
/// CBOR-encoded value, carried through verbatim on both encode and decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraParam {
    /// The integer header label.
    pub label: i64,
    /// The parameter's value, as already-encoded CBOR bytes (one item).
    pub value: Vec<u8>,
}

/// A decoded or to-be-encoded set of header parameters (one bucket: protected or
/// unprotected).
///
/// Labels from the common header parameters table (RFC 9052 §3.1) are exposed as
/// named fields; anything else is kept in [`Self::extra`] as opaque encoded bytes,
/// since this crate does not need to interpret most header parameter values to do
/// its job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    /// The `alg` header parameter (label 1), if present.
    pub alg: Option<i64>,
    /// The `crit` header parameter (label 2): labels the recipient is required to
    /// understand, empty if absent.
    pub crit: Vec<i64>,
    /// The `content type` header parameter (label 3), as a registered integer code,
    /// if present and encoded as an integer.
    pub content_type_uint: Option<u64>,
    /// The `content type` header parameter (label 3), as a MIME text string, if
    /// present and encoded as text.
    pub content_type_text: Option<alloc::string::String>,
    /// The `kid` header parameter (label 4), if present.
    pub kid: Option<Vec<u8>>,
    /// The `IV` header parameter (label 5), if present.
    pub iv: Option<Vec<u8>>,
    /// The `Partial IV` header parameter (label 6), if present.
    pub partial_iv: Option<Vec<u8>>,
    /// Every other header parameter, label and encoded value preserved verbatim.
    pub extra: Vec<ExtraParam>,
}

impl HeaderMap {
    /// An empty header bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `alg` parameter, builder style.
    #[must_use]
    pub fn with_alg(mut self, alg: i64) -> Self {
        self.alg = Some(alg);
        self
    }

    /// Set the `kid` parameter, builder style.
    #[must_use]
    pub fn with_kid(mut self, kid: Vec<u8>) -> Self {
        self.kid = Some(kid);
        self
    }

    /// Set the `crit` parameter, builder style.
    #[must_use]
    pub fn with_crit(mut self, crit: Vec<i64>) -> Self {
        self.crit = crit;
        self
    }

    /// True if this bucket carries no parameters at all (encodes as an empty map).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alg.is_none()
            && self.crit.is_empty()
            && self.content_type_uint.is_none()
            && self.content_type_text.is_none()
            && self.kid.is_none()
            && self.iv.is_none()
            && self.partial_iv.is_none()
            && self.extra.is_empty()
    }

    fn encode_body(&self, enc: &mut Encoder<'_>) {
        enc.open_map();
        if let Some(alg) = self.alg {
            enc.add_int64(header::ALG);
            enc.add_int64(alg);
        }
        if !self.crit.is_empty() {
            enc.add_int64(header::CRIT);
            enc.open_array();
            for label in &self.crit {
                enc.add_int64(*label);
            }
            enc.close_array();
        }
        if let Some(ct) = self.content_type_uint {
            enc.add_int64(header::CONTENT_TYPE);
            enc.add_uint64(ct);
        }
        if let Some(ct) = &self.content_type_text {
            enc.add_int64(header::CONTENT_TYPE);
            enc.add_text(ct);
        }
        if let Some(kid) = &self.kid {
            enc.add_int64(header::KID);
            enc.add_bytes(kid);
        }
        if let Some(iv) = &self.iv {
            enc.add_int64(header::IV);
            enc.add_bytes(iv);
        }
        if let Some(piv) = &self.partial_iv {
            enc.add_int64(header::PARTIAL_IV);
            enc.add_bytes(piv);
        }
        for param in &self.extra {
            enc.add_int64(param.label);
            enc.add_encoded(&param.value);
        }
        enc.close_map();
    }

    /// Encode this bucket as a bare CBOR map (used for the unprotected bucket, which
    /// is never bstr-wrapped).
    pub fn encode_map(&self) -> Result<Vec<u8>, CoseError> {
        let mut buf = alloc::vec![0u8; HEADER_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        self.encode_body(&mut enc);
        let len = enc
            .finish()
            .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Encode this bucket as a protected header: the serialized map wrapped in a byte
    /// string, or a zero-length byte string if the bucket is empty (RFC 9052 §3.1).
    pub fn encode_protected(&self) -> Result<Vec<u8>, CoseError> {
        if self.is_empty() {
            return Ok(alloc::vec![0x40]);
        }
        let mut buf = alloc::vec![0u8; HEADER_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        enc.bstr_wrap();
        self.encode_body(&mut enc);
        enc.close_bstr_wrap2(true);
        let len = enc
            .finish()
            .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Decode a bucket from a bare CBOR map (the unprotected bucket's wire form).
    pub fn decode_map(bytes: &[u8]) -> Result<Self, CoseError> {
        let mut dec = Decoder::new(bytes);
        let item = dec.get_next()?;
        let map = Self::decode_from_map_item(&mut dec, bytes, &item.item)?;
        dec.finish()?;
        Ok(map)
    }

    /// Decode a bucket from its protected-header wire form: a byte string containing
    /// the serialized map (possibly zero-length, meaning an empty bucket).
    pub fn decode_protected(bytes: &[u8]) -> Result<Self, CoseError> {
        let mut dec = Decoder::new(bytes);
        let item = dec.get_next()?;
        let inner = match item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::ParameterCbor)),
        };
        dec.finish()?;
        if inner.is_empty() {
            return Ok(Self::new());
        }
        Self::decode_map(inner)
    }

    pub(crate) fn decode_from_map_item(
        dec: &mut Decoder<'_>,
        bytes: &[u8],
        item: &Item<'_>,
    ) -> Result<Self, CoseError> {
        let count = match *item {
            Item::MapStart(n) => n,
            _ => return Err(CoseError::without_offset(CoseErrorCode::ParameterCbor)),
        };
        dec.enter_map(item)?;
        let mut map = Self::new();
        let mut seen_labels: Vec<i64> = Vec::new();
        for _ in 0..count {
            let label_item = dec.get_next()?;
            let label = match label_item.item {
                Item::UInt(v) => i64::try_from(v)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::ParameterCbor))?,
                Item::NInt(v) => {
                    -1 - i64::try_from(v).map_err(|_| CoseError::without_offset(CoseErrorCode::ParameterCbor))?
                }
                Item::Text(_, _) => {
                    return Err(CoseError::without_offset(CoseErrorCode::StringLabeledParam))
                }
                _ => return Err(CoseError::without_offset(CoseErrorCode::ParameterCbor)),
            };
            if seen_labels.contains(&label) {
                return Err(CoseError::without_offset(CoseErrorCode::DuplicateParameter));
            }
            seen_labels.push(label);

            let value_start = dec.position();
            let recognized = label == header::ALG
                || label == header::CRIT
                || label == header::CONTENT_TYPE
                || label == header::KID
                || label == header::IV
                || label == header::PARTIAL_IV;
            if !recognized {
                qcbor::skip_value(dec)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::ParameterCbor))?;
                let raw = Vec::from(&bytes[value_start..dec.position()]);
                map.extra.push(ExtraParam { label, value: raw });
                continue;
            }
            let value_item = dec.get_next()?;
            match label {
                l if l == header::ALG => {
                    map.alg = Some(decode_int_value(&value_item.item)?);
                }
                l if l == header::CRIT => {
                    map.crit = decode_crit_array(dec, &value_item.item)?;
                }
                l if l == header::CONTENT_TYPE => match value_item.item {
                    Item::UInt(v) => map.content_type_uint = Some(v),
                    Item::Text(s, _) => map.content_type_text = Some(alloc::string::String::from(s)),
                    _ => return Err(CoseError::without_offset(CoseErrorCode::BadContentType)),
                },
                l if l == header::KID => match value_item.item {
                    Item::Bytes(b, _) => map.kid = Some(Vec::from(b)),
                    _ => return Err(CoseError::without_offset(CoseErrorCode::InvalidParameterType)),
                },
                l if l == header::IV => match value_item.item {
                    Item::Bytes(b, _) => map.iv = Some(Vec::from(b)),
                    _ => return Err(CoseError::without_offset(CoseErrorCode::InvalidParameterType)),
                },
                l if l == header::PARTIAL_IV => match value_item.item {
                    Item::Bytes(b, _) => map.partial_iv = Some(Vec::from(b)),
                    _ => return Err(CoseError::without_offset(CoseErrorCode::InvalidParameterType)),
                },
                _ => unreachable!("recognized labels are exhaustively matched above"),
            }
        }
        dec.exit_map()?;
        Ok(map)
    }

    /// Validate `crit` against `protected` per RFC 9052 §3.1: every label named in
    /// `crit` must appear in `protected`, and (unless `allow_unknown` is set) every
    /// label this function does not itself recognize as a common header parameter
    /// must be one the caller already accounted for via `recognized`.
    pub fn check_crit(&self, recognized: &[i64], allow_unknown: bool) -> Result<(), CoseError> {
        for label in &self.crit {
            let present = *label == header::ALG && self.alg.is_some()
                || *label == header::CONTENT_TYPE
                    && (self.content_type_uint.is_some() || self.content_type_text.is_some())
                || *label == header::KID && self.kid.is_some()
                || *label == header::IV && self.iv.is_some()
                || *label == header::PARTIAL_IV && self.partial_iv.is_some()
                || self.extra.iter().any(|p| p.label == *label);
            if !present {
                return Err(CoseError::without_offset(CoseErrorCode::CritParameter));
            }
            if !allow_unknown && !recognized.contains(label) {
                return Err(CoseError::without_offset(CoseErrorCode::UnknownCriticalParameter));
            }
        }
        Ok(())
    }
}

fn decode_int_value(item: &Item<'_>) -> Result<i64, CoseError> {
    match *item {
        Item::UInt(v) => {
            i64::try_from(v).map_err(|_| CoseError::without_offset(CoseErrorCode::NonIntegerAlgId))
        }
        Item::NInt(v) => {
            let v = i64::try_from(v)
                .map_err(|_| CoseError::without_offset(CoseErrorCode::NonIntegerAlgId))?;
            Ok(-1 - v)
        }
        _ => Err(CoseError::without_offset(CoseErrorCode::NonIntegerAlgId)),
    }
}

fn decode_crit_array(dec: &mut Decoder<'_>, item: &Item<'_>) -> Result<Vec<i64>, CoseError> {
    let count = match *item {
        Item::ArrayStart(n) => n,
        _ => return Err(CoseError::without_offset(CoseErrorCode::ParameterCbor)),
    };
    dec.enter_array(item)?;
    let mut labels = Vec::new();
    for _ in 0..count {
        let entry = dec.get_next()?;
        labels.push(decode_int_value(&entry.item)?);
    }
    dec.exit_array()?;
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_protected_header_is_zero_length_byte_string() {
        let map = HeaderMap::new();
        let encoded = map.encode_protected().unwrap();
        assert_eq!(encoded, alloc::vec![0x40]);
    }

    #[test]
    fn alg_kid_round_trip_through_protected_bucket() {
        let map = HeaderMap::new()
            .with_alg(crate::iana::alg::HMAC_256_256)
            .with_kid(alloc::vec![1, 2, 3]);
        let encoded = map.encode_protected().unwrap();
        let decoded = HeaderMap::decode_protected(&encoded).unwrap();
        assert_eq!(decoded.alg, Some(crate::iana::alg::HMAC_256_256));
        assert_eq!(decoded.kid, Some(alloc::vec![1, 2, 3]));
    }

    #[test]
    fn crit_naming_absent_label_fails() {
        let map = HeaderMap::new().with_crit(alloc::vec![header::CONTENT_TYPE]);
        let err = map.check_crit(&[header::CONTENT_TYPE], false).unwrap_err();
        assert_eq!(err.code, CoseErrorCode::CritParameter);
    }

    #[test]
    fn crit_unknown_label_fails_unless_suppressed() {
        let map = HeaderMap::new().with_alg(1).with_crit(alloc::vec![header::ALG, 1000]);
        assert_eq!(
            map.check_crit(&[header::ALG], false).unwrap_err().code,
            CoseErrorCode::UnknownCriticalParameter
        );
        assert!(map.check_crit(&[header::ALG], true).is_ok());
    }
}
