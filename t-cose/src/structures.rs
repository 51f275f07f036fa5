//! The `Sig_structure`/`Sig_structure1`, `MAC_structure`, and `Enc_structure`
//! to-be-signed/MAC'd/encrypted byte constructions (RFC 9052 §4.4, §6.3, §5.3).
//!
//! Each builder writes through [`qcbor::Encoder`] so the assembled bytes share the
//! same preferred-serialization code path as every other encode in this crate.

use alloc::vec::Vec;

use qcbor::{EncodeFlags, Encoder};

use crate::error::{CoseError, CoseErrorCode};

/// Generous upper bound on an assembled to-be-signed/MAC'd/encrypted structure.
/// Protected headers and `external_aad` are small in practice; payloads that exceed
/// this budget should be hashed or chunked by the caller before reaching this crate.
const STRUCTURE_BUF_CAP: usize = 65536;

fn with_encoder(
    body: impl FnOnce(&mut Encoder<'_>),
) -> Result<Vec<u8>, CoseError> {
    let mut buf = alloc::vec![0u8; STRUCTURE_BUF_CAP];
    let mut enc = Encoder::new(&mut buf);
    enc.configure(EncodeFlags::PREFERRED);
    enc.open_array();
    body(&mut enc);
    enc.close_array();
    let len = enc
        .finish()
        .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
    buf.truncate(len);
    Ok(buf)
}

/// Build `Sig_structure1`, the bytes signed over by `COSE_Sign1`.
///
/// ```text
/// Sig_structure1 = [ "Signature1", body_protected, external_aad, payload ]
/// ```
pub fn sig_structure1(
    body_protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, CoseError> {
    with_encoder(|enc| {
        enc.add_text("Signature1");
        enc.add_encoded(body_protected);
        enc.add_bytes(external_aad);
        enc.add_bytes(payload);
    })
}

/// Build `Sig_structure`, the bytes one signer of a `COSE_Sign` message signs over.
///
/// ```text
/// Sig_structure = [ "Signature", body_protected, sign_protected, external_aad, payload ]
/// ```
pub fn sig_structure(
    body_protected: &[u8],
    sign_protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, CoseError> {
    with_encoder(|enc| {
        enc.add_text("Signature");
        enc.add_encoded(body_protected);
        enc.add_encoded(sign_protected);
        enc.add_bytes(external_aad);
        enc.add_bytes(payload);
    })
}

/// Build `MAC_structure`, the bytes MAC'd by `COSE_Mac0` or `COSE_Mac`.
///
/// ```text
/// MAC_structure = [ context, protected, external_aad, payload ]
/// ```
/// where `context` is `"MAC0"` or `"MAC"`.
pub fn mac_structure(
    context: &str,
    protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, CoseError> {
    with_encoder(|enc| {
        enc.add_text(context);
        enc.add_encoded(protected);
        enc.add_bytes(external_aad);
        enc.add_bytes(payload);
    })
}

/// Build `Enc_structure`, the additional authenticated data for `COSE_Encrypt0` or
/// `COSE_Encrypt`'s AEAD operation.
///
/// ```text
/// Enc_structure = [ context, protected, external_aad ]
/// ```
/// where `context` is `"Encrypt0"` or `"Encrypt"`.
pub fn enc_structure(
    context: &str,
    protected: &[u8],
    external_aad: &[u8],
) -> Result<Vec<u8>, CoseError> {
    with_encoder(|enc| {
        enc.add_text(context);
        enc.add_encoded(protected);
        enc.add_bytes(external_aad);
    })
}
