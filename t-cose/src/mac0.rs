//! `COSE_Mac0`: a CBOR array `[protected, unprotected, payload, tag]`, authenticating
//! the payload with a single symmetric MAC key (RFC 9052 §6.2).

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::headers::HeaderMap;
use crate::iana::tag;
use crate::options::{SignOptions, VerifyOptions};
use crate::structures::mac_structure;
use crate::{CryptoProvider, RECOGNIZED_HEADERS};

const MESSAGE_BUF_CAP: usize = 65536;

/// Builds a `COSE_Mac0` message.
pub struct Mac0Build<'a, C: CryptoProvider> {
    crypto: &'a C,
    alg: i64,
    protected: HeaderMap,
    unprotected: HeaderMap,
    options: SignOptions,
}

impl<'a, C: CryptoProvider> Mac0Build<'a, C> {
    /// Start building a message MAC'd under `alg`.
    #[must_use]
    pub fn new(crypto: &'a C, alg: i64) -> Self {
        Self {
            crypto,
            alg,
            protected: HeaderMap::new(),
            unprotected: HeaderMap::new(),
            options: SignOptions::NONE,
        }
    }

    /// Set the `kid` header parameter (placed in the protected bucket).
    #[must_use]
    pub fn with_kid(mut self, kid: Vec<u8>) -> Self {
        self.protected.kid = Some(kid);
        self
    }

    /// Replace the protected header bucket.
    #[must_use]
    pub fn with_protected(mut self, protected: HeaderMap) -> Self {
        self.protected = protected;
        self
    }

    /// Replace the unprotected header bucket.
    #[must_use]
    pub fn with_unprotected(mut self, unprotected: HeaderMap) -> Self {
        self.unprotected = unprotected;
        self
    }

    /// Set options (`OMIT_CBOR_TAG`, `NO_CRIT_PARAM_CHECK`).
    #[must_use]
    pub fn with_options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }

    /// MAC `payload`, inlining it into the message.
    pub fn compute(
        &self,
        key: &C::SymmetricKey,
        external_aad: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        self.build(key, external_aad, payload, true)
    }

    /// MAC `payload` but emit `null` in its place (a detached payload).
    pub fn compute_detached(
        &self,
        key: &C::SymmetricKey,
        external_aad: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        self.build(key, external_aad, payload, false)
    }

    fn build(
        &self,
        key: &C::SymmetricKey,
        external_aad: &[u8],
        payload: &[u8],
        inline_payload: bool,
    ) -> Result<Vec<u8>, CoseError> {
        let mut protected = self.protected.clone();
        protected.alg = Some(self.alg);
        if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }

        let protected_bytes = protected.encode_protected()?;
        let to_be_maced = mac_structure("MAC0", &protected_bytes, external_aad, payload)?;
        let mut state = self.crypto.hmac_begin(self.alg, key)?;
        self.crypto.hmac_update(&mut state, &to_be_maced)?;
        let tag_bytes = self.crypto.hmac_finish(state)?;
        let unprotected_bytes = self.unprotected.encode_map()?;

        let mut buf = alloc::vec![0u8; MESSAGE_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        if !self.options.contains(SignOptions::OMIT_CBOR_TAG) {
            enc.add_tag_number(tag::COSE_MAC0);
        }
        enc.open_array();
        enc.add_encoded(&protected_bytes);
        enc.add_encoded(&unprotected_bytes);
        if inline_payload {
            enc.add_bytes(payload);
        } else {
            enc.add_null();
        }
        enc.add_bytes(&tag_bytes);
        enc.close_array();
        let len = enc
            .finish()
            .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Validates a `COSE_Mac0` message.
pub struct Mac0Validate<'a, C: CryptoProvider> {
    crypto: &'a C,
    options: VerifyOptions,
}

/// The result of a successful `COSE_Mac0` validation.
pub struct Mac0Validated<'m> {
    /// The decoded protected header bucket.
    pub protected: HeaderMap,
    /// The decoded unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The payload: borrowed from the message for an inlined payload, or the
    /// caller-supplied detached slice for a detached one.
    pub payload: &'m [u8],
}

struct ParsedMac0<'m> {
    protected: HeaderMap,
    protected_raw: &'m [u8],
    unprotected: HeaderMap,
    payload_item: Item<'m>,
    tag: Vec<u8>,
}

impl<'a, C: CryptoProvider> Mac0Validate<'a, C> {
    /// Start a validator with the given options.
    #[must_use]
    pub fn new(crypto: &'a C, options: VerifyOptions) -> Self {
        Self { crypto, options }
    }

    /// Validate a message with an inlined payload.
    pub fn validate<'m>(
        &self,
        key: &C::SymmetricKey,
        external_aad: &[u8],
        message: &'m [u8],
    ) -> Result<Mac0Validated<'m>, CoseError> {
        let parsed = self.parse(message)?;
        let payload = match parsed.payload_item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::Mac0Format)),
        };
        self.finish_validate(parsed.protected, parsed.protected_raw, parsed.unprotected, payload, external_aad, key, &parsed.tag)
    }

    /// Validate a message whose payload was detached at MAC time; `payload` is
    /// supplied out of band.
    pub fn validate_detached<'m>(
        &self,
        key: &C::SymmetricKey,
        external_aad: &[u8],
        message: &[u8],
        payload: &'m [u8],
    ) -> Result<Mac0Validated<'m>, CoseError> {
        let parsed = self.parse(message)?;
        if !matches!(parsed.payload_item, Item::Null) {
            return Err(CoseError::without_offset(CoseErrorCode::Mac0Format));
        }
        self.finish_validate(parsed.protected, parsed.protected_raw, parsed.unprotected, payload, external_aad, key, &parsed.tag)
    }

    fn parse<'m>(&self, message: &'m [u8]) -> Result<ParsedMac0<'m>, CoseError> {
        let mut dec = Decoder::new(message);
        let outer = dec.get_next()?;
        let tags = outer.tags.as_slice();
        if self.options.contains(VerifyOptions::TAG_REQUIRED) && tags.is_empty() {
            return Err(CoseError::without_offset(CoseErrorCode::IncorrectlyTagged));
        }
        if self.options.contains(VerifyOptions::TAG_PROHIBITED) && !tags.is_empty() {
            return Err(CoseError::without_offset(CoseErrorCode::IncorrectlyTagged));
        }
        if let Some(&t) = tags.first() {
            if t != tag::COSE_MAC0 {
                return Err(CoseError::without_offset(CoseErrorCode::WrongCoseMessageType));
            }
        }
        if !matches!(outer.item, Item::ArrayStart(4)) {
            return Err(CoseError::without_offset(CoseErrorCode::Mac0Format));
        }
        dec.enter_array(&outer.item)?;

        let protected_item = dec.get_next()?;
        let protected_content = match protected_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::Mac0Format)),
        };
        let protected_raw = &message[protected_item.offset..dec.position()];
        let protected = if protected_content.is_empty() {
            HeaderMap::new()
        } else {
            HeaderMap::decode_map(protected_content)?
        };

        let unprotected_item = dec.get_next()?;
        let unprotected = HeaderMap::decode_from_map_item(&mut dec, message, &unprotected_item.item)?;

        let payload_item = dec.get_next()?;
        let tag_item = dec.get_next()?;
        let tag_bytes = match tag_item.item {
            Item::Bytes(b, _) => Vec::from(b),
            _ => return Err(CoseError::without_offset(CoseErrorCode::Mac0Format)),
        };
        dec.exit_array()?;
        dec.finish()?;

        Ok(ParsedMac0 {
            protected,
            protected_raw,
            unprotected,
            payload_item: payload_item.item,
            tag: tag_bytes,
        })
    }

    fn finish_validate<'m>(
        &self,
        protected: HeaderMap,
        protected_raw: &[u8],
        unprotected: HeaderMap,
        payload: &'m [u8],
        external_aad: &[u8],
        key: &C::SymmetricKey,
        tag_bytes: &[u8],
    ) -> Result<Mac0Validated<'m>, CoseError> {
        if !self.options.contains(VerifyOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }
        if self.options.contains(VerifyOptions::REQUIRE_KID) && protected.kid.is_none() {
            return Err(CoseError::without_offset(CoseErrorCode::NoKid));
        }
        let alg = protected
            .alg
            .ok_or_else(|| CoseError::without_offset(CoseErrorCode::NoAlgId))?;

        if self.options.contains(VerifyOptions::DECODE_ONLY) {
            return Ok(Mac0Validated { protected, unprotected, payload });
        }

        let to_be_maced = mac_structure("MAC0", protected_raw, external_aad, payload)?;
        self.crypto.hmac_verify(alg, key, &to_be_maced, tag_bytes)?;
        Ok(Mac0Validated { protected, unprotected, payload })
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::{RustCryptoProvider, SymmetricKey};

    fn key_32() -> Vec<u8> {
        // 0b2d ... 8939, the 32-byte key from the COSE_Mac0 worked example.
        alloc::vec![
            0x0b, 0x2d, 0x0e, 0x1a, 0x2a, 0x2e, 0x1a, 0x2e, 0x11, 0x2d, 0x1e, 0x2d, 0x1a, 0x2e,
            0x11, 0x2d, 0x1e, 0x2d, 0x1a, 0x2e, 0x11, 0x2d, 0x1e, 0x2d, 0x1a, 0x2e, 0x11, 0x2d,
            0x1e, 0x2d, 0x89, 0x39,
        ]
    }

    #[test]
    fn mac0_round_trip_with_hmac256() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(key_32());

        let builder = Mac0Build::new(&provider, crate::iana::alg::HMAC_256_256);
        let message = builder.compute(&key, &[], b"payload").unwrap();

        // tag 17, protected = bstr{1: 5}, unprotected = {}, payload, 32-byte tag.
        assert_eq!(message[0], 0xd1);

        let validator = Mac0Validate::new(&provider, VerifyOptions::NONE);
        let validated = validator.validate(&key, &[], &message).unwrap();
        assert_eq!(validated.payload, b"payload");
    }

    #[test]
    fn mac0_tampered_payload_fails_hmac_verify() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(key_32());

        let builder = Mac0Build::new(&provider, crate::iana::alg::HMAC_256_256);
        let mut message = builder.compute(&key, &[], b"payload").unwrap();

        // Flip the first byte of the encoded "payload" text inside the message to 'h'.
        let idx = message.windows(7).position(|w| w == b"payload").unwrap();
        message[idx] = b'h';

        let validator = Mac0Validate::new(&provider, VerifyOptions::NONE);
        let err = validator.validate(&key, &[], &message).unwrap_err();
        assert_eq!(err.code, CoseErrorCode::HmacVerify);
    }
}
