//! `COSE_Sign1`: a CBOR array `[protected, unprotected, payload, signature]`, carrying
//! exactly one signature over the whole message (RFC 9052 §4.2).

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::headers::HeaderMap;
use crate::iana::tag;
use crate::options::{SignOptions, VerifyOptions};
use crate::structures::sig_structure1;
use crate::{short_circuit_sign, short_circuit_verify, CryptoProvider, RECOGNIZED_HEADERS};

const MESSAGE_BUF_CAP: usize = 65536;

/// Builds a `COSE_Sign1` message over a single payload with a single signer.
pub struct Sign1Sign<'a, C: CryptoProvider> {
    crypto: &'a C,
    alg: i64,
    protected: HeaderMap,
    unprotected: HeaderMap,
    options: SignOptions,
}

impl<'a, C: CryptoProvider> Sign1Sign<'a, C> {
    /// Start building a message signed under `alg`.
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

    /// Replace the protected header bucket entirely (e.g. to add `crit` or
    /// unrecognized parameters); `alg` is always set from the constructor argument
    /// regardless of what this bucket carries.
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

    /// Set signing options (`ALLOW_SHORT_CIRCUIT`, `OMIT_CBOR_TAG`, ...).
    #[must_use]
    pub fn with_options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }

    /// Sign `payload`, inlining it into the message.
    pub fn sign(
        &self,
        key: &C::SigningKey,
        external_aad: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        self.build(key, external_aad, payload, true)
    }

    /// Sign `payload` but emit `null` in its place (a detached payload): the verifier
    /// must be given `payload` out of band.
    pub fn sign_detached(
        &self,
        key: &C::SigningKey,
        external_aad: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        self.build(key, external_aad, payload, false)
    }

    fn build(
        &self,
        key: &C::SigningKey,
        external_aad: &[u8],
        payload: &[u8],
        inline_payload: bool,
    ) -> Result<Vec<u8>, CoseError> {
        let mut protected = self.protected.clone();
        protected.alg = Some(self.alg);
        let short_circuit = self.options.contains(SignOptions::ALLOW_SHORT_CIRCUIT);
        if short_circuit && protected.kid.is_none() {
            protected.kid = Some(Vec::from(crate::iana::SHORT_CIRCUIT_KID));
        }
        if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }

        let protected_bytes = protected.encode_protected()?;
        let tbs = sig_structure1(&protected_bytes, external_aad, payload)?;
        let signature = if short_circuit {
            short_circuit_sign(self.crypto, &tbs)?
        } else {
            self.crypto.sign(self.alg, key, &tbs)?
        };
        let unprotected_bytes = self.unprotected.encode_map()?;

        let mut buf = alloc::vec![0u8; MESSAGE_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        if !self.options.contains(SignOptions::OMIT_CBOR_TAG) {
            enc.add_tag_number(tag::COSE_SIGN1);
        }
        enc.open_array();
        enc.add_encoded(&protected_bytes);
        enc.add_encoded(&unprotected_bytes);
        if inline_payload {
            enc.add_bytes(payload);
        } else {
            enc.add_null();
        }
        enc.add_bytes(&signature);
        enc.close_array();
        let len = enc
            .finish()
            .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Verifies a `COSE_Sign1` message.
pub struct Sign1Verify<'a, C: CryptoProvider> {
    crypto: &'a C,
    options: VerifyOptions,
}

/// The result of a successful `COSE_Sign1` verification.
pub struct Sign1Verified<'m> {
    /// The decoded protected header bucket.
    pub protected: HeaderMap,
    /// The decoded unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The payload: borrowed from the message for an inlined payload, or the
    /// caller-supplied detached slice for a detached one.
    pub payload: &'m [u8],
}

struct ParsedSign1<'m> {
    protected: HeaderMap,
    protected_raw: &'m [u8],
    unprotected: HeaderMap,
    payload_item: Item<'m>,
    signature: Vec<u8>,
}

impl<'a, C: CryptoProvider> Sign1Verify<'a, C> {
    /// Start a verifier with the given options.
    #[must_use]
    pub fn new(crypto: &'a C, options: VerifyOptions) -> Self {
        Self { crypto, options }
    }

    /// Verify a message with an inlined payload.
    pub fn verify<'m>(
        &self,
        key: &C::VerificationKey,
        external_aad: &[u8],
        message: &'m [u8],
    ) -> Result<Sign1Verified<'m>, CoseError> {
        let parsed = self.parse(message)?;
        let payload = match parsed.payload_item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::Sign1Format)),
        };
        self.finish_verify(parsed.protected, parsed.protected_raw, parsed.unprotected, payload, external_aad, key, &parsed.signature)
    }

    /// Verify a message whose payload was detached at signing time; `payload` is
    /// supplied out of band.
    pub fn verify_detached<'m>(
        &self,
        key: &C::VerificationKey,
        external_aad: &[u8],
        message: &[u8],
        payload: &'m [u8],
    ) -> Result<Sign1Verified<'m>, CoseError> {
        let parsed = self.parse(message)?;
        if !matches!(parsed.payload_item, Item::Null) {
            return Err(CoseError::without_offset(CoseErrorCode::Sign1Format));
        }
        self.finish_verify(parsed.protected, parsed.protected_raw, parsed.unprotected, payload, external_aad, key, &parsed.signature)
    }

    fn parse<'m>(&self, message: &'m [u8]) -> Result<ParsedSign1<'m>, CoseError> {
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
            if t != tag::COSE_SIGN1 {
                return Err(CoseError::without_offset(CoseErrorCode::WrongCoseMessageType));
            }
        }
        if !matches!(outer.item, Item::ArrayStart(4)) {
            return Err(CoseError::without_offset(CoseErrorCode::Sign1Format));
        }
        dec.enter_array(&outer.item)?;

        let protected_item = dec.get_next()?;
        if !matches!(protected_item.item, Item::Bytes(_, _)) {
            return Err(CoseError::without_offset(CoseErrorCode::Sign1Format));
        }
        let protected_content = match protected_item.item {
            Item::Bytes(b, _) => b,
            _ => unreachable!("checked above"),
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
        let sig_item = dec.get_next()?;
        let signature = match sig_item.item {
            Item::Bytes(b, _) => Vec::from(b),
            _ => return Err(CoseError::without_offset(CoseErrorCode::Sign1Format)),
        };
        dec.exit_array()?;
        dec.finish()?;

        Ok(ParsedSign1 {
            protected,
            protected_raw,
            unprotected,
            payload_item: payload_item.item,
            signature,
        })
    }

    fn finish_verify<'m>(
        &self,
        protected: HeaderMap,
        protected_raw: &[u8],
        unprotected: HeaderMap,
        payload: &'m [u8],
        external_aad: &[u8],
        key: &C::VerificationKey,
        signature: &[u8],
    ) -> Result<Sign1Verified<'m>, CoseError> {
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
            return Ok(Sign1Verified { protected, unprotected, payload });
        }

        let tbs = sig_structure1(protected_raw, external_aad, payload)?;
        let short_circuit = self.options.contains(VerifyOptions::ALLOW_SHORT_CIRCUIT)
            && protected.kid.as_deref() == Some(crate::iana::SHORT_CIRCUIT_KID);
        if short_circuit {
            short_circuit_verify(self.crypto, &tbs, signature)?;
        } else {
            self.crypto.verify(alg, key, &tbs, signature)?;
        }
        Ok(Sign1Verified { protected, unprotected, payload })
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::{RustCryptoProvider, SigningKey, VerificationKey};
    use ed25519_dalek::SigningKey as DalekSigningKey;
    use rand_core::OsRng;

    #[test]
    fn sign1_round_trip_with_eddsa() {
        let provider = RustCryptoProvider;
        let signing = DalekSigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();

        let signer = Sign1Sign::new(&provider, crate::iana::alg::EDDSA)
            .with_kid(alloc::vec![1, 2, 3]);
        let message = signer
            .sign(&SigningKey::Ed25519(signing), &[], b"hello world")
            .unwrap();

        let verifier = Sign1Verify::new(&provider, VerifyOptions::NONE);
        let verified = verifier
            .verify(&VerificationKey::Ed25519(verifying), &[], &message)
            .unwrap();
        assert_eq!(verified.payload, b"hello world");
        assert_eq!(verified.protected.kid, Some(alloc::vec![1, 2, 3]));
    }

    #[test]
    fn sign1_tampering_is_detected() {
        let provider = RustCryptoProvider;
        let signing = DalekSigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();

        let signer = Sign1Sign::new(&provider, crate::iana::alg::EDDSA);
        let mut message = signer
            .sign(&SigningKey::Ed25519(signing), &[], b"hello world")
            .unwrap();
        let last = message.len() - 1;
        message[last] ^= 0xff;

        let verifier = Sign1Verify::new(&provider, VerifyOptions::NONE);
        assert!(verifier
            .verify(&VerificationKey::Ed25519(verifying), &[], &message)
            .is_err());
    }

    #[test]
    fn sign1_short_circuit_round_trip() {
        let provider = RustCryptoProvider;
        let signer = Sign1Sign::new(&provider, crate::iana::alg::EDDSA)
            .with_options(SignOptions::ALLOW_SHORT_CIRCUIT);
        // The short-circuit path never touches the signing key.
        let signing = DalekSigningKey::generate(&mut OsRng);
        let message = signer
            .sign(&SigningKey::Ed25519(signing), &[], b"payload")
            .unwrap();

        let verifier = Sign1Verify::new(&provider, VerifyOptions::ALLOW_SHORT_CIRCUIT);
        let verifying = DalekSigningKey::generate(&mut OsRng).verifying_key();
        let verified = verifier
            .verify(&VerificationKey::Ed25519(verifying), &[], &message)
            .unwrap();
        assert_eq!(verified.payload, b"payload");
    }

    #[test]
    fn sign1_detached_payload_round_trip() {
        let provider = RustCryptoProvider;
        let signing = DalekSigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();

        let signer = Sign1Sign::new(&provider, crate::iana::alg::EDDSA);
        let message = signer
            .sign_detached(&SigningKey::Ed25519(signing), &[], b"detached payload")
            .unwrap();

        let verifier = Sign1Verify::new(&provider, VerifyOptions::NONE);
        let verified = verifier
            .verify_detached(&VerificationKey::Ed25519(verifying), &[], &message, b"detached payload")
            .unwrap();
        assert_eq!(verified.payload, b"detached payload");
    }
}
