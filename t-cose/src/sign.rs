//! `COSE_Sign`: a CBOR array `[protected, unprotected, payload, signatures]` where
//! `signatures` is an array of `COSE_Signature` structures, each carrying one
//! signer's own protected/unprotected buckets and signature (RFC 9052 §4.1).

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::headers::HeaderMap;
use crate::iana::tag;
use crate::options::{SignOptions, VerifyOptions};
use crate::structures::sig_structure;
use crate::{short_circuit_sign, short_circuit_verify, CryptoProvider, RECOGNIZED_HEADERS};

const MESSAGE_BUF_CAP: usize = 65536;

/// One signer's contribution to a `COSE_Sign` message: the algorithm and key it
/// signs under, plus its own protected/unprotected header buckets.
pub struct SignerRequest<'k, C: CryptoProvider> {
    /// The COSE algorithm ID this signer signs under.
    pub alg: i64,
    /// The signer's private key handle.
    pub key: &'k C::SigningKey,
    /// This signer's protected header bucket (`alg` is set automatically).
    pub protected: HeaderMap,
    /// This signer's unprotected header bucket.
    pub unprotected: HeaderMap,
}

impl<'k, C: CryptoProvider> SignerRequest<'k, C> {
    /// A signer with empty header buckets beyond the algorithm.
    #[must_use]
    pub fn new(alg: i64, key: &'k C::SigningKey) -> Self {
        Self { alg, key, protected: HeaderMap::new(), unprotected: HeaderMap::new() }
    }

    /// Set this signer's `kid` (placed in its protected bucket).
    #[must_use]
    pub fn with_kid(mut self, kid: Vec<u8>) -> Self {
        self.protected.kid = Some(kid);
        self
    }
}

/// Builds a `COSE_Sign` message with one or more independent signers.
pub struct SignBuild<'a, C: CryptoProvider> {
    crypto: &'a C,
    body_protected: HeaderMap,
    body_unprotected: HeaderMap,
    options: SignOptions,
}

impl<'a, C: CryptoProvider> SignBuild<'a, C> {
    /// Start building a message, initially with no signers.
    #[must_use]
    pub fn new(crypto: &'a C) -> Self {
        Self {
            crypto,
            body_protected: HeaderMap::new(),
            body_unprotected: HeaderMap::new(),
            options: SignOptions::NONE,
        }
    }

    /// Replace the body-level protected header bucket.
    #[must_use]
    pub fn with_body_protected(mut self, protected: HeaderMap) -> Self {
        self.body_protected = protected;
        self
    }

    /// Replace the body-level unprotected header bucket.
    #[must_use]
    pub fn with_body_unprotected(mut self, unprotected: HeaderMap) -> Self {
        self.body_unprotected = unprotected;
        self
    }

    /// Set options (`OMIT_CBOR_TAG`, `NO_CRIT_PARAM_CHECK`, `ALLOW_SHORT_CIRCUIT`).
    #[must_use]
    pub fn with_options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }

    /// Sign `payload` with each of `signers`, producing one `COSE_Signature` per
    /// entry.
    pub fn sign(
        &self,
        signers: &[SignerRequest<'_, C>],
        external_aad: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        if signers.is_empty() {
            return Err(CoseError::without_offset(CoseErrorCode::NoSigners));
        }

        let mut body_protected = self.body_protected.clone();
        if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
            body_protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }
        let body_protected_bytes = body_protected.encode_protected()?;
        let body_unprotected_bytes = self.body_unprotected.encode_map()?;

        let short_circuit = self.options.contains(SignOptions::ALLOW_SHORT_CIRCUIT);

        let mut buf = alloc::vec![0u8; MESSAGE_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        if !self.options.contains(SignOptions::OMIT_CBOR_TAG) {
            enc.add_tag_number(tag::COSE_SIGN);
        }
        enc.open_array();
        enc.add_encoded(&body_protected_bytes);
        enc.add_encoded(&body_unprotected_bytes);
        enc.add_bytes(payload);
        enc.open_array();
        for signer in signers {
            let mut sign_protected = signer.protected.clone();
            sign_protected.alg = Some(signer.alg);
            if short_circuit && sign_protected.kid.is_none() {
                sign_protected.kid = Some(Vec::from(crate::iana::SHORT_CIRCUIT_KID));
            }
            if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
                sign_protected.check_crit(&RECOGNIZED_HEADERS, false)?;
            }
            let sign_protected_bytes = sign_protected.encode_protected()?;
            let tbs = sig_structure(&body_protected_bytes, &sign_protected_bytes, external_aad, payload)?;
            let signature = if short_circuit {
                short_circuit_sign(self.crypto, &tbs)?
            } else {
                self.crypto.sign(signer.alg, signer.key, &tbs)?
            };
            let sign_unprotected_bytes = signer.unprotected.encode_map()?;

            enc.open_array();
            enc.add_encoded(&sign_protected_bytes);
            enc.add_encoded(&sign_unprotected_bytes);
            enc.add_bytes(&signature);
            enc.close_array();
        }
        enc.close_array();
        enc.close_array();
        let len = enc
            .finish()
            .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// One decoded `COSE_Signature` entry.
pub struct DecodedSignature {
    /// This signer's protected header bucket.
    pub protected: HeaderMap,
    /// This signer's unprotected header bucket.
    pub unprotected: HeaderMap,
}

/// The result of a successful `COSE_Sign` verification.
pub struct SignVerified<'m> {
    /// The body-level protected header bucket.
    pub body_protected: HeaderMap,
    /// The body-level unprotected header bucket.
    pub body_unprotected: HeaderMap,
    /// The payload.
    pub payload: &'m [u8],
    /// Every signer's headers, in message order. The index of the signature that
    /// actually verified is [`Self::verified_index`].
    pub signatures: Vec<DecodedSignature>,
    /// Index into [`Self::signatures`] of the entry that verified.
    pub verified_index: usize,
}

/// Verifies a `COSE_Sign` message against a single known verification key, trying
/// each `COSE_Signature` entry in turn.
pub struct SignVerify<'a, C: CryptoProvider> {
    crypto: &'a C,
    options: VerifyOptions,
}

impl<'a, C: CryptoProvider> SignVerify<'a, C> {
    /// Start a verifier with the given options.
    #[must_use]
    pub fn new(crypto: &'a C, options: VerifyOptions) -> Self {
        Self { crypto, options }
    }

    /// Verify `message` against `key`, accepting the first `COSE_Signature` entry
    /// that matches.
    pub fn verify<'m>(
        &self,
        key: &C::VerificationKey,
        external_aad: &[u8],
        message: &'m [u8],
    ) -> Result<SignVerified<'m>, CoseError> {
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
            if t != tag::COSE_SIGN {
                return Err(CoseError::without_offset(CoseErrorCode::WrongCoseMessageType));
            }
        }
        if !matches!(outer.item, Item::ArrayStart(4)) {
            return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat));
        }
        dec.enter_array(&outer.item)?;

        let body_protected_item = dec.get_next()?;
        let body_protected_content = match body_protected_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat)),
        };
        let body_protected_raw = &message[body_protected_item.offset..dec.position()];
        let body_protected = if body_protected_content.is_empty() {
            HeaderMap::new()
        } else {
            HeaderMap::decode_map(body_protected_content)?
        };
        if !self.options.contains(VerifyOptions::NO_CRIT_PARAM_CHECK) {
            body_protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }

        let body_unprotected_item = dec.get_next()?;
        let body_unprotected = HeaderMap::decode_from_map_item(&mut dec, message, &body_unprotected_item.item)?;

        let payload_item = dec.get_next()?;
        let payload = match payload_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat)),
        };

        let signatures_item = dec.get_next()?;
        let sig_count = match signatures_item.item {
            Item::ArrayStart(n) => usize::try_from(n)
                .map_err(|_| CoseError::without_offset(CoseErrorCode::SignatureFormat))?,
            _ => return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat)),
        };
        if sig_count == 0 {
            return Err(CoseError::without_offset(CoseErrorCode::NoSigners));
        }
        dec.enter_array(&signatures_item.item)?;

        let mut decoded = Vec::with_capacity(sig_count);
        let mut raw_entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(sig_count);
        for _ in 0..sig_count {
            let entry = dec.get_next()?;
            if !matches!(entry.item, Item::ArrayStart(3)) {
                return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat));
            }
            dec.enter_array(&entry.item)?;

            let sign_protected_item = dec.get_next()?;
            let sign_protected_content = match sign_protected_item.item {
                Item::Bytes(b, _) => b,
                _ => return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat)),
            };
            let sign_protected_raw = Vec::from(&message[sign_protected_item.offset..dec.position()]);
            let sign_protected = if sign_protected_content.is_empty() {
                HeaderMap::new()
            } else {
                HeaderMap::decode_map(sign_protected_content)?
            };

            let sign_unprotected_item = dec.get_next()?;
            let sign_unprotected = HeaderMap::decode_from_map_item(&mut dec, message, &sign_unprotected_item.item)?;

            let sig_item = dec.get_next()?;
            let signature = match sig_item.item {
                Item::Bytes(b, _) => Vec::from(b),
                _ => return Err(CoseError::without_offset(CoseErrorCode::SignatureFormat)),
            };
            dec.exit_array()?;

            if !self.options.contains(VerifyOptions::NO_CRIT_PARAM_CHECK) {
                sign_protected.check_crit(&RECOGNIZED_HEADERS, false)?;
            }
            decoded.push(DecodedSignature { protected: sign_protected, unprotected: sign_unprotected });
            raw_entries.push((sign_protected_raw, signature));
        }
        dec.exit_array()?;
        dec.exit_array()?;
        dec.finish()?;

        if self.options.contains(VerifyOptions::DECODE_ONLY) {
            return Ok(SignVerified {
                body_protected,
                body_unprotected,
                payload,
                signatures: decoded,
                verified_index: 0,
            });
        }

        let short_circuit = self.options.contains(VerifyOptions::ALLOW_SHORT_CIRCUIT);
        for (index, (sign_protected_raw, signature)) in raw_entries.iter().enumerate() {
            let alg = match decoded[index].protected.alg {
                Some(alg) => alg,
                None => continue,
            };
            let tbs = match sig_structure(body_protected_raw, sign_protected_raw, external_aad, payload) {
                Ok(tbs) => tbs,
                Err(_) => continue,
            };
            let is_short_circuit = short_circuit
                && decoded[index].protected.kid.as_deref() == Some(crate::iana::SHORT_CIRCUIT_KID);
            let result = if is_short_circuit {
                short_circuit_verify(self.crypto, &tbs, signature)
            } else {
                self.crypto.verify(alg, key, &tbs, signature)
            };
            if result.is_ok() {
                return Ok(SignVerified {
                    body_protected,
                    body_unprotected,
                    payload,
                    signatures: decoded,
                    verified_index: index,
                });
            }
        }
        Err(CoseError::without_offset(CoseErrorCode::SigVerify))
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::{RustCryptoProvider, SigningKey, VerificationKey};
    use ed25519_dalek::SigningKey as DalekSigningKey;
    use rand_core::OsRng;

    #[test]
    fn sign_round_trip_with_single_signer() {
        let provider = RustCryptoProvider;
        let signing = DalekSigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        let key = SigningKey::Ed25519(signing);

        let signers = [SignerRequest::new(crate::iana::alg::EDDSA, &key).with_kid(alloc::vec![9])];
        let builder = SignBuild::new(&provider);
        let message = builder.sign(&signers, &[], b"multi-signer payload").unwrap();

        let verifier = SignVerify::new(&provider, VerifyOptions::NONE);
        let verified = verifier
            .verify(&VerificationKey::Ed25519(verifying), &[], &message)
            .unwrap();
        assert_eq!(verified.payload, b"multi-signer payload");
        assert_eq!(verified.verified_index, 0);
    }

    #[test]
    fn sign_picks_out_the_matching_signer_among_several() {
        let provider = RustCryptoProvider;
        let signing_a = DalekSigningKey::generate(&mut OsRng);
        let signing_b = DalekSigningKey::generate(&mut OsRng);
        let verifying_b = signing_b.verifying_key();
        let key_a = SigningKey::Ed25519(signing_a);
        let key_b = SigningKey::Ed25519(signing_b);

        let signers = [
            SignerRequest::new(crate::iana::alg::EDDSA, &key_a).with_kid(alloc::vec![1]),
            SignerRequest::new(crate::iana::alg::EDDSA, &key_b).with_kid(alloc::vec![2]),
        ];
        let builder = SignBuild::new(&provider);
        let message = builder.sign(&signers, &[], b"payload").unwrap();

        let verifier = SignVerify::new(&provider, VerifyOptions::NONE);
        let verified = verifier
            .verify(&VerificationKey::Ed25519(verifying_b), &[], &message)
            .unwrap();
        assert_eq!(verified.verified_index, 1);
    }

    #[test]
    fn sign_rejects_zero_signers() {
        let provider = RustCryptoProvider;
        let builder = SignBuild::new(&provider);
        let signers: [SignerRequest<'_, RustCryptoProvider>; 0] = [];
        let err = builder.sign(&signers, &[], b"payload").unwrap_err();
        assert_eq!(err.code, CoseErrorCode::NoSigners);
    }
}
