//! `COSE_Mac`: a CBOR array `[protected, unprotected, payload, tag, recipients]`,
//! authenticating a payload with one MAC key shared (directly or key-wrapped) with
//! multiple recipients (RFC 9052 §6.1).
//!
//! Recipient key management (wrapping/unwrapping the MAC key for each
//! `COSE_recipient`) is left to the caller: this module builds and parses the
//! `COSE_recipient` structures and the shared `MAC_structure`/tag, but the actual
//! per-recipient key-encryption step goes through [`crate::crypto::CryptoProvider`]
//! directly at the call site, since turning unwrapped bytes back into an opaque
//! [`CryptoProvider::SymmetricKey`] is inherently provider-specific.

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::headers::HeaderMap;
use crate::iana::tag;
use crate::options::{SignOptions, VerifyOptions};
use crate::structures::mac_structure;
use crate::{CryptoProvider, RECOGNIZED_HEADERS};

const MESSAGE_BUF_CAP: usize = 65536;

/// One `COSE_recipient` entry: a recipient's own header buckets plus the MAC key,
/// already wrapped for that recipient (or empty, for the `direct` algorithm).
#[derive(Debug, Clone)]
pub struct RecipientRequest {
    /// This recipient's protected header bucket (`alg` is set automatically).
    pub protected: HeaderMap,
    /// This recipient's unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The MAC key, wrapped for this recipient under `protected.alg`; empty for
    /// [`crate::iana::alg::DIRECT`].
    pub encrypted_key: Vec<u8>,
}

impl RecipientRequest {
    /// A recipient using key-management algorithm `alg`, with the given
    /// already-wrapped key bytes (empty for `direct`).
    #[must_use]
    pub fn new(alg: i64, encrypted_key: Vec<u8>) -> Self {
        Self {
            protected: HeaderMap::new().with_alg(alg),
            unprotected: HeaderMap::new(),
            encrypted_key,
        }
    }

    /// Set this recipient's `kid` (placed in its protected bucket).
    #[must_use]
    pub fn with_kid(mut self, kid: Vec<u8>) -> Self {
        self.protected.kid = Some(kid);
        self
    }
}

/// Builds a `COSE_Mac` message for one or more recipients.
pub struct MacBuild<'a, C: CryptoProvider> {
    crypto: &'a C,
    alg: i64,
    protected: HeaderMap,
    unprotected: HeaderMap,
    options: SignOptions,
}

impl<'a, C: CryptoProvider> MacBuild<'a, C> {
    /// Start building a message MAC'd under `alg` (an HMAC algorithm ID).
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

    /// Replace the body-level protected header bucket.
    #[must_use]
    pub fn with_protected(mut self, protected: HeaderMap) -> Self {
        self.protected = protected;
        self
    }

    /// Replace the body-level unprotected header bucket.
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

    /// MAC `payload` under `mac_key`, appending one `COSE_recipient` per entry in
    /// `recipients`.
    pub fn compute(
        &self,
        mac_key: &C::SymmetricKey,
        recipients: &[RecipientRequest],
        external_aad: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        if recipients.is_empty() {
            return Err(CoseError::without_offset(CoseErrorCode::NoSigners));
        }

        let mut protected = self.protected.clone();
        protected.alg = Some(self.alg);
        if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }

        let protected_bytes = protected.encode_protected()?;
        let to_be_maced = mac_structure("MAC", &protected_bytes, external_aad, payload)?;
        let mut state = self.crypto.hmac_begin(self.alg, mac_key)?;
        self.crypto.hmac_update(&mut state, &to_be_maced)?;
        let tag_bytes = self.crypto.hmac_finish(state)?;
        let unprotected_bytes = self.unprotected.encode_map()?;

        let mut buf = alloc::vec![0u8; MESSAGE_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        if !self.options.contains(SignOptions::OMIT_CBOR_TAG) {
            enc.add_tag_number(tag::COSE_MAC);
        }
        enc.open_array();
        enc.add_encoded(&protected_bytes);
        enc.add_encoded(&unprotected_bytes);
        enc.add_bytes(payload);
        enc.add_bytes(&tag_bytes);
        enc.open_array();
        for recipient in recipients {
            let recipient_protected_bytes = recipient.protected.encode_protected()?;
            let recipient_unprotected_bytes = recipient.unprotected.encode_map()?;
            enc.open_array();
            enc.add_encoded(&recipient_protected_bytes);
            enc.add_encoded(&recipient_unprotected_bytes);
            enc.add_bytes(&recipient.encrypted_key);
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

/// A decoded `COSE_recipient` entry.
pub struct RecipientInfo {
    /// This recipient's protected header bucket.
    pub protected: HeaderMap,
    /// This recipient's unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The MAC key, wrapped for this recipient (or empty, for `direct`).
    pub encrypted_key: Vec<u8>,
}

/// The result of decoding (but not yet validating) a `COSE_Mac` message: the tag is
/// already checked against `mac_key` by the time this is returned by
/// [`MacValidate::validate`]; [`Self::recipients`] is exposed so callers can confirm
/// which recipient's wrapped key they used.
pub struct MacValidated<'m> {
    /// The decoded protected header bucket.
    pub protected: HeaderMap,
    /// The decoded unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The payload.
    pub payload: &'m [u8],
    /// Every recipient entry, in message order.
    pub recipients: Vec<RecipientInfo>,
}

/// Validates a `COSE_Mac` message against an already-recovered MAC key. Recovering
/// that key from one of [`MacValidated::recipients`] (unwrapping or taking the
/// `direct` shared secret) is the caller's responsibility.
pub struct MacValidate<'a, C: CryptoProvider> {
    crypto: &'a C,
    options: VerifyOptions,
}

impl<'a, C: CryptoProvider> MacValidate<'a, C> {
    /// Start a validator with the given options.
    #[must_use]
    pub fn new(crypto: &'a C, options: VerifyOptions) -> Self {
        Self { crypto, options }
    }

    /// Validate `message`'s tag against `mac_key`, returning the decoded headers,
    /// payload, and recipient list.
    pub fn validate<'m>(
        &self,
        mac_key: &C::SymmetricKey,
        external_aad: &[u8],
        message: &'m [u8],
    ) -> Result<MacValidated<'m>, CoseError> {
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
            if t != tag::COSE_MAC {
                return Err(CoseError::without_offset(CoseErrorCode::WrongCoseMessageType));
            }
        }
        if !matches!(outer.item, Item::ArrayStart(5)) {
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
        if !self.options.contains(VerifyOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }
        if self.options.contains(VerifyOptions::REQUIRE_KID) && protected.kid.is_none() {
            return Err(CoseError::without_offset(CoseErrorCode::NoKid));
        }
        let alg = protected
            .alg
            .ok_or_else(|| CoseError::without_offset(CoseErrorCode::NoAlgId))?;

        let unprotected_item = dec.get_next()?;
        let unprotected = HeaderMap::decode_from_map_item(&mut dec, message, &unprotected_item.item)?;

        let payload_item = dec.get_next()?;
        let payload = match payload_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::Mac0Format)),
        };

        let tag_item = dec.get_next()?;
        let tag_bytes = match tag_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::Mac0Format)),
        };

        let recipients_item = dec.get_next()?;
        let recipient_count = match recipients_item.item {
            Item::ArrayStart(n) => usize::try_from(n)
                .map_err(|_| CoseError::without_offset(CoseErrorCode::RecipientFormat))?,
            _ => return Err(CoseError::without_offset(CoseErrorCode::RecipientFormat)),
        };
        dec.enter_array(&recipients_item.item)?;
        let mut recipients = Vec::with_capacity(recipient_count);
        for _ in 0..recipient_count {
            let entry = dec.get_next()?;
            if !matches!(entry.item, Item::ArrayStart(3)) {
                return Err(CoseError::without_offset(CoseErrorCode::RecipientFormat));
            }
            dec.enter_array(&entry.item)?;

            let r_protected_item = dec.get_next()?;
            let r_protected_content = match r_protected_item.item {
                Item::Bytes(b, _) => b,
                _ => return Err(CoseError::without_offset(CoseErrorCode::RecipientFormat)),
            };
            let r_protected = if r_protected_content.is_empty() {
                HeaderMap::new()
            } else {
                HeaderMap::decode_map(r_protected_content)?
            };

            let r_unprotected_item = dec.get_next()?;
            let r_unprotected = HeaderMap::decode_from_map_item(&mut dec, message, &r_unprotected_item.item)?;

            let key_item = dec.get_next()?;
            let encrypted_key = match key_item.item {
                Item::Bytes(b, _) => Vec::from(b),
                _ => return Err(CoseError::without_offset(CoseErrorCode::RecipientFormat)),
            };
            dec.exit_array()?;

            recipients.push(RecipientInfo {
                protected: r_protected,
                unprotected: r_unprotected,
                encrypted_key,
            });
        }
        dec.exit_array()?;
        dec.exit_array()?;
        dec.finish()?;

        if self.options.contains(VerifyOptions::DECODE_ONLY) {
            return Ok(MacValidated { protected, unprotected, payload, recipients });
        }

        let to_be_maced = mac_structure("MAC", protected_raw, external_aad, payload)?;
        self.crypto.hmac_verify(alg, mac_key, &to_be_maced, tag_bytes)?;
        Ok(MacValidated { protected, unprotected, payload, recipients })
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::{RustCryptoProvider, SymmetricKey};

    #[test]
    fn mac_round_trip_with_direct_recipient() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x07u8; 32]);

        let recipients = [RecipientRequest::new(crate::iana::alg::DIRECT, Vec::new())];
        let builder = MacBuild::new(&provider, crate::iana::alg::HMAC_256_256);
        let message = builder.compute(&key, &recipients, &[], b"payload").unwrap();

        let validator = MacValidate::new(&provider, VerifyOptions::NONE);
        let validated = validator.validate(&key, &[], &message).unwrap();
        assert_eq!(validated.payload, b"payload");
        assert_eq!(validated.recipients.len(), 1);
        assert!(validated.recipients[0].encrypted_key.is_empty());
    }

    #[test]
    fn mac_rejects_zero_recipients() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x07u8; 32]);
        let builder = MacBuild::new(&provider, crate::iana::alg::HMAC_256_256);
        let err = builder.compute(&key, &[], &[], b"payload").unwrap_err();
        assert_eq!(err.code, CoseErrorCode::NoSigners);
    }

    #[test]
    fn mac_wrong_key_fails_hmac_verify() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x07u8; 32]);
        let wrong_key = SymmetricKey::new(alloc::vec![0x08u8; 32]);

        let recipients = [RecipientRequest::new(crate::iana::alg::DIRECT, Vec::new())];
        let builder = MacBuild::new(&provider, crate::iana::alg::HMAC_256_256);
        let message = builder.compute(&key, &recipients, &[], b"payload").unwrap();

        let validator = MacValidate::new(&provider, VerifyOptions::NONE);
        let err = validator.validate(&wrong_key, &[], &message).unwrap_err();
        assert_eq!(err.code, CoseErrorCode::HmacVerify);
    }
}
