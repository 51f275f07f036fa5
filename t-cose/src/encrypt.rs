//! `COSE_Encrypt`: a CBOR array `[protected, unprotected, ciphertext, recipients]`,
//! encrypting a payload under a content-encryption key shared (directly or
//! key-wrapped) with multiple recipients (RFC 9052 §5.1).
//!
//! `COSE_recipient` entries have the identical wire shape whether they hang off a
//! `COSE_Mac` or a `COSE_Encrypt` message, so this module reuses
//! [`crate::mac::RecipientRequest`]/[`crate::mac::RecipientInfo`] rather than
//! redeclaring them.

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::headers::HeaderMap;
use crate::iana::tag;
use crate::mac::{RecipientInfo, RecipientRequest};
use crate::options::{SignOptions, VerifyOptions};
use crate::structures::enc_structure;
use crate::{CryptoProvider, RECOGNIZED_HEADERS};

const MESSAGE_BUF_CAP: usize = 65536;

/// Builds a `COSE_Encrypt` message for one or more recipients.
pub struct EncryptBuild<'a, C: CryptoProvider> {
    crypto: &'a C,
    alg: i64,
    protected: HeaderMap,
    unprotected: HeaderMap,
    options: SignOptions,
}

impl<'a, C: CryptoProvider> EncryptBuild<'a, C> {
    /// Start building a message encrypted under `alg` (a content-encryption
    /// algorithm ID).
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

    /// Encrypt `plaintext` under `content_key`/`nonce`, appending one
    /// `COSE_recipient` per entry in `recipients`. `nonce` is carried as the
    /// unprotected `IV` header parameter.
    pub fn encrypt(
        &self,
        content_key: &C::SymmetricKey,
        nonce: &[u8],
        recipients: &[RecipientRequest],
        external_aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        if recipients.is_empty() {
            return Err(CoseError::without_offset(CoseErrorCode::NoSigners));
        }

        let mut protected = self.protected.clone();
        protected.alg = Some(self.alg);
        if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }
        let mut unprotected = self.unprotected.clone();
        unprotected.iv = Some(Vec::from(nonce));

        let protected_bytes = protected.encode_protected()?;
        let aad = enc_structure("Encrypt", &protected_bytes, external_aad)?;
        let ciphertext = self.crypto.aead_encrypt(self.alg, content_key, nonce, &aad, plaintext)?;
        let unprotected_bytes = unprotected.encode_map()?;

        let mut buf = alloc::vec![0u8; MESSAGE_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        if !self.options.contains(SignOptions::OMIT_CBOR_TAG) {
            enc.add_tag_number(tag::COSE_ENCRYPT);
        }
        enc.open_array();
        enc.add_encoded(&protected_bytes);
        enc.add_encoded(&unprotected_bytes);
        enc.add_bytes(&ciphertext);
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

/// The result of decrypting a `COSE_Encrypt` message.
pub struct EncryptDecrypted {
    /// The decoded protected header bucket.
    pub protected: HeaderMap,
    /// The decoded unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The recovered plaintext.
    pub plaintext: Vec<u8>,
    /// Every recipient entry, in message order.
    pub recipients: Vec<RecipientInfo>,
}

/// Decrypts a `COSE_Encrypt` message against an already-recovered content-encryption
/// key. Recovering that key from one of [`EncryptDecrypted::recipients`] is the
/// caller's responsibility, same as [`crate::mac::MacValidate`].
pub struct EncryptDecrypt<'a, C: CryptoProvider> {
    crypto: &'a C,
    options: VerifyOptions,
}

impl<'a, C: CryptoProvider> EncryptDecrypt<'a, C> {
    /// Start a decryptor with the given options.
    #[must_use]
    pub fn new(crypto: &'a C, options: VerifyOptions) -> Self {
        Self { crypto, options }
    }

    /// Decrypt `message` with `content_key`, recovering the nonce from its
    /// unprotected `IV` header parameter.
    pub fn decrypt(
        &self,
        content_key: &C::SymmetricKey,
        external_aad: &[u8],
        message: &[u8],
    ) -> Result<EncryptDecrypted, CoseError> {
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
            if t != tag::COSE_ENCRYPT {
                return Err(CoseError::without_offset(CoseErrorCode::WrongCoseMessageType));
            }
        }
        if !matches!(outer.item, Item::ArrayStart(4)) {
            return Err(CoseError::without_offset(CoseErrorCode::CborDecode));
        }
        dec.enter_array(&outer.item)?;

        let protected_item = dec.get_next()?;
        let protected_content = match protected_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::CborDecode)),
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
        let nonce = unprotected
            .iv
            .clone()
            .or_else(|| protected.iv.clone())
            .ok_or_else(|| CoseError::without_offset(CoseErrorCode::CborMandatoryFieldMissing))?;

        let ciphertext_item = dec.get_next()?;
        let ciphertext = match ciphertext_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::CborDecode)),
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

        let aad = enc_structure("Encrypt", protected_raw, external_aad)?;
        let plaintext = self.crypto.aead_decrypt(alg, content_key, &nonce, &aad, ciphertext)?;
        Ok(EncryptDecrypted { protected, unprotected, plaintext, recipients })
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::{RustCryptoProvider, SymmetricKey};

    #[test]
    fn encrypt_round_trip_with_direct_recipient() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x11u8; 16]);
        let nonce = alloc::vec![0x22u8; 12];

        let recipients = [RecipientRequest::new(crate::iana::alg::DIRECT, Vec::new())];
        let builder = EncryptBuild::new(&provider, crate::iana::alg::A128GCM);
        let message = builder
            .encrypt(&key, &nonce, &recipients, &[], b"multi-recipient secret")
            .unwrap();

        let decryptor = EncryptDecrypt::new(&provider, VerifyOptions::NONE);
        let decrypted = decryptor.decrypt(&key, &[], &message).unwrap();
        assert_eq!(decrypted.plaintext, b"multi-recipient secret");
        assert_eq!(decrypted.recipients.len(), 1);
    }

    #[test]
    fn encrypt_rejects_zero_recipients() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x11u8; 16]);
        let nonce = alloc::vec![0x22u8; 12];
        let builder = EncryptBuild::new(&provider, crate::iana::alg::A128GCM);
        let err = builder.encrypt(&key, &nonce, &[], &[], b"secret").unwrap_err();
        assert_eq!(err.code, CoseErrorCode::NoSigners);
    }
}
