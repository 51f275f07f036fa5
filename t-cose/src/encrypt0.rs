//! `COSE_Encrypt0`: a CBOR array `[protected, unprotected, ciphertext]`, encrypting a
//! payload for a single recipient under a directly-shared symmetric key (RFC 9052
//! §5.2).

use alloc::vec::Vec;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

use crate::error::{CoseError, CoseErrorCode};
use crate::headers::HeaderMap;
use crate::iana::tag;
use crate::options::{SignOptions, VerifyOptions};
use crate::structures::enc_structure;
use crate::{CryptoProvider, RECOGNIZED_HEADERS};

const MESSAGE_BUF_CAP: usize = 65536;

/// Builds a `COSE_Encrypt0` message.
pub struct Encrypt0Build<'a, C: CryptoProvider> {
    crypto: &'a C,
    alg: i64,
    protected: HeaderMap,
    unprotected: HeaderMap,
    options: SignOptions,
}

impl<'a, C: CryptoProvider> Encrypt0Build<'a, C> {
    /// Start building a message encrypted under `alg`.
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

    /// Encrypt `plaintext` under `key`/`nonce`, carrying `nonce` as the unprotected
    /// `IV` header parameter so the decryptor can recover it.
    pub fn encrypt(
        &self,
        key: &C::SymmetricKey,
        nonce: &[u8],
        external_aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        let mut protected = self.protected.clone();
        protected.alg = Some(self.alg);
        if !self.options.contains(SignOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }
        let mut unprotected = self.unprotected.clone();
        unprotected.iv = Some(Vec::from(nonce));

        let protected_bytes = protected.encode_protected()?;
        let aad = enc_structure("Encrypt0", &protected_bytes, external_aad)?;
        let ciphertext = self.crypto.aead_encrypt(self.alg, key, nonce, &aad, plaintext)?;
        let unprotected_bytes = unprotected.encode_map()?;

        let mut buf = alloc::vec![0u8; MESSAGE_BUF_CAP];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        if !self.options.contains(SignOptions::OMIT_CBOR_TAG) {
            enc.add_tag_number(tag::COSE_ENCRYPT0);
        }
        enc.open_array();
        enc.add_encoded(&protected_bytes);
        enc.add_encoded(&unprotected_bytes);
        enc.add_bytes(&ciphertext);
        enc.close_array();
        let len = enc
            .finish()
            .map_err(|e| CoseError::new(CoseErrorCode::from_encode_error(e.code), e.offset))?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Decrypts a `COSE_Encrypt0` message.
pub struct Encrypt0Decrypt<'a, C: CryptoProvider> {
    crypto: &'a C,
    options: VerifyOptions,
}

/// The result of a successful `COSE_Encrypt0` decryption.
pub struct Encrypt0Decrypted {
    /// The decoded protected header bucket.
    pub protected: HeaderMap,
    /// The decoded unprotected header bucket.
    pub unprotected: HeaderMap,
    /// The recovered plaintext.
    pub plaintext: Vec<u8>,
}

impl<'a, C: CryptoProvider> Encrypt0Decrypt<'a, C> {
    /// Start a decryptor with the given options.
    #[must_use]
    pub fn new(crypto: &'a C, options: VerifyOptions) -> Self {
        Self { crypto, options }
    }

    /// Decrypt a message, recovering the nonce from its unprotected `IV` header
    /// parameter.
    pub fn decrypt(
        &self,
        key: &C::SymmetricKey,
        external_aad: &[u8],
        message: &[u8],
    ) -> Result<Encrypt0Decrypted, CoseError> {
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
            if t != tag::COSE_ENCRYPT0 {
                return Err(CoseError::without_offset(CoseErrorCode::WrongCoseMessageType));
            }
        }
        if !matches!(outer.item, Item::ArrayStart(3)) {
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

        let unprotected_item = dec.get_next()?;
        let unprotected = HeaderMap::decode_from_map_item(&mut dec, message, &unprotected_item.item)?;

        let ciphertext_item = dec.get_next()?;
        let ciphertext = match ciphertext_item.item {
            Item::Bytes(b, _) => b,
            _ => return Err(CoseError::without_offset(CoseErrorCode::CborDecode)),
        };
        dec.exit_array()?;
        dec.finish()?;

        if !self.options.contains(VerifyOptions::NO_CRIT_PARAM_CHECK) {
            protected.check_crit(&RECOGNIZED_HEADERS, false)?;
        }
        if self.options.contains(VerifyOptions::REQUIRE_KID) && protected.kid.is_none() {
            return Err(CoseError::without_offset(CoseErrorCode::NoKid));
        }
        let alg = protected
            .alg
            .ok_or_else(|| CoseError::without_offset(CoseErrorCode::NoAlgId))?;
        let nonce = unprotected
            .iv
            .as_deref()
            .or(protected.iv.as_deref())
            .ok_or_else(|| CoseError::without_offset(CoseErrorCode::CborMandatoryFieldMissing))?;

        let aad = enc_structure("Encrypt0", protected_raw, external_aad)?;
        let plaintext = self.crypto.aead_decrypt(alg, key, nonce, &aad, ciphertext)?;
        Ok(Encrypt0Decrypted { protected, unprotected, plaintext })
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::{RustCryptoProvider, SymmetricKey};

    #[test]
    fn encrypt0_round_trip_with_a128gcm() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x42u8; 16]);
        let nonce = alloc::vec![0x24u8; 12];

        let builder = Encrypt0Build::new(&provider, crate::iana::alg::A128GCM);
        let message = builder.encrypt(&key, &nonce, &[], b"secret payload").unwrap();

        let decryptor = Encrypt0Decrypt::new(&provider, VerifyOptions::NONE);
        let decrypted = decryptor.decrypt(&key, &[], &message).unwrap();
        assert_eq!(decrypted.plaintext, b"secret payload");
    }

    #[test]
    fn encrypt0_tampered_ciphertext_fails_to_decrypt() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x42u8; 16]);
        let nonce = alloc::vec![0x24u8; 12];

        let builder = Encrypt0Build::new(&provider, crate::iana::alg::A128GCM);
        let mut message = builder.encrypt(&key, &nonce, &[], b"secret payload").unwrap();
        let last = message.len() - 1;
        message[last] ^= 0xff;

        let decryptor = Encrypt0Decrypt::new(&provider, VerifyOptions::NONE);
        assert!(decryptor.decrypt(&key, &[], &message).is_err());
    }
}
