//! A [`CryptoProvider`] backed by RustCrypto crates: SHA-256/384/512 hashing,
//! HMAC-256, Ed25519 sign/verify, AES-128/256-GCM AEAD, and HKDF-SHA256.
//!
//! ECDSA (P-256), RSA-PSS, and AES-KW are declared on [`CryptoProvider`] but not
//! implemented here — see `DESIGN.md` for why this subset was chosen.

use alloc::vec::Vec;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey as Ed25519SigningKey, Verifier, VerifyingKey as Ed25519VerifyingKey};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::crypto::CryptoProvider;
use crate::error::{CoseError, CoseErrorCode};
use crate::iana::hash_alg;

type HmacSha256 = Hmac<Sha256>;

/// A signing key handle recognized by [`RustCryptoProvider`].
pub enum SigningKey {
    /// An Ed25519 signing key.
    Ed25519(Ed25519SigningKey),
}

/// A verification key handle recognized by [`RustCryptoProvider`].
pub enum VerificationKey {
    /// An Ed25519 verifying key.
    Ed25519(Ed25519VerifyingKey),
}

/// A symmetric key handle: raw key bytes used for HMAC, AES-GCM, or HKDF input
/// keying material, interpreted according to the algorithm ID each call supplies.
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    /// Wrap raw key bytes as a symmetric key handle.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Incremental hash state for [`RustCryptoProvider`].
pub enum HashState {
    /// SHA-256.
    Sha256(Sha256),
    /// SHA-384.
    Sha384(Sha384),
    /// SHA-512.
    Sha512(Sha512),
}

/// Incremental HMAC state for [`RustCryptoProvider`]. Only HMAC-SHA-256 is bundled.
pub struct HmacState(HmacSha256);

/// A [`CryptoProvider`] implementation using RustCrypto crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    type SigningKey = SigningKey;
    type VerificationKey = VerificationKey;
    type SymmetricKey = SymmetricKey;
    type HashState = HashState;
    type HmacState = HmacState;

    fn hash_begin(&self, alg: i64) -> Result<Self::HashState, CoseError> {
        match alg {
            hash_alg::SHA_256 => Ok(HashState::Sha256(Sha256::new())),
            hash_alg::SHA_384 => Ok(HashState::Sha384(Sha384::new())),
            hash_alg::SHA_512 => Ok(HashState::Sha512(Sha512::new())),
            _ => Err(CoseError::without_offset(CoseErrorCode::UnsupportedHash)),
        }
    }

    fn hash_update(&self, state: &mut Self::HashState, data: &[u8]) -> Result<(), CoseError> {
        match state {
            HashState::Sha256(h) => Digest::update(h, data),
            HashState::Sha384(h) => Digest::update(h, data),
            HashState::Sha512(h) => Digest::update(h, data),
        }
        Ok(())
    }

    fn hash_finish(&self, state: Self::HashState) -> Result<Vec<u8>, CoseError> {
        Ok(match state {
            HashState::Sha256(h) => h.finalize().to_vec(),
            HashState::Sha384(h) => h.finalize().to_vec(),
            HashState::Sha512(h) => h.finalize().to_vec(),
        })
    }

    fn sign(
        &self,
        alg: i64,
        key: &Self::SigningKey,
        to_be_signed: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        match (alg, key) {
            (crate::iana::alg::EDDSA, SigningKey::Ed25519(k)) => {
                Ok(k.sign(to_be_signed).to_bytes().to_vec())
            }
            _ => Err(CoseError::without_offset(CoseErrorCode::UnsupportedSigningAlg)),
        }
    }

    fn verify(
        &self,
        alg: i64,
        key: &Self::VerificationKey,
        to_be_signed: &[u8],
        signature: &[u8],
    ) -> Result<(), CoseError> {
        match (alg, key) {
            (crate::iana::alg::EDDSA, VerificationKey::Ed25519(k)) => {
                let sig_bytes: [u8; 64] = signature
                    .try_into()
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::SigVerify))?;
                let sig = Signature::from_bytes(&sig_bytes);
                k.verify(to_be_signed, &sig)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::SigVerify))
            }
            _ => Err(CoseError::without_offset(CoseErrorCode::UnsupportedSigningAlg)),
        }
    }

    fn hmac_begin(&self, alg: i64, key: &Self::SymmetricKey) -> Result<Self::HmacState, CoseError> {
        if alg != crate::iana::alg::HMAC_256_256 {
            return Err(CoseError::without_offset(CoseErrorCode::UnsupportedHmacAlg));
        }
        let mac = HmacSha256::new_from_slice(&key.0)
            .map_err(|_| CoseError::without_offset(CoseErrorCode::HmacGeneralFail))?;
        Ok(HmacState(mac))
    }

    fn hmac_update(&self, state: &mut Self::HmacState, data: &[u8]) -> Result<(), CoseError> {
        state.0.update(data);
        Ok(())
    }

    fn hmac_finish(&self, state: Self::HmacState) -> Result<Vec<u8>, CoseError> {
        Ok(state.0.finalize().into_bytes().to_vec())
    }

    fn hmac_verify(
        &self,
        alg: i64,
        key: &Self::SymmetricKey,
        data: &[u8],
        tag: &[u8],
    ) -> Result<(), CoseError> {
        let mut state = self.hmac_begin(alg, key)?;
        self.hmac_update(&mut state, data)?;
        state
            .0
            .verify_slice(tag)
            .map_err(|_| CoseError::without_offset(CoseErrorCode::HmacVerify))
    }

    fn aead_encrypt(
        &self,
        alg: i64,
        key: &Self::SymmetricKey,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload { msg: plaintext, aad };
        match alg {
            crate::iana::alg::A128GCM => {
                let cipher = Aes128Gcm::new_from_slice(&key.0)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::UnsupportedKeyLength))?;
                cipher
                    .encrypt(nonce, payload)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::EncryptFail))
            }
            crate::iana::alg::A256GCM => {
                let cipher = Aes256Gcm::new_from_slice(&key.0)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::UnsupportedKeyLength))?;
                cipher
                    .encrypt(nonce, payload)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::EncryptFail))
            }
            _ => Err(CoseError::without_offset(CoseErrorCode::UnsupportedCipherAlg)),
        }
    }

    fn aead_decrypt(
        &self,
        alg: i64,
        key: &Self::SymmetricKey,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CoseError> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload { msg: ciphertext, aad };
        match alg {
            crate::iana::alg::A128GCM => {
                let cipher = Aes128Gcm::new_from_slice(&key.0)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::UnsupportedKeyLength))?;
                cipher
                    .decrypt(nonce, payload)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::DecryptFail))
            }
            crate::iana::alg::A256GCM => {
                let cipher = Aes256Gcm::new_from_slice(&key.0)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::UnsupportedKeyLength))?;
                cipher
                    .decrypt(nonce, payload)
                    .map_err(|_| CoseError::without_offset(CoseErrorCode::DecryptFail))
            }
            _ => Err(CoseError::without_offset(CoseErrorCode::UnsupportedCipherAlg)),
        }
    }

    fn kw_wrap(&self, _alg: i64, _key: &Self::SymmetricKey, _plaintext: &[u8]) -> Result<Vec<u8>, CoseError> {
        Err(CoseError::without_offset(CoseErrorCode::KwFailed))
    }

    fn kw_unwrap(&self, _alg: i64, _key: &Self::SymmetricKey, _wrapped: &[u8]) -> Result<Vec<u8>, CoseError> {
        Err(CoseError::without_offset(CoseErrorCode::KwFailed))
    }

    fn kdf(
        &self,
        alg: i64,
        salt: &[u8],
        info: &[u8],
        ikm: &[u8],
        out_len: usize,
    ) -> Result<Vec<u8>, CoseError> {
        if alg != crate::iana::alg::DIRECT_HKDF_SHA_256 {
            return Err(CoseError::without_offset(CoseErrorCode::HkdfFail));
        }
        let salt = if salt.is_empty() { None } else { Some(salt) };
        let hk = Hkdf::<Sha256>::new(salt, ikm);
        let mut okm = alloc::vec![0u8; out_len];
        hk.expand(info, &mut okm)
            .map_err(|_| CoseError::without_offset(CoseErrorCode::HkdfFail))?;
        Ok(okm)
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;

    #[test]
    fn hmac_256_round_trips() {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(alloc::vec![0x0bu8; 32]);
        let mut state = provider.hmac_begin(crate::iana::alg::HMAC_256_256, &key).unwrap();
        provider.hmac_update(&mut state, b"payload").unwrap();
        let tag = provider.hmac_finish(state).unwrap();
        assert_eq!(tag.len(), 32);
        provider
            .hmac_verify(crate::iana::alg::HMAC_256_256, &key, b"payload", &tag)
            .unwrap();
        assert!(provider
            .hmac_verify(crate::iana::alg::HMAC_256_256, &key, b"Payload", &tag)
            .is_err());
    }

    #[test]
    fn ed25519_sign_and_verify() {
        use ed25519_dalek::SigningKey as DalekSigningKey;
        use rand_core::OsRng;

        let provider = RustCryptoProvider;
        let signing = DalekSigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        let sig = provider
            .sign(crate::iana::alg::EDDSA, &SigningKey::Ed25519(signing), b"hello")
            .unwrap();
        provider
            .verify(crate::iana::alg::EDDSA, &VerificationKey::Ed25519(verifying), b"hello", &sig)
            .unwrap();
    }
}
