//! The crypto adapter interface: `t-cose` never implements a cryptographic
//! primitive itself, only consumes one through this trait.
//!
//! Keys are opaque handles — the adapter's associated types — and this crate never
//! interprets their bytes. Enable the `rustcrypto` feature for a concrete
//! implementation ([`crate::crypto_rustcrypto::RustCryptoProvider`]) covering the
//! algorithm subset listed there; callers needing RSA-PSS, ECDSA, AES-KW, or HPKE
//! implement this trait against whatever crate they prefer.

use alloc::vec::Vec;

use crate::error::CoseError;

/// A cryptographic service provider for COSE signing, MAC, and AEAD operations.
///
/// Every method takes an algorithm ID exactly as it appears in the COSE `alg` header
/// parameter (a negative or small positive integer per the IANA COSE Algorithms
/// registry), so a single provider can recognize and reject algorithms it does not
/// implement without `t-cose` needing to know the registry itself.
pub trait CryptoProvider {
    /// An opaque signing key handle (e.g. an Ed25519 or ECDSA private key).
    type SigningKey;
    /// An opaque signature-verification key handle (the public counterpart).
    type VerificationKey;
    /// An opaque symmetric key handle (HMAC, AEAD, or key-wrap key).
    type SymmetricKey;
    /// Incremental hash state, created by [`Self::hash_begin`].
    type HashState;
    /// Incremental HMAC state, created by [`Self::hmac_begin`].
    type HmacState;

    /// Begin an incremental hash of the algorithm named by `hash_alg` (a COSE/IANA
    /// hash algorithm identifier).
    fn hash_begin(&self, hash_alg: i64) -> Result<Self::HashState, CoseError>;
    /// Feed more bytes into an in-progress hash.
    fn hash_update(&self, state: &mut Self::HashState, data: &[u8]) -> Result<(), CoseError>;
    /// Finish a hash, returning the digest bytes.
    fn hash_finish(&self, state: Self::HashState) -> Result<Vec<u8>, CoseError>;

    /// Sign `to_be_signed` with `key` under `alg`, returning the signature bytes.
    fn sign(
        &self,
        alg: i64,
        key: &Self::SigningKey,
        to_be_signed: &[u8],
    ) -> Result<Vec<u8>, CoseError>;

    /// Verify `signature` over `to_be_signed` with `key` under `alg`.
    fn verify(
        &self,
        alg: i64,
        key: &Self::VerificationKey,
        to_be_signed: &[u8],
        signature: &[u8],
    ) -> Result<(), CoseError>;

    /// Begin an incremental HMAC of the algorithm named by `alg` under `key`.
    fn hmac_begin(&self, alg: i64, key: &Self::SymmetricKey) -> Result<Self::HmacState, CoseError>;
    /// Feed more bytes into an in-progress HMAC.
    fn hmac_update(&self, state: &mut Self::HmacState, data: &[u8]) -> Result<(), CoseError>;
    /// Finish an HMAC, returning the tag bytes.
    fn hmac_finish(&self, state: Self::HmacState) -> Result<Vec<u8>, CoseError>;
    /// Verify an HMAC tag over `data` with `key` under `alg`.
    fn hmac_verify(
        &self,
        alg: i64,
        key: &Self::SymmetricKey,
        data: &[u8],
        tag: &[u8],
    ) -> Result<(), CoseError>;

    /// AEAD-encrypt `plaintext` under `alg`/`key`/`nonce`/`aad`, returning ciphertext
    /// with the authentication tag appended.
    fn aead_encrypt(
        &self,
        alg: i64,
        key: &Self::SymmetricKey,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CoseError>;

    /// AEAD-decrypt `ciphertext` (tag appended) under `alg`/`key`/`nonce`/`aad`.
    fn aead_decrypt(
        &self,
        alg: i64,
        key: &Self::SymmetricKey,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CoseError>;

    /// Key-wrap `plaintext` (a content-encryption key) under `alg`/`key`.
    fn kw_wrap(&self, alg: i64, key: &Self::SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CoseError>;

    /// Key-unwrap `wrapped` under `alg`/`key`.
    fn kw_unwrap(&self, alg: i64, key: &Self::SymmetricKey, wrapped: &[u8]) -> Result<Vec<u8>, CoseError>;

    /// HKDF-derive `out_len` bytes under `alg`/`salt`/`info` from `ikm`.
    fn kdf(
        &self,
        alg: i64,
        salt: &[u8],
        info: &[u8],
        ikm: &[u8],
        out_len: usize,
    ) -> Result<Vec<u8>, CoseError>;
}
