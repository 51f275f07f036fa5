//! Named constants for IANA-registered COSE tag numbers and header parameter
//! labels, so call sites read `header::ALG` rather than a bare `1`.

/// COSE message CBOR tag numbers (RFC 9052 §2).
pub mod tag {
    /// `COSE_Sign`.
    pub const COSE_SIGN: u64 = 98;
    /// `COSE_Sign1`.
    pub const COSE_SIGN1: u64 = 18;
    /// `COSE_Encrypt`.
    pub const COSE_ENCRYPT: u64 = 96;
    /// `COSE_Encrypt0`.
    pub const COSE_ENCRYPT0: u64 = 16;
    /// `COSE_Mac`.
    pub const COSE_MAC: u64 = 97;
    /// `COSE_Mac0`.
    pub const COSE_MAC0: u64 = 17;
    /// CBOR Web Token (RFC 8392), often wrapping a COSE message as its payload.
    pub const CWT: u64 = 61;
    /// Self-described CBOR (RFC 8949 §3.4.6).
    pub const SELF_DESCRIBED_CBOR: u64 = 55799;
}

/// Common header parameter labels (RFC 9052 §3.1).
pub mod header {
    /// Cryptographic algorithm to use.
    pub const ALG: i64 = 1;
    /// Critical headers to be understood.
    pub const CRIT: i64 = 2;
    /// Content type of the payload.
    pub const CONTENT_TYPE: i64 = 3;
    /// Key identifier.
    pub const KID: i64 = 4;
    /// Full initialization vector.
    pub const IV: i64 = 5;
    /// Partial initialization vector.
    pub const PARTIAL_IV: i64 = 6;
    /// Counter signature.
    pub const COUNTER_SIGNATURE: i64 = 7;
}

/// COSE algorithm identifiers relevant to the bundled `rustcrypto` provider (IANA
/// "COSE Algorithms" registry).
pub mod alg {
    /// ECDSA using P-256 and SHA-256.
    pub const ES256: i64 = -7;
    /// EdDSA.
    pub const EDDSA: i64 = -8;
    /// HMAC using SHA-256, truncated to 256 bits.
    pub const HMAC_256_256: i64 = 5;
    /// AES-GCM with a 128-bit key.
    pub const A128GCM: i64 = 1;
    /// AES-GCM with a 256-bit key.
    pub const A256GCM: i64 = 3;
    /// Direct key agreement with HKDF-SHA-256.
    pub const DIRECT_HKDF_SHA_256: i64 = -10;
    /// Direct use of a shared secret as the content/MAC key, with no key-wrapping
    /// step: a `COSE_recipient`'s encrypted-key field is empty.
    pub const DIRECT: i64 = -6;
}

/// COSE hash algorithm identifiers (IANA "COSE Algorithms" registry).
pub mod hash_alg {
    /// SHA-2 256-bit hash.
    pub const SHA_256: i64 = -16;
    /// SHA-2 384-bit hash.
    pub const SHA_384: i64 = -43;
    /// SHA-2 512-bit hash.
    pub const SHA_512: i64 = -44;
}

/// The well-known key ID t_cose's reference implementation uses to mark a
/// short-circuit (test-only, non-secret) signature.
pub const SHORT_CIRCUIT_KID: &[u8] = b"short-circuit";
