//! The short-circuit (test-only) signature construction: a deterministic, non-secret
//! stand-in for a real signature, used to exercise COSE message plumbing without a
//! signing key. Gated on the signer side by `SignOptions::ALLOW_SHORT_CIRCUIT` (which
//! also marks the message with the well-known [`crate::iana::SHORT_CIRCUIT_KID`]) and
//! on the verifier side by `VerifyOptions::ALLOW_SHORT_CIRCUIT`.

use alloc::vec::Vec;

use crate::crypto::CryptoProvider;
use crate::error::{CoseError, CoseErrorCode};
use crate::iana::hash_alg;

/// Signature length the short-circuit construction produces, matching the common
/// ECDSA P-256/EdDSA signature size so it round-trips through the same fixed-size
/// buffers a real signature would.
const SHORT_CIRCUIT_SIG_LEN: usize = 64;

pub(crate) fn short_circuit_sign<C: CryptoProvider>(
    crypto: &C,
    to_be_signed: &[u8],
) -> Result<Vec<u8>, CoseError> {
    let mut state = crypto.hash_begin(hash_alg::SHA_256)?;
    crypto.hash_update(&mut state, to_be_signed)?;
    let digest = crypto.hash_finish(state)?;
    let mut sig = Vec::with_capacity(SHORT_CIRCUIT_SIG_LEN);
    while sig.len() < SHORT_CIRCUIT_SIG_LEN {
        sig.extend_from_slice(&digest);
    }
    sig.truncate(SHORT_CIRCUIT_SIG_LEN);
    Ok(sig)
}

pub(crate) fn short_circuit_verify<C: CryptoProvider>(
    crypto: &C,
    to_be_signed: &[u8],
    signature: &[u8],
) -> Result<(), CoseError> {
    let expected = short_circuit_sign(crypto, to_be_signed)?;
    if expected == signature {
        Ok(())
    } else {
        Err(CoseError::without_offset(CoseErrorCode::SigVerify))
    }
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto_rustcrypto::RustCryptoProvider;

    #[test]
    fn short_circuit_sign_is_deterministic_and_verifies() {
        let provider = RustCryptoProvider;
        let sig1 = short_circuit_sign(&provider, b"to-be-signed").unwrap();
        let sig2 = short_circuit_sign(&provider, b"to-be-signed").unwrap();
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), SHORT_CIRCUIT_SIG_LEN);
        short_circuit_verify(&provider, b"to-be-signed", &sig1).unwrap();
        assert!(short_circuit_verify(&provider, b"different", &sig1).is_err());
    }
}
