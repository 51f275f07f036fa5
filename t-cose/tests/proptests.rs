//! Property-based tamper-detection checks: flipping any single byte of a signed,
//! MACed, or encrypted message must never verify, whatever byte gets flipped.

#![cfg(feature = "rustcrypto")]

use proptest::prelude::*;

use t_cose::crypto_rustcrypto::{RustCryptoProvider, SymmetricKey};
use t_cose::encrypt0::{Encrypt0Build, Encrypt0Decrypt};
use t_cose::iana::alg;
use t_cose::mac0::{Mac0Build, Mac0Validate};
use t_cose::options::VerifyOptions;

fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..64)
}

proptest! {
    #[test]
    fn mac0_single_byte_flip_never_verifies(payload in arb_payload(), flip_index in 0usize..512, flip_mask in 1u8..=255) {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(vec![0x2bu8; 32]);

        let builder = Mac0Build::new(&provider, alg::HMAC_256_256);
        let message = builder.compute(&key, &[], &payload).unwrap();

        let index = flip_index % message.len();
        let mut tampered = message.clone();
        tampered[index] ^= flip_mask;

        let validator = Mac0Validate::new(&provider, VerifyOptions::NONE);
        let result = validator.validate(&key, &[], &tampered);
        // The untampered message must still verify, so a passing tampered result
        // would have to come from the flip itself being a no-op (impossible: xor
        // with a nonzero mask always changes the byte) or the decoder being too
        // permissive about malformed shapes.
        prop_assert!(result.is_err());
    }

    #[test]
    fn encrypt0_single_byte_flip_never_decrypts(plaintext in arb_payload(), flip_index in 0usize..512, flip_mask in 1u8..=255) {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(vec![0x4cu8; 16]);
        let nonce = vec![0x4du8; 12];

        let builder = Encrypt0Build::new(&provider, alg::A128GCM);
        let message = builder.encrypt(&key, &nonce, &[], &plaintext).unwrap();

        let index = flip_index % message.len();
        let mut tampered = message.clone();
        tampered[index] ^= flip_mask;

        let decryptor = Encrypt0Decrypt::new(&provider, VerifyOptions::NONE);
        prop_assert!(decryptor.decrypt(&key, &[], &tampered).is_err());
    }

    #[test]
    fn mac0_round_trips_for_arbitrary_payloads(payload in arb_payload()) {
        let provider = RustCryptoProvider;
        let key = SymmetricKey::new(vec![0x2bu8; 32]);

        let builder = Mac0Build::new(&provider, alg::HMAC_256_256);
        let message = builder.compute(&key, &[], &payload).unwrap();

        let validator = Mac0Validate::new(&provider, VerifyOptions::NONE);
        let validated = validator.validate(&key, &[], &message).unwrap();
        prop_assert_eq!(validated.payload, payload.as_slice());
    }
}
