//! Fixed end-to-end vectors: one scenario per bundled message type, checking both
//! the wire shape (tag numbers, array framing) and the round trip through the
//! bundled [`RustCryptoProvider`].

#![cfg(feature = "rustcrypto")]

use t_cose::crypto_rustcrypto::{RustCryptoProvider, SigningKey, SymmetricKey, VerificationKey};
use t_cose::encrypt0::{Encrypt0Build, Encrypt0Decrypt};
use t_cose::error::CoseErrorCode;
use t_cose::iana::alg;
use t_cose::mac0::{Mac0Build, Mac0Validate};
use t_cose::options::VerifyOptions;
use t_cose::sign1::{Sign1Sign, Sign1Verify};

/// 32-byte HMAC-256 key opening and closing on the bytes named in the fixture
/// (`0b2d ... 8939`); the bytes in between are filler, since only the endpoints are
/// pinned in the fixture description.
fn mac0_fixture_key() -> Vec<u8> {
    let mut key = vec![0u8; 32];
    key[0] = 0x0b;
    key[1] = 0x2d;
    key[30] = 0x89;
    key[31] = 0x39;
    key
}

#[test]
fn mac0_hmac256_tagged_message_has_the_expected_wire_shape() {
    let provider = RustCryptoProvider;
    let key_bytes = mac0_fixture_key();
    let key = SymmetricKey::new(key_bytes.clone());

    let builder = Mac0Build::new(&provider, alg::HMAC_256_256);
    let message = builder.compute(&key, &[], b"payload").unwrap();

    // tag 17, 4-element array.
    assert_eq!(message[0], 0xd1);
    assert_eq!(message[1], 0x84);
    // protected = bstr{1: 5}.
    assert_eq!(&message[2..6], [0x43, 0xa1, 0x01, 0x05]);
    // unprotected = empty map.
    assert_eq!(message[6], 0xa0);
    // payload = bstr "payload".
    assert_eq!(message[7], 0x47);
    assert_eq!(&message[8..15], b"payload");
    // tag = 32-byte HMAC, major type 2 with a one-byte length prefix (0x58 0x20).
    assert_eq!(&message[15..17], [0x58, 0x20]);
    assert_eq!(message.len(), 17 + 32);

    let validator = Mac0Validate::new(&provider, VerifyOptions::NONE);
    let validated = validator.validate(&key, &[], &message).unwrap();
    assert_eq!(validated.payload, b"payload");
}

#[test]
fn mac0_tampered_payload_byte_fails_hmac_verify() {
    let provider = RustCryptoProvider;
    let key = SymmetricKey::new(mac0_fixture_key());

    let builder = Mac0Build::new(&provider, alg::HMAC_256_256);
    let mut message = builder.compute(&key, &[], b"payload").unwrap();

    // Flip the payload's first byte 'p' (0x70) to 'h' (0x68), as the fixture
    // describes, leaving the rest of the message untouched.
    let payload_start = message.len() - 32 - 2 - 7;
    assert_eq!(message[payload_start], b'p');
    message[payload_start] = b'h';

    let validator = Mac0Validate::new(&provider, VerifyOptions::NONE);
    let err = validator.validate(&key, &[], &message).unwrap_err();
    assert_eq!(err.code, CoseErrorCode::HmacVerify);
}

#[test]
fn sign1_round_trip_with_eddsa() {
    use ed25519_dalek::SigningKey as DalekSigningKey;
    use rand_core::OsRng;

    let provider = RustCryptoProvider;
    let signing = DalekSigningKey::generate(&mut OsRng);
    let verifying = signing.verifying_key();

    let signer = Sign1Sign::new(&provider, alg::EDDSA);
    let message = signer
        .sign(&SigningKey::Ed25519(signing), &[], b"hello, cose")
        .unwrap();
    assert_eq!(message[0], 0xd2); // tag 18

    let verifier = Sign1Verify::new(&provider, VerifyOptions::NONE);
    let verified = verifier
        .verify(&VerificationKey::Ed25519(verifying), &[], &message)
        .unwrap();
    assert_eq!(verified.payload, b"hello, cose");
}

#[test]
fn sign1_tampered_signature_byte_never_verifies() {
    use ed25519_dalek::SigningKey as DalekSigningKey;
    use rand_core::OsRng;

    let provider = RustCryptoProvider;
    let signing = DalekSigningKey::generate(&mut OsRng);
    let verifying = signing.verifying_key();

    let signer = Sign1Sign::new(&provider, alg::EDDSA);
    let mut message = signer
        .sign(&SigningKey::Ed25519(signing), &[], b"hello, cose")
        .unwrap();
    let last = message.len() - 1;
    message[last] ^= 0xff;

    let verifier = Sign1Verify::new(&provider, VerifyOptions::NONE);
    assert!(verifier
        .verify(&VerificationKey::Ed25519(verifying), &[], &message)
        .is_err());
}

#[test]
fn encrypt0_round_trip_with_a128gcm() {
    let provider = RustCryptoProvider;
    let key = SymmetricKey::new(vec![0x5a; 16]);
    let nonce = vec![0x5b; 12];

    let builder = Encrypt0Build::new(&provider, alg::A128GCM);
    let message = builder.encrypt(&key, &nonce, &[], b"top secret").unwrap();
    assert_eq!(message[0], 0xd0); // tag 16

    let decryptor = Encrypt0Decrypt::new(&provider, VerifyOptions::NONE);
    let decrypted = decryptor.decrypt(&key, &[], &message).unwrap();
    assert_eq!(decrypted.plaintext, b"top secret");
}
