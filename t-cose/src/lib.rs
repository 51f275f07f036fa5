//! # t-cose
//!
//! A COSE (RFC 9052) signing, MAC, and encryption layer built on [`qcbor`].
//!
//! This crate assembles and parses `COSE_Sign1`/`COSE_Sign`, `COSE_Mac0`/`COSE_Mac`,
//! and `COSE_Encrypt0`/`COSE_Encrypt` messages, constructing the byte-exact
//! `Sig_structure`/`MAC_structure`/`Enc_structure` that the cryptographic primitives
//! actually operate over. The primitives themselves are never implemented here: every
//! sign/verify/MAC/AEAD/key-wrap/KDF operation is consumed through
//! [`crypto::CryptoProvider`], a thin adapter trait. Enable the `rustcrypto` feature
//! for [`crypto_rustcrypto::RustCryptoProvider`], a concrete implementation covering a
//! practical algorithm subset.
//!
//! ## Feature flags
//!
//! - `std` *(default)*: implements `std::error::Error` for [`error::CoseError`].
//! - `rustcrypto`: a [`crypto::CryptoProvider`] backed by RustCrypto crates.
//!
//! Unlike `qcbor`, this crate is not allocation-free: header parameter maps and
//! assembled to-be-signed structures are naturally owned collections (`Vec`,
//! `String`), matching how the original t_cose reference implementation's internal
//! state is built even though its public API takes caller-supplied output buffers.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

extern crate alloc;

pub mod crypto;
#[cfg(feature = "rustcrypto")]
pub mod crypto_rustcrypto;
pub mod encrypt;
pub mod encrypt0;
pub mod error;
pub mod headers;
pub mod iana;
pub mod mac;
pub mod mac0;
pub mod options;
pub mod sign;
pub mod sign1;
mod short_circuit;
pub mod structures;

pub use crate::crypto::CryptoProvider;
pub use crate::error::{CoseError, CoseErrorCode};
pub use crate::headers::{ExtraParam, HeaderMap};
pub use crate::options::{SignOptions, VerifyOptions};

pub(crate) use crate::short_circuit::{short_circuit_sign, short_circuit_verify};

/// Header parameter labels every message type in this crate recognizes directly
/// (used as the `recognized` set for `crit` validation unless the caller supplies
/// their own via a future extension point).
pub(crate) const RECOGNIZED_HEADERS: [i64; 6] = [
    crate::iana::header::ALG,
    crate::iana::header::CRIT,
    crate::iana::header::CONTENT_TYPE,
    crate::iana::header::KID,
    crate::iana::header::IV,
    crate::iana::header::PARTIAL_IV,
];
