//! # qcbor
//!
//! A streaming, allocation-free CBOR (RFC 8949) encoder and decoder that reads and
//! writes entirely through caller-supplied buffers.
//!
//! ## Design principles
//!
//! - **No allocator, ever.** [`Encoder`] writes into a `&mut [u8]` the caller owns;
//!   [`Decoder`] reads from a `&[u8]` the caller owns. The only scratch space this
//!   crate ever touches is an optional, fixed-size [`MemPool`](decode::MemPool) used
//!   to reassemble indefinite-length strings, and that pool is caller-supplied too.
//! - **Definite-length heads are back-patched, not pre-guessed.** Opening an array or
//!   map reserves no bytes; closing it splices the now-known head in at the
//!   container's start offset, so callers never pay for a worst-case length field.
//! - **Errors latch.** Every mutating call on [`Encoder`]/[`Decoder`] is infallible to
//!   invoke; the first error is recorded internally and surfaces once, at `finish`.
//! - **Preferred serialization, Core Deterministic Encoding, and dCBOR are opt-in
//!   encoder modes** ([`encode::EncodeFlags`]), not separate code paths.
//!
//! ## Feature flags
//!
//! - `std` *(default)*: implements `std::error::Error` for [`QcborError`].
//!
//! ## `no_std`
//!
//! This crate is `no_std` and allocator-free unconditionally — there is no `alloc`
//! feature to enable, because nothing in this crate ever allocates.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

mod buf;
mod decode;
mod encode;
mod error;
mod float;
mod head;
mod limits;
mod tags;

pub use crate::buf::{InBuf, OutBuf};
pub use crate::decode::{
    decode_number, skip_value, Decoder, Item, MemPool, NumberView, Source, TagList, TaggedItem,
};
pub use crate::encode::{EncodeFlags, Encoder};
pub use crate::error::{ErrorCode, QcborError};
pub use crate::float::{f32_to_half_exact, f64_to_f32_exact, half_to_f32, is_non_canonical_nan};
pub use crate::head::major;
pub use crate::limits::{DecodeLimits, DEFAULT_MAX_NESTING, DEFAULT_MAX_TAGS_PER_ITEM, MAX_ITEMS_PER_CONTAINER};
pub use crate::tags::{
    add_bignum_preferred, add_bignum_raw, add_date_string, add_epoch_days,
    add_epoch_seconds_float, add_epoch_seconds_int, add_exp_mantissa, bignum_source,
    decode_bignum, decode_epoch_seconds, decode_exp_mantissa, tag, BigNum, ExpMantissa,
};
