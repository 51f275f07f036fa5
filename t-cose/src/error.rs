//! The COSE error taxonomy, with CBOR-layer errors folded in by category.

use core::fmt;
use qcbor::ErrorCode as CborErrorCode;

/// A structured COSE error code.
///
/// CBOR-layer failures are folded in at construction time rather than kept as a
/// separate wrapped variant, so callers match on one flat enum regardless of which
/// layer detected the problem: [`CoseErrorCode::from_encode_error`] maps
/// `BufferTooSmall` to [`CoseErrorCode::TooSmall`] and anything else to
/// [`CoseErrorCode::CborFormatting`]; [`CoseErrorCode::from_decode_error`] maps every
/// CBOR decode failure to [`CoseErrorCode::CborNotWellFormed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoseErrorCode {
    /// The signing algorithm is not supported by the configured crypto provider.
    UnsupportedSigningAlg,
    /// Failed to construct the protected header bucket.
    MakingProtected,
    /// The hash algorithm is not supported.
    UnsupportedHash,
    /// A hash operation failed for an unspecified reason.
    HashGeneralFail,
    /// The caller-supplied hash output buffer was too small.
    HashBufferSize,
    /// The caller-supplied signature output buffer was too small.
    SigBufferSize,
    /// The `COSE_Sign1` structure is malformed.
    Sign1Format,
    /// Propagated CBOR decode failure: the input is not well-formed CBOR.
    CborNotWellFormed,
    /// A header parameter's CBOR encoding is malformed.
    ParameterCbor,
    /// No algorithm ID header parameter was present.
    NoAlgId,
    /// No key ID header parameter was present where one was required.
    NoKid,
    /// Signature verification failed (the signature does not match).
    SigVerify,
    /// An invalid argument was passed to an API call.
    InvalidArgument,
    /// A memory allocation or fixed-capacity buffer was exhausted.
    InsufficientMemory,
    /// A generic, otherwise-unclassified failure.
    Fail,
    /// Tampering was detected (MAC/AEAD tag mismatch).
    TamperingDetected,
    /// The supplied key is not recognized/usable.
    UnknownKey,
    /// The supplied key is not of the type the algorithm requires.
    WrongTypeOfKey,
    /// The `Sig_structure`/`Sig_structure1` to-be-signed bytes could not be built.
    SigStruct,
    /// Short-circuit (test-only) signature verification was attempted without
    /// [`crate::options::VerifyOptions::ALLOW_SHORT_CIRCUIT`] set.
    ShortCircuitSig,
    /// A signing operation failed for an unspecified reason.
    SigFail,
    /// A CBOR encode operation failed for a reason other than buffer size.
    CborFormatting,
    /// A caller-supplied output buffer was too small.
    TooSmall,
    /// More header parameters were present than this implementation supports.
    TooManyParameters,
    /// A label listed in `crit` was not recognized by this implementation.
    UnknownCriticalParameter,
    /// The key is recognized but not usable with this library's configuration.
    IncorrectKeyForLib,
    /// The algorithm ID header parameter was not encoded as an integer.
    NonIntegerAlgId,
    /// The content-type header parameter has an invalid value.
    BadContentType,
    /// The outer CBOR tag number does not match the expected message type.
    IncorrectlyTagged,
    /// An empty/zero-length key was supplied where a non-empty key is required.
    EmptyKey,
    /// The same header label appeared in both the protected and unprotected buckets,
    /// or twice in the same bucket.
    DuplicateParameter,
    /// A parameter that must be protected (per `crit` or algorithm policy) was found
    /// unprotected.
    ParameterNotProtected,
    /// A label named in `crit` was not found in the protected bucket.
    CritParameter,
    /// More tag numbers preceded a CBOR item than this library supports.
    TooManyTags,
    /// A recognized but unsupported header parameter type was encountered.
    UnhandledHeaderParameter,
    /// A header parameter's CBOR type did not match what its label requires.
    InvalidParameterType,
    /// The `crit` parameter itself was found in the unprotected bucket.
    CritInUnprotected,
    /// The caller-supplied buffer has insufficient room for the header parameters.
    InsufficientSpaceForParameters,
    /// A header label was encoded as a text string, which this implementation does
    /// not support for critical-parameter checking.
    StringLabeledParam,
    /// A `COSE_Sign` message was built with zero signers.
    NoSigners,
    /// More signers were added than this implementation supports.
    TooManySigners,
    /// No recipient's key ID matched the supplied key.
    KidUnmatched,
    /// A CBOR decode operation failed for a reason other than well-formedness.
    CborDecode,
    /// A `COSE_Signature` structure is malformed.
    SignatureFormat,
    /// A `COSE_Mac0` structure is malformed.
    Mac0Format,
    /// The content-key-distribution algorithm is not supported.
    UnsupportedContentKeyDistributionAlg,
    /// The encryption algorithm is not supported.
    UnsupportedEncryptionAlg,
    /// The key length does not match what the algorithm requires.
    UnsupportedKeyLength,
    /// A recipient structure could not be added to this message.
    RecipientCannotBeAdded,
    /// The AEAD cipher algorithm is not supported.
    UnsupportedCipherAlg,
    /// An AEAD encrypt operation failed.
    EncryptFail,
    /// An AEAD decrypt operation failed.
    DecryptFail,
    /// An HPKE encrypt (sender) operation failed.
    HpkeEncryptFail,
    /// An HPKE decrypt (receiver) operation failed.
    HpkeDecryptFail,
    /// A mandatory CBOR field was missing.
    CborMandatoryFieldMissing,
    /// HPKE sender information was malformed or inconsistent.
    HpkeSenderInfoIncorrect,
    /// The key's usage flags do not permit the requested operation.
    UnsupportedKeyUsageFlags,
    /// Importing a private key failed.
    PrivateKeyImportFailed,
    /// The random number generator failed.
    RngFailed,
    /// Exporting a public key failed.
    PublicKeyExportFailed,
    /// Key generation failed.
    KeyGenerationFailed,
    /// Exporting a key failed.
    KeyExportFailed,
    /// An AES key-wrap/unwrap operation failed.
    KwFailed,
    /// An auxiliary buffer was required but not supplied.
    NeedAuxiliaryBuffer,
    /// The supplied auxiliary buffer was the wrong size.
    AuxiliaryBufferSize,
    /// A `COSE_Sign`/`COSE_Mac`/`COSE_Encrypt` verification was attempted with zero
    /// verifiers configured.
    NoVerifiers,
    /// This verifier declines to attempt this particular signature/recipient.
    Decline,
    /// A header parameter that must not be protected was found protected.
    ProtectedParamNotAllowed,
    /// A `COSE_recipient` structure is malformed.
    RecipientFormat,
    /// No more recipients/signatures remain to iterate.
    NoMore,
    /// The elliptic curve is not supported.
    UnsupportedEllipticCurveAlg,
    /// Importing a public key failed.
    PublicKeyImportFailed,
    /// Importing a symmetric key failed.
    SymmetricKeyImportFailed,
    /// The key-encapsulation mechanism algorithm is not supported.
    UnsupportedKemAlg,
    /// An HKDF operation failed.
    HkdfFail,
    /// A derived or supplied length is invalid.
    InvalidLength,
    /// The HMAC algorithm is not supported.
    UnsupportedHmacAlg,
    /// An HMAC operation failed for an unspecified reason.
    HmacGeneralFail,
    /// HMAC verification failed (the tag does not match).
    HmacVerify,
    /// A key-agreement (e.g. ECDH) operation failed.
    KeyAgreementFail,
    /// An unspecified operation is unsupported.
    Unsupported,
    /// A multi-step signing/MAC operation was continued out of order.
    SigInProgress,
    /// An invalid combination of options was requested.
    BadOpt,
    /// The COSE message type could not be determined from its CBOR tag.
    CantDetermineMessageType,
    /// The message's CBOR tag does not match any message type this call accepts.
    WrongCoseMessageType,
    /// A KDF output buffer was too small.
    KdfBufferTooSmall,
    /// A KDF context info structure has an invalid size.
    KdfContextSize,
}

impl CoseErrorCode {
    /// Map a CBOR encode failure to a COSE error, per the documented propagation
    /// policy: `BufferTooSmall` becomes [`Self::TooSmall`], anything else becomes
    /// [`Self::CborFormatting`].
    #[must_use]
    pub const fn from_encode_error(code: CborErrorCode) -> Self {
        match code {
            CborErrorCode::BufferTooSmall => Self::TooSmall,
            _ => Self::CborFormatting,
        }
    }

    /// Map any CBOR decode failure to [`Self::CborNotWellFormed`], per the documented
    /// propagation policy.
    #[must_use]
    pub const fn from_decode_error(_code: CborErrorCode) -> Self {
        Self::CborNotWellFormed
    }
}

/// A COSE error, carrying the structured code plus the qcbor offset that produced it
/// (zero when the error did not originate at the CBOR layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoseError {
    /// The error code.
    pub code: CoseErrorCode,
    /// Byte offset into the relevant CBOR buffer, or 0 if not applicable.
    pub offset: usize,
}

impl CoseError {
    /// Construct a new error at `offset`.
    #[must_use]
    pub const fn new(code: CoseErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }

    /// Construct an error with no meaningful buffer offset.
    #[must_use]
    pub const fn without_offset(code: CoseErrorCode) -> Self {
        Self { code, offset: 0 }
    }
}

impl From<qcbor::QcborError> for CoseError {
    fn from(e: qcbor::QcborError) -> Self {
        Self::new(CoseErrorCode::from_decode_error(e.code), e.offset)
    }
}

impl fmt::Display for CoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t-cose error at offset {}: {:?}", self.offset, self.code)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoseError {}
