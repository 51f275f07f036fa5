use core::fmt;

/// A structured error code identifying why a CBOR encode or decode operation failed.
///
/// Codes are grouped into contiguous ranges so that classification (`is_ill_formed`,
/// `is_unrecoverable`) is a single comparison rather than a lookup table, per the
/// taxonomy partition this crate follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    // --- Encoding errors ---
    /// The output buffer is too small to hold the encoded bytes.
    BufferTooSmall,
    /// The encoded output would exceed 2^32 bytes.
    BufferTooLarge,
    /// A reserved simple value (24..=31) was requested.
    EncodeUnsupported,
    /// Container nesting exceeded the configured maximum depth.
    ArrayNestingTooDeep,
    /// `close_array`/`close_map` was called against a frame of the other kind.
    CloseMismatch,
    /// A definite-length container would need more items than fit the length encoding.
    ArrayTooLong,
    /// More closes were issued than containers are open.
    TooManyCloses,
    /// `finish` was called while a container is still open.
    ArrayOrMapStillOpen,

    // --- Ill-formed decode errors ("this input is not valid CBOR") ---
    /// A type-7 simple value used the two-byte form for a value that fits in the head byte.
    BadTypeSeven,
    /// Bytes remain in the input after the single top-level item was consumed.
    ExtraBytes,
    /// Additional-information value 28..30 was used.
    UnsupportedReservedAi,
    /// A container was entered but not fully consumed before being exited.
    ArrayOrMapUnconsumed,
    /// The integer argument encoding was malformed.
    BadIntegerLength,
    /// An indefinite-length string chunk did not match the enclosing major type.
    IndefiniteStringChunk,
    /// Input ended in the middle of an item.
    HitEnd,
    /// A break (0xff) appeared where none was expected.
    BadBreak,

    // --- Unrecoverable decode errors (decoding cannot continue) ---
    /// The input exceeds the configured maximum size.
    InputTooLarge,
    /// Container/tag/wrap nesting exceeded the configured maximum depth while decoding.
    DecodeNestingTooDeep,
    /// A declared array length exceeds configured limits.
    DecodeArrayTooLong,
    /// A declared string length exceeds configured limits.
    StringTooLong,
    /// A decimal-fraction/bigfloat `[exponent, mantissa]` pair was malformed.
    BadExpAndMantissa,
    /// An indefinite-length string was encountered with no memory pool configured.
    NoStringAllocator,
    /// The configured memory pool has insufficient space to reassemble a string.
    StringAllocateFailed,
    /// More tag numbers preceded an item than `MAX_TAGS_PER_ITEM` allows.
    TooManyTags,

    // --- Other decode errors ---
    /// A map label was of a type this decoder does not support for label search.
    MapLabelTypeUnsupported,
    /// The next item was not of the type requested by a typed getter.
    UnexpectedType,
    /// Tag content did not match the expected shape for its tag number.
    BadOptionalTagContent,
    /// A duplicate label was found while scanning a map.
    DuplicateLabel,
    /// The configured memory pool size is invalid.
    MemPoolSize,
    /// A CBOR-representable value lies outside the caller's requested integer range.
    IntOverflow,
    /// A date tag's value over/underflows the representable range.
    DateOverflow,
    /// `exit_array`/`exit_map` was called without a matching enter.
    ExitMismatch,
    /// No more items remain in the current array/map.
    NoMoreItems,
    /// The requested label was not found in the entered map.
    LabelNotFound,
    /// An integer value's sign could not be represented in the requested type.
    NumberSignConversion,
    /// A numeric conversion over- or under-flowed.
    ConversionOverOrUnderFlow,
    /// A map-search operation was attempted without first entering a map.
    MapNotEntered,
    /// A caller-supplied callback returned failure.
    CallbackFail,
    /// Epoch-date decoding was disabled for this decoder configuration.
    FloatDateDisabled,
    /// Half-precision float decoding was disabled for this decoder configuration.
    HalfPrecisionDisabled,
    /// Hardware (binary32/64) float decoding was disabled for this decoder configuration.
    HwFloatDisabled,
    /// A floating point conversion hit a domain error (e.g. NaN forbidden).
    FloatException,

    /// Invalid limits were supplied (e.g. a limit of zero for a required resource).
    InvalidLimits,
}

impl ErrorCode {
    const ILL_FORMED_START: Self = Self::BadTypeSeven;
    const ILL_FORMED_END: Self = Self::BadBreak;
    const UNRECOVERABLE_START: Self = Self::InputTooLarge;
    const UNRECOVERABLE_END: Self = Self::TooManyTags;

    #[inline]
    #[must_use]
    const fn rank(self) -> u8 {
        // Declaration order doubles as the range used for classification.
        self as u8
    }

    /// Returns `true` if this error means "the input is not well-formed CBOR".
    #[must_use]
    pub const fn is_ill_formed(self) -> bool {
        self.rank() >= Self::ILL_FORMED_START.rank() && self.rank() <= Self::ILL_FORMED_END.rank()
    }

    /// Returns `true` if this error means decoding cannot continue at all.
    #[must_use]
    pub const fn is_unrecoverable(self) -> bool {
        self.is_ill_formed()
            || (self.rank() >= Self::UNRECOVERABLE_START.rank()
                && self.rank() <= Self::UNRECOVERABLE_END.rank())
    }
}

/// An error produced by a `qcbor` encode or decode operation, with a stable code and the
/// byte offset at which it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QcborError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset into the relevant buffer where the error was detected.
    pub offset: usize,
}

impl QcborError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }
}

impl fmt::Display for QcborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.code {
            ErrorCode::BufferTooSmall => "output buffer too small",
            ErrorCode::BufferTooLarge => "encoded output exceeds 2^32 bytes",
            ErrorCode::EncodeUnsupported => "reserved simple value cannot be encoded",
            ErrorCode::ArrayNestingTooDeep => "container nesting too deep",
            ErrorCode::CloseMismatch => "close does not match the open container kind",
            ErrorCode::ArrayTooLong => "container has too many items to encode its length",
            ErrorCode::TooManyCloses => "more closes than open containers",
            ErrorCode::ArrayOrMapStillOpen => "finish called with a container still open",

            ErrorCode::BadTypeSeven => "simple value used a non-canonical two-byte form",
            ErrorCode::ExtraBytes => "extra bytes after the top-level item",
            ErrorCode::UnsupportedReservedAi => "reserved additional-information value",
            ErrorCode::ArrayOrMapUnconsumed => "container exited before fully consumed",
            ErrorCode::BadIntegerLength => "malformed integer argument encoding",
            ErrorCode::IndefiniteStringChunk => "indefinite-length string chunk type mismatch",
            ErrorCode::HitEnd => "unexpected end of input",
            ErrorCode::BadBreak => "unexpected break marker",

            ErrorCode::InputTooLarge => "input exceeds configured size limit",
            ErrorCode::DecodeNestingTooDeep => "nesting too deep while decoding",
            ErrorCode::DecodeArrayTooLong => "declared array length exceeds limits",
            ErrorCode::StringTooLong => "declared string length exceeds limits",
            ErrorCode::BadExpAndMantissa => "malformed decimal-fraction/bigfloat pair",
            ErrorCode::NoStringAllocator => "indefinite-length string with no memory pool set",
            ErrorCode::StringAllocateFailed => "memory pool exhausted while reassembling a string",
            ErrorCode::TooManyTags => "too many tag numbers preceding one item",

            ErrorCode::MapLabelTypeUnsupported => "unsupported map label type for search",
            ErrorCode::UnexpectedType => "item is not of the requested type",
            ErrorCode::BadOptionalTagContent => "tag content does not match its tag number",
            ErrorCode::DuplicateLabel => "duplicate map label",
            ErrorCode::MemPoolSize => "invalid memory pool size",
            ErrorCode::IntOverflow => "integer value outside the requested range",
            ErrorCode::DateOverflow => "date value outside the representable range",
            ErrorCode::ExitMismatch => "exit without a matching enter",
            ErrorCode::NoMoreItems => "no more items in the current container",
            ErrorCode::LabelNotFound => "label not found in map",
            ErrorCode::NumberSignConversion => "integer sign cannot be represented",
            ErrorCode::ConversionOverOrUnderFlow => "numeric conversion over/underflowed",
            ErrorCode::MapNotEntered => "map search attempted without entering a map",
            ErrorCode::CallbackFail => "caller-supplied callback failed",
            ErrorCode::FloatDateDisabled => "epoch-date decoding disabled",
            ErrorCode::HalfPrecisionDisabled => "half-precision float decoding disabled",
            ErrorCode::HwFloatDisabled => "hardware float decoding disabled",
            ErrorCode::FloatException => "floating point domain error",

            ErrorCode::InvalidLimits => "invalid decode/encode limits",
        };
        write!(f, "qcbor error at offset {}: {msg}", self.offset)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QcborError {}
