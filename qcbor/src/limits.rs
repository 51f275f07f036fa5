//! Depth, count, and size limits enforced by the encoder and decoder.

/// Default maximum container/wrap nesting depth (spec default: "10, sufficient for
/// real-world protocols").
pub const DEFAULT_MAX_NESTING: usize = 10;

/// Default maximum number of tag numbers collected for a single item.
pub const DEFAULT_MAX_TAGS_PER_ITEM: usize = 4;

/// A definite-length array or map may not declare more than this many items; larger
/// values would collide with the reserved indefinite-length sentinel in the packed
/// on-wire length field.
pub const MAX_ITEMS_PER_CONTAINER: u64 = 0xFFFE;

/// Resource limits enforced while decoding.
///
/// All limits are deterministic and enforced without background timers, matching the
/// no-I/O, no-cancellation resource model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum container/tag/wrap nesting depth.
    pub max_nesting: usize,
    /// Maximum tag numbers preceding a single item.
    pub max_tags_per_item: usize,
    /// Maximum accepted input length in bytes.
    pub max_input_bytes: usize,
    /// Maximum accepted declared array length.
    pub max_array_len: u64,
    /// Maximum accepted declared map length (pairs).
    pub max_map_len: u64,
    /// Maximum accepted byte-string length.
    pub max_bytes_len: u64,
    /// Maximum accepted text-string length in UTF-8 bytes.
    pub max_text_len: u64,
}

impl DecodeLimits {
    /// Construct limits appropriate for a single caller-owned input buffer of the given
    /// size: container/string lengths are capped by the input size itself.
    #[must_use]
    pub const fn for_input_len(len: usize) -> Self {
        let len_u64 = len as u64;
        Self {
            max_nesting: DEFAULT_MAX_NESTING,
            max_tags_per_item: DEFAULT_MAX_TAGS_PER_ITEM,
            max_input_bytes: len,
            max_array_len: len_u64,
            max_map_len: len_u64,
            max_bytes_len: len_u64,
            max_text_len: len_u64,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::for_input_len(usize::MAX / 2)
    }
}
