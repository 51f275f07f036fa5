//! A streaming, allocation-free CBOR decoder reading from a caller-supplied byte slice.
//!
//! Indefinite-length string reassembly is the one place this decoder needs scratch
//! space; callers that need it install a [`MemPool`] via [`Decoder::set_mem_pool`].
//! Everything else reads directly out of the borrowed input.

use crate::buf::InBuf;
use crate::error::{ErrorCode, QcborError};
use crate::head::{decode_head, major, read_argument, read_argument_checked, AI_INDEFINITE_OR_BREAK};
use crate::limits::{DecodeLimits, DEFAULT_MAX_NESTING, DEFAULT_MAX_TAGS_PER_ITEM};

/// Where a reassembled indefinite-length string's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Borrowed directly from the original input, valid for the decoder's lifetime.
    Input,
    /// Borrowed from the mem pool, valid only until the pool is reset or reused.
    Pool,
}

/// One decoded CBOR data item, with its leading tag numbers (if any).
#[derive(Debug, Clone, Copy)]
pub enum Item<'de> {
    /// Major type 0.
    UInt(u64),
    /// Major type 1, wire value (the encoded item is `-(1 + value)`).
    NInt(u64),
    /// Major type 2.
    Bytes(&'de [u8], Source),
    /// Major type 3.
    Text(&'de str, Source),
    /// Major type 4, definite length: item count.
    ArrayStart(u64),
    /// Major type 5, definite length: pair count.
    MapStart(u64),
    /// Major type 4, indefinite length.
    IndefArrayStart,
    /// Major type 5, indefinite length.
    IndefMapStart,
    /// Simple value 20/21.
    Bool(bool),
    /// Simple value 22.
    Null,
    /// Simple value 23.
    Undefined,
    /// Any other simple value (0..=19 or the two-byte 32..=255 form).
    Simple(u8),
    /// Major type 7, ai 25, widened to `f32`.
    Half(f32),
    /// Major type 7, ai 26.
    Single(f32),
    /// Major type 7, ai 27.
    Double(f64),
    /// The `0xff` stop code ending an indefinite-length container or string.
    Break,
}

/// Up to [`DEFAULT_MAX_TAGS_PER_ITEM`] tag numbers collected ahead of an item.
#[derive(Debug, Clone, Copy)]
pub struct TagList {
    tags: [u64; DEFAULT_MAX_TAGS_PER_ITEM],
    len: usize,
}

impl TagList {
    const EMPTY: Self = Self {
        tags: [0; DEFAULT_MAX_TAGS_PER_ITEM],
        len: 0,
    };

    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.tags[..self.len]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A decoded item together with the tag numbers that preceded it, and the offset it
/// started at.
#[derive(Debug, Clone, Copy)]
pub struct TaggedItem<'de> {
    /// The item itself.
    pub item: Item<'de>,
    /// Tag numbers that preceded it, outermost first.
    pub tags: TagList,
    /// Byte offset the first tag number (or the item itself, if untagged) started at.
    pub offset: usize,
}

/// A fixed-capacity arena used to reassemble indefinite-length byte/text strings.
/// There is no general allocator hook: this is the only scratch space this decoder
/// ever uses, and it is entirely caller-owned.
///
/// Each reassembly consumes a disjoint prefix of the remaining storage (a plain bump
/// allocator implemented with `split_at_mut`, so handing out a chunk needs no unsafe
/// code); once storage is exhausted, further indefinite-length strings fail with
/// `StringAllocateFailed`. Construct a fresh pool per decode if reuse across decodes
/// is needed.
pub struct MemPool<'p> {
    remaining: &'p mut [u8],
}

impl<'p> MemPool<'p> {
    #[must_use]
    pub fn new(storage: &'p mut [u8]) -> Self {
        Self { remaining: storage }
    }

    fn alloc(&mut self, len: usize) -> Result<&'p mut [u8], ErrorCode> {
        if len > self.remaining.len() {
            return Err(ErrorCode::StringAllocateFailed);
        }
        let taken = core::mem::replace(&mut self.remaining, &mut []);
        let (head, tail) = taken.split_at_mut(len);
        self.remaining = tail;
        Ok(head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Array,
    Map,
    IndefArray,
    IndefMap,
    BstrWrap,
}

#[derive(Debug, Clone, Copy)]
struct Frame<'de> {
    kind: ContainerKind,
    remaining: u64,
    /// The cursor to restore on exit, for `BstrWrap` frames only.
    saved_cursor: Option<InBuf<'de>>,
}

/// A streaming CBOR decoder over a borrowed input slice.
pub struct Decoder<'de> {
    inp: InBuf<'de>,
    limits: DecodeLimits,
    stack: [Option<Frame<'de>>; DEFAULT_MAX_NESTING],
    depth: usize,
    pool: Option<MemPool<'de>>,
    error: Option<QcborError>,
    checked: bool,
}

impl<'de> Decoder<'de> {
    /// Construct a decoder over `input` with default limits derived from its length.
    #[must_use]
    pub fn new(input: &'de [u8]) -> Self {
        Self {
            inp: InBuf::new(input),
            limits: DecodeLimits::for_input_len(input.len()),
            stack: [None; DEFAULT_MAX_NESTING],
            depth: 0,
            pool: None,
            error: None,
            checked: false,
        }
    }

    /// Override the default resource limits.
    pub fn set_limits(&mut self, limits: DecodeLimits) {
        self.limits = limits;
    }

    /// Reject non-minimal (non-shortest) integer/length encodings, for CDE/dCBOR
    /// decoding.
    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    /// Install a memory pool for reassembling indefinite-length strings. Without one,
    /// encountering an indefinite-length string fails with `NoStringAllocator`.
    pub fn set_mem_pool(&mut self, pool: MemPool<'de>) {
        self.pool = Some(pool);
    }

    #[inline]
    fn fail(&mut self, code: ErrorCode) -> QcborError {
        let err = QcborError::new(code, self.inp.position());
        if self.error.is_none() {
            self.error = Some(err);
        }
        err
    }

    fn current_remaining_mut(&mut self) -> Option<&mut u64> {
        if self.depth == 0 {
            return None;
        }
        self.stack[self.depth - 1].as_mut().map(|f| &mut f.remaining)
    }

    fn consume_from_parent(&mut self) {
        if let Some(r) = self.current_remaining_mut() {
            if *r != u64::MAX {
                *r -= 1;
            }
        }
    }

    /// Fetch and remove the next item from the input, collecting any leading tag
    /// numbers into its [`TagList`].
    pub fn get_next(&mut self) -> Result<TaggedItem<'de>, QcborError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let mut tags = TagList::EMPTY;
        let start_offset = self.inp.position();
        loop {
            let head = decode_head(&mut self.inp).map_err(|e| self.latch(e))?;
            if head.major == major::TAG {
                if tags.len >= DEFAULT_MAX_TAGS_PER_ITEM {
                    return Err(self.fail(ErrorCode::TooManyTags));
                }
                let tag = self.read_arg(head.major, head.ai, head.offset)?;
                tags.tags[tags.len] = tag;
                tags.len += 1;
                continue;
            }
            let item = self.decode_body(head.major, head.ai, head.offset)?;
            if !matches!(item, Item::Break) {
                self.consume_from_parent();
            }
            return Ok(TaggedItem {
                item,
                tags,
                offset: start_offset,
            });
        }
    }

    fn latch(&mut self, e: QcborError) -> QcborError {
        if self.error.is_none() {
            self.error = Some(e);
        }
        e
    }

    fn read_arg(&mut self, _major: u8, ai: u8, offset: usize) -> Result<u64, QcborError> {
        if self.checked {
            read_argument_checked(&mut self.inp, ai, offset).map_err(|e| self.latch(e))
        } else {
            read_argument(&mut self.inp, ai, offset).map_err(|e| self.latch(e))
        }
    }

    fn decode_body(&mut self, maj: u8, ai: u8, offset: usize) -> Result<Item<'de>, QcborError> {
        match maj {
            major::UNSIGNED => Ok(Item::UInt(self.read_arg(maj, ai, offset)?)),
            major::NEGATIVE => Ok(Item::NInt(self.read_arg(maj, ai, offset)?)),
            major::BYTES => self.decode_string(ai, offset, true),
            major::TEXT => self.decode_string(ai, offset, false),
            major::ARRAY => {
                if ai == crate::head::AI_INDEFINITE_OR_BREAK {
                    Ok(Item::IndefArrayStart)
                } else {
                    let n = self.read_arg(maj, ai, offset)?;
                    if n > self.limits.max_array_len {
                        return Err(self.fail(ErrorCode::DecodeArrayTooLong));
                    }
                    Ok(Item::ArrayStart(n))
                }
            }
            major::MAP => {
                if ai == crate::head::AI_INDEFINITE_OR_BREAK {
                    Ok(Item::IndefMapStart)
                } else {
                    let n = self.read_arg(maj, ai, offset)?;
                    if n > self.limits.max_map_len {
                        return Err(self.fail(ErrorCode::DecodeArrayTooLong));
                    }
                    Ok(Item::MapStart(n))
                }
            }
            major::TAG => unreachable!("tags are consumed in get_next"),
            major::SIMPLE_FLOAT => self.decode_simple_or_float(ai, offset),
            _ => Err(self.fail(ErrorCode::UnexpectedType)),
        }
    }

    fn decode_simple_or_float(&mut self, ai: u8, offset: usize) -> Result<Item<'de>, QcborError> {
        match ai {
            20 => Ok(Item::Bool(false)),
            21 => Ok(Item::Bool(true)),
            22 => Ok(Item::Null),
            23 => Ok(Item::Undefined),
            24 => {
                let v = self.inp.read_u8().map_err(|e| self.latch(e))?;
                if self.checked && v < 32 {
                    return Err(self.fail(ErrorCode::BadTypeSeven));
                }
                Ok(Item::Simple(v))
            }
            0..=19 => Ok(Item::Simple(ai)),
            25 => {
                let b = self.inp.read_exact(2).map_err(|e| self.latch(e))?;
                let bits = u16::from_be_bytes([b[0], b[1]]);
                Ok(Item::Half(crate::float::half_to_f32(bits)))
            }
            26 => {
                let b = self.inp.read_exact(4).map_err(|e| self.latch(e))?;
                Ok(Item::Single(f32::from_bits(u32::from_be_bytes([
                    b[0], b[1], b[2], b[3],
                ]))))
            }
            27 => {
                let b = self.inp.read_exact(8).map_err(|e| self.latch(e))?;
                Ok(Item::Double(f64::from_bits(u64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))))
            }
            28..=30 => Err(self.fail(ErrorCode::UnsupportedReservedAi)),
            31 => Ok(Item::Break),
            _ => Err(self.fail(ErrorCode::BadIntegerLength)),
        }
    }

    fn decode_string(&mut self, ai: u8, offset: usize, is_bytes: bool) -> Result<Item<'de>, QcborError> {
        if ai == crate::head::AI_INDEFINITE_OR_BREAK {
            return self.reassemble_indefinite_string(is_bytes, offset);
        }
        let len = self.read_arg(if is_bytes { major::BYTES } else { major::TEXT }, ai, offset)?;
        let max = if is_bytes {
            self.limits.max_bytes_len
        } else {
            self.limits.max_text_len
        };
        if len > max {
            return Err(self.fail(ErrorCode::StringTooLong));
        }
        let bytes = self.inp.read_exact(len as usize).map_err(|e| self.latch(e))?;
        if is_bytes {
            Ok(Item::Bytes(bytes, Source::Input))
        } else {
            let s = core::str::from_utf8(bytes).map_err(|_| self.fail(ErrorCode::BadOptionalTagContent))?;
            Ok(Item::Text(s, Source::Input))
        }
    }

    fn reassemble_indefinite_string(
        &mut self,
        is_bytes: bool,
        offset: usize,
    ) -> Result<Item<'de>, QcborError> {
        if self.pool.is_none() {
            return Err(self.fail(ErrorCode::NoStringAllocator));
        }
        // First pass: measure total length and validate chunk types without copying.
        let mut total = 0usize;
        let mut scan = self.inp;
        loop {
            let chunk_head = decode_head(&mut scan).map_err(|e| self.latch(e))?;
            if chunk_head.major == major::SIMPLE_FLOAT && chunk_head.ai == 31 {
                break;
            }
            let expect_major = if is_bytes { major::BYTES } else { major::TEXT };
            if chunk_head.major != expect_major || chunk_head.ai == crate::head::AI_INDEFINITE_OR_BREAK {
                return Err(self.fail(ErrorCode::IndefiniteStringChunk));
            }
            let len = read_argument(&mut scan, chunk_head.ai, chunk_head.offset).map_err(|e| self.latch(e))?;
            scan.read_exact(len as usize).map_err(|e| self.latch(e))?;
            total += len as usize;
        }
        if (total as u64) > (if is_bytes { self.limits.max_bytes_len } else { self.limits.max_text_len }) {
            return Err(self.fail(ErrorCode::StringTooLong));
        }

        // Second pass: copy chunks into a single reserved span of the pool. The
        // reservation's lifetime ('de) is independent of this method's `&mut self`
        // borrow, so ordinary field borrows (self.inp, self.error) remain usable
        // below once this block ends.
        let dest: &'de mut [u8] = {
            let pool = self.pool.as_mut().expect("checked above");
            pool.alloc(total).map_err(|e| QcborError::new(e, offset))?
        };
        let mut written = 0usize;
        loop {
            let chunk_head = decode_head(&mut self.inp).map_err(|e| self.latch(e))?;
            if chunk_head.major == major::SIMPLE_FLOAT && chunk_head.ai == 31 {
                break;
            }
            let len = read_argument(&mut self.inp, chunk_head.ai, chunk_head.offset).map_err(|e| self.latch(e))?;
            let chunk = self.inp.read_exact(len as usize).map_err(|e| self.latch(e))?;
            dest[written..written + chunk.len()].copy_from_slice(chunk);
            written += chunk.len();
        }
        let frozen: &'de [u8] = dest;
        if is_bytes {
            Ok(Item::Bytes(frozen, Source::Pool))
        } else {
            let s = core::str::from_utf8(frozen).map_err(|_| self.fail(ErrorCode::BadOptionalTagContent))?;
            Ok(Item::Text(s, Source::Pool))
        }
    }

    // --- container navigation ---

    fn push_frame(&mut self, kind: ContainerKind, remaining: u64) -> Result<(), QcborError> {
        if self.depth >= self.limits.max_nesting {
            return Err(self.fail(ErrorCode::DecodeNestingTooDeep));
        }
        self.stack[self.depth] = Some(Frame {
            kind,
            remaining,
            saved_cursor: None,
        });
        self.depth += 1;
        Ok(())
    }

    /// Enter an array previously returned as `Item::ArrayStart`/`IndefArrayStart`.
    pub fn enter_array(&mut self, item: &Item<'_>) -> Result<(), QcborError> {
        match *item {
            Item::ArrayStart(n) => self.push_frame(ContainerKind::Array, n),
            Item::IndefArrayStart => self.push_frame(ContainerKind::IndefArray, u64::MAX),
            _ => Err(self.fail(ErrorCode::UnexpectedType)),
        }
    }

    /// Enter a map previously returned as `Item::MapStart`/`IndefMapStart`. `remaining`
    /// tracks item count (label + value both count), i.e. twice the pair count.
    pub fn enter_map(&mut self, item: &Item<'_>) -> Result<(), QcborError> {
        match *item {
            Item::MapStart(n) => self.push_frame(
                ContainerKind::Map,
                n.checked_mul(2).ok_or_else(|| QcborError::new(ErrorCode::DecodeArrayTooLong, self.inp.position()))?,
            ),
            Item::IndefMapStart => self.push_frame(ContainerKind::IndefMap, u64::MAX),
            _ => Err(self.fail(ErrorCode::UnexpectedType)),
        }
    }

    fn exit_container(&mut self, want_array: bool) -> Result<(), QcborError> {
        if self.depth == 0 {
            return Err(self.fail(ErrorCode::ExitMismatch));
        }
        let frame = self.stack[self.depth - 1].ok_or_else(|| self.fail(ErrorCode::ExitMismatch))?;
        let is_array = matches!(frame.kind, ContainerKind::Array | ContainerKind::IndefArray);
        if is_array != want_array {
            return Err(self.fail(ErrorCode::ExitMismatch));
        }
        match frame.kind {
            ContainerKind::Array | ContainerKind::Map => {
                if frame.remaining != 0 {
                    return Err(self.fail(ErrorCode::ArrayOrMapUnconsumed));
                }
            }
            ContainerKind::IndefArray | ContainerKind::IndefMap => {
                // The break byte is consumed as a Break item via get_next; nothing left
                // to check here beyond having observed it (callers drain with get_next
                // until Break is returned before calling exit_*).
            }
            ContainerKind::BstrWrap => unreachable!(),
        }
        self.stack[self.depth - 1] = None;
        self.depth -= 1;
        // No consume_from_parent() here: the container itself was already counted
        // against its enclosing container when get_next returned its *Start item.
        Ok(())
    }

    /// Exit a previously-entered array.
    pub fn exit_array(&mut self) -> Result<(), QcborError> {
        self.exit_container(true)
    }

    /// Exit a previously-entered map.
    pub fn exit_map(&mut self) -> Result<(), QcborError> {
        self.exit_container(false)
    }

    /// Enter a byte-string-wrapped CBOR region (e.g. a COSE protected-header bucket),
    /// redirecting subsequent `get_next` calls to read from inside the byte string.
    /// The outer cursor is saved on the nesting stack and restored by
    /// [`Decoder::exit_bstr_wrapped`].
    pub fn enter_bstr_wrapped(&mut self, item: &Item<'de>) -> Result<(), QcborError> {
        let Item::Bytes(bytes, _) = *item else {
            return Err(self.fail(ErrorCode::UnexpectedType));
        };
        if self.depth >= self.limits.max_nesting {
            return Err(self.fail(ErrorCode::DecodeNestingTooDeep));
        }
        let saved_cursor = self.inp;
        self.stack[self.depth] = Some(Frame {
            kind: ContainerKind::BstrWrap,
            remaining: 0,
            saved_cursor: Some(saved_cursor),
        });
        self.depth += 1;
        self.inp = InBuf::new(bytes);
        Ok(())
    }

    /// Exit a byte-string-wrapped region entered with [`Decoder::enter_bstr_wrapped`],
    /// restoring the outer cursor.
    pub fn exit_bstr_wrapped(&mut self) -> Result<(), QcborError> {
        if self.depth == 0 {
            return Err(self.fail(ErrorCode::ExitMismatch));
        }
        let frame = self.stack[self.depth - 1].ok_or_else(|| self.fail(ErrorCode::ExitMismatch))?;
        if frame.kind != ContainerKind::BstrWrap {
            return Err(self.fail(ErrorCode::ExitMismatch));
        }
        if !self.inp.at_end() {
            return Err(self.fail(ErrorCode::ArrayOrMapUnconsumed));
        }
        self.stack[self.depth - 1] = None;
        self.depth -= 1;
        self.inp = frame
            .saved_cursor
            .expect("bstr-wrap frames always carry a saved cursor");
        // No consume_from_parent() here: the wrapped byte string was already counted
        // against its enclosing container when get_next first returned it.
        Ok(())
    }

    /// Verify the cursor is at the end of input and no container remains open.
    pub fn finish(&self) -> Result<(), QcborError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.depth != 0 {
            return Err(QcborError::new(ErrorCode::ArrayOrMapUnconsumed, self.inp.position()));
        }
        if !self.inp.at_end() {
            return Err(QcborError::new(ErrorCode::ExtraBytes, self.inp.position()));
        }
        Ok(())
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.inp.position()
    }

    /// Search the currently-entered map for a text-string label, returning its value
    /// item. The scan is forward-only and single-pass: it starts from the decoder's
    /// current cursor (the map's first entry, the first time this is called) and
    /// consumes each label/value pair in turn, skipping past values whose label
    /// doesn't match (spec explicitly allows this implementation strategy over
    /// building an index) until it finds one that does or runs out of pairs. A label
    /// positioned before the cursor — e.g. already passed by an earlier lookup — will
    /// not be found; callers that need to look up multiple labels in one map should
    /// order their lookups to match the map's encoded order, or re-enter the map to
    /// restart the scan from its first entry. Leaves the decoder positioned just past
    /// the matched value, so callers may keep searching for more or call `exit_map`
    /// once done.
    pub fn get_item_in_map_sz(&mut self, key: &str) -> Result<TaggedItem<'de>, QcborError> {
        self.get_item_in_map_with(|dec| {
            let label = dec.get_next()?;
            Ok(matches!(label.item, Item::Text(s, _) if s == key))
        })
    }

    /// Search the currently-entered map for an integer label (matching both the
    /// unsigned and negative CBOR integer forms), returning its value item.
    pub fn get_item_in_map_n(&mut self, key: i64) -> Result<TaggedItem<'de>, QcborError> {
        self.get_item_in_map_with(|dec| {
            let label = dec.get_next()?;
            let matched = match label.item {
                Item::UInt(v) => i64::try_from(v).map(|v| v == key).unwrap_or(false),
                Item::NInt(v) => i64::try_from(v).map(|v| -1 - v == key).unwrap_or(false),
                _ => false,
            };
            Ok(matched)
        })
    }

    /// Shared map-search core: the topmost entered container must be the map being
    /// searched. Repeatedly reads a label (via `match_label`, which itself consumes
    /// the label item and reports whether it matched) and either decodes the paired
    /// value (on match) or skips it (via [`skip_value`]) before trying the next pair.
    /// The scan is bounded by the map frame's own remaining-item counter (decremented
    /// by the ordinary `get_next`/`skip_value` path as it goes), not by end-of-input,
    /// so a lookup never reads past the map it was asked to search.
    fn get_item_in_map_with(
        &mut self,
        mut match_label: impl FnMut(&mut Self) -> Result<bool, QcborError>,
    ) -> Result<TaggedItem<'de>, QcborError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.depth == 0 {
            return Err(self.fail(ErrorCode::MapNotEntered));
        }
        let frame = self.stack[self.depth - 1];
        let Some(frame) = frame else {
            return Err(self.fail(ErrorCode::MapNotEntered));
        };
        if frame.kind != ContainerKind::Map && frame.kind != ContainerKind::IndefMap {
            return Err(self.fail(ErrorCode::MapNotEntered));
        }
        loop {
            let remaining = self.stack[self.depth - 1]
                .expect("map frame checked above")
                .remaining;
            if remaining == 0 {
                return Err(self.fail(ErrorCode::LabelNotFound));
            }
            if remaining == u64::MAX {
                let mut peek = self.inp;
                if let Ok(head) = decode_head(&mut peek) {
                    if head.major == major::SIMPLE_FLOAT && head.ai == AI_INDEFINITE_OR_BREAK {
                        return Err(self.fail(ErrorCode::LabelNotFound));
                    }
                }
            }
            let matched = match_label(self)?;
            if matched {
                return self.get_next();
            }
            skip_value(self)?;
        }
    }
}

/// A common numeric representation for `GetNumberConvertPrecisely`-style conversion:
/// integers and whole-valued floats collapse to one of these without precision loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberView {
    /// Fits in `i64` and is negative (or was produced from a negative item).
    Int(i64),
    /// Fits in `u64`.
    UInt(u64),
    /// A major-type-1 item whose wire value is `u64::MAX`, representing `-(2^64)`,
    /// which has no `i64`/`u64` representation.
    NegBig65,
    /// A half/single/double-precision float.
    Double(f64),
}

/// Convert a decoded item to a [`NumberView`], failing with `UnexpectedType` for
/// non-numeric items.
pub fn decode_number(item: &Item<'_>) -> Result<NumberView, ErrorCode> {
    match *item {
        Item::UInt(v) => Ok(NumberView::UInt(v)),
        Item::NInt(v) => {
            if v == u64::MAX {
                Ok(NumberView::NegBig65)
            } else {
                match i64::try_from(v) {
                    Ok(n) => Ok(NumberView::Int(-1 - n)),
                    Err(_) => Ok(NumberView::NegBig65),
                }
            }
        }
        Item::Half(f) | Item::Single(f) => Ok(NumberView::Double(f64::from(f))),
        Item::Double(d) => Ok(NumberView::Double(d)),
        _ => Err(ErrorCode::UnexpectedType),
    }
}

/// Skip one well-formed item (and, recursively, everything nested inside it) without
/// materializing it, advancing `dec`'s cursor past it. Used by map-label search to
/// walk past values whose label didn't match.
pub fn skip_value(dec: &mut Decoder<'_>) -> Result<(), QcborError> {
    let tagged = dec.get_next()?;
    match tagged.item {
        Item::ArrayStart(n) => {
            for _ in 0..n {
                skip_value(dec)?;
            }
        }
        Item::MapStart(n) => {
            for _ in 0..n {
                skip_value(dec)?;
                skip_value(dec)?;
            }
        }
        Item::IndefArrayStart | Item::IndefMapStart => loop {
            let next = dec.get_next()?;
            if matches!(next.item, Item::Break) {
                break;
            }
            skip_nested(dec, &next.item)?;
        },
        _ => {}
    }
    Ok(())
}

fn skip_nested(dec: &mut Decoder<'_>, item: &Item<'_>) -> Result<(), QcborError> {
    match *item {
        Item::ArrayStart(n) => {
            for _ in 0..n {
                skip_value(dec)?;
            }
            Ok(())
        }
        Item::MapStart(n) => {
            for _ in 0..n {
                skip_value(dec)?;
                skip_value(dec)?;
            }
            Ok(())
        }
        Item::IndefArrayStart | Item::IndefMapStart => loop {
            let next = dec.get_next()?;
            if matches!(next.item, Item::Break) {
                return Ok(());
            }
            skip_nested(dec, &next.item)?;
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_integer_array() {
        let bytes = [0x86, 0x01, 0x20, 0x18, 0x18, 0x18, 0x64, 0x19, 0x03, 0xE8, 0x39, 0x03, 0xE7];
        let mut dec = Decoder::new(&bytes);
        let arr = dec.get_next().unwrap();
        dec.enter_array(&arr.item).unwrap();
        let mut got = alloc_array();
        for slot in got.iter_mut() {
            let item = dec.get_next().unwrap();
            *slot = Some(decode_number(&item.item).unwrap());
        }
        dec.exit_array().unwrap();
        dec.finish().unwrap();
        assert_eq!(got[0], Some(NumberView::UInt(1)));
        assert_eq!(got[1], Some(NumberView::Int(-1)));
        assert_eq!(got[2], Some(NumberView::UInt(24)));
        assert_eq!(got[3], Some(NumberView::UInt(100)));
        assert_eq!(got[4], Some(NumberView::UInt(1000)));
        assert_eq!(got[5], Some(NumberView::Int(-1000)));
    }

    fn alloc_array() -> [Option<NumberView>; 6] {
        [None; 6]
    }

    #[test]
    fn decode_simple_map() {
        let bytes = [0xA2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x82, 0x02, 0x03];
        let mut dec = Decoder::new(&bytes);
        let m = dec.get_next().unwrap();
        dec.enter_map(&m.item).unwrap();

        let k1 = dec.get_next().unwrap();
        assert!(matches!(k1.item, Item::Text("a", Source::Input)));
        let v1 = dec.get_next().unwrap();
        assert!(matches!(v1.item, Item::UInt(1)));

        let k2 = dec.get_next().unwrap();
        assert!(matches!(k2.item, Item::Text("b", Source::Input)));
        let arr = dec.get_next().unwrap();
        dec.enter_array(&arr.item).unwrap();
        assert!(matches!(dec.get_next().unwrap().item, Item::UInt(2)));
        assert!(matches!(dec.get_next().unwrap().item, Item::UInt(3)));
        dec.exit_array().unwrap();

        dec.exit_map().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn indefinite_string_needs_pool() {
        // 0x7f = indefinite text string, "a" chunk, "b" chunk, break.
        let bytes = [0x7f, 0x61, b'a', 0x61, b'b', 0xff];
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            dec.get_next().unwrap_err().code,
            ErrorCode::NoStringAllocator
        );
    }

    #[test]
    fn indefinite_string_reassembles_with_pool() {
        let bytes = [0x7f, 0x61, b'a', 0x61, b'b', 0xff];
        let mut pool_storage = [0u8; 8];
        let mut dec = Decoder::new(&bytes);
        dec.set_mem_pool(MemPool::new(&mut pool_storage));
        let item = dec.get_next().unwrap();
        match item.item {
            Item::Text(s, Source::Pool) => assert_eq!(s, "ab"),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn map_search_by_text_label_skips_unrelated_entries() {
        // {"x": 1, "a": 2, "b": [3, 4]}
        let bytes = [
            0xA3, 0x61, b'x', 0x01, 0x61, b'a', 0x02, 0x61, b'b', 0x82, 0x03, 0x04,
        ];
        let mut dec = Decoder::new(&bytes);
        let m = dec.get_next().unwrap();
        dec.enter_map(&m.item).unwrap();
        let found = dec.get_item_in_map_sz("b").unwrap();
        assert!(matches!(found.item, Item::ArrayStart(2)));
        dec.enter_array(&found.item).unwrap();
        assert!(matches!(dec.get_next().unwrap().item, Item::UInt(3)));
        assert!(matches!(dec.get_next().unwrap().item, Item::UInt(4)));
        dec.exit_array().unwrap();
    }

    #[test]
    fn map_search_by_int_label_finds_negative_key() {
        // {1: 100, -1: 200}
        let bytes = [0xA2, 0x01, 0x18, 0x64, 0x20, 0x18, 0xC8];
        let mut dec = Decoder::new(&bytes);
        let m = dec.get_next().unwrap();
        dec.enter_map(&m.item).unwrap();
        let found = dec.get_item_in_map_n(-1).unwrap();
        assert!(matches!(found.item, Item::UInt(200)));
    }

    #[test]
    fn map_search_missing_label_fails() {
        let bytes = [0xA1, 0x61, b'a', 0x01];
        let mut dec = Decoder::new(&bytes);
        let m = dec.get_next().unwrap();
        dec.enter_map(&m.item).unwrap();
        assert_eq!(
            dec.get_item_in_map_sz("z").unwrap_err().code,
            ErrorCode::LabelNotFound
        );
    }

    #[test]
    fn checked_mode_rejects_non_minimal_ints() {
        // 0x18 0x01 is a non-minimal encoding of 1 (should be bare 0x01).
        let bytes = [0x18, 0x01];
        let mut dec = Decoder::new(&bytes);
        dec.set_checked(true);
        assert_eq!(
            dec.get_next().unwrap_err().code,
            ErrorCode::BadIntegerLength
        );
    }
}
