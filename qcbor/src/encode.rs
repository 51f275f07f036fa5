//! A streaming, allocation-free CBOR encoder writing into a caller-supplied buffer.
//!
//! Definite-length containers are encoded with the "insert-in-the-middle" strategy:
//! no placeholder bytes are reserved when a container opens. Instead the body is
//! written first and, at close time, the now-known head (major type + item count) is
//! spliced in at the container's start offset via `OutBuf::insert_at`, shifting the
//! body to make room. This avoids ever guessing a worst-case head width.

use crate::buf::OutBuf;
use crate::error::{ErrorCode, QcborError};
use crate::float::{f32_to_half_exact, f64_to_f32_exact};
use crate::head::{encode_head, encode_head_ai, major};
use crate::limits::DEFAULT_MAX_NESTING;

/// Encoder behavior flags, combined with bitwise or.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeFlags(u8);

impl EncodeFlags {
    /// No special behavior: preferred-width integers, but maps in caller-chosen order
    /// and indefinite lengths allowed.
    pub const NONE: Self = Self(0);
    /// Sort map entries into byte-lexicographic key order at `close_map`.
    pub const SORT: Self = Self(1 << 0);
    /// Reduce floats to the smallest exact width (half < single < double).
    pub const PREFERRED: Self = Self(1 << 1);
    /// Core Deterministic Encoding: `PREFERRED` + `SORT`, reject indefinite lengths.
    pub const CDE: Self = Self(Self::PREFERRED.0 | Self::SORT.0 | (1 << 2));
    /// Restrict type-7 simple values to the subset dCBOR allows (true/false/null).
    pub const ONLY_DCBOR_SIMPLE: Self = Self(1 << 3);
    /// dCBOR: `CDE` + `ONLY_DCBOR_SIMPLE` + collapse whole-valued floats to integers.
    pub const DCBOR: Self = Self(Self::CDE.0 | Self::ONLY_DCBOR_SIMPLE.0 | (1 << 4));

    const INDEF_FORBIDDEN: Self = Self(1 << 2);

    #[must_use]
    const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for EncodeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Array,
    Map,
    IndefArray,
    IndefMap,
    BstrWrap,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    start: usize,
    count: u32,
}

/// A streaming CBOR encoder over a caller-owned output buffer.
///
/// Every mutating method is infallible to call (errors latch internally, mirroring
/// `OutBuf`'s sticky-error discipline); call [`Encoder::finish`] once to learn whether
/// anything went wrong.
pub struct Encoder<'a> {
    out: OutBuf<'a>,
    flags: EncodeFlags,
    stack: [Option<Frame>; DEFAULT_MAX_NESTING],
    depth: usize,
    error: Option<QcborError>,
}

impl<'a> Encoder<'a> {
    /// Construct an encoder writing into `out`.
    #[must_use]
    pub fn new(out: &'a mut [u8]) -> Self {
        Self {
            out: OutBuf::new(out),
            flags: EncodeFlags::NONE,
            stack: [None; DEFAULT_MAX_NESTING],
            depth: 0,
            error: None,
        }
    }

    /// Construct an encoder that only tallies the size the encoding would need.
    #[must_use]
    pub fn for_size_only() -> Self {
        Self {
            out: OutBuf::for_size_only(),
            flags: EncodeFlags::NONE,
            stack: [None; DEFAULT_MAX_NESTING],
            depth: 0,
            error: None,
        }
    }

    /// Set the encoding mode. Must be called before any `add_*`/`open_*` call, though
    /// nothing currently enforces that beyond documentation.
    pub fn configure(&mut self, flags: EncodeFlags) {
        self.flags = flags;
    }

    #[inline]
    fn fail(&mut self, code: ErrorCode) {
        if self.error.is_none() {
            self.error = Some(QcborError::new(code, self.out.len()));
        }
    }

    #[inline]
    fn ok(&mut self) -> bool {
        self.error.is_none() && self.out.error().is_none()
    }

    #[inline]
    fn bump_count(&mut self) {
        if self.depth == 0 {
            return;
        }
        if let Some(frame) = &mut self.stack[self.depth - 1] {
            frame.count += 1;
        }
    }

    /// Current output length, i.e. the offset the next item will start at.
    #[must_use]
    pub fn tell(&self) -> usize {
        self.out.len()
    }

    /// Borrow the encoded bytes from offset `from` to the current cursor.
    ///
    /// # Panics
    ///
    /// Debug builds assert `from <= self.tell()`; this is a documented precondition,
    /// not a runtime-enforced invariant, matching the encoder's other "caller already
    /// knows the shape of what it wrote" operations.
    #[must_use]
    pub fn sub_string(&self, from: usize) -> &[u8] {
        debug_assert!(from <= self.tell());
        &self.out.as_bytes()[from..]
    }

    fn emit_head(&mut self, maj: u8, value: u64) {
        encode_head(&mut self.out, maj, value);
    }

    // --- scalars ---

    /// Add a signed integer.
    pub fn add_int64(&mut self, v: i64) {
        if !self.ok() {
            return;
        }
        if v >= 0 {
            self.add_uint64(v as u64);
        } else {
            let n = (-1i128 - i128::from(v)) as u64;
            self.emit_head(major::NEGATIVE, n);
            self.bump_count();
        }
    }

    /// Add an unsigned integer.
    pub fn add_uint64(&mut self, v: u64) {
        if !self.ok() {
            return;
        }
        self.emit_head(major::UNSIGNED, v);
        self.bump_count();
    }

    /// Add a negative integer given its magnitude-minus-one (the CBOR wire
    /// representation: encodes to `-(1 + v)`).
    pub fn add_negative_uint64(&mut self, v: u64) {
        if !self.ok() {
            return;
        }
        self.emit_head(major::NEGATIVE, v);
        self.bump_count();
    }

    /// Add a definite-length byte string in one call.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        if !self.ok() {
            return;
        }
        self.emit_head(major::BYTES, bytes.len() as u64);
        self.out.append(bytes);
        self.bump_count();
    }

    /// Add a definite-length UTF-8 text string in one call.
    pub fn add_text(&mut self, s: &str) {
        if !self.ok() {
            return;
        }
        self.emit_head(major::TEXT, s.len() as u64);
        self.out.append(s.as_bytes());
        self.bump_count();
    }

    fn should_reduce_float(&self) -> bool {
        self.flags.contains(EncodeFlags::PREFERRED)
    }

    fn dcbor_integer_reduce(&mut self, v: f64) -> bool {
        if self.flags.contains(EncodeFlags::DCBOR)
            && v.is_finite()
            && v.fract() == 0.0
            && v >= -(9_223_372_036_854_775_808.0_f64 + 1.0)
            && v < 18_446_744_073_709_551_616.0_f64
        {
            if v >= 0.0 {
                self.add_uint64(v as u64);
            } else {
                let mag_minus_one = (-v - 1.0) as u64;
                self.add_negative_uint64(mag_minus_one);
            }
            true
        } else {
            false
        }
    }

    /// Add a double, applying preferred-width float reduction if configured.
    pub fn add_double(&mut self, v: f64) {
        if !self.ok() {
            return;
        }
        if self.dcbor_integer_reduce(v) {
            return;
        }
        if self.should_reduce_float() {
            if let Some(f) = f64_to_f32_exact(v) {
                if let Some(h) = f32_to_half_exact(f) {
                    self.write_half(h);
                    return;
                }
                self.write_single(f);
                return;
            }
        }
        self.write_double(v);
    }

    /// Add a single-precision float, applying preferred-width reduction if configured.
    pub fn add_float(&mut self, v: f32) {
        if !self.ok() {
            return;
        }
        if self.dcbor_integer_reduce(f64::from(v)) {
            return;
        }
        if self.should_reduce_float() {
            if let Some(h) = f32_to_half_exact(v) {
                self.write_half(h);
                return;
            }
        }
        self.write_single(v);
    }

    /// Add a double with no preferred-width reduction, always emitting 9 bytes.
    pub fn add_double_no_preferred(&mut self, v: f64) {
        if !self.ok() {
            return;
        }
        self.write_double(v);
    }

    /// Add a single with no preferred-width reduction, always emitting 5 bytes.
    pub fn add_float_no_preferred(&mut self, v: f32) {
        if !self.ok() {
            return;
        }
        self.write_single(v);
    }

    fn write_half(&mut self, bits: u16) {
        encode_head_ai(&mut self.out, major::SIMPLE_FLOAT, 25);
        self.out.append(&bits.to_be_bytes());
        self.bump_count();
    }

    fn write_single(&mut self, v: f32) {
        encode_head_ai(&mut self.out, major::SIMPLE_FLOAT, 26);
        self.out.append(&v.to_bits().to_be_bytes());
        self.bump_count();
    }

    fn write_double(&mut self, v: f64) {
        encode_head_ai(&mut self.out, major::SIMPLE_FLOAT, 27);
        self.out.append(&v.to_bits().to_be_bytes());
        self.bump_count();
    }

    /// Add a type-7 simple value directly (caller asserts it is not reserved: 24..=31
    /// other than the well-known false/true/null/undefined encodings are rejected).
    /// Values 32..=255 use the two-byte form (`0xf8` followed by the value byte).
    pub fn add_simple(&mut self, value: u8) {
        if !self.ok() {
            return;
        }
        if (24..=31).contains(&value) {
            self.fail(ErrorCode::EncodeUnsupported);
            return;
        }
        if self.flags.contains(EncodeFlags::ONLY_DCBOR_SIMPLE) && !matches!(value, 20 | 21 | 22) {
            self.fail(ErrorCode::EncodeUnsupported);
            return;
        }
        if value < 32 {
            encode_head_ai(&mut self.out, major::SIMPLE_FLOAT, value);
        } else {
            encode_head_ai(&mut self.out, major::SIMPLE_FLOAT, 24);
            self.out.append_u8(value);
        }
        self.bump_count();
    }

    /// Add `true` or `false`.
    pub fn add_bool(&mut self, value: bool) {
        self.add_simple(if value { 21 } else { 20 });
    }

    /// Add CBOR `null`.
    pub fn add_null(&mut self) {
        self.add_simple(22);
    }

    /// Add CBOR `undefined`.
    pub fn add_undef(&mut self) {
        self.add_simple(23);
    }

    /// Add a tag number, which must be immediately followed by exactly one item (the
    /// tag's content).
    pub fn add_tag_number(&mut self, tag: u64) {
        if !self.ok() {
            return;
        }
        self.emit_head(major::TAG, tag);
        // Tag numbers don't themselves count as container items; the following
        // content item does, via its own add_*/open_* call.
    }

    // --- containers ---

    fn push_frame(&mut self, kind: FrameKind) {
        if self.depth >= DEFAULT_MAX_NESTING {
            self.fail(ErrorCode::ArrayNestingTooDeep);
            return;
        }
        self.stack[self.depth] = Some(Frame {
            kind,
            start: self.out.len(),
            count: 0,
        });
        self.depth += 1;
    }

    /// Open a definite-length array.
    pub fn open_array(&mut self) {
        if !self.ok() {
            return;
        }
        self.push_frame(FrameKind::Array);
    }

    /// Open a definite-length map (entries added as alternating label/value items).
    pub fn open_map(&mut self) {
        if !self.ok() {
            return;
        }
        self.push_frame(FrameKind::Map);
    }

    fn indefinite_forbidden(&self) -> bool {
        self.flags.contains(EncodeFlags::PREFERRED) || self.flags.contains(EncodeFlags::INDEF_FORBIDDEN)
    }

    /// Open an indefinite-length array. Rejected under `PREFERRED`/`CDE`/`DCBOR`,
    /// which require definite lengths.
    pub fn open_array_indef(&mut self) {
        if !self.ok() {
            return;
        }
        if self.indefinite_forbidden() {
            self.fail(ErrorCode::EncodeUnsupported);
            return;
        }
        encode_head_ai(&mut self.out, major::ARRAY, 31);
        self.push_frame(FrameKind::IndefArray);
    }

    /// Open an indefinite-length map. Rejected under `PREFERRED`/`CDE`/`DCBOR`, which
    /// require definite lengths.
    pub fn open_map_indef(&mut self) {
        if !self.ok() {
            return;
        }
        if self.indefinite_forbidden() {
            self.fail(ErrorCode::EncodeUnsupported);
            return;
        }
        encode_head_ai(&mut self.out, major::MAP, 31);
        self.push_frame(FrameKind::IndefMap);
    }

    fn pop_frame(&mut self, expect_array: bool) -> Option<Frame> {
        if self.depth == 0 {
            self.fail(ErrorCode::TooManyCloses);
            return None;
        }
        let frame = self.stack[self.depth - 1].take().unwrap();
        let is_array = matches!(frame.kind, FrameKind::Array | FrameKind::IndefArray);
        if is_array != expect_array {
            self.fail(ErrorCode::CloseMismatch);
            return None;
        }
        self.depth -= 1;
        // Closing this frame counts as one item in its parent.
        if self.depth > 0 {
            if let Some(parent) = &mut self.stack[self.depth - 1] {
                parent.count += 1;
            }
        }
        Some(frame)
    }

    /// Close a definite-length array, splicing in its head at `start`.
    pub fn close_array(&mut self) {
        if !self.ok() {
            return;
        }
        if let Some(frame) = self.pop_frame(true) {
            self.splice_definite_head(major::ARRAY, frame.start, u64::from(frame.count));
        }
    }

    /// Close a definite-length map. If `EncodeFlags::SORT` is set, entries are sorted
    /// into byte-lexicographic key order first.
    pub fn close_map(&mut self) {
        if !self.ok() {
            return;
        }
        if let Some(frame) = self.pop_frame(false) {
            if frame.count % 2 != 0 {
                self.fail(ErrorCode::ArrayOrMapUnconsumed);
                return;
            }
            if self.flags.contains(EncodeFlags::SORT) {
                self.sort_map_body(frame.start);
                if self.error.is_some() {
                    return;
                }
            }
            self.splice_definite_head(major::MAP, frame.start, u64::from(frame.count / 2));
        }
    }

    /// Close an indefinite-length array, writing the `0xff` break.
    pub fn close_array_indef(&mut self) {
        if !self.ok() {
            return;
        }
        if self.pop_frame(true).is_some() {
            self.out.append_u8(0xff);
        }
    }

    /// Close an indefinite-length map, writing the `0xff` break.
    pub fn close_map_indef(&mut self) {
        if !self.ok() {
            return;
        }
        if let Some(frame) = self.pop_frame(false) {
            if frame.count % 2 != 0 {
                self.fail(ErrorCode::ArrayOrMapUnconsumed);
                return;
            }
            self.out.append_u8(0xff);
        }
    }

    fn splice_definite_head(&mut self, maj: u8, start: usize, count: u64) {
        if count > crate::limits::MAX_ITEMS_PER_CONTAINER {
            self.fail(ErrorCode::ArrayTooLong);
            return;
        }
        let mut head_buf = [0u8; 9];
        let mut head_out = OutBuf::new(&mut head_buf);
        encode_head(&mut head_out, maj, count);
        let head_len = match head_out.finish() {
            Ok(n) => n,
            Err(e) => {
                self.fail(e.code);
                return;
            }
        };
        self.out.insert_at(start, &head_buf[..head_len]);
        if let Some(code) = self.out.error() {
            self.fail(code);
        }
    }

    /// Maximum map entries a single `close_map` with `SORT` set can rearrange.
    const MAX_SORT_ITEMS: usize = 64;

    /// Scan `[start, end)` as a flat sequence of CBOR items (a map body, read as
    /// label/value pairs laid end to end) and record each item's `(start, end)` span.
    fn scan_item_spans(
        &self,
        start: usize,
        end: usize,
    ) -> Result<([(usize, usize); Self::MAX_SORT_ITEMS], usize), ErrorCode> {
        let bytes = self.out.as_bytes();
        let mut spans = [(0usize, 0usize); Self::MAX_SORT_ITEMS];
        let mut n = 0usize;
        let mut pos = start;
        while pos < end {
            if n >= spans.len() {
                return Err(ErrorCode::ArrayTooLong);
            }
            let item_end = skip_one_item(bytes, pos)?;
            spans[n] = (pos, item_end);
            n += 1;
            pos = item_end;
        }
        Ok((spans, n))
    }

    /// Bubble-sort the map body starting at byte offset `start` into
    /// byte-lexicographic order of each pair's encoded label. Detects duplicate
    /// labels along the way. A no-op in size-calculation mode (sorting never changes
    /// the total encoded length).
    fn sort_map_body(&mut self, start: usize) {
        if self.out.is_tally_only() {
            return;
        }
        loop {
            let end = self.out.len();
            let (item_spans, item_count) = match self.scan_item_spans(start, end) {
                Ok(v) => v,
                Err(code) => {
                    self.fail(code);
                    return;
                }
            };
            // Pair up consecutive (label, value) items into entry spans.
            let pairs = item_count / 2;
            let mut swapped = false;
            for i in 0..pairs.saturating_sub(1) {
                let (a_label_start, a_label_end) = item_spans[2 * i];
                let (_, a_val_end) = item_spans[2 * i + 1];
                let (b_label_start, b_label_end) = item_spans[2 * i + 2];
                let (_, b_val_end) = item_spans[2 * i + 3];

                let bytes = self.out.as_bytes();
                let a_label = &bytes[a_label_start..a_label_end];
                let b_label = &bytes[b_label_start..b_label_end];
                match a_label.cmp(b_label) {
                    core::cmp::Ordering::Greater => {
                        if let Some(storage) = self.out.storage_mut() {
                            rotate_swap_adjacent(storage, a_label_start, a_val_end, b_val_end);
                        }
                        swapped = true;
                        break;
                    }
                    core::cmp::Ordering::Equal => {
                        self.fail(ErrorCode::DuplicateLabel);
                        return;
                    }
                    core::cmp::Ordering::Less => {}
                }
            }
            if !swapped {
                break;
            }
        }
    }

    // --- byte-string wrapping ---

    /// Open a byte-string-wrapped region: subsequent items are encoded as normal, and
    /// on close the whole region is wrapped in a definite-length byte string header.
    pub fn bstr_wrap(&mut self) {
        if !self.ok() {
            return;
        }
        self.push_frame(FrameKind::BstrWrap);
    }

    /// Close a byte-string wrap, splicing in the byte-string head.
    ///
    /// `include_head` mirrors the C API's `UsefulBufC`-returning variant: when `true`
    /// the returned slice (via `sub_string`) includes the byte-string head; this
    /// implementation always writes the head to the buffer either way and only this
    /// flag's documented meaning differs for callers that want the bare content span.
    pub fn close_bstr_wrap2(&mut self, include_head: bool) -> usize {
        if !self.ok() {
            return self.out.len();
        }
        if self.depth == 0 || !matches!(self.stack[self.depth - 1].map(|f| f.kind), Some(FrameKind::BstrWrap)) {
            self.fail(ErrorCode::CloseMismatch);
            return self.out.len();
        }
        let frame = self.stack[self.depth - 1].take().unwrap();
        self.depth -= 1;
        if self.depth > 0 {
            if let Some(parent) = &mut self.stack[self.depth - 1] {
                parent.count += 1;
            }
        }
        let content_len = self.out.len() - frame.start;
        let mut head_buf = [0u8; 9];
        let mut head_out = OutBuf::new(&mut head_buf);
        encode_head(&mut head_out, major::BYTES, content_len as u64);
        let head_len = match head_out.finish() {
            Ok(n) => n,
            Err(e) => {
                self.fail(e.code);
                return self.out.len();
            }
        };
        self.out.insert_at(frame.start, &head_buf[..head_len]);
        if let Some(code) = self.out.error() {
            self.fail(code);
            return self.out.len();
        }
        if include_head {
            frame.start
        } else {
            frame.start + head_len
        }
    }

    /// Abandon the innermost byte-string wrap, discarding everything written inside
    /// it (the cursor rewinds to the wrap's start).
    pub fn cancel_bstr_wrap(&mut self) {
        if self.depth == 0 || !matches!(self.stack[self.depth - 1].map(|f| f.kind), Some(FrameKind::BstrWrap)) {
            self.fail(ErrorCode::CloseMismatch);
            return;
        }
        let frame = self.stack[self.depth - 1].take().unwrap();
        self.depth -= 1;
        self.out.truncate(frame.start);
    }

    /// Append already-encoded, well-formed CBOR bytes verbatim, without validating
    /// them.
    pub fn add_encoded(&mut self, bytes: &[u8]) {
        if !self.ok() {
            return;
        }
        self.out.append(bytes);
        self.bump_count();
    }

    // --- finish ---

    /// Finish encoding, returning the final length or the first latched error.
    pub fn finish(&self) -> Result<usize, QcborError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.depth != 0 {
            return Err(QcborError::new(ErrorCode::ArrayOrMapStillOpen, self.out.len()));
        }
        self.out.finish()
    }

    /// Finish encoding in size-calculation mode, returning only the size it would have
    /// used.
    pub fn finish_get_size(&self) -> Result<usize, QcborError> {
        self.finish()
    }

    /// Borrow the encoded output (valid after a successful [`Encoder::finish`]).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.out.as_bytes()
    }
}

/// Swap two adjacent byte ranges `[a_start, a_end)` and `[a_end, b_end)` in place
/// using the three-reversal rotation trick, so map-entry reordering needs no
/// temporary allocation regardless of how long the two entries are.
fn rotate_swap_adjacent(storage: &mut [u8], a_start: usize, a_end: usize, b_end: usize) {
    storage[a_start..a_end].reverse();
    storage[a_end..b_end].reverse();
    storage[a_start..b_end].reverse();
}

/// Skip one well-formed CBOR item starting at `body[pos]`, returning the offset just
/// past it. Used by map sorting to locate label/value span boundaries without a
/// separate parser dependency.
fn skip_one_item(body: &[u8], pos: usize) -> Result<usize, ErrorCode> {
    use crate::buf::InBuf;
    use crate::head::decode_head;

    let mut inp = InBuf::new(body);
    inp.seek(pos);
    let head = decode_head(&mut inp).map_err(|e| e.code)?;
    match head.major {
        major::UNSIGNED | major::NEGATIVE => {
            let _ = crate::head::read_argument(&mut inp, head.ai, head.offset).map_err(|e| e.code)?;
            Ok(inp.position())
        }
        major::BYTES | major::TEXT => {
            let len = crate::head::read_argument(&mut inp, head.ai, head.offset).map_err(|e| e.code)?;
            inp.read_exact(len as usize).map_err(|e| e.code)?;
            Ok(inp.position())
        }
        major::ARRAY => {
            let n = crate::head::read_argument(&mut inp, head.ai, head.offset).map_err(|e| e.code)?;
            let mut p = inp.position();
            for _ in 0..n {
                p = skip_one_item(body, p)?;
            }
            Ok(p)
        }
        major::MAP => {
            let n = crate::head::read_argument(&mut inp, head.ai, head.offset).map_err(|e| e.code)?;
            let mut p = inp.position();
            for _ in 0..n * 2 {
                p = skip_one_item(body, p)?;
            }
            Ok(p)
        }
        major::TAG => {
            let _ = crate::head::read_argument(&mut inp, head.ai, head.offset).map_err(|e| e.code)?;
            skip_one_item(body, inp.position())
        }
        major::SIMPLE_FLOAT => match head.ai {
            20..=23 => Ok(inp.position()),
            25 => {
                inp.read_exact(2).map_err(|e| e.code)?;
                Ok(inp.position())
            }
            26 => {
                inp.read_exact(4).map_err(|e| e.code)?;
                Ok(inp.position())
            }
            27 => {
                inp.read_exact(8).map_err(|e| e.code)?;
                Ok(inp.position())
            }
            0..=19 | 24 => {
                inp.read_exact(usize::from(head.ai == 24)).map_err(|e| e.code)?;
                Ok(inp.position())
            }
            _ => Err(ErrorCode::BadBreak),
        },
        _ => Err(ErrorCode::UnexpectedType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_array_matches_expected_wire_form() {
        let mut storage = [0u8; 32];
        let mut enc = Encoder::new(&mut storage);
        enc.open_array();
        enc.add_int64(1);
        enc.add_int64(-1);
        enc.add_int64(24);
        enc.add_int64(100);
        enc.add_int64(1000);
        enc.add_int64(-1000);
        enc.close_array();
        let len = enc.finish().unwrap();
        assert_eq!(
            &enc.as_bytes()[..len],
            &[0x86, 0x01, 0x20, 0x18, 0x18, 0x18, 0x64, 0x19, 0x03, 0xE8, 0x39, 0x03, 0xE7]
        );
    }

    #[test]
    fn simple_text_map() {
        let mut storage = [0u8; 32];
        let mut enc = Encoder::new(&mut storage);
        enc.open_map();
        enc.add_text("a");
        enc.add_int64(1);
        enc.add_text("b");
        enc.open_array();
        enc.add_int64(2);
        enc.add_int64(3);
        enc.close_array();
        enc.close_map();
        let len = enc.finish().unwrap();
        assert_eq!(
            &enc.as_bytes()[..len],
            &[0xA2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x82, 0x02, 0x03]
        );
    }

    #[test]
    fn preferred_half_float() {
        let mut storage = [0u8; 16];
        let mut enc = Encoder::new(&mut storage);
        enc.configure(EncodeFlags::PREFERRED);
        enc.add_double(1.0);
        let len = enc.finish().unwrap();
        assert_eq!(&enc.as_bytes()[..len], &[0xF9, 0x3C, 0x00]);
    }

    #[test]
    fn close_mismatch_is_latched() {
        let mut storage = [0u8; 16];
        let mut enc = Encoder::new(&mut storage);
        enc.open_array();
        enc.close_map();
        assert_eq!(enc.finish().unwrap_err().code, ErrorCode::CloseMismatch);
    }

    #[test]
    fn unclosed_container_fails_finish() {
        let mut storage = [0u8; 16];
        let mut enc = Encoder::new(&mut storage);
        enc.open_array();
        enc.add_int64(1);
        assert_eq!(
            enc.finish().unwrap_err().code,
            ErrorCode::ArrayOrMapStillOpen
        );
    }

    #[test]
    fn map_sort_orders_by_encoded_label() {
        let mut storage = [0u8; 32];
        let mut enc = Encoder::new(&mut storage);
        enc.configure(EncodeFlags::SORT);
        enc.open_map();
        enc.add_text("b");
        enc.add_int64(2);
        enc.add_text("a");
        enc.add_int64(1);
        enc.close_map();
        let len = enc.finish().unwrap();
        assert_eq!(
            &enc.as_bytes()[..len],
            &[0xA2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x02]
        );
    }

    #[test]
    fn bstr_wrap_produces_nested_byte_string() {
        let mut storage = [0u8; 16];
        let mut enc = Encoder::new(&mut storage);
        enc.bstr_wrap();
        enc.add_int64(7);
        enc.close_bstr_wrap2(true);
        let len = enc.finish().unwrap();
        assert_eq!(&enc.as_bytes()[..len], &[0x41, 0x07]);
    }
}
