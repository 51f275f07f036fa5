//! Bounded, allocation-free output and input cursors ("Buffer Window").
//!
//! `OutBuf` and `InBuf` never allocate: they operate entirely on caller-supplied
//! storage. `OutBuf` supports appending at the cursor and inserting at an arbitrary
//! earlier offset (shifting the suffix), which is how the encoder back-patches
//! definite-length container heads once their final size is known.

use crate::error::{ErrorCode, QcborError};

/// Maximum offset this crate will ever produce or accept; encoded output above this
/// many bytes is rejected with `BufferTooLarge`.
pub const MAX_OFFSET: u64 = u32::MAX as u64;

/// A bounded output cursor over caller-supplied storage.
///
/// All mutating operations are "fire and forget": on overflow they set a sticky error
/// bit instead of returning early, so callers are not required to check every call —
/// the error surfaces once, at `finish`/`error()`.
pub struct OutBuf<'a> {
    storage: Option<&'a mut [u8]>,
    len: usize,
    error: Option<ErrorCode>,
}

impl<'a> OutBuf<'a> {
    /// Construct a cursor writing into `storage`.
    #[must_use]
    pub fn new(storage: &'a mut [u8]) -> Self {
        Self {
            storage: Some(storage),
            len: 0,
            error: None,
        }
    }

    /// Construct a cursor in "size calculation mode": no backing storage is written,
    /// but every operation still tallies the exact length it would have produced.
    #[must_use]
    pub const fn for_size_only() -> Self {
        Self {
            storage: None,
            len: 0,
            error: None,
        }
    }

    /// Bytes written (or tallied, in size-calculation mode) so far.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been written yet.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The sticky error, if any operation has overflowed.
    #[inline]
    #[must_use]
    pub const fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    #[inline]
    fn capacity(&self) -> usize {
        match &self.storage {
            Some(s) => s.len(),
            None => usize::MAX,
        }
    }

    #[inline]
    fn set_error(&mut self, code: ErrorCode) {
        if self.error.is_none() {
            self.error = Some(code);
        }
    }

    /// Append `bytes` at the current cursor, advancing it.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        let new_len = match self.len.checked_add(bytes.len()) {
            Some(n) => n,
            None => {
                self.set_error(ErrorCode::BufferTooLarge);
                return;
            }
        };
        if new_len as u64 > MAX_OFFSET {
            self.set_error(ErrorCode::BufferTooLarge);
            return;
        }
        if new_len > self.capacity() {
            self.set_error(ErrorCode::BufferTooSmall);
            return;
        }
        if let Some(storage) = &mut self.storage {
            storage[self.len..new_len].copy_from_slice(bytes);
        }
        self.len = new_len;
    }

    /// Append a single byte.
    #[inline]
    pub fn append_u8(&mut self, byte: u8) {
        self.append(&[byte]);
    }

    /// Insert `bytes` at `offset`, shifting any bytes from `offset..len()` to the right.
    ///
    /// `offset == len()` is a degenerate append and is always permitted.
    pub fn insert_at(&mut self, offset: usize, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if offset > self.len {
            // Not reachable by well-behaved callers (the encoder only inserts at
            // offsets it itself recorded), but latch rather than panic.
            self.set_error(ErrorCode::BufferTooSmall);
            return;
        }
        let new_len = match self.len.checked_add(bytes.len()) {
            Some(n) => n,
            None => {
                self.set_error(ErrorCode::BufferTooLarge);
                return;
            }
        };
        if new_len as u64 > MAX_OFFSET {
            self.set_error(ErrorCode::BufferTooLarge);
            return;
        }
        if new_len > self.capacity() {
            self.set_error(ErrorCode::BufferTooSmall);
            return;
        }
        if let Some(storage) = &mut self.storage {
            storage.copy_within(offset..self.len, offset + bytes.len());
            storage[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self.len = new_len;
    }

    /// Borrow the bytes written so far (empty in size-calculation mode).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Some(s) => &s[..self.len],
            None => &[],
        }
    }

    /// Mutably borrow the bytes written so far, for in-place rearrangement (map
    /// sorting). `None` in size-calculation mode, where there is no backing storage.
    pub fn storage_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            Some(s) => Some(&mut s[..self.len]),
            None => None,
        }
    }

    /// `true` if this cursor only tallies length and never writes through storage.
    #[inline]
    #[must_use]
    pub const fn is_tally_only(&self) -> bool {
        self.storage.is_none()
    }

    /// Discard everything written at or after `new_len`, rewinding the cursor. Used to
    /// abandon a byte-string wrap.
    pub fn truncate(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.len);
        self.len = new_len;
    }

    /// Verify no error occurred and return the final length, or the latched error.
    pub fn finish(&self) -> Result<usize, QcborError> {
        match self.error {
            Some(code) => Err(QcborError::new(code, self.len)),
            None => Ok(self.len),
        }
    }
}

/// A bounded input cursor over a borrowed byte slice.
#[derive(Debug, Clone, Copy)]
pub struct InBuf<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> InBuf<'a> {
    /// Construct a cursor over `data`, starting at offset 0.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The full input slice (not windowed by the cursor).
    #[inline]
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current cursor offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Reposition the cursor. Used when entering/exiting byte-string-wrapped CBOR.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Read one byte at the cursor and advance.
    pub fn read_u8(&mut self) -> Result<u8, QcborError> {
        let off = self.pos;
        let b = *self
            .data
            .get(off)
            .ok_or_else(|| QcborError::new(ErrorCode::HitEnd, off))?;
        self.pos += 1;
        Ok(b)
    }

    /// Read exactly `n` bytes at the cursor and advance, returning a borrow into the
    /// original input.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], QcborError> {
        let off = self.pos;
        let end = off
            .checked_add(n)
            .ok_or_else(|| QcborError::new(ErrorCode::HitEnd, off))?;
        if end > self.data.len() {
            return Err(QcborError::new(ErrorCode::HitEnd, off));
        }
        let s = &self.data[off..end];
        self.pos = end;
        Ok(s)
    }

    /// Read `n` bytes at an arbitrary offset without moving the cursor.
    pub fn read_at(&self, offset: usize, n: usize) -> Result<&'a [u8], QcborError> {
        let end = offset
            .checked_add(n)
            .ok_or_else(|| QcborError::new(ErrorCode::HitEnd, offset))?;
        if end > self.data.len() {
            return Err(QcborError::new(ErrorCode::HitEnd, offset));
        }
        Ok(&self.data[offset..end])
    }

    /// Returns `true` if the cursor is at the end of the input.
    #[inline]
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes remaining after the cursor.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_tracks_length() {
        let mut storage = [0u8; 8];
        let mut out = OutBuf::new(&mut storage);
        out.append(&[1, 2, 3]);
        out.append(&[4]);
        assert_eq!(out.len(), 4);
        assert_eq!(out.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn overflow_latches_and_is_sticky() {
        let mut storage = [0u8; 2];
        let mut out = OutBuf::new(&mut storage);
        out.append(&[1, 2, 3]);
        assert_eq!(out.error(), Some(ErrorCode::BufferTooSmall));
        out.append(&[4]);
        assert_eq!(out.error(), Some(ErrorCode::BufferTooSmall));
        assert!(out.finish().is_err());
    }

    #[test]
    fn insert_at_shifts_suffix() {
        let mut storage = [0u8; 8];
        let mut out = OutBuf::new(&mut storage);
        out.append(&[2, 3]);
        out.insert_at(0, &[1]);
        assert_eq!(out.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn insert_at_end_is_append() {
        let mut storage = [0u8; 8];
        let mut out = OutBuf::new(&mut storage);
        out.append(&[1, 2]);
        out.insert_at(2, &[3]);
        assert_eq!(out.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn size_only_mode_tallies_without_storage() {
        let mut out = OutBuf::for_size_only();
        out.append(&[1, 2, 3]);
        out.insert_at(0, &[9]);
        assert_eq!(out.len(), 4);
        assert!(out.as_bytes().is_empty());
    }

    #[test]
    fn in_buf_reads_and_seeks() {
        let data = [1, 2, 3, 4, 5];
        let mut inp = InBuf::new(&data);
        assert_eq!(inp.read_u8().unwrap(), 1);
        assert_eq!(inp.read_exact(2).unwrap(), &[2, 3]);
        assert_eq!(inp.read_at(0, 2).unwrap(), &[1, 2]);
        inp.seek(4);
        assert_eq!(inp.read_u8().unwrap(), 5);
        assert!(inp.at_end());
    }
}
