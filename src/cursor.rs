//! Bounded big-endian reading over a byte slice.
//!
//! Every read either succeeds completely or returns `None` (or a short count) without moving
//! past the end of the underlying data, so table parsers can abort cleanly when a structure
//! claims more bytes than the packet or section actually holds.

/// A monotonic read position over a borrowed slice.
#[derive(Debug)]
pub struct ByteCursor<'buf> {
    data: &'buf [u8],
    pos: usize,
}

impl<'buf> ByteCursor<'buf> {
    pub fn new(data: &'buf [u8]) -> ByteCursor<'buf> {
        ByteCursor { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_slice(2)?;
        Some(u16::from(bytes[0]) << 8 | u16::from(bytes[1]))
    }

    /// Reads a 24-bit big-endian value.
    pub fn read_u24(&mut self) -> Option<u32> {
        let bytes = self.read_slice(3)?;
        Some(u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2]))
    }

    /// Borrows the next `len` bytes, or returns `None` (consuming nothing) if fewer remain.
    pub fn read_slice(&mut self, len: usize) -> Option<&'buf [u8]> {
        if len > self.remaining() {
            return None;
        }
        let s = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(s)
    }

    /// Copies as many bytes as are available, up to `dest.len()`, returning the count copied.
    pub fn read_into(&mut self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.remaining());
        dest[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Skips up to `len` bytes, returning the number actually skipped.
    pub fn skip(&mut self, len: usize) -> usize {
        let n = len.min(self.remaining());
        self.pos += n;
        n
    }

    /// Consumes everything left, returning how many bytes that was.
    pub fn skip_to_end(&mut self) -> usize {
        let n = self.remaining();
        self.pos = self.data.len();
        n
    }

    /// Borrows everything not yet consumed, and consumes it.
    pub fn rest(&mut self) -> &'buf [u8] {
        let s = &self.data[self.pos..];
        self.pos = self.data.len();
        s
    }
}
