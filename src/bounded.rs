//! Fixed-capacity lists used where tables may carry more entries than are retained.
//!
//! Pushing past capacity is not an error: the entry is counted but not stored, so callers keep
//! parsing (and keep their read position aligned) after the list is full.

use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// Program-level descriptors retained per PMT.
pub const MAX_DESCRIPTORS: usize = 8;
/// Elementary stream entries retained per PMT.
pub const MAX_STREAMS: usize = 32;
/// Playspeeds retained from a `DLNA.ORG_PS` field.
pub const MAX_PLAYSPEEDS: usize = 64;

/// A list holding at most `N` items inline; never allocates.
pub struct BoundedList<T, const N: usize> {
    items: SmallVec<[T; N]>,
    seen: usize,
}

impl<T, const N: usize> BoundedList<T, N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> BoundedList<T, N> {
        BoundedList {
            items: SmallVec::new(),
            seen: 0,
        }
    }

    /// Stores `item` if there is room.  Returns `false` if it was discarded.
    pub fn push(&mut self, item: T) -> bool {
        self.seen += 1;
        if self.items.len() < N {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    /// The number of items offered to `push()`, including discarded ones.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// The number of items offered but not stored.
    pub fn truncated(&self) -> usize {
        self.seen - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen = 0;
    }
}

impl<T, const N: usize> Default for BoundedList<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for BoundedList<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items[..]
    }
}

impl<T: Clone, const N: usize> Clone for BoundedList<T, N> {
    fn clone(&self) -> Self {
        BoundedList {
            items: self.items.clone(),
            seen: self.seen,
        }
    }
}

impl<T: PartialEq, const N: usize> PartialEq for BoundedList<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items && self.seen == other.seen
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for BoundedList<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()?;
        if self.truncated() > 0 {
            write!(f, " (+{} dropped)", self.truncated())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncates_silently() {
        let mut l: BoundedList<u8, 2> = BoundedList::new();
        assert!(l.push(1));
        assert!(l.push(2));
        assert!(!l.push(3));
        assert_eq!(&l[..], &[1, 2]);
        assert_eq!(l.seen(), 3);
        assert_eq!(l.truncated(), 1);
        l.clear();
        assert!(l.is_empty());
        assert_eq!(l.seen(), 0);
    }
}
