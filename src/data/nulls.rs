//! Null bitmap for blocks.

use std::mem::size_of;

/// Growable bitmap with one bit per position; a set bit marks a null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullMask {
    words: Vec<u64>,
    len: usize,
}

impl NullMask {
    /// Creates an empty mask sized for `positions` positions.
    #[must_use]
    pub fn with_capacity(positions: usize) -> Self {
        Self {
            words: Vec::with_capacity(positions.div_ceil(64)),
            len: 0,
        }
    }

    /// Appends one position.
    pub fn push(&mut self, is_null: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }
        if is_null {
            if let Some(word) = self.words.last_mut() {
                *word |= 1 << bit;
            }
        }
        self.len += 1;
    }

    /// Returns whether `position` is null.
    #[inline]
    #[must_use]
    pub fn is_null(&self, position: usize) -> bool {
        debug_assert!(position < self.len);
        self.words[position / 64] & (1 << (position % 64)) != 0
    }

    /// Number of positions tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no positions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of null positions.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Heap bytes used.
    #[must_use]
    pub fn ram_bytes(&self) -> usize {
        self.words.len() * size_of::<u64>()
    }
}
