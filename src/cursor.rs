use std::{num::NonZeroUsize, ops::Range};

/// Pages through the eligible set `stride` rows at a time, wrapping to the
/// start once the end is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCursor {
    offset: usize,
    stride: NonZeroUsize,
    total: usize,
}

impl BatchCursor {
    pub fn new(stride: NonZeroUsize, total: usize) -> Self {
        Self {
            offset: 0,
            stride,
            total,
        }
    }

    /// Resume at a carried offset; one that no longer fits the set starts over.
    pub fn restore(offset: usize, stride: NonZeroUsize, total: usize) -> Self {
        Self {
            offset: if offset < total { offset } else { 0 },
            stride,
            total,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn stride(&self) -> NonZeroUsize {
        self.stride
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn next_slice(&self) -> Range<usize> {
        let end = self.offset.saturating_add(self.stride.get()).min(self.total);
        self.offset.min(end)..end
    }

    /// Returns true when the cursor wrapped back to the start.
    pub fn advance(&mut self) -> bool {
        let next = self.offset.saturating_add(self.stride.get());
        if next >= self.total {
            self.offset = 0;
            true
        } else {
            self.offset = next;
            false
        }
    }
}
