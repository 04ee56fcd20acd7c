//! Overlay layer selection
//!
//! Only one overlay is rendered at a time. The cursor cycles through the
//! current overlay list on each advance event, wrapping with plain modulo.

use tracing::debug;

/// Cursor over the overlay list. Invariant: `cursor < len`, or `len == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerSelector {
    cursor: usize,
    len: usize,
}

impl LayerSelector {
    pub fn new(len: usize) -> Self {
        Self { cursor: 0, len }
    }

    /// Selected overlay index, `None` for an empty list
    pub fn current(&self) -> Option<usize> {
        (self.len > 0).then_some(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Step to the next overlay; no-op for an empty list
    pub fn advance(&mut self) -> Option<usize> {
        if self.len > 0 {
            self.cursor = (self.cursor + 1) % self.len;
            debug!(cursor = self.cursor, len = self.len, "Overlay selection advanced");
        }
        self.current()
    }

    /// The overlay list was replaced with one of `len` entries.
    ///
    /// The cursor keeps its position while still valid and is clamped to the
    /// last entry when the list shrank past it. An empty list parks it at 0.
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        self.cursor = match len {
            0 => 0,
            _ => self.cursor.min(len - 1),
        };
    }

    /// Back to the first overlay (full snapshot)
    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps() {
        let mut selector = LayerSelector::new(3);
        assert_eq!(selector.current(), Some(0));
        let seq: Vec<_> = (0..4).filter_map(|_| selector.advance()).collect();
        assert_eq!(seq, [1, 2, 0, 1]);
    }

    #[test]
    fn test_single_entry_stays() {
        let mut selector = LayerSelector::new(1);
        assert_eq!(selector.advance(), Some(0));
        assert_eq!(selector.advance(), Some(0));
    }

    #[test]
    fn test_empty_is_noop() {
        let mut selector = LayerSelector::new(0);
        assert_eq!(selector.advance(), None);
        assert_eq!(selector.current(), None);
        assert!(selector.is_empty());
    }

    #[test]
    fn test_resize_clamps() {
        let mut selector = LayerSelector::new(5);
        selector.advance();
        selector.advance();
        selector.advance();
        assert_eq!(selector.current(), Some(3));

        selector.resize(6);
        assert_eq!(selector.current(), Some(3));

        selector.resize(2);
        assert_eq!(selector.current(), Some(1));

        selector.resize(0);
        assert_eq!(selector.current(), None);

        selector.resize(4);
        assert_eq!(selector.current(), Some(0));
    }

    #[test]
    fn test_reset() {
        let mut selector = LayerSelector::new(3);
        selector.advance();
        selector.reset(2);
        assert_eq!(selector.current(), Some(0));
        assert_eq!(selector.len(), 2);
    }
}
