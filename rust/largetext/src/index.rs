use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use crate::{ranges::CharRange, window::Window};

/// Append-only interval index from character offset to [`Window`].
///
/// Populated by the decoder engine in increasing character order; read
/// concurrently by any number of threads. A window becomes visible to readers
/// atomically.
#[derive(Default)]
pub struct RangeIndex {
    windows: RwLock<Vec<Window>>,
}

impl RangeIndex {
    pub fn new() -> RangeIndex {
        Default::default()
    }

    /// Appends a window following the last one.
    ///
    /// Windows that produced no characters carry nothing to look up and are not
    /// stored.
    pub(crate) fn push(&self, window: Window) {
        if window.char_range().is_empty() {
            return;
        }
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(windows.last().is_none_or(|last| {
            last.char_range().is_appendable(&window.char_range())
                && last.byte_range().end() <= window.byte_range().start()
        }));
        windows.push(window);
    }

    /// Returns the window whose character range contains `offset`, or `None` if
    /// `offset` has not been decoded yet.
    pub fn lookup(&self, offset: usize) -> Option<Window> {
        let windows = self.read();
        let pos = windows.partition_point(|w| w.char_range().end() <= offset);
        windows
            .get(pos)
            .filter(|w| w.char_range().contains(offset))
            .copied()
    }

    /// Returns, in order, the windows whose character ranges intersect `range`.
    ///
    /// When `range` is within the decoded prefix, the result covers it without
    /// gaps.
    pub fn lookup_range(&self, range: CharRange) -> Vec<Window> {
        if range.is_empty() {
            return Vec::new();
        }
        let windows = self.read();
        let first = windows.partition_point(|w| w.char_range().end() <= range.start());
        windows[first..]
            .iter()
            .take_while(|w| w.char_range().start() < range.end())
            .copied()
            .collect()
    }

    /// Number of indexed windows.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of characters covered by the indexed windows.
    pub fn covered_chars(&self) -> usize {
        self.read().last().map_or(0, |w| w.char_range().end())
    }

    pub fn last(&self) -> Option<Window> {
        self.read().last().copied()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Window>> {
        self.windows.read().unwrap_or_else(PoisonError::into_inner)
    }
}
