use std::fmt;

use crate::ranges::{ByteRange, CharRange};

/// One atomically decoded chunk of the file: the byte span that was decoded and
/// the span of characters it produced.
///
/// Windows are created by the decoder engine in strictly increasing order, both
/// ranges contiguous with the previous window's. They order by their character
/// span.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window {
    char_range: CharRange,
    byte_range: ByteRange,
}

impl Window {
    pub fn new(byte_range: ByteRange, char_range: CharRange) -> Window {
        Window {
            char_range,
            byte_range,
        }
    }

    #[inline]
    pub fn byte_range(&self) -> ByteRange {
        self.byte_range
    }

    #[inline]
    pub fn char_range(&self) -> CharRange {
        self.char_range
    }

    /// Whether `next` continues this window in both byte and character space.
    pub fn is_followed_by(&self, next: &Window) -> bool {
        self.byte_range.is_appendable(&next.byte_range)
            && self.char_range.is_appendable(&next.char_range)
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Window(bytes {}, chars {})", self.byte_range, self.char_range)
    }
}
