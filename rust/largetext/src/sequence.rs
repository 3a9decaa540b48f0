//! Character sequence views over decoded windows.
//!
//! A [`TextSequence`] is an immutable view of an absolute character range of the
//! text. Views within a single window index straight into that window's buffer;
//! views spanning several windows keep a snapshot of the covering buffers.
//! Indices passed to a view are always relative to the view's own start.

use std::{
    fmt::{self, Write},
    sync::Arc,
};

use largetext_common::{Error, Result};

use crate::{
    cache::{BufferCache, CharBuffer},
    engine::DecodeEngine,
    ranges::CharRange,
};

/// Builds sequence views for absolute character ranges of one text.
pub struct SequenceFactory {
    engine: DecodeEngine,
    cache: BufferCache,
}

impl SequenceFactory {
    pub fn new(engine: DecodeEngine, cache: BufferCache) -> Arc<SequenceFactory> {
        Arc::new(SequenceFactory { engine, cache })
    }

    pub fn engine(&self) -> &DecodeEngine {
        &self.engine
    }

    pub fn cache(&self) -> &BufferCache {
        &self.cache
    }

    /// Returns a view of `range`, blocking until the range is decoded.
    pub fn get_sequence(&self, range: CharRange) -> Result<TextSequence> {
        if range.is_empty() {
            return Ok(TextSequence::empty());
        }
        let windows = self.engine.windows_for(range)?;
        match windows.as_slice() {
            [] => Err(Error::invalid_operation(format!(
                "get_sequence({range}): no covering window"
            ))),
            [window] => Ok(TextSequence {
                range,
                kind: SequenceKind::Single {
                    buffer: self.cache.load(window)?,
                    buffer_start: window.char_range().start(),
                },
            }),
            windows => {
                let chunks = self
                    .cache
                    .load_all(windows)?
                    .into_iter()
                    .map(|(window, buffer)| (window.char_range(), buffer))
                    .collect();
                Ok(TextSequence {
                    range,
                    kind: SequenceKind::Multi { chunks },
                })
            }
        }
    }
}

#[derive(Clone)]
enum SequenceKind {
    Empty,
    Single {
        buffer: CharBuffer,
        /// Absolute offset of `buffer[0]`.
        buffer_start: usize,
    },
    Multi {
        /// Ordered, contiguous buffers covering at least the view's range.
        chunks: Arc<[(CharRange, CharBuffer)]>,
    },
}

/// Immutable view of a character range of the text.
#[derive(Clone)]
pub struct TextSequence {
    range: CharRange,
    kind: SequenceKind,
}

static EMPTY: TextSequence = TextSequence {
    range: CharRange::EMPTY,
    kind: SequenceKind::Empty,
};

impl TextSequence {
    /// The empty sequence.
    pub fn empty() -> TextSequence {
        EMPTY.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Absolute character range of this view within the text.
    pub fn range(&self) -> CharRange {
        self.range
    }

    /// Whether the view is served from a single window buffer.
    pub fn is_single_window(&self) -> bool {
        matches!(self.kind, SequenceKind::Single { .. })
    }

    pub fn char_at(&self, index: usize) -> Result<char> {
        if index >= self.len() {
            return Err(Error::out_of_bounds(index, self.len()));
        }
        let offset = self.range.start() + index;
        match &self.kind {
            SequenceKind::Empty => Err(Error::out_of_bounds(index, 0)),
            SequenceKind::Single {
                buffer,
                buffer_start,
            } => Ok(buffer[offset - buffer_start]),
            SequenceKind::Multi { chunks, .. } => {
                let pos = chunks.partition_point(|(range, _)| range.end() <= offset);
                match chunks.get(pos) {
                    Some((range, buffer)) if range.contains(offset) => {
                        Ok(buffer[offset - range.start()])
                    }
                    _ => Err(Error::invalid_operation(format!(
                        "char_at({offset}): no buffer"
                    ))),
                }
            }
        }
    }

    /// Returns the view of `[start, end)`, relative to this view.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Result<TextSequence> {
        if start > end {
            return Err(Error::invalid_arg(
                "start",
                format!("start {start} is greater than end {end}"),
            ));
        }
        if end > self.len() {
            return Err(Error::out_of_bounds(end, self.len()));
        }
        if start == end {
            return Ok(TextSequence::empty());
        }
        let range = CharRange::new(self.range.start() + start, self.range.start() + end);
        match &self.kind {
            SequenceKind::Empty => Ok(TextSequence::empty()),
            SequenceKind::Single { .. } => Ok(TextSequence {
                range,
                kind: self.kind.clone(),
            }),
            SequenceKind::Multi { chunks } => {
                let mut narrowed = chunks
                    .iter()
                    .filter(|(chunk, _)| chunk.intersects(&range))
                    .cloned()
                    .collect::<Vec<_>>();
                let kind = if narrowed.len() == 1 {
                    let (chunk, buffer) = narrowed.remove(0);
                    SequenceKind::Single {
                        buffer,
                        buffer_start: chunk.start(),
                    }
                } else {
                    SequenceKind::Multi {
                        chunks: narrowed.into(),
                    }
                };
                Ok(TextSequence { range, kind })
            }
        }
    }

    /// Iterates over the buffer slices backing this view, in order.
    pub fn segments(&self) -> impl Iterator<Item = &[char]> + '_ {
        let range = self.range;
        let chunks: &[(CharRange, CharBuffer)] = match &self.kind {
            SequenceKind::Multi { chunks, .. } => &chunks[..],
            _ => &[],
        };
        let single = match &self.kind {
            SequenceKind::Single {
                buffer,
                buffer_start,
            } => Some(&buffer[range.start() - buffer_start..range.end() - buffer_start]),
            _ => None,
        };
        single.into_iter().chain(chunks.iter().filter_map(move |(chunk, buffer)| {
            chunk
                .intersection(&range)
                .map(|part| &buffer[part.relative_to(chunk.start()).to_range()])
        }))
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.segments().flat_map(|segment| segment.iter().copied())
    }
}

impl fmt::Display for TextSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TextSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SequenceKind::Empty => "empty",
            SequenceKind::Single { .. } => "single",
            SequenceKind::Multi { .. } => "multi",
        };
        f.debug_struct("TextSequence")
            .field("range", &self.range)
            .field("kind", &kind)
            .finish()
    }
}

impl PartialEq<str> for TextSequence {
    fn eq(&self, other: &str) -> bool {
        self.chars().eq(other.chars())
    }
}

impl PartialEq<&str> for TextSequence {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use largetext_charset::{Charset, DecoderOptions};
    use largetext_io::{Bytes, ReadAt};

    use super::{SequenceFactory, TextSequence};
    use crate::{cache::BufferCache, engine::DecodeEngine, ranges::CharRange};

    fn factory_of(text: &str, window_size: usize) -> Arc<SequenceFactory> {
        let source = Arc::new(Bytes::copy_from_slice(text.as_bytes())) as Arc<dyn ReadAt>;
        let options = DecoderOptions::new(Charset::Utf8);
        let engine = DecodeEngine::start(source.clone(), options, window_size).unwrap();
        SequenceFactory::new(engine, BufferCache::new(source, options))
    }

    #[test]
    fn test_single_window_view() {
        let factory = factory_of("hello, world", 64);
        let seq = factory.get_sequence(CharRange::new(7, 12)).unwrap();
        assert!(seq.is_single_window());
        assert_eq!(seq, "world");
        assert_eq!(seq.char_at(0).unwrap(), 'w');
        assert!(seq.char_at(5).unwrap_err().is_out_of_bounds());
        let sub = seq.sub_sequence(1, 3).unwrap();
        assert!(sub.is_single_window());
        assert_eq!(sub, "or");
        assert_eq!(sub.range(), CharRange::new(8, 10));
    }

    #[test]
    fn test_multi_window_view() {
        let text = "0123456789abcdefghij";
        let factory = factory_of(text, 4);
        let seq = factory.get_sequence(CharRange::new(2, 18)).unwrap();
        assert!(!seq.is_single_window());
        assert_eq!(seq.to_string(), &text[2..18]);
        for i in 0..seq.len() {
            assert_eq!(seq.char_at(i).unwrap(), text.as_bytes()[i + 2] as char);
        }

        let narrowed = seq.sub_sequence(3, 12).unwrap();
        assert!(!narrowed.is_single_window());
        assert_eq!(narrowed, &text[5..14]);

        // Narrowing within one window falls back to the single-window view.
        let within = seq.sub_sequence(6, 8).unwrap();
        assert!(within.is_single_window());
        assert_eq!(within, "89");
        assert_eq!(within.range(), CharRange::new(8, 10));
        assert_eq!(within.sub_sequence(1, 2).unwrap(), "9");
    }

    #[test]
    fn test_views_outlive_released_cache() {
        let text = "0123456789abcdefghij";
        let factory = factory_of(text, 4);
        let seq = factory.get_sequence(CharRange::new(2, 18)).unwrap();
        factory.engine().cancel();
        factory.cache().release();

        assert_eq!(seq, &text[2..18]);
        let within = seq.sub_sequence(6, 8).unwrap();
        assert!(within.is_single_window());
        assert_eq!(within, "89");
        assert_eq!(seq.sub_sequence(1, 15).unwrap(), &text[3..17]);
        assert!(factory.get_sequence(CharRange::new(0, 2)).is_err());
    }

    #[test]
    fn test_sub_sequence_arguments() {
        let factory = factory_of("abcdef", 2);
        let seq = factory.get_sequence(CharRange::new(0, 6)).unwrap();
        assert!(seq.sub_sequence(4, 3).unwrap_err().to_string().contains("start"));
        assert!(seq.sub_sequence(2, 7).unwrap_err().is_out_of_bounds());
        let empty = seq.sub_sequence(3, 3).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "");
        assert!(TextSequence::empty().char_at(0).is_err());
    }
}
