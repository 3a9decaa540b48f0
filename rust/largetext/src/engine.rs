//! The background decoder: walks the byte source window by window, publishing
//! every decoded [`Window`] to the [`RangeIndex`] and the characters decoded so far
//! to the [`DecodingStatus`].
//!
//! Decoding is strictly sequential. A window may end in the middle of a
//! multi-byte sequence, in which case the window is shrunk to the bytes fully
//! decoded and the remainder is decoded as part of the next window.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Instant,
};

use largetext_charset::{CharDecoder, DecodeOutcome, DecoderOptions};
use largetext_common::{DecodeError, Error, Result};
use largetext_io::ReadAt;

use crate::{
    index::RangeIndex,
    ranges::{ByteRange, CharRange},
    status::DecodingStatus,
    window::Window,
};

const DECODER_THREAD_NAME: &str = "text-decoder";

/// State shared between the engine handle and its decoding thread.
#[derive(Default)]
struct Control {
    cancelled: AtomicBool,
    /// Byte offset of the end of the last published window.
    byte_offset: AtomicU64,
}

/// Handle to the decoding of one byte source.
///
/// The decoding thread is detached: dropping or cancelling the engine asks it to
/// stop at the next window boundary without waiting for it.
pub struct DecodeEngine {
    status: Arc<DecodingStatus>,
    index: Arc<RangeIndex>,
    control: Arc<Control>,
    file_size: u64,
}

impl DecodeEngine {
    /// Starts decoding `source` on a background thread, `window_size` bytes at a
    /// time.
    pub fn start(
        source: Arc<dyn ReadAt>,
        options: DecoderOptions,
        window_size: usize,
    ) -> Result<DecodeEngine> {
        largetext_common::verify_arg!(window_size, window_size > 0);
        let file_size = source
            .size()
            .map_err(|e| Error::io("query text source size", e))?;
        let status = Arc::new(DecodingStatus::new());
        let index = Arc::new(RangeIndex::new());
        let control = Arc::new(Control::default());

        let task = DecodeTask {
            source,
            decoder: CharDecoder::new(options),
            window_size,
            file_size,
            status: status.clone(),
            index: index.clone(),
            control: control.clone(),
        };
        std::thread::Builder::new()
            .name(DECODER_THREAD_NAME.to_string())
            .spawn(move || task.run())
            .map_err(|e| Error::io("spawn decoder thread", e))?;

        Ok(DecodeEngine {
            status,
            index,
            control,
            file_size,
        })
    }

    pub fn status(&self) -> &Arc<DecodingStatus> {
        &self.status
    }

    pub fn index(&self) -> &Arc<RangeIndex> {
        &self.index
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Returns the window containing character `offset`, blocking until it is
    /// decoded.
    pub fn window_at(&self, offset: usize) -> Result<Window> {
        let required = offset
            .checked_add(1)
            .ok_or_else(|| Error::out_of_bounds(offset, usize::MAX))?;
        self.status.wait_for(required)?;
        self.index
            .lookup(offset)
            .ok_or_else(|| Error::invalid_operation(format!("window_at({offset}): not indexed")))
    }

    /// Returns the ordered windows covering `range`, blocking until all of them
    /// are decoded.
    pub fn windows_for(&self, range: CharRange) -> Result<Vec<Window>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        self.status.wait_for(range.end())?;
        Ok(self.index.lookup_range(range))
    }

    /// Blocks until decoding ends and returns the total number of characters.
    pub fn total_chars(&self) -> Result<usize> {
        self.status.total_chars()
    }

    /// Stops the decoding.
    ///
    /// Pending and future waiters fail with a cancellation error unless decoding
    /// already ended.
    pub fn cancel(&self) {
        if self.control.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let offset = self.control.byte_offset.load(Ordering::Acquire);
        if self.status.notify_failed(DecodeError::Cancelled { offset }) {
            log::debug!("text decoding cancelled at byte offset {offset}");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for DecodeEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct DecodeTask {
    source: Arc<dyn ReadAt>,
    decoder: CharDecoder,
    window_size: usize,
    file_size: u64,
    status: Arc<DecodingStatus>,
    index: Arc<RangeIndex>,
    control: Arc<Control>,
}

struct Summary {
    chars: usize,
    windows: usize,
}

impl DecodeTask {
    fn run(mut self) {
        let started = Instant::now();
        log::debug!(
            "decoding {} bytes as {} in windows of {} bytes",
            self.file_size,
            self.decoder.charset(),
            self.window_size
        );
        match self.decode_all() {
            Ok(summary) => {
                self.status.notify_finished(summary.chars);
                log::debug!(
                    "decoded {} characters in {} windows in {:?} ({} replaced, {} skipped)",
                    summary.chars,
                    summary.windows,
                    started.elapsed(),
                    self.decoder.replaced_count(),
                    self.decoder.skipped_count()
                );
            }
            Err(e @ DecodeError::Cancelled { .. }) => {
                if self.status.notify_failed(e.clone()) {
                    log::debug!("{e}");
                }
            }
            Err(e) => {
                if self.status.notify_failed(e.clone()) {
                    log::warn!("text decoding failed: {e}");
                }
            }
        }
    }

    fn decode_all(&mut self) -> std::result::Result<Summary, DecodeError> {
        let mut byte_offset = 0u64;
        let mut char_offset = 0usize;
        let mut windows = 0usize;
        let capacity = usize::try_from(self.file_size)
            .map_or(self.window_size, |size| size.min(self.window_size));
        let mut output = Vec::with_capacity(capacity);

        while byte_offset < self.file_size {
            if self.control.cancelled.load(Ordering::Acquire) {
                return Err(DecodeError::Cancelled {
                    offset: byte_offset,
                });
            }

            let end = byte_offset
                .saturating_add(self.window_size as u64)
                .min(self.file_size);
            let bytes = self
                .source
                .read_at(byte_offset..end)
                .map_err(|e| DecodeError::io(byte_offset, e))?;
            if bytes.is_empty() {
                return Err(DecodeError::Stalled {
                    offset: byte_offset,
                });
            }
            let last = byte_offset + bytes.len() as u64 >= self.file_size;

            output.clear();
            let step = self.decoder.decode(&bytes, &mut output, last);
            let consumed = step.consumed as u64;
            let failure = match step.outcome {
                DecodeOutcome::Complete | DecodeOutcome::Incomplete => None,
                DecodeOutcome::Malformed { length } => Some(DecodeError::Malformed {
                    offset: byte_offset + consumed,
                    length,
                }),
                DecodeOutcome::Unmappable { length } => Some(DecodeError::Unmappable {
                    offset: byte_offset + consumed,
                    length,
                }),
            };

            if consumed > 0 {
                let window = Window::new(
                    ByteRange::new(byte_offset, byte_offset + consumed),
                    CharRange::new(char_offset, char_offset + output.len()),
                );
                self.index.push(window);
                byte_offset += consumed;
                char_offset += output.len();
                windows += 1;
                self.control
                    .byte_offset
                    .store(byte_offset, Ordering::Release);
                self.status.notify_progress(char_offset);
                log::trace!("published {window:?}");
            }

            if let Some(e) = failure {
                return Err(e);
            }
            if consumed == 0 {
                return Err(DecodeError::Stalled {
                    offset: byte_offset,
                });
            }
        }

        Ok(Summary {
            chars: char_offset,
            windows,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use largetext_charset::{Charset, CodingErrorAction, DecoderOptions};
    use largetext_io::{Bytes, ReadAt};

    use super::DecodeEngine;
    use crate::ranges::CharRange;

    fn start(content: &[u8], options: DecoderOptions, window_size: usize) -> DecodeEngine {
        let source = Arc::new(Bytes::copy_from_slice(content)) as Arc<dyn ReadAt>;
        DecodeEngine::start(source, options, window_size).unwrap()
    }

    #[test]
    fn test_windows_are_contiguous() {
        let text = "ab€cd😀ef".repeat(10);
        let engine = start(text.as_bytes(), DecoderOptions::new(Charset::Utf8), 5);
        assert_eq!(engine.total_chars().unwrap(), text.chars().count());
        let windows = engine
            .windows_for(CharRange::new(0, text.chars().count()))
            .unwrap();
        assert_eq!(windows.first().unwrap().byte_range().start(), 0);
        assert_eq!(
            windows.last().unwrap().byte_range().end(),
            text.len() as u64
        );
        for pair in windows.windows(2) {
            assert!(pair[0].is_followed_by(&pair[1]));
        }
        for w in &windows {
            assert!(w.byte_range().len() <= 5);
        }
    }

    #[test]
    fn test_report_stops_at_malformed_byte() {
        let engine = start(b"Hel\xD0o", DecoderOptions::new(Charset::Utf8), 64);
        let err = engine.window_at(4).unwrap_err();
        let decode = err.decode_error().unwrap();
        assert_eq!(decode.offset(), 3);
        assert!(engine.total_chars().unwrap_err().is_decode());
        // The valid prefix was published before the failure.
        assert_eq!(engine.index().covered_chars(), 3);
    }

    #[test]
    fn test_truncated_file_end_is_malformed() {
        let options = DecoderOptions::new(Charset::Utf8).with_action(CodingErrorAction::Replace);
        let engine = start(b"abc\xE2\x82", options, 4);
        assert_eq!(engine.total_chars().unwrap(), 4);
    }

    #[test]
    fn test_window_at_beyond_end_is_out_of_bounds() {
        let engine = start(b"0123456789", DecoderOptions::new(Charset::UsAscii), 3);
        assert_eq!(engine.window_at(9).unwrap().char_range(), CharRange::new(9, 10));
        assert!(engine.window_at(10).unwrap_err().is_out_of_bounds());
        assert!(engine.window_at(usize::MAX).unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn test_huge_window_on_small_source() {
        let window_size = i32::MAX as usize - 1;
        let engine = start(b"tiny", DecoderOptions::new(Charset::Utf8), window_size);
        assert_eq!(engine.total_chars().unwrap(), 4);
        assert_eq!(engine.index().len(), 1);
    }

    #[test]
    fn test_empty_source() {
        let engine = start(b"", DecoderOptions::default(), 16);
        assert_eq!(engine.total_chars().unwrap(), 0);
        assert!(engine.window_at(0).unwrap_err().is_out_of_bounds());
        assert!(engine.windows_for(CharRange::EMPTY).unwrap().is_empty());
    }
}
