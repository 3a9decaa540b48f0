//! The public character sequence surface over a large text file.

use std::{
    cell::RefCell,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use largetext_common::{Error, Result};

use crate::{
    cache::{CacheStats, CharBuffer},
    ranges::CharRange,
    sequence::{SequenceFactory, TextSequence},
};

/// A very large text, decoded in the background and randomly indexable by
/// character.
///
/// Calls block only while the requested characters are not decoded yet. Once
/// decoding failed, every call fails with the same decode error. Every call on a
/// closed text fails with `ErrorKind::Closed`.
pub trait LargeText: Send {
    /// Total number of characters; blocks until the whole text is decoded.
    fn length(&self) -> Result<usize>;

    fn char_at(&self, index: usize) -> Result<char>;

    /// View of the characters `[start, end)`.
    fn sub_sequence(&self, start: usize, end: usize) -> Result<TextSequence>;

    /// View of the whole text; blocks until the whole text is decoded.
    fn contents(&self) -> Result<TextSequence> {
        let length = self.length()?;
        self.sub_sequence(0, length)
    }

    /// Materializes the whole text.
    fn read_to_string(&self) -> Result<String> {
        Ok(self.contents()?.to_string())
    }

    /// Stops the background decoding and releases the cached buffers and the
    /// byte source.
    ///
    /// Blocked calls are released with a cancellation error. Closing twice is a
    /// no-op.
    fn close(&self);

    fn is_closed(&self) -> bool;

    fn cache_stats(&self) -> CacheStats;
}

/// Most recently resolved window and its buffer.
#[derive(Clone)]
struct Locality {
    range: CharRange,
    buffer: CharBuffer,
}

impl Locality {
    #[inline]
    fn get(&self, index: usize) -> Option<char> {
        self.range
            .contains(index)
            .then(|| self.buffer[index - self.range.start()])
    }
}

static NEXT_TEXT_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by both facade flavors.
struct TextCore {
    id: u64,
    factory: Arc<SequenceFactory>,
    closed: AtomicBool,
}

impl TextCore {
    fn new(factory: Arc<SequenceFactory>) -> TextCore {
        TextCore {
            id: NEXT_TEXT_ID.fetch_add(1, Ordering::Relaxed),
            factory,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::closed())
        } else {
            Ok(())
        }
    }

    fn length(&self) -> Result<usize> {
        self.ensure_open()?;
        self.factory.engine().total_chars()
    }

    fn resolve(&self, index: usize) -> Result<Locality> {
        self.ensure_open()?;
        let window = self.factory.engine().window_at(index)?;
        let buffer = self.factory.cache().load(&window)?;
        Ok(Locality {
            range: window.char_range(),
            buffer,
        })
    }

    fn sub_sequence(&self, start: usize, end: usize) -> Result<TextSequence> {
        self.ensure_open()?;
        let range = CharRange::try_new(start, end)?;
        self.factory.get_sequence(range)
    }

    /// Returns `false` if already closed.
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.factory.engine().cancel();
        let stats = self.factory.cache().stats();
        self.factory.cache().release();
        log::debug!("closed text #{}, cache statistics: {stats}", self.id);
        true
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn cache_stats(&self) -> CacheStats {
        self.factory.cache().stats()
    }
}

/// `LargeText` that keeps its locality cache in the instance.
///
/// Not `Sync`: the instance can move between threads but cannot be shared.
pub struct UnsyncLargeText {
    core: TextCore,
    last: RefCell<Option<Locality>>,
}

impl UnsyncLargeText {
    pub(crate) fn new(factory: Arc<SequenceFactory>) -> UnsyncLargeText {
        UnsyncLargeText {
            core: TextCore::new(factory),
            last: RefCell::new(None),
        }
    }
}

impl LargeText for UnsyncLargeText {
    fn length(&self) -> Result<usize> {
        self.core.length()
    }

    fn char_at(&self, index: usize) -> Result<char> {
        self.core.ensure_open()?;
        if let Some(c) = self.last.borrow().as_ref().and_then(|l| l.get(index)) {
            return Ok(c);
        }
        let locality = self.core.resolve(index)?;
        let c = locality
            .get(index)
            .ok_or_else(|| Error::invalid_operation(format!("char_at({index})")))?;
        *self.last.borrow_mut() = Some(locality);
        Ok(c)
    }

    fn sub_sequence(&self, start: usize, end: usize) -> Result<TextSequence> {
        self.core.sub_sequence(start, end)
    }

    fn close(&self) {
        if self.core.close() {
            self.last.borrow_mut().take();
        }
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn cache_stats(&self) -> CacheStats {
        self.core.cache_stats()
    }
}

impl Drop for UnsyncLargeText {
    fn drop(&mut self) {
        self.close();
    }
}

thread_local! {
    /// Locality cache of the calling thread, tagged with the owning text id.
    static LAST_WINDOW: RefCell<Option<(u64, Locality)>> = const { RefCell::new(None) };
}

/// `LargeText` that can be shared between threads; every thread keeps its own
/// locality cache.
///
/// A thread holds the locality cache of one text at a time. Alternating between
/// several texts on one thread works but loses the shortcut.
pub struct SyncLargeText {
    core: TextCore,
}

impl SyncLargeText {
    pub(crate) fn new(factory: Arc<SequenceFactory>) -> SyncLargeText {
        SyncLargeText {
            core: TextCore::new(factory),
        }
    }

    fn cached_char(&self, index: usize) -> Option<char> {
        LAST_WINDOW.with(|slot| {
            slot.borrow()
                .as_ref()
                .filter(|(id, _)| *id == self.core.id)
                .and_then(|(_, locality)| locality.get(index))
        })
    }
}

impl LargeText for SyncLargeText {
    fn length(&self) -> Result<usize> {
        self.core.length()
    }

    fn char_at(&self, index: usize) -> Result<char> {
        self.core.ensure_open()?;
        if let Some(c) = self.cached_char(index) {
            return Ok(c);
        }
        let locality = self.core.resolve(index)?;
        let c = locality
            .get(index)
            .ok_or_else(|| Error::invalid_operation(format!("char_at({index})")))?;
        LAST_WINDOW.with(|slot| *slot.borrow_mut() = Some((self.core.id, locality)));
        Ok(c)
    }

    fn sub_sequence(&self, start: usize, end: usize) -> Result<TextSequence> {
        self.core.sub_sequence(start, end)
    }

    fn close(&self) {
        if self.core.close() {
            let id = self.core.id;
            let _ = LAST_WINDOW.try_with(|slot| {
                let mut slot = slot.borrow_mut();
                if slot.as_ref().is_some_and(|(owner, _)| *owner == id) {
                    *slot = None;
                }
            });
        }
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn cache_stats(&self) -> CacheStats {
        self.core.cache_stats()
    }
}

impl Drop for SyncLargeText {
    fn drop(&mut self) {
        self.close();
    }
}
