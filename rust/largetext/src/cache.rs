//! Expiring cache of decoded character buffers, keyed by [`Window`].

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use largetext_charset::{CharDecoder, DecodeOutcome, DecoderOptions};
use largetext_common::{DecodeError, Error, Result};
use largetext_io::ReadAt;
use once_cell::sync::OnceCell;

use crate::window::Window;

/// Immutable decoded content of one window.
pub type CharBuffer = Arc<[char]>;

/// Idle period after which a cached buffer is dropped.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(30);

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of windows actually decoded.
    pub loads: u64,
    pub evictions: u64,
    /// Entries currently held.
    pub entries: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits: {}, misses: {}, loads: {}, evictions: {}, entries: {}",
            self.hits, self.misses, self.loads, self.evictions, self.entries
        )
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    evictions: AtomicU64,
}

struct CacheEntry {
    buffer: OnceCell<CharBuffer>,
    /// Milliseconds since the cache epoch.
    last_access: AtomicU64,
}

impl CacheEntry {
    fn new(now: u64) -> CacheEntry {
        CacheEntry {
            buffer: OnceCell::new(),
            last_access: AtomicU64::new(now),
        }
    }

    fn is_expired(&self, now: u64, expiry: u64) -> bool {
        now.saturating_sub(self.last_access.load(Ordering::Relaxed)) >= expiry
    }
}

struct Entries {
    map: HashMap<Window, Arc<CacheEntry>>,
    last_sweep: u64,
}

/// Materializes the characters of a window on demand.
///
/// Every miss re-reads the window's bytes and decodes them with a fresh decoder;
/// the engine guarantees that a window's bytes decode cleanly in isolation.
/// Concurrent misses on the same window share a single decode.
///
/// [`BufferCache::release`] drops the byte source; later misses fail with
/// `ErrorKind::Closed`.
pub struct BufferCache {
    source: RwLock<Option<Arc<dyn ReadAt>>>,
    options: DecoderOptions,
    expiry: Duration,
    epoch: Instant,
    entries: Mutex<Entries>,
    counters: Counters,
}

impl BufferCache {
    pub fn new(source: Arc<dyn ReadAt>, options: DecoderOptions) -> BufferCache {
        BufferCache {
            source: RwLock::new(Some(source)),
            options,
            expiry: DEFAULT_CACHE_EXPIRY,
            epoch: Instant::now(),
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: 0,
            }),
            counters: Default::default(),
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> BufferCache {
        self.expiry = expiry;
        self
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Returns the decoded characters of `window`.
    pub fn load(&self, window: &Window) -> Result<CharBuffer> {
        if self.is_released() {
            return Err(Error::closed());
        }
        let now = self.now();
        let entry = {
            let mut entries = self.lock();
            self.sweep(&mut entries, now);
            let expiry = self.expiry_millis();
            let live = entries
                .map
                .get(window)
                .filter(|entry| !entry.is_expired(now, expiry))
                .cloned();
            match live {
                Some(entry) => entry,
                None => {
                    if entries.map.remove(window).is_some() {
                        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                    let entry = Arc::new(CacheEntry::new(now));
                    entries.map.insert(*window, entry.clone());
                    entry
                }
            }
        };
        entry.last_access.store(now, Ordering::Relaxed);

        if let Some(buffer) = entry.buffer.get() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(buffer.clone());
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let buffer = entry.buffer.get_or_try_init(|| self.decode(window))?;
        Ok(buffer.clone())
    }

    /// Loads several windows, preserving their order.
    pub fn load_all(&self, windows: &[Window]) -> Result<Vec<(Window, CharBuffer)>> {
        windows
            .iter()
            .map(|window| Ok((*window, self.load(window)?)))
            .collect()
    }

    /// Drops all the cached buffers.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let dropped = entries.map.len() as u64;
        entries.map.clear();
        self.counters
            .evictions
            .fetch_add(dropped, Ordering::Relaxed);
    }

    /// Drops the cached buffers and the byte source.
    pub fn release(&self) {
        let source = self
            .source
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.clear();
        if source.is_some() {
            log::trace!("released text source");
        }
    }

    pub fn is_released(&self) -> bool {
        self.source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            entries: self.lock().map.len(),
        }
    }

    fn decode(&self, window: &Window) -> Result<CharBuffer> {
        let byte_range = window.byte_range();
        let offset = byte_range.start();
        let source = self
            .source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(Error::closed)?;
        let bytes = source
            .read_at(byte_range.to_range())
            .map_err(|e| DecodeError::io(offset, e))?;
        if bytes.len() as u64 != byte_range.len() {
            return Err(DecodeError::io(
                offset,
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            )
            .into());
        }

        let mut decoder = CharDecoder::new(self.options);
        let mut output = Vec::with_capacity(window.char_range().len());
        let step = decoder.decode(&bytes, &mut output, true);
        let failed_at = offset + step.consumed as u64;
        match step.outcome {
            DecodeOutcome::Complete => (),
            DecodeOutcome::Incomplete => {
                return Err(DecodeError::Stalled { offset: failed_at }.into());
            }
            DecodeOutcome::Malformed { length } => {
                return Err(DecodeError::Malformed {
                    offset: failed_at,
                    length,
                }
                .into());
            }
            DecodeOutcome::Unmappable { length } => {
                return Err(DecodeError::Unmappable {
                    offset: failed_at,
                    length,
                }
                .into());
            }
        }
        if output.len() != window.char_range().len() {
            return Err(Error::invalid_operation(format!(
                "decoding {window:?} produced {} characters",
                output.len()
            )));
        }

        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        log::trace!("loaded {window:?}");
        Ok(output.into())
    }

    /// Drops expired entries, at most once per half expiry period.
    fn sweep(&self, entries: &mut Entries, now: u64) {
        let expiry = self.expiry_millis();
        if now.saturating_sub(entries.last_sweep) < expiry / 2 {
            return;
        }
        entries.last_sweep = now;
        let before = entries.map.len();
        entries.map.retain(|_, entry| !entry.is_expired(now, expiry));
        let evicted = (before - entries.map.len()) as u64;
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted, Ordering::Relaxed);
            log::trace!("evicted {evicted} expired buffers");
        }
    }

    fn now(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn expiry_millis(&self) -> u64 {
        self.expiry.as_millis() as u64
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
