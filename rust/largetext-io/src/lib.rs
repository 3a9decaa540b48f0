//! I/O abstractions for read-only random access to large files:
//! - `ReadAt`: positional reader with the ability to fetch a specified byte range from a file/blob.
//! - `Bytes`: a cheaply cloneable, immutable view over bytes owned by a shared buffer or mapping.
//!
//! Provides a few simple implementations: memory-mapped, positional file reads and memory-based.

use std::{ops::Range, sync::Arc};

pub mod bytes;
pub mod file;
pub mod memory;
pub mod mmap;
pub mod utils;

pub use bytes::Bytes;
pub use file::FileReader;
pub use mmap::MmapReader;

/// A trait representing a conceptual file or buffer that supports reading from arbitrary
/// positions.
///
/// The underlying content is assumed to be immutable for the lifetime of the reader.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads a specified range of bytes from the object.
    ///
    /// **NOTE**: `read_at` should not return with a short read, unless end-of-file
    /// is encountered.
    ///
    /// # Arguments
    ///
    /// * `range` - A `Range<u64>` that specifies the start and end positions for reading.
    ///   The function may return fewer bytes than requested if the range extends beyond
    ///   the end of the object.
    ///
    /// # Returns
    ///
    /// * `std::io::Result<Bytes>` - The result containing the bytes read, or an error
    ///   if the operation fails.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.as_ref().read_at(range)
    }
}
