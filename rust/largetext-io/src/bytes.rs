use std::{
    fmt,
    ops::{Deref, Range, RangeBounds},
    sync::Arc,
};

type SharedOwner = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// A cheaply cloneable and sliceable chunk of immutable bytes.
///
/// The bytes are owned by a shared backing object: a heap buffer or a memory
/// mapping. Cloning and slicing never copies the content.
#[derive(Clone)]
pub struct Bytes {
    owner: SharedOwner,
    range: Range<usize>,
}

impl Bytes {
    /// Creates an empty `Bytes`.
    pub fn new() -> Bytes {
        Bytes::from_owner(Vec::<u8>::new())
    }

    /// Wraps a backing object exposing its entire content.
    pub fn from_owner<T>(owner: T) -> Bytes
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        let len = owner.as_ref().len();
        Bytes {
            owner: Arc::new(owner),
            range: 0..len,
        }
    }

    pub fn copy_from_slice(data: &[u8]) -> Bytes {
        Bytes::from_owner(data.to_vec())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns a sub-view of this buffer without copying.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Bytes {
        let start = match range.start_bound() {
            std::ops::Bound::Included(&s) => s,
            std::ops::Bound::Excluded(&s) => s + 1,
            std::ops::Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            std::ops::Bound::Included(&e) => e + 1,
            std::ops::Bound::Excluded(&e) => e,
            std::ops::Bound::Unbounded => self.len(),
        };
        assert!(start <= end, "slice start {start} > end {end}");
        assert!(end <= self.len(), "slice end {end} > len {}", self.len());
        Bytes {
            owner: self.owner.clone(),
            range: self.range.start + start..self.range.start + end,
        }
    }
}

impl Default for Bytes {
    fn default() -> Bytes {
        Bytes::new()
    }
}

impl Deref for Bytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        let data: &[u8] = (*self.owner).as_ref();
        &data[self.range.clone()]
    }
}

impl AsRef<[u8]> for Bytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Bytes {
        Bytes::from_owner(vec)
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Bytes) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl Eq for Bytes {}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytes").field("len", &self.len()).finish()
    }
}
