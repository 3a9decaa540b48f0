//! Half-open offset intervals used to describe byte spans of the file and
//! character spans of the decoded text.

use std::{
    fmt,
    ops::{Add, Range, Sub},
};

use largetext_common::{Error, Result};

/// Offset type an [`Interval`] can be built over.
pub trait Offset:
    Copy + Ord + Default + fmt::Debug + fmt::Display + Add<Output = Self> + Sub<Output = Self>
{
}

impl Offset for u64 {}

impl Offset for usize {}

/// A half-open interval `[start, end)` with `start <= end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Interval<T> {
    start: T,
    end: T,
}

/// Byte span in the underlying file.
pub type ByteRange = Interval<u64>;

/// Character span in the decoded text.
pub type CharRange = Interval<usize>;

impl<T: Offset> Interval<T> {
    /// # Panics
    ///
    /// Panics if `end < start`.
    pub fn new(start: T, end: T) -> Interval<T> {
        assert!(start <= end, "invalid interval [{start}, {end})");
        Interval { start, end }
    }

    pub fn try_new(start: T, end: T) -> Result<Interval<T>> {
        if start <= end {
            Ok(Interval { start, end })
        } else {
            Err(Error::invalid_arg(
                "end",
                format!("end {end} precedes start {start}"),
            ))
        }
    }

    /// Empty interval positioned at `at`.
    pub fn empty_at(at: T) -> Interval<T> {
        Interval { start: at, end: at }
    }

    #[inline]
    pub fn start(&self) -> T {
        self.start
    }

    #[inline]
    pub fn end(&self) -> T {
        self.end
    }

    #[inline]
    pub fn len(&self) -> T {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, offset: T) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `other` lies entirely within this interval.
    pub fn encloses(&self, other: &Interval<T>) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the two intervals share at least one offset.
    pub fn intersects(&self, other: &Interval<T>) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersection(&self, other: &Interval<T>) -> Option<Interval<T>> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Interval { start, end })
    }

    /// Whether `next` starts exactly where this interval ends.
    pub fn is_appendable(&self, next: &Interval<T>) -> bool {
        self.end == next.start
    }

    /// Translates the interval so that `base` becomes offset zero.
    ///
    /// # Panics
    ///
    /// Panics if `base` is greater than `start`.
    pub fn relative_to(&self, base: T) -> Interval<T> {
        Interval::new(self.start - base, self.end - base)
    }

    pub fn shift(&self, delta: T) -> Interval<T> {
        Interval {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    pub fn to_range(&self) -> Range<T> {
        self.start..self.end
    }
}

impl Interval<usize> {
    pub const EMPTY: CharRange = Interval { start: 0, end: 0 };
}

impl<T: Offset> From<Range<T>> for Interval<T> {
    fn from(range: Range<T>) -> Interval<T> {
        Interval::new(range.start, range.end)
    }
}

impl<T: Offset> From<Interval<T>> for Range<T> {
    fn from(interval: Interval<T>) -> Range<T> {
        interval.to_range()
    }
}

impl<T: Offset> fmt::Debug for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl<T: Offset> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteRange, CharRange};

    #[test]
    fn test_interval_basics() {
        let r = CharRange::new(10, 20);
        assert_eq!(r.len(), 10);
        assert!(r.contains(10));
        assert!(r.contains(19));
        assert!(!r.contains(20));
        assert!(r.encloses(&CharRange::new(12, 20)));
        assert!(!r.encloses(&CharRange::new(12, 21)));
        assert!(r.is_appendable(&CharRange::new(20, 25)));
        assert!(!r.is_appendable(&CharRange::new(19, 25)));
        assert_eq!(r.relative_to(10), CharRange::new(0, 10));
        assert_eq!(r.to_string(), "[10, 20)");
    }

    #[test]
    fn test_intersection() {
        let a = ByteRange::new(0, 8);
        assert_eq!(a.intersection(&ByteRange::new(4, 12)), Some(ByteRange::new(4, 8)));
        assert_eq!(a.intersection(&ByteRange::new(8, 12)), None);
        assert!(!a.intersects(&ByteRange::new(8, 12)));
        assert!(a.intersects(&ByteRange::new(7, 12)));
        assert!(CharRange::EMPTY.is_empty());
        assert!(!CharRange::EMPTY.contains(0));
    }

    #[test]
    fn test_try_new_rejects_inverted() {
        assert!(CharRange::try_new(5, 4).is_err());
        assert_eq!(CharRange::try_new(4, 4).unwrap(), CharRange::empty_at(4));
    }
}
