use std::ops::Range;

use crate::{Bytes, ReadAt, verify};

impl<T> ReadAt for T
where
    T: details::SliceBytes + Send + Sync + 'static,
{
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let content_len = self.len() as u64;
        if range.start > content_len {
            return Ok(Bytes::new());
        }
        let end = std::cmp::min(range.end, content_len);
        Ok(self.slice(range.start as usize..end as usize))
    }
}

mod details {
    use std::ops::Range;

    use crate::Bytes;

    pub trait SliceBytes {
        fn len(&self) -> usize;
        fn slice(&self, range: Range<usize>) -> Bytes;
    }

    impl SliceBytes for Bytes {
        fn len(&self) -> usize {
            Bytes::len(self)
        }

        fn slice(&self, range: Range<usize>) -> Bytes {
            Bytes::slice(self, range)
        }
    }

    impl SliceBytes for Vec<u8> {
        fn len(&self) -> usize {
            Vec::len(self)
        }

        fn slice(&self, range: Range<usize>) -> Bytes {
            Bytes::copy_from_slice(&self[range])
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{Bytes, ReadAt};

    #[test]
    fn test_mem_reader() {
        let blob = b"abcd123".to_vec();
        assert_eq!(blob.size().unwrap(), 7);
        let buf = blob.read_at(1..3).unwrap();
        assert_eq!(buf.as_ref(), b"bc");
        let buf = blob.read_at(4..200).unwrap();
        assert_eq!(buf.as_ref(), b"123");

        let blob = Arc::new(blob) as Arc<dyn ReadAt>;
        let buf = blob.read_at(1..3).unwrap();
        assert_eq!(buf.as_ref(), b"bc");
    }

    #[test]
    fn test_bytes_reader_is_zero_copy() {
        let blob = Bytes::from(b"hello world".to_vec());
        let buf = blob.read_at(6..11).unwrap();
        assert_eq!(buf.as_ref(), b"world");
        assert!(blob.read_at(12..20).unwrap().is_empty());
    }
}
