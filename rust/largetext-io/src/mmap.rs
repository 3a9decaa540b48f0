use std::{fs::File, ops::Range, path::Path, sync::Arc};

use memmap2::MmapOptions;

use crate::{
    Bytes, ReadAt,
    utils::{clamp_range, to_usize_len},
    verify,
};

/// `ReadAt` over a file where every read is served by a fresh read-only memory
/// mapping of exactly the requested byte range.
///
/// The returned `Bytes` keep their mapping alive, so no content is copied.
/// The file size is captured when the reader is opened; the file is expected to
/// stay unchanged while it is being read.
pub struct MmapReader {
    file: Arc<File>,
    size: u64,
}

impl MmapReader {
    pub fn new(file: impl Into<Arc<File>>) -> std::io::Result<MmapReader> {
        let file = file.into();
        let size = file.metadata()?.len();
        Ok(MmapReader { file, size })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<MmapReader> {
        MmapReader::new(File::open(path)?)
    }
}

impl ReadAt for MmapReader {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let range = clamp_range(range, self.size);
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let len = to_usize_len(&range)?;
        // SAFETY: the mapping is read-only and the file is never written through
        // this reader; concurrent external modification of the file is outside of
        // the supported usage.
        let map = unsafe {
            MmapOptions::new()
                .offset(range.start)
                .len(len)
                .map(self.file.as_ref())?
        };
        Ok(Bytes::from_owner(map))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::{MmapReader, ReadAt};

    #[test]
    fn test_mmap_reader_unaligned_ranges() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let content = (0..20_000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        file.write_all(&content).expect("write_all");
        file.flush().expect("flush");

        let reader = MmapReader::open(file.path()).expect("open");
        assert_eq!(reader.size().unwrap(), 20_000);
        let buf = reader.read_at(4097..9001).expect("read_at");
        assert_eq!(buf.as_ref(), &content[4097..9001]);
        let tail = reader.read_at(19_990..30_000).expect("read_at");
        assert_eq!(tail.as_ref(), &content[19_990..]);
        assert!(reader.read_at(20_000..20_001).unwrap().is_empty());
    }
}
