use std::{fs::File, io, ops::Range, path::Path};

use crate::{
    Bytes, ReadAt,
    utils::{clamp_range, to_usize_len},
    verify,
};

/// `ReadAt` over a file using positional reads into owned buffers, for
/// platforms or files where mapping is not wanted.
///
/// As with [`MmapReader`](crate::MmapReader), the size is captured on open.
/// A file that shrinks afterwards fails reads past its new end with
/// `UnexpectedEof`.
pub struct FileReader {
    file: File,
    size: u64,
}

impl FileReader {
    pub fn new(file: File) -> io::Result<FileReader> {
        let size = file.metadata()?.len();
        Ok(FileReader { file, size })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<FileReader> {
        FileReader::new(File::open(path)?)
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> io::Result<Bytes> {
        verify!(range.end >= range.start);
        let range = clamp_range(range, self.size);
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let mut buf = vec![0u8; to_usize_len(&range)?];
        fill_at(&self.file, range.start, &mut buf)?;
        Ok(buf.into())
    }
}

#[cfg(unix)]
fn fill_at(file: &File, pos: u64, buf: &mut [u8]) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, pos)
}

#[cfg(windows)]
fn fill_at(file: &File, pos: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    let mut filled = 0;
    while filled < buf.len() {
        match file.seek_read(&mut buf[filled..], pos + filled as u64) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
