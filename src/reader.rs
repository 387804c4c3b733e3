//! The byte source abstraction the pull cursor refills its buffer from: a
//! pull-style `read` rather than a push-style `feed`.

use crate::error::ReaderError;

/// A source of raw bytes. `read` follows `std::io::Read`'s contract: it
/// writes into the front of `buffer` and returns the number of bytes
/// written, with `Ok(0)` meaning end of input.
///
/// Kept as a crate-local trait (rather than requiring `std::io::Read`
/// directly) so an in-memory [`SliceReader`] can hand back a zero-copy view
/// over borrowed data instead of forcing a copy into the cursor's buffer.
pub trait Reader {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ReaderError>;
}

/// A [`Reader`] over an in-memory byte slice. No system calls, no copies
/// beyond what the cursor itself performs into its own buffer.
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceReader { data, pos: 0 }
    }
}

impl<'a> Reader for SliceReader<'a> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ReaderError> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buffer.len());
        buffer[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// A [`Reader`] adapter over any [`std::io::Read`], retrying on
/// `ErrorKind::Interrupted` the way a well-behaved reader should.
pub struct IoReader<R> {
    inner: R,
}

impl<R: std::io::Read> IoReader<R> {
    pub fn new(inner: R) -> Self {
        IoReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: std::io::Read> Reader for IoReader<R> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ReaderError> {
        loop {
            match self.inner.read(buffer) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReaderError::Io(e)),
            }
        }
    }
}
