//! Raw byte channels and their capability sets
//!
//! A [`Channel`] is any sequential byte endpoint: a pipe, a socket, a file.
//! It declares what it supports through [`Channel::capabilities`]; sources
//! query this once at construction and never call an operation outside it.
//! Default method bodies report the matching capability error, so adapters
//! only implement what their endpoint can do.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Which operations a channel supports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    /// Position, size and truncate
    pub seek: bool,
}

impl Capabilities {
    pub const READ_ONLY: Self = Self::new(true, false, false);
    pub const WRITE_ONLY: Self = Self::new(false, true, false);
    pub const READ_WRITE: Self = Self::new(true, true, false);
    pub const SEEKABLE: Self = Self::new(true, true, true);

    pub const fn new(read: bool, write: bool, seek: bool) -> Self {
        Self { read, write, seek }
    }

    pub const fn with_seek(self, seek: bool) -> Self {
        Self { seek, ..self }
    }

    /// True if at least one transfer direction is available
    pub fn is_usable(&self) -> bool {
        self.read || self.write
    }
}

/// A byte-oriented I/O endpoint
///
/// Transfers return the number of bytes moved; `0` means the channel made no
/// progress (end of data, or it is not accepting more right now).
pub trait Channel {
    fn capabilities(&self) -> Capabilities;

    fn read(&mut self, _dst: &mut [u8]) -> Result<usize> {
        Err(Error::NonReadable)
    }

    fn write(&mut self, _src: &[u8]) -> Result<usize> {
        Err(Error::NonWritable)
    }

    fn position(&mut self) -> Result<u64> {
        Err(Error::Unsupported("position"))
    }

    fn set_position(&mut self, _pos: u64) -> Result<()> {
        Err(Error::Unsupported("seek"))
    }

    fn size(&mut self) -> Result<u64> {
        Err(Error::Unsupported("size"))
    }

    fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(Error::Unsupported("truncate"))
    }

    fn is_open(&self) -> bool {
        true
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        (**self).read(dst)
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        (**self).write(src)
    }

    fn position(&mut self) -> Result<u64> {
        (**self).position()
    }

    fn set_position(&mut self, pos: u64) -> Result<()> {
        (**self).set_position(pos)
    }

    fn size(&mut self) -> Result<u64> {
        (**self).size()
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        (**self).truncate(len)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Retry a transfer interrupted by a signal
fn retry<T>(mut op: impl FnMut() -> io::Result<T>) -> Result<T> {
    loop {
        match op() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other.map_err(Error::from),
        }
    }
}

/// Read-only channel over any [`Read`]
pub struct ReadChannel<R> {
    inner: Option<R>,
}

impl<R: Read> ReadChannel<R> {
    pub fn new(inner: R) -> Self {
        Self { inner: Some(inner) }
    }

    /// Unwrap the reader, `None` once closed
    pub fn into_inner(self) -> Option<R> {
        self.inner
    }
}

impl<R: Read> Channel for ReadChannel<R> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(Error::Closed)?;
        retry(|| inner.read(dst))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

/// Write-only channel over any [`Write`]
pub struct WriteChannel<W> {
    inner: Option<W>,
}

impl<W: Write> WriteChannel<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    /// Unwrap the writer, `None` once closed
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }
}

impl<W: Write> Channel for WriteChannel<W> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::WRITE_ONLY
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(Error::Closed)?;
        retry(|| inner.write(src))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            inner.flush()?;
        }
        Ok(())
    }
}

/// Non-seekable channel that both reads and writes, such as a socket
pub struct DuplexChannel<T> {
    inner: Option<T>,
}

impl<T: Read + Write> DuplexChannel<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn into_inner(self) -> Option<T> {
        self.inner
    }
}

impl<T: Read + Write> Channel for DuplexChannel<T> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(Error::Closed)?;
        retry(|| inner.read(dst))
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(Error::Closed)?;
        retry(|| inner.write(src))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            inner.flush()?;
        }
        Ok(())
    }
}

/// Seekable channel over an already opened [`File`]
///
/// The file's access mode cannot be queried portably, so the caller states
/// it. Truncating below the current position moves the position to the new
/// end, matching what file channels do.
pub struct FileChannel {
    file: Option<File>,
    caps: Capabilities,
}

impl FileChannel {
    /// Wrap a file opened for reading and writing
    pub fn new(file: File) -> Self {
        Self::with_capabilities(file, Capabilities::SEEKABLE)
    }

    /// Wrap a file opened for reading only
    pub fn read_only(file: File) -> Self {
        Self::with_capabilities(file, Capabilities::READ_ONLY.with_seek(true))
    }

    /// Wrap a file opened for writing only
    pub fn write_only(file: File) -> Self {
        Self::with_capabilities(file, Capabilities::WRITE_ONLY.with_seek(true))
    }

    pub fn with_capabilities(file: File, caps: Capabilities) -> Self {
        Self {
            file: Some(file),
            caps,
        }
    }

    pub fn into_inner(self) -> Option<File> {
        self.file
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::Closed)
    }
}

impl Channel for FileChannel {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        if !self.caps.read {
            return Err(Error::NonReadable);
        }
        let file = self.file()?;
        retry(|| file.read(dst))
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        if !self.caps.write {
            return Err(Error::NonWritable);
        }
        let file = self.file()?;
        retry(|| file.write(src))
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.file()?.stream_position()?)
    }

    fn set_position(&mut self, pos: u64) -> Result<()> {
        self.file()?.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        if !self.caps.write {
            return Err(Error::NonWritable);
        }
        let file = self.file()?;
        if len < file.metadata()?.len() {
            file.set_len(len)?;
        }
        if file.stream_position()? > len {
            file.seek(SeekFrom::Start(len))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            if self.caps.write {
                file.sync_all()?;
            }
        }
        Ok(())
    }
}
