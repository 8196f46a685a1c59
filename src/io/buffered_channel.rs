//! A buffered source presented as a channel
//!
//! Lets a buffered source be handed to anything that consumes a
//! [`Channel`], including another source.

use super::buffer::LARGE_BUFFER_SIZE;
use super::channel::{Capabilities, Channel};
use super::error::Result;
use super::seekable::SeekableSource;
use super::source::{BufferedSource, Source};

/// Buffer size used when none is given (1MB)
pub const DEFAULT_CHANNEL_BUFFER_SIZE: usize = LARGE_BUFFER_SIZE;

/// Channel backed by a buffered source
pub struct BufferedChannel<S> {
    source: S,
    open: bool,
}

impl<S: Source> BufferedChannel<S> {
    pub fn new(source: S) -> Self {
        Self { source, open: true }
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<C: Channel> BufferedChannel<BufferedSource<C>> {
    /// Buffer a non-seekable channel with the default buffer size
    pub fn buffered(chan: C) -> Result<Self> {
        Ok(Self::new(BufferedSource::with_capacity(
            DEFAULT_CHANNEL_BUFFER_SIZE,
            chan,
        )?))
    }
}

impl<C: Channel> BufferedChannel<SeekableSource<C>> {
    /// Buffer a seekable channel with the default buffer size
    pub fn seekable(chan: C) -> Result<Self> {
        Ok(Self::new(SeekableSource::with_capacity(
            DEFAULT_CHANNEL_BUFFER_SIZE,
            chan,
        )?))
    }
}

impl<S: Source> Channel for BufferedChannel<S> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::new(
            self.source.can_read(),
            self.source.can_write(),
            self.source.can_seek(),
        )
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        Ok(self.source.read(dst)?.unwrap_or(0))
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        self.source.write(src)
    }

    fn position(&mut self) -> Result<u64> {
        self.source.position()
    }

    fn set_position(&mut self, pos: u64) -> Result<()> {
        self.source.set_position(pos)
    }

    fn size(&mut self) -> Result<u64> {
        self.source.size()
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        self.source.truncate(len)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<()> {
        self.source.close()?;
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::channel::ReadChannel;
    use crate::io::memory::MemoryChannel;
    use std::io::Cursor;

    #[test]
    fn test_capabilities_follow_source() {
        let chan =
            BufferedChannel::buffered(ReadChannel::new(Cursor::new(vec![1u8, 2, 3]))).unwrap();
        assert_eq!(chan.capabilities(), Capabilities::READ_ONLY);
        assert_eq!(chan.get_ref().buffer_size(), DEFAULT_CHANNEL_BUFFER_SIZE);

        let chan = BufferedChannel::seekable(MemoryChannel::new()).unwrap();
        assert_eq!(chan.capabilities(), Capabilities::SEEKABLE);
    }

    #[test]
    fn test_nested_sources() {
        let inner =
            BufferedChannel::new(SeekableSource::with_capacity(16, MemoryChannel::new()).unwrap());
        let mut outer = SeekableSource::with_capacity(4, inner).unwrap();

        outer.write_all(b"nested buffers").unwrap();
        outer.set_position(7).unwrap();
        let mut word = [0u8; 7];
        outer.read_fully(&mut word).unwrap();
        assert_eq!(&word, b"buffers");

        outer.close().unwrap();
        assert!(!outer.get_ref().is_open());
        assert!(!outer.get_ref().get_ref().get_ref().is_open());
    }

    #[test]
    fn test_end_of_data_reads_as_zero() {
        let mut chan =
            BufferedChannel::buffered(ReadChannel::new(Cursor::new(Vec::<u8>::new()))).unwrap();
        assert_eq!(chan.read(&mut [0u8; 4]).unwrap(), 0);
    }
}
