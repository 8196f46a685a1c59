//! Single-direction buffering core
//!
//! A [`BufferCore`] owns the fill/flush cycle for one direction of a channel.
//! It does not own the buffer or the channel: the source that composes it
//! lends both on every call, which lets a seekable source run a read core and
//! a write core over the same buffer and channel.

use tracing::trace;

use super::buffer::{BufferAdapter, ByteBuffer};
use super::channel::{Capabilities, Channel};
use super::error::{Error, Result};

/// Direction a core transfers in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Fill/flush state for one direction of a channel
#[derive(Debug)]
pub struct BufferCore {
    direction: Direction,
    dirty: bool,
    /// The channel can be repositioned, so flushing bytes past the cursor can
    /// be undone by rewinding.
    seekable: bool,
}

impl BufferCore {
    /// Read core for a channel, `None` if the channel cannot read
    pub fn reader(caps: Capabilities) -> Option<Self> {
        caps.read.then(|| Self::new(Direction::Read, caps.seek))
    }

    /// Write core for a channel, `None` if the channel cannot write
    pub fn writer(caps: Capabilities) -> Option<Self> {
        caps.write.then(|| Self::new(Direction::Write, caps.seek))
    }

    fn new(direction: Direction, seekable: bool) -> Self {
        trace!(?direction, seekable, "core init");
        Self {
            direction,
            dirty: false,
            seekable,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn can_read(&self) -> bool {
        self.direction == Direction::Read
    }

    pub fn can_write(&self) -> bool {
        self.direction == Direction::Write
    }

    /// Oversized writes may bypass the buffer
    pub fn can_grow(&self) -> bool {
        self.can_write()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        if !self.dirty {
            trace!("mark dirty");
        }
        self.dirty = true;
    }

    /// Refill the buffer from the channel, keeping unconsumed bytes in front.
    ///
    /// Reads until the channel reports no progress or the buffer is full, then
    /// leaves the cursor at the start of the valid window. Returns the number
    /// of bytes fetched.
    pub fn fill<C: Channel + ?Sized>(
        &mut self,
        buf: &mut ByteBuffer,
        chan: &mut C,
    ) -> Result<usize> {
        if !self.can_read() {
            return Ok(0);
        }

        buf.compact();
        let start = buf.position();
        let capacity = buf.capacity();

        let mut end = start;
        let result = loop {
            if end == capacity {
                break Ok(());
            }
            match chan.read(&mut buf.as_mut_slice()[end..capacity]) {
                Ok(0) => break Ok(()),
                Ok(n) => end += n,
                Err(e) => break Err(e),
            }
        };

        buf.set_position(end);
        buf.flip();
        trace!(bytes = end - start, "fill");
        result.map(|()| end - start)
    }

    /// Drain written bytes to the channel.
    ///
    /// On success the buffer is reset for writing and the dirty flag cleared.
    /// If the channel stops accepting bytes, whatever is left stays buffered
    /// and the flag stays set. Returns the number of bytes the channel took.
    pub fn flush<C: Channel + ?Sized>(
        &mut self,
        buf: &mut ByteBuffer,
        chan: &mut C,
    ) -> Result<usize> {
        if !self.can_write() || !self.dirty {
            return Ok(0);
        }

        let cursor = buf.position();
        let end = buf.written_extent();

        let mut written = 0;
        let result = loop {
            if written == end {
                break Ok(());
            }
            match chan.write(&buf.as_slice()[written..end]) {
                Ok(0) => break Ok(()),
                Ok(n) => written += n,
                Err(e) => break Err(e),
            }
        };

        if written == end {
            // bytes past the cursor went out too; the channel must end up
            // where the logical stream is
            self.rewind(chan, end - cursor)?;
            buf.clear();
            self.dirty = false;
        } else {
            let keep_from = cursor.min(written);
            self.rewind(chan, written - keep_from)?;
            buf.shift_written(keep_from);
            trace!(pending = buf.written_extent(), "flush stalled");
        }

        trace!(bytes = written, "flush");
        result.map(|()| written)
    }

    /// Flush and fail if anything is left behind.
    pub fn flush_all<C: Channel + ?Sized>(
        &mut self,
        buf: &mut ByteBuffer,
        chan: &mut C,
    ) -> Result<()> {
        self.flush(buf, chan)?;
        if self.dirty {
            return Err(Error::Stalled {
                pending: buf.written_extent(),
            });
        }
        Ok(())
    }

    fn rewind<C: Channel + ?Sized>(&self, chan: &mut C, by: usize) -> Result<()> {
        if by == 0 || !self.seekable {
            return Ok(());
        }
        let pos = chan.position()?;
        chan.set_position(pos - by as u64)
    }

    /// Read into `dst`, draining the buffer before touching the channel.
    ///
    /// `None` means the channel is exhausted.
    pub fn read<C: Channel + ?Sized>(
        &mut self,
        buf: &mut ByteBuffer,
        chan: &mut C,
        dst: &mut [u8],
    ) -> Result<Option<usize>> {
        if !self.can_read() {
            return Err(Error::NonReadable);
        }
        if dst.is_empty() {
            return Ok(Some(0));
        }

        if let Some(n) = BufferAdapter::new(buf).read(dst) {
            return Ok(Some(n));
        }
        trace!("read: buffer empty");

        self.flush(buf, chan)?;

        if dst.len() > buf.capacity() {
            trace!(len = dst.len(), "read: bypass buffer");
            buf.mark_empty();
            let n = chan.read(dst)?;
            return Ok((n > 0).then_some(n));
        }

        self.fill(buf, chan)?;
        Ok(BufferAdapter::new(buf).read(dst))
    }

    /// Write from `src` into the buffer, flushing it when full.
    ///
    /// Returns `0` if the channel is not accepting bytes and the buffer is
    /// still full; the caller may retry later.
    pub fn write<C: Channel + ?Sized>(
        &mut self,
        buf: &mut ByteBuffer,
        chan: &mut C,
        src: &[u8],
    ) -> Result<usize> {
        if !self.can_write() {
            return Err(Error::NonWritable);
        }
        if src.is_empty() {
            return Ok(0);
        }

        let n = match BufferAdapter::new(buf).write(src) {
            Some(n) => n,
            None => {
                trace!("write: buffer full");
                // pending bytes must reach the channel before anything bypasses them
                self.flush(buf, chan)?;
                if self.dirty {
                    return Ok(0);
                }

                if src.len() > buf.capacity() {
                    trace!(len = src.len(), "write: bypass buffer");
                    buf.mark_empty();
                    chan.write(src)?
                } else {
                    buf.clear();
                    BufferAdapter::new(buf).write(src).unwrap_or(0)
                }
            }
        };

        self.mark_dirty();
        Ok(n)
    }

    /// Guarantee `required` contiguous readable bytes at the buffer cursor
    pub fn request_read<'b, C: Channel + ?Sized>(
        &mut self,
        buf: &'b mut ByteBuffer,
        chan: &mut C,
        required: usize,
    ) -> Result<&'b mut ByteBuffer> {
        if !self.can_read() {
            return Err(Error::NonReadable);
        }
        self.request(buf, chan, required)
    }

    /// Guarantee room for `required` contiguous bytes at the buffer cursor
    pub fn request_write<'b, C: Channel + ?Sized>(
        &mut self,
        buf: &'b mut ByteBuffer,
        chan: &mut C,
        required: usize,
    ) -> Result<&'b mut ByteBuffer> {
        if !self.can_write() {
            return Err(Error::NonWritable);
        }
        let buf = self.request(buf, chan, required)?;
        self.mark_dirty();
        Ok(buf)
    }

    fn request<'b, C: Channel + ?Sized>(
        &mut self,
        buf: &'b mut ByteBuffer,
        chan: &mut C,
        required: usize,
    ) -> Result<&'b mut ByteBuffer> {
        if buf.remaining() >= required {
            return Ok(buf);
        }
        trace!(
            missing = required - buf.remaining(),
            direction = ?self.direction,
            "request"
        );

        self.flush(buf, chan)?;
        self.fill(buf, chan)?;

        if self.can_write() {
            // a fresh write window spans the whole buffer
            buf.set_limit(buf.capacity());
        }

        if buf.remaining() < required {
            return Err(Error::EndOfStream {
                required,
                available: buf.remaining(),
            });
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory::MemoryChannel;

    fn empty(capacity: usize) -> ByteBuffer {
        let mut buf = ByteBuffer::new(capacity);
        buf.mark_empty();
        buf
    }

    #[test]
    fn test_fill_keeps_unconsumed_bytes() {
        let mut chan = MemoryChannel::from_bytes(b"abcdefghij".to_vec()).with_max_transfer(3);
        let mut core = BufferCore::reader(chan.capabilities()).unwrap();
        let mut buf = empty(6);

        assert_eq!(core.fill(&mut buf, &mut chan).unwrap(), 6);
        buf.advance(4);
        assert_eq!(core.fill(&mut buf, &mut chan).unwrap(), 4);
        assert_eq!(buf.chunk(), b"efghij");
        assert_eq!(core.fill(&mut buf, &mut chan).unwrap(), 0);
    }

    #[test]
    fn test_read_bypasses_buffer_for_large_destinations() {
        let mut chan = MemoryChannel::from_bytes((0u8..32).collect());
        let mut core = BufferCore::reader(chan.capabilities()).unwrap();
        let mut buf = empty(4);

        let mut dst = [0u8; 16];
        assert_eq!(core.read(&mut buf, &mut chan, &mut dst).unwrap(), Some(16));
        assert_eq!(dst[15], 15);
        assert_eq!(buf.limit(), 0);
        assert_eq!(chan.calls().reads, 1);
    }

    #[test]
    fn test_read_signals_end_of_stream() {
        let mut chan = MemoryChannel::from_bytes(b"xy".to_vec());
        let mut core = BufferCore::reader(chan.capabilities()).unwrap();
        let mut buf = empty(4);

        let mut dst = [0u8; 4];
        assert_eq!(core.read(&mut buf, &mut chan, &mut dst).unwrap(), Some(2));
        assert_eq!(core.read(&mut buf, &mut chan, &mut dst).unwrap(), None);
    }

    #[test]
    fn test_write_flushes_before_bypass() {
        let mut chan = MemoryChannel::new();
        let mut core = BufferCore::writer(chan.capabilities()).unwrap();
        let mut buf = empty(4);

        assert_eq!(core.write(&mut buf, &mut chan, b"ab").unwrap(), 2);
        assert_eq!(core.write(&mut buf, &mut chan, b"0123456789").unwrap(), 2);
        assert_eq!(core.write(&mut buf, &mut chan, b"23456789").unwrap(), 8);
        assert_eq!(chan.data(), b"ab0123456789");
    }

    #[test]
    fn test_stalled_flush_keeps_pending_bytes() {
        let mut chan = MemoryChannel::new();
        chan.set_write_budget(Some(2));
        let mut core = BufferCore::writer(chan.capabilities()).unwrap();
        let mut buf = ByteBuffer::new(4);

        assert_eq!(core.write(&mut buf, &mut chan, b"abcd").unwrap(), 4);
        assert_eq!(core.flush(&mut buf, &mut chan).unwrap(), 2);
        assert!(core.is_dirty());
        assert_eq!(buf.position(), 2);
        assert_eq!(&buf.as_slice()[..2], b"cd");

        chan.set_write_budget(None);
        assert_eq!(core.flush(&mut buf, &mut chan).unwrap(), 2);
        assert!(!core.is_dirty());
        assert_eq!(chan.data(), b"abcd");
    }

    #[test]
    fn test_request_read_failure_keeps_remaining() {
        let mut chan = MemoryChannel::from_bytes(b"abc".to_vec());
        let mut core = BufferCore::reader(chan.capabilities()).unwrap();
        let mut buf = empty(8);

        assert_eq!(core.request_read(&mut buf, &mut chan, 2).unwrap().remaining(), 3);
        buf.advance(1);
        let err = core.request_read(&mut buf, &mut chan, 4).unwrap_err();
        assert!(matches!(err, Error::EndOfStream { required: 4, available: 2 }));
        assert_eq!(buf.chunk(), b"bc");
    }

    #[test]
    fn test_request_write_extends_window() {
        let mut chan = MemoryChannel::new();
        let mut core = BufferCore::writer(chan.capabilities()).unwrap();
        let mut buf = empty(8);

        core.request_write(&mut buf, &mut chan, 4).unwrap().put_u32(7).unwrap();
        assert!(core.is_dirty());
        assert!(core.request_write(&mut buf, &mut chan, 9).is_err());
        assert_eq!(chan.data(), &[0, 0, 0, 7]);
    }

    #[test]
    fn test_direction_errors() {
        let mut chan = MemoryChannel::new();
        let mut core = BufferCore::writer(chan.capabilities()).unwrap();
        let mut buf = empty(4);
        assert!(matches!(
            core.read(&mut buf, &mut chan, &mut [0u8; 1]),
            Err(Error::NonReadable)
        ));
        assert_eq!(core.fill(&mut buf, &mut chan).unwrap(), 0);
    }
}
