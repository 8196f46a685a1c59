//! Buffered source over a seekable channel
//!
//! One read core and one write core share the buffer and the channel; the
//! [`Mode`] says which of them owns the buffer contents. The two layouts
//! relate to the channel position differently:
//!
//! - write mode: buffered bytes have not reached the channel yet, so the
//!   buffer start sits at the channel position and the logical position is
//!   `channel + cursor`
//! - read mode: buffered bytes were fetched ahead, so the buffer end sits at
//!   the channel position and the logical position is `channel - unread`
//!
//! Every mode switch goes through a single reconciliation step, which brings
//! the channel position back in line with the logical one and empties the
//! buffer.
//!
//! # Examples
//! ```
//! use bufchan::{ByteBuffer, MemoryChannel, SeekableSource, Source};
//!
//! let mut src = SeekableSource::new(ByteBuffer::new(8), MemoryChannel::new()).unwrap();
//! src.write_all(b"hello world").unwrap();
//! src.set_position(6).unwrap();
//!
//! let mut word = [0u8; 5];
//! src.read_fully(&mut word).unwrap();
//! assert_eq!(&word, b"world");
//! assert_eq!(src.size().unwrap(), 11);
//! ```

use std::io::{self, SeekFrom};

use tracing::{debug, trace};

use super::buffer::{ByteBuffer, ByteOrder};
use super::buffer_core::BufferCore;
use super::channel::Channel;
use super::error::{Error, Result};
use super::source::{delegate_source, Mode, Source};

/// Buffered source over a seekable channel, switching freely between
/// reading and writing
pub struct SeekableSource<C> {
    buf: ByteBuffer,
    chan: C,
    reader: Option<BufferCore>,
    writer: Option<BufferCore>,
    mode: Mode,
}

impl<C: Channel> SeekableSource<C> {
    /// Wrap `chan`, which must support seeking and at least one direction
    pub fn new(mut buffer: ByteBuffer, chan: C) -> Result<Self> {
        let caps = chan.capabilities();
        if !caps.seek {
            return Err(Error::Unsupported("seek"));
        }
        if !caps.is_usable() {
            return Err(Error::NoCapabilities);
        }
        buffer.mark_empty();

        let reader = BufferCore::reader(caps);
        let writer = BufferCore::writer(caps);
        // a channel that cannot read starts out writing
        let mode = if reader.is_some() { Mode::Read } else { Mode::Write };

        debug!(
            readable = caps.read,
            writable = caps.write,
            capacity = buffer.capacity(),
            "seekable source"
        );

        Ok(Self {
            buf: buffer,
            chan,
            reader,
            writer,
            mode,
        })
    }

    /// Wrap `chan` with a freshly allocated buffer
    pub fn with_capacity(capacity: usize, chan: C) -> Result<Self> {
        Self::new(ByteBuffer::new(capacity), chan)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> &ByteBuffer {
        &self.buf
    }

    pub fn get_ref(&self) -> &C {
        &self.chan
    }

    /// Flush, move the channel to the logical position and return it
    pub fn into_inner(mut self) -> Result<C> {
        self.reconcile()?;
        Ok(self.chan)
    }

    /// Align the channel with the logical position and empty the buffer.
    ///
    /// Write mode flushes everything pending. Read mode moves the channel
    /// back over the bytes that were fetched but not consumed.
    fn reconcile(&mut self) -> Result<()> {
        match self.mode {
            Mode::Write => self.flush()?,
            Mode::Read => {
                let unread = self.buf.remaining();
                if unread > 0 {
                    let pos = self.chan.position()?;
                    self.chan.set_position(pos - unread as u64)?;
                }
            }
        }
        trace!(mode = ?self.mode, "clear");
        self.buf.mark_empty();
        Ok(())
    }

    fn set_read(&mut self) -> Result<()> {
        if self.reader.is_none() {
            return Err(Error::NonReadable);
        }
        if self.mode == Mode::Write {
            trace!("set read");
            self.reconcile()?;
            self.mode = Mode::Read;
        }
        Ok(())
    }

    fn set_write(&mut self) -> Result<()> {
        if self.writer.is_none() {
            return Err(Error::NonWritable);
        }
        if self.mode == Mode::Read {
            trace!("set write");
            self.reconcile()?;
            self.mode = Mode::Write;
        }
        Ok(())
    }

    pub fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>> {
        self.set_read()?;
        let core = self.reader.as_mut().ok_or(Error::NonReadable)?;
        core.read(&mut self.buf, &mut self.chan, dst)
    }

    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        self.set_write()?;
        let core = self.writer.as_mut().ok_or(Error::NonWritable)?;
        core.write(&mut self.buf, &mut self.chan, src)
    }

    pub fn request_read(&mut self, required: usize) -> Result<&mut ByteBuffer> {
        self.set_read()?;
        let core = self.reader.as_mut().ok_or(Error::NonReadable)?;
        core.request_read(&mut self.buf, &mut self.chan, required)
    }

    pub fn request_write(&mut self, required: usize) -> Result<&mut ByteBuffer> {
        self.set_write()?;
        let core = self.writer.as_mut().ok_or(Error::NonWritable)?;
        core.request_write(&mut self.buf, &mut self.chan, required)
    }

    pub fn flush(&mut self) -> Result<()> {
        match (self.mode, self.writer.as_mut()) {
            (Mode::Write, Some(core)) => core.flush_all(&mut self.buf, &mut self.chan),
            _ => Ok(()),
        }
    }

    /// Logical stream position
    pub fn position(&mut self) -> Result<u64> {
        let chan_pos = self.chan.position()?;
        Ok(match self.mode {
            Mode::Write => chan_pos + self.buf.position() as u64,
            Mode::Read => chan_pos - self.buf.remaining() as u64,
        })
    }

    /// Move the logical position.
    ///
    /// Targets inside the buffered window only move the buffer cursor. Any
    /// other target flushes, empties the buffer and seeks the channel.
    pub fn set_position(&mut self, pos: u64) -> Result<()> {
        let chan_pos = self.chan.position()?;

        let offset = match self.mode {
            Mode::Write => {
                let extent = self.buf.written_extent() as u64;
                pos.checked_sub(chan_pos).filter(|delta| *delta <= extent)
            }
            Mode::Read => {
                let limit = self.buf.limit() as u64;
                let start = chan_pos.saturating_sub(limit);
                pos.checked_sub(start).filter(|delta| *delta <= limit)
            }
        };

        match offset {
            Some(offset) => {
                trace!(pos, offset, "position: inside buffer");
                self.buf.set_position(offset as usize);
            }
            None => {
                trace!(pos, "position: outside buffer");
                self.flush()?;
                self.buf.mark_empty();
                self.chan.set_position(pos)?;
            }
        }
        Ok(())
    }

    /// Stream length, counting written bytes that are still buffered
    ///
    /// Never less than the logical position. In write mode the bytes past
    /// the cursor left by a backward seek count too.
    pub fn size(&mut self) -> Result<u64> {
        let size = self.chan.size()?.max(self.position()?);
        Ok(match self.mode {
            Mode::Write => size.max(self.chan.position()? + self.buf.written_extent() as u64),
            Mode::Read => size,
        })
    }

    /// Cut the stream to `len` bytes, after landing every pending write
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        if self.writer.is_none() {
            return Err(Error::NonWritable);
        }
        self.reconcile()?;
        trace!(len, "truncate");
        self.chan.truncate(len)
    }

    pub fn order(&self) -> ByteOrder {
        self.buf.order()
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        trace!(?order, "order");
        self.buf.set_order(order);
    }

    pub fn buffer_size(&self) -> usize {
        self.buf.capacity()
    }

    pub fn can_read(&self) -> bool {
        self.reader.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    pub fn can_seek(&self) -> bool {
        true
    }

    pub fn can_grow(&self) -> bool {
        self.writer.as_ref().is_some_and(BufferCore::can_grow)
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.chan.is_open() {
            return Ok(());
        }
        self.flush()?;
        self.chan.close()?;
        debug!("close");
        Ok(())
    }
}

delegate_source!(SeekableSource);

impl<C: Channel> io::Seek for SeekableSource<C> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position()?.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size()?.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        self.set_position(target)?;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position()?)
    }
}
