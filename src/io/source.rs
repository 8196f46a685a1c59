//! Buffered sources over channels
//!
//! A source owns one [`ByteBuffer`] and one [`Channel`] and serves reads and
//! writes out of the buffer, touching the channel only to fill or flush it.
//! [`BufferedSource`] wraps channels that cannot seek; see
//! [`SeekableSource`](super::seekable::SeekableSource) for the seekable one.
//!
//! # Examples
//! ```
//! use bufchan::{BufferedSource, ByteBuffer, Source, WriteChannel};
//!
//! let mut out = BufferedSource::new(ByteBuffer::new(16), WriteChannel::new(Vec::new())).unwrap();
//! out.write_all(b"hello").unwrap();
//! out.request_write(4).unwrap().put_u32(42).unwrap();
//!
//! let sink = out.into_inner().unwrap().into_inner().unwrap();
//! assert_eq!(sink, b"hello\0\0\0\x2a");
//! ```

use tracing::{debug, trace};

use super::buffer::{ByteBuffer, ByteOrder};
use super::buffer_core::BufferCore;
use super::channel::Channel;
use super::error::{Error, Result};

/// Which direction currently owns the buffer contents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// Buffered access to a channel
pub trait Source {
    /// Read into `dst`; `None` once the channel is exhausted.
    fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>>;

    /// Write from `src`, returning how many bytes were taken.
    fn write(&mut self, src: &[u8]) -> Result<usize>;

    /// Contiguous window of at least `required` readable bytes at the cursor.
    fn request_read(&mut self, required: usize) -> Result<&mut ByteBuffer>;

    /// Contiguous window with room for at least `required` bytes at the cursor.
    fn request_write(&mut self, required: usize) -> Result<&mut ByteBuffer>;

    /// Push every pending byte to the channel.
    fn flush(&mut self) -> Result<()>;

    fn position(&mut self) -> Result<u64>;

    fn set_position(&mut self, pos: u64) -> Result<()>;

    fn size(&mut self) -> Result<u64>;

    fn truncate(&mut self, len: u64) -> Result<()>;

    fn order(&self) -> ByteOrder;

    fn set_order(&mut self, order: ByteOrder);

    fn buffer_size(&self) -> usize;

    fn can_read(&self) -> bool;

    fn can_write(&self) -> bool;

    fn can_seek(&self) -> bool;

    fn can_grow(&self) -> bool;

    /// Flush pending writes and close the channel.
    fn close(&mut self) -> Result<()>;

    /// Read until `dst` is full
    fn read_fully(&mut self, dst: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < dst.len() {
            match self.read(&mut dst[filled..])? {
                Some(n) => filled += n,
                None => {
                    return Err(Error::EndOfStream {
                        required: dst.len(),
                        available: filled,
                    })
                }
            }
        }
        Ok(())
    }

    /// Write all of `src`
    fn write_all(&mut self, mut src: &[u8]) -> Result<()> {
        while !src.is_empty() {
            match self.write(src)? {
                0 => return Err(Error::Stalled { pending: src.len() }),
                n => src = &src[n..],
            }
        }
        Ok(())
    }
}

/// Buffered source over a channel that cannot seek
///
/// Usually one-directional. Over a duplex channel both directions share the
/// buffer: switching to reading flushes pending output first, and switching
/// to writing is refused while unread input is buffered, since that input
/// cannot be handed back to the channel.
pub struct BufferedSource<C> {
    buf: ByteBuffer,
    chan: C,
    reader: Option<BufferCore>,
    writer: Option<BufferCore>,
    mode: Mode,
}

impl<C: Channel> BufferedSource<C> {
    /// Wrap `chan`, which must support at least one direction
    pub fn new(mut buffer: ByteBuffer, chan: C) -> Result<Self> {
        let caps = chan.capabilities();
        if !caps.is_usable() {
            return Err(Error::NoCapabilities);
        }
        buffer.mark_empty();

        let reader = BufferCore::reader(caps);
        let writer = BufferCore::writer(caps);
        let mode = if reader.is_some() { Mode::Read } else { Mode::Write };

        debug!(
            readable = caps.read,
            writable = caps.write,
            capacity = buffer.capacity(),
            "buffered source"
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

    /// Flush and hand back the channel without closing it
    pub fn into_inner(mut self) -> Result<C> {
        self.flush()?;
        Ok(self.chan)
    }

    fn set_read(&mut self) -> Result<()> {
        if self.reader.is_none() {
            return Err(Error::NonReadable);
        }
        if self.mode == Mode::Write {
            trace!("set read");
            self.flush()?;
            self.buf.mark_empty();
            self.mode = Mode::Read;
        }
        Ok(())
    }

    fn set_write(&mut self) -> Result<()> {
        if self.writer.is_none() {
            return Err(Error::NonWritable);
        }
        if self.mode == Mode::Read {
            let unread = self.buf.remaining();
            if unread > 0 {
                return Err(Error::PendingInput { unread });
            }
            trace!("set write");
            self.buf.mark_empty();
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

    pub fn position(&mut self) -> Result<u64> {
        Err(Error::Unsupported("position"))
    }

    pub fn set_position(&mut self, _pos: u64) -> Result<()> {
        Err(Error::Unsupported("seek"))
    }

    pub fn size(&mut self) -> Result<u64> {
        Err(Error::Unsupported("size"))
    }

    pub fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(Error::Unsupported("truncate"))
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
        false
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

/// Implement [`Source`] and the `std::io` traits by forwarding to the
/// inherent methods of the same names.
macro_rules! delegate_source {
    ($ty:ident) => {
        impl<C: Channel> Source for $ty<C> {
            fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>> {
                $ty::read(self, dst)
            }

            fn write(&mut self, src: &[u8]) -> Result<usize> {
                $ty::write(self, src)
            }

            fn request_read(&mut self, required: usize) -> Result<&mut ByteBuffer> {
                $ty::request_read(self, required)
            }

            fn request_write(&mut self, required: usize) -> Result<&mut ByteBuffer> {
                $ty::request_write(self, required)
            }

            fn flush(&mut self) -> Result<()> {
                $ty::flush(self)
            }

            fn position(&mut self) -> Result<u64> {
                $ty::position(self)
            }

            fn set_position(&mut self, pos: u64) -> Result<()> {
                $ty::set_position(self, pos)
            }

            fn size(&mut self) -> Result<u64> {
                $ty::size(self)
            }

            fn truncate(&mut self, len: u64) -> Result<()> {
                $ty::truncate(self, len)
            }

            fn order(&self) -> ByteOrder {
                $ty::order(self)
            }

            fn set_order(&mut self, order: ByteOrder) {
                $ty::set_order(self, order)
            }

            fn buffer_size(&self) -> usize {
                $ty::buffer_size(self)
            }

            fn can_read(&self) -> bool {
                $ty::can_read(self)
            }

            fn can_write(&self) -> bool {
                $ty::can_write(self)
            }

            fn can_seek(&self) -> bool {
                $ty::can_seek(self)
            }

            fn can_grow(&self) -> bool {
                $ty::can_grow(self)
            }

            fn close(&mut self) -> Result<()> {
                $ty::close(self)
            }
        }

        impl<C: Channel> std::io::Read for $ty<C> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                Ok($ty::read(self, buf)?.unwrap_or(0))
            }
        }

        impl<C: Channel> std::io::Write for $ty<C> {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok($ty::write(self, buf)?)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok($ty::flush(self)?)
            }
        }
    };
}

pub(crate) use delegate_source;

delegate_source!(BufferedSource);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::channel::{Capabilities, DuplexChannel, ReadChannel, WriteChannel};
    use crate::io::memory::MemoryChannel;
    use std::io::Cursor;

    fn reader(data: &[u8], capacity: usize) -> BufferedSource<ReadChannel<Cursor<Vec<u8>>>> {
        let chan = ReadChannel::new(Cursor::new(data.to_vec()));
        BufferedSource::with_capacity(capacity, chan).unwrap()
    }

    #[test]
    fn test_small_reads_amortize_channel_calls() {
        let data: Vec<u8> = (0..64).collect();
        let chan =
            MemoryChannel::from_bytes(data.clone()).with_capabilities(Capabilities::READ_ONLY);
        let mut src = BufferedSource::with_capacity(16, chan).unwrap();

        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while let Some(n) = src.read(&mut byte).unwrap() {
            out.extend_from_slice(&byte[..n]);
        }
        assert_eq!(out, data);
        // four full fills plus the one that found the channel exhausted
        assert_eq!(src.get_ref().calls().reads, 5);
    }

    #[test]
    fn test_request_read_decodes_in_place() {
        let mut src = reader(&[0, 0, 1, 0, 0xff, 0xfe], 8);
        assert_eq!(src.request_read(4).unwrap().get_u32().unwrap(), 256);

        src.set_order(ByteOrder::LittleEndian);
        assert_eq!(src.request_read(2).unwrap().get_u16().unwrap(), 0xfeff);

        let err = src.request_read(1).unwrap_err();
        assert!(matches!(err, Error::EndOfStream { required: 1, available: 0 }));
    }

    #[test]
    fn test_read_only_source_rejects_writes() {
        let mut src = reader(b"abc", 4);
        assert!(!src.can_write());
        assert!(!src.can_grow());
        assert!(matches!(src.write(b"x"), Err(Error::NonWritable)));
        assert!(matches!(src.request_write(1), Err(Error::NonWritable)));
    }

    #[test]
    fn test_write_only_source_rejects_reads() {
        let mut src = BufferedSource::with_capacity(4, WriteChannel::new(Vec::new())).unwrap();
        assert!(src.can_grow());
        src.write_all(b"ab").unwrap();
        assert!(matches!(src.read(&mut [0u8; 2]), Err(Error::NonReadable)));
        assert!(matches!(src.request_read(1), Err(Error::NonReadable)));
        let sink = src.into_inner().unwrap().into_inner().unwrap();
        assert_eq!(sink, b"ab");
    }

    #[test]
    fn test_positioning_is_unsupported() {
        let mut src = reader(b"abc", 4);
        assert!(!src.can_seek());
        assert!(matches!(src.position(), Err(Error::Unsupported("position"))));
        assert!(matches!(src.set_position(0), Err(Error::Unsupported("seek"))));
        assert!(matches!(src.size(), Err(Error::Unsupported("size"))));
        assert!(matches!(src.truncate(0), Err(Error::Unsupported("truncate"))));
    }

    #[test]
    fn test_large_write_keeps_order() {
        let mut src = BufferedSource::with_capacity(4, WriteChannel::new(Vec::new())).unwrap();
        src.write_all(b"abc").unwrap();
        src.write_all(b"0123456789").unwrap();
        src.write_all(b"z").unwrap();
        let sink = src.into_inner().unwrap().into_inner().unwrap();
        assert_eq!(sink, b"abc0123456789z");
    }

    #[test]
    fn test_duplex_switches_direction() {
        let chan = DuplexChannel::new(Cursor::new(b"ping".to_vec()));
        let mut src = BufferedSource::with_capacity(8, chan).unwrap();

        let mut word = [0u8; 4];
        src.read_fully(&mut word).unwrap();
        assert_eq!(&word, b"ping");

        src.write_all(b"pong").unwrap();
        assert_eq!(src.mode(), Mode::Write);
        src.flush().unwrap();

        let cursor = src.into_inner().unwrap().into_inner().unwrap();
        assert_eq!(cursor.into_inner(), b"pingpong");
    }

    #[test]
    fn test_duplex_refuses_write_over_unread_input() {
        let chan = DuplexChannel::new(Cursor::new(b"abcdef".to_vec()));
        let mut src = BufferedSource::with_capacity(8, chan).unwrap();
        let mut two = [0u8; 2];
        src.read_fully(&mut two).unwrap();
        assert!(matches!(src.write(b"x"), Err(Error::PendingInput { unread: 4 })));
    }

    #[test]
    fn test_no_capabilities() {
        let chan = MemoryChannel::new().with_capabilities(Capabilities::default());
        assert!(matches!(
            BufferedSource::with_capacity(4, chan),
            Err(Error::NoCapabilities)
        ));
    }

    #[test]
    fn test_close_flushes_then_closes() {
        let chan = MemoryChannel::new().with_capabilities(Capabilities::WRITE_ONLY);
        let mut src = BufferedSource::with_capacity(8, chan).unwrap();
        src.write_all(b"tail").unwrap();
        src.close().unwrap();
        assert!(!src.get_ref().is_open());
        assert_eq!(src.get_ref().data(), b"tail");
        src.close().unwrap();
    }

    #[test]
    fn test_std_io_traits() {
        use std::io::{Read, Write};

        let mut src = reader(b"line one\nline two\n", 4);
        let mut text = String::new();
        Read::read_to_string(&mut src, &mut text).unwrap();
        assert_eq!(text, "line one\nline two\n");

        let mut out = BufferedSource::with_capacity(4, WriteChannel::new(Vec::new())).unwrap();
        write!(out, "{}-{}", 12, "ab").unwrap();
        Write::flush(&mut out).unwrap();
        assert_eq!(out.into_inner().unwrap().into_inner().unwrap(), b"12-ab");
    }
}
