//! Fixed-capacity byte buffers
//!
//! A [`ByteBuffer`] is a fixed region with three markers: the start, a cursor
//! (`position`) and the end of valid data (`limit`). Sources use it in two
//! layouts:
//!
//! - reading: `[0, limit)` holds bytes fetched from the channel and
//!   `[position, limit)` is what the caller has not consumed yet
//! - writing: `[0, position)` holds bytes written by the caller and
//!   `[position, limit)` is free space
//!
//! [`BufferAdapter`] lets the valid window of a buffer be treated as a channel.

use serde::{Deserialize, Serialize};

use super::channel::{Capabilities, Channel};
use super::error::{Error, Result};

/// Default buffer size for I/O operations (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Large buffer size for high-throughput operations (1MB)
pub const LARGE_BUFFER_SIZE: usize = 1024 * 1024;

/// Small buffer size for memory-constrained scenarios (4KB)
pub const SMALL_BUFFER_SIZE: usize = 4 * 1024;

/// Byte order applied to multi-byte accessors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Byte order of the host platform
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }
}

macro_rules! typed_accessors {
    ($($get:ident, $put:ident, $ty:ty;)*) => {
        $(
            #[doc = concat!(
                "Read a `",
                stringify!($ty),
                "` at the cursor in the buffer's byte order"
            )]
            pub fn $get(&mut self) -> Result<$ty> {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                self.get_bytes(&mut raw)?;
                Ok(match self.order {
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                })
            }

            #[doc = concat!(
                "Write a `",
                stringify!($ty),
                "` at the cursor in the buffer's byte order"
            )]
            pub fn $put(&mut self, value: $ty) -> Result<()> {
                let raw = match self.order {
                    ByteOrder::BigEndian => value.to_be_bytes(),
                    ByteOrder::LittleEndian => value.to_le_bytes(),
                };
                self.put_bytes(&raw)
            }
        )*
    };
}

/// Fixed-capacity byte region with a cursor and a valid-data limit
#[derive(Clone, Debug)]
pub struct ByteBuffer {
    data: Box<[u8]>,
    position: usize,
    limit: usize,
    /// Furthest cursor reached since the last reset, kept so that moving the
    /// cursor backwards does not forget bytes already written past it.
    high_water: usize,
    order: ByteOrder,
}

impl ByteBuffer {
    /// Allocate a zeroed buffer whose limit equals its capacity
    pub fn new(capacity: usize) -> Self {
        Self::with_order(capacity, ByteOrder::default())
    }

    /// Allocate a buffer with an explicit byte order
    pub fn with_order(capacity: usize, order: ByteOrder) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            position: 0,
            limit: capacity,
            high_water: 0,
            order,
        }
    }

    /// Size of the backing region
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current cursor
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor
    ///
    /// # Panics
    /// Panics if `position` is past the limit.
    pub fn set_position(&mut self, position: usize) {
        assert!(
            position <= self.limit,
            "position {position} past limit {}",
            self.limit
        );
        self.high_water = self.high_water.max(self.position);
        self.position = position;
    }

    /// End of the valid window
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Move the end of the valid window, pulling the cursor back if needed
    ///
    /// # Panics
    /// Panics if `limit` exceeds the capacity.
    pub fn set_limit(&mut self, limit: usize) {
        assert!(
            limit <= self.capacity(),
            "limit {limit} past capacity {}",
            self.capacity()
        );
        self.limit = limit;
        self.position = self.position.min(limit);
        self.high_water = self.high_water.min(limit);
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// End of the bytes written so far in the writing layout.
    pub fn written_extent(&self) -> usize {
        self.position.max(self.high_water)
    }

    /// Reset for writing: cursor at the start, limit at the capacity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity();
        self.high_water = 0;
    }

    /// Reset to an empty window: nothing left to read, no room to write.
    pub fn mark_empty(&mut self) {
        self.position = 0;
        self.limit = 0;
        self.high_water = 0;
    }

    /// Make what was written readable from the start.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
        self.high_water = 0;
    }

    /// Move `[position, limit)` to the start and open the rest for writing.
    pub fn compact(&mut self) {
        let unread = self.remaining();
        self.data.copy_within(self.position..self.limit, 0);
        self.position = unread;
        self.limit = self.capacity();
        self.high_water = 0;
    }

    /// Drop the first `n` written bytes, moving the rest of the writing
    /// layout to the front.
    pub(crate) fn shift_written(&mut self, n: usize) {
        let extent = self.written_extent();
        self.data.copy_within(n..extent, 0);
        self.position -= n;
        self.high_water = extent - n;
        self.limit = self.capacity();
    }

    /// Advance the cursor by `n` bytes
    ///
    /// # Panics
    /// Panics if fewer than `n` bytes remain.
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.remaining(), "advance {n} past limit");
        self.position += n;
    }

    /// Bytes between the cursor and the limit
    pub fn chunk(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Mutable bytes between the cursor and the limit
    pub fn chunk_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.position..self.limit]
    }

    /// The whole backing region regardless of markers.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy exactly `dst.len()` bytes out of the buffer
    pub fn get_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        if dst.len() > self.remaining() {
            return Err(Error::EndOfStream {
                required: dst.len(),
                available: self.remaining(),
            });
        }
        let end = self.position + dst.len();
        dst.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(())
    }

    /// Copy all of `src` into the buffer
    pub fn put_bytes(&mut self, src: &[u8]) -> Result<()> {
        if src.len() > self.remaining() {
            return Err(Error::EndOfStream {
                required: src.len(),
                available: self.remaining(),
            });
        }
        let end = self.position + src.len();
        self.data[self.position..end].copy_from_slice(src);
        self.position = end;
        Ok(())
    }

    typed_accessors! {
        get_u8, put_u8, u8;
        get_i8, put_i8, i8;
        get_u16, put_u16, u16;
        get_i16, put_i16, i16;
        get_u32, put_u32, u32;
        get_i32, put_i32, i32;
        get_u64, put_u64, u64;
        get_i64, put_i64, i64;
        get_f32, put_f32, f32;
        get_f64, put_f64, f64;
    }
}

impl From<Vec<u8>> for ByteBuffer {
    /// Wrap existing bytes as a readable window over all of them.
    fn from(bytes: Vec<u8>) -> Self {
        let limit = bytes.len();
        Self {
            data: bytes.into_boxed_slice(),
            position: 0,
            limit,
            high_water: 0,
            order: ByteOrder::default(),
        }
    }
}

/// View over a [`ByteBuffer`] that behaves like a channel
///
/// Transfers copy between the caller's slice and the buffer's valid window,
/// moving the buffer cursor. `None` signals that the window is exhausted,
/// which is distinct from a zero-length transfer.
pub struct BufferAdapter<'a> {
    buf: &'a mut ByteBuffer,
}

impl<'a> BufferAdapter<'a> {
    pub fn new(buf: &'a mut ByteBuffer) -> Self {
        Self { buf }
    }

    /// Copy up to `dst.len()` bytes out of the window.
    pub fn read(&mut self, dst: &mut [u8]) -> Option<usize> {
        if !self.buf.has_remaining() {
            return None;
        }
        let n = dst.len().min(self.buf.remaining());
        let start = self.buf.position;
        dst[..n].copy_from_slice(&self.buf.data[start..start + n]);
        self.buf.position += n;
        Some(n)
    }

    /// Copy up to `src.len()` bytes into the window.
    pub fn write(&mut self, src: &[u8]) -> Option<usize> {
        if !self.buf.has_remaining() {
            return None;
        }
        let n = src.len().min(self.buf.remaining());
        let start = self.buf.position;
        self.buf.data[start..start + n].copy_from_slice(&src[..n]);
        self.buf.position += n;
        Some(n)
    }
}

impl Channel for BufferAdapter<'_> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        Ok(BufferAdapter::read(self, dst).unwrap_or(0))
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        Ok(BufferAdapter::write(self, src).unwrap_or(0))
    }
}
