//! Source configuration
//!
//! Buffer capacity is fixed when a source is built; byte order can still be
//! changed afterwards through `set_order`.
//!
//! ```rust
//! use bufchan::{ByteOrder, MemoryChannel, SourceOptions};
//!
//! let opts = SourceOptions::small().with_byte_order(ByteOrder::LittleEndian);
//! let src = opts.seekable(MemoryChannel::new()).unwrap();
//! assert_eq!(src.buffer_size(), 4 * 1024);
//! assert_eq!(src.order(), ByteOrder::LittleEndian);
//! ```

use serde::{Deserialize, Serialize};

use super::buffer::{
    ByteBuffer, ByteOrder, DEFAULT_BUFFER_SIZE, LARGE_BUFFER_SIZE, SMALL_BUFFER_SIZE,
};
use super::channel::Channel;
use super::error::Result;
use super::seekable::SeekableSource;
use super::source::BufferedSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Buffer capacity in bytes
    pub buffer_size: usize,
    /// Initial byte order for multi-byte accessors
    pub byte_order: ByteOrder,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            byte_order: ByteOrder::default(),
        }
    }
}

impl SourceOptions {
    /// Memory-constrained preset
    pub fn small() -> Self {
        Self::default().with_buffer_size(SMALL_BUFFER_SIZE)
    }

    /// High-throughput preset
    pub fn large() -> Self {
        Self::default().with_buffer_size(LARGE_BUFFER_SIZE)
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn allocate(&self) -> ByteBuffer {
        ByteBuffer::with_order(self.buffer_size, self.byte_order)
    }

    pub fn buffered<C: Channel>(&self, chan: C) -> Result<BufferedSource<C>> {
        BufferedSource::new(self.allocate(), chan)
    }

    pub fn seekable<C: Channel>(&self, chan: C) -> Result<SeekableSource<C>> {
        SeekableSource::new(self.allocate(), chan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(SourceOptions::default().buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(SourceOptions::small().buffer_size, SMALL_BUFFER_SIZE);
        assert_eq!(SourceOptions::large().buffer_size, LARGE_BUFFER_SIZE);
        assert_eq!(SourceOptions::default().byte_order, ByteOrder::BigEndian);
    }

    #[test]
    fn test_allocate_applies_order() {
        let buf = SourceOptions::default()
            .with_buffer_size(32)
            .with_byte_order(ByteOrder::LittleEndian)
            .allocate();
        assert_eq!(buf.capacity(), 32);
        assert_eq!(buf.order(), ByteOrder::LittleEndian);
    }
}
