//! Streaming copies between sources

use super::error::Result;
use super::source::Source;

/// Copy everything left in `src` into `dst`
///
/// Reads in chunks of `chunk_size` bytes. Chunks larger than a source's
/// buffer go straight to the channel. Returns the number of bytes copied.
///
/// # Examples
/// ```
/// use bufchan::{transfer, ByteBuffer, MemoryChannel, SeekableSource};
///
/// let chan = MemoryChannel::from_bytes(b"payload".to_vec());
/// let mut src = SeekableSource::new(ByteBuffer::new(8), chan).unwrap();
/// let mut dst = SeekableSource::new(ByteBuffer::new(8), MemoryChannel::new()).unwrap();
///
/// assert_eq!(transfer(&mut src, &mut dst, 3).unwrap(), 7);
/// assert_eq!(dst.into_inner().unwrap().data(), b"payload");
/// ```
pub fn transfer<S, D>(src: &mut S, dst: &mut D, chunk_size: usize) -> Result<u64>
where
    S: Source + ?Sized,
    D: Source + ?Sized,
{
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    while let Some(n) = src.read(&mut chunk)? {
        dst.write_all(&chunk[..n])?;
        total += n as u64;
    }

    dst.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::channel::{ReadChannel, WriteChannel};
    use crate::io::source::BufferedSource;
    use std::io::Cursor;

    #[test]
    fn test_transfer_between_pipes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let chan = ReadChannel::new(Cursor::new(data.clone()));
        let mut src = BufferedSource::with_capacity(64, chan).unwrap();
        let mut dst = BufferedSource::with_capacity(48, WriteChannel::new(Vec::new())).unwrap();

        assert_eq!(transfer(&mut src, &mut dst, 100).unwrap(), 1000);
        assert_eq!(dst.into_inner().unwrap().into_inner().unwrap(), data);
    }

    #[test]
    fn test_transfer_empty() {
        let chan = ReadChannel::new(Cursor::new(Vec::<u8>::new()));
        let mut src = BufferedSource::with_capacity(8, chan).unwrap();
        let mut dst = BufferedSource::with_capacity(8, WriteChannel::new(Vec::new())).unwrap();
        assert_eq!(transfer(&mut src, &mut dst, 0).unwrap(), 0);
    }
}
