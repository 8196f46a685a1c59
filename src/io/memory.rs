//! Growable in-memory seekable channel

use super::channel::{Capabilities, Channel};
use super::error::{Error, Result};

/// Number of channel calls observed, per kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub reads: usize,
    pub writes: usize,
    pub seeks: usize,
}

/// A seekable channel backed by a `Vec<u8>`
///
/// Behaves like a file: writing past the end extends the data, seeking past
/// the end is allowed and a later write fills the gap with zeroes. A transfer
/// cap limits how many bytes a single call moves, and a write budget makes
/// the channel stop accepting bytes, which emulates short transfers and
/// back-pressure.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    data: Vec<u8>,
    position: usize,
    caps: Capabilities,
    max_transfer: Option<usize>,
    write_budget: Option<usize>,
    calls: CallCounts,
    closed: bool,
}

impl MemoryChannel {
    /// Empty channel supporting read, write and seek
    pub fn new() -> Self {
        Self::from_bytes(Vec::new())
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            caps: Capabilities::SEEKABLE,
            ..Self::default()
        }
    }

    /// Restrict what the channel reports it can do
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Move at most `max` bytes per read or write call
    pub fn with_max_transfer(mut self, max: usize) -> Self {
        self.max_transfer = Some(max);
        self
    }

    /// Accept only `budget` more written bytes, then report no progress
    pub fn set_write_budget(&mut self, budget: Option<usize>) {
        self.write_budget = budget;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    pub fn reset_calls(&mut self) {
        self.calls = CallCounts::default();
    }

    fn cap(&self, len: usize) -> usize {
        self.max_transfer.map_or(len, |max| len.min(max))
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn check_seek(&self, op: &'static str) -> Result<()> {
        self.check_open()?;
        if self.caps.seek {
            Ok(())
        } else {
            Err(Error::Unsupported(op))
        }
    }
}

impl Channel for MemoryChannel {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        if !self.caps.read {
            return Err(Error::NonReadable);
        }
        self.check_open()?;
        self.calls.reads += 1;

        let available = self.data.len().saturating_sub(self.position);
        let n = self.cap(dst.len()).min(available);
        if n == 0 {
            return Ok(0);
        }
        dst[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        if !self.caps.write {
            return Err(Error::NonWritable);
        }
        self.check_open()?;
        self.calls.writes += 1;

        let mut n = self.cap(src.len());
        if let Some(budget) = self.write_budget.as_mut() {
            n = n.min(*budget);
            *budget -= n;
        }
        if n == 0 {
            return Ok(0);
        }

        let end = self.position + n;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(&src[..n]);
        self.position = end;
        Ok(n)
    }

    fn position(&mut self) -> Result<u64> {
        self.check_seek("position")?;
        Ok(self.position as u64)
    }

    fn set_position(&mut self, pos: u64) -> Result<()> {
        self.check_seek("seek")?;
        self.calls.seeks += 1;
        self.position = usize::try_from(pos)
            .map_err(|_| Error::Io(std::io::Error::other("position exceeds address space")))?;
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        self.check_seek("size")?;
        Ok(self.data.len() as u64)
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        self.check_seek("truncate")?;
        if !self.caps.write {
            return Err(Error::NonWritable);
        }
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len < self.data.len() {
            self.data.truncate(len);
        }
        self.position = self.position.min(len);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
