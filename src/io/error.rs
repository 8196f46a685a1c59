//! Error taxonomy for buffered sources and channels

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A contiguous span could not be provided after one flush+fill cycle.
    #[error("end of stream: {required} bytes requested, {available} available")]
    EndOfStream { required: usize, available: usize },

    #[error("channel is not readable")]
    NonReadable,

    #[error("channel is not writable")]
    NonWritable,

    /// Positioning operation invoked on a source or channel that cannot seek.
    #[error("{0} is not supported by this source")]
    Unsupported(&'static str),

    #[error("channel is neither readable nor writable")]
    NoCapabilities,

    /// Unread input would be lost by switching a non-seekable source to writing.
    #[error("{unread} unread bytes are buffered; drain them before writing")]
    PendingInput { unread: usize },

    /// The channel stopped accepting bytes while a complete flush was required.
    #[error("channel stalled with {pending} bytes still buffered")]
    Stalled { pending: usize },

    #[error("channel is closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Capability errors are configuration mistakes and must never be retried.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            Error::NonReadable | Error::NonWritable | Error::Unsupported(_) | Error::NoCapabilities
        )
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Io(inner) => return inner,
            Error::EndOfStream { .. } => io::ErrorKind::UnexpectedEof,
            Error::NonReadable
            | Error::NonWritable
            | Error::Unsupported(_)
            | Error::NoCapabilities => io::ErrorKind::Unsupported,
            Error::PendingInput { .. } => io::ErrorKind::InvalidInput,
            Error::Stalled { .. } => io::ErrorKind::WriteZero,
            Error::Closed => io::ErrorKind::NotConnected,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
