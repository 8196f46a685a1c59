//! # bufchan
//!
//! Buffered, optionally bidirectional and seekable access to raw byte
//! channels.
//!
//! A channel (pipe, socket, file, memory region) is wrapped together with a
//! fixed-capacity [`ByteBuffer`] into a source. Small reads and writes are
//! served from the buffer; the channel only sees fills and flushes. Over a
//! seekable channel, [`SeekableSource`] keeps the logical stream position
//! consistent with the channel while switching between reading and writing,
//! and seeks inside the buffered window without any I/O.

pub mod io;
pub use io::*;

/// Install a `tracing` subscriber driven by `RUST_LOG`
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_loads() {
        // Verify core types are accessible
        let _ = ByteOrder::native();
        let _ = Capabilities::SEEKABLE;
        let opts = SourceOptions::default();
        assert_eq!(opts.buffer_size, DEFAULT_BUFFER_SIZE);
    }
}
