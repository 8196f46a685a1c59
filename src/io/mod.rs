pub mod buffer;
pub mod buffer_core;
pub mod buffered_channel;
pub mod channel;
pub mod error;
pub mod memory;
pub mod options;
pub mod seekable;
pub mod source;
pub mod stream;

pub use buffer::*;
pub use buffer_core::*;
pub use buffered_channel::*;
pub use channel::*;
pub use error::*;
pub use memory::*;
pub use options::*;
pub use seekable::*;
pub use source::*;
pub use stream::*;
