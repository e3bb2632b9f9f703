mod data_storage;
mod stream_buffer;

pub use data_storage::*;
pub use stream_buffer::*;
