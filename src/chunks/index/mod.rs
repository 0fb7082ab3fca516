mod blob_timestamp_chunk;
mod timestamp_index_chunk;

pub use blob_timestamp_chunk::*;
pub use timestamp_index_chunk::*;
