mod blob_chunk;
mod iterator;

pub use blob_chunk::*;
pub use iterator::*;
