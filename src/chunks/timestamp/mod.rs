mod timestamp_chunk;

pub use timestamp_chunk::*;
