mod value_chunk;

pub use value_chunk::*;
