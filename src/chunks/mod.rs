mod blob;
mod chunk;
mod index;
mod timestamp;
mod value;

pub use blob::*;
pub use chunk::*;
pub use index::*;
pub use timestamp::*;
pub use value::*;
