pub mod encoding;
mod types;

pub use types::*;
