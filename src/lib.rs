//! Columnar chunk codec for time series of opaque byte blobs.
//!
//! A chunk stores an ordered sequence of `(timestamp, value bytes)` samples
//! in two independent columns, so readers that only need timestamps can skip
//! the value column (and its decompression) entirely. Timestamps are encoded
//! with double delta + varint, values as length-prefixed blobs framed with
//! zstd on flush.

pub mod chunks;
pub mod common;
mod error;
pub mod reader;

pub use chunks::{
    BlobAppender, BlobChunk, BlobChunkIterator, BlobTimestampChunk, ChunkEncoding, ChunkIterator,
    DecodedChunk, TimestampChunk, TimestampIndexChunk, ValueChunk, from_data,
};
pub use common::{Sample, Timestamp};
pub use error::{TsdbError, TsdbResult};
