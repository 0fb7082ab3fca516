use crate::chunks::BlobChunk;
use crate::common::Timestamp;
use crate::error::{TsdbError, TsdbResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;

/// Columns whose backing buffer carries more slack than this are copied
/// into a tight allocation by `compact`.
pub(crate) const CHUNK_COMPACT_CAPACITY_THRESHOLD: usize = 32;

/// Heap bytes held by a column buffer. Borrowed buffers belong to the loaded
/// envelope and are not counted against the chunk.
pub(crate) fn owned_capacity(data: &Cow<'_, [u8]>) -> usize {
    match data {
        Cow::Owned(buf) => buf.capacity(),
        Cow::Borrowed(_) => 0,
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChunkEncoding {
    None = 0,
    /// The two-column composite envelope (`BlobChunk`).
    #[default]
    Blob = 1,
    Timestamps = 2,
    Values = 3,
}

impl ChunkEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            ChunkEncoding::None => "none",
            ChunkEncoding::Blob => "blob",
            ChunkEncoding::Timestamps => "timestamps",
            ChunkEncoding::Values => "values",
        }
    }
}

impl Display for ChunkEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for ChunkEncoding {
    type Error = TsdbError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChunkEncoding::None),
            1 => Ok(ChunkEncoding::Blob),
            2 => Ok(ChunkEncoding::Timestamps),
            3 => Ok(ChunkEncoding::Values),
            _ => Err(TsdbError::InvalidEncoding(value.to_string())),
        }
    }
}

/// Cursor-style iterator over the samples of a chunk.
///
/// `next` and `seek` return `false` at the end of the chunk or once an error
/// has latched; callers poll `err` after exhaustion to tell the two apart.
/// `at` is only meaningful after a `next`/`seek` that returned `true`.
pub trait ChunkIterator {
    fn next(&mut self) -> bool;

    /// Advances until a sample with timestamp `>= ts` is reached. Always
    /// examines at least one sample, so seeking to `i64::MIN` lands on the
    /// first sample of the chunk.
    fn seek(&mut self, ts: Timestamp) -> bool;

    fn at(&self) -> (Timestamp, &[u8]);

    fn err(&self) -> Option<&TsdbError>;
}

/// A chunk reconstructed from raw bytes by [`from_data`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum DecodedChunk<'a> {
    Blob(BlobChunk<'a>),
}

impl<'a> DecodedChunk<'a> {
    pub fn encoding(&self) -> ChunkEncoding {
        match self {
            DecodedChunk::Blob(chunk) => chunk.encoding(),
        }
    }

    pub fn num_samples(&self) -> usize {
        match self {
            DecodedChunk::Blob(chunk) => chunk.num_samples(),
        }
    }

    pub fn bytes(&mut self) -> TsdbResult<Cow<'_, [u8]>> {
        match self {
            DecodedChunk::Blob(chunk) => chunk.bytes(),
        }
    }

    pub fn iterator<'s>(
        &'s self,
        reuse: Option<crate::chunks::BlobChunkIterator<'_>>,
    ) -> crate::chunks::BlobChunkIterator<'s> {
        match self {
            DecodedChunk::Blob(chunk) => chunk.iterator(reuse),
        }
    }
}

/// Dispatches an encoding tag to the matching chunk loader. The bytes are
/// borrowed, not copied; the returned chunk is immutable.
pub fn from_data(encoding: ChunkEncoding, data: &[u8]) -> TsdbResult<DecodedChunk<'_>> {
    match encoding {
        ChunkEncoding::Blob => Ok(DecodedChunk::Blob(BlobChunk::load(data)?)),
        other => Err(TsdbError::InvalidEncoding(other.to_string())),
    }
}
