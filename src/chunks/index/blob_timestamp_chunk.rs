use crate::chunks::blob::{BlobAppender, BlobChunk, BlobChunkIterator};
use crate::chunks::chunk::ChunkEncoding;
use crate::chunks::index::{TimestampIndexAppender, TimestampIndexChunk, TimestampIndexIterator};
use crate::common::Timestamp;
use crate::error::TsdbResult;
use get_size::GetSize;
use std::borrow::Cow;
use std::mem::size_of;

/// A composite chunk carrying its own timestamp sidecar.
///
/// The appender drives the composite and the standalone index in lockstep,
/// so consumers can scan timestamps through [`timestamp_iterator`] without
/// materializing the composite (or opening its value frame) at all.
///
/// [`timestamp_iterator`]: BlobTimestampChunk::timestamp_iterator
#[derive(Clone, Debug, PartialEq)]
pub struct BlobTimestampChunk<'a> {
    bc: BlobChunk<'a>,
    tc: TimestampIndexChunk<'a>,
}

impl BlobTimestampChunk<'static> {
    pub fn new() -> Self {
        BlobTimestampChunk {
            bc: BlobChunk::new(),
            tc: TimestampIndexChunk::new(),
        }
    }
}

impl Default for BlobTimestampChunk<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSize for BlobTimestampChunk<'_> {
    fn get_size(&self) -> usize {
        size_of::<Self>() + self.bc.get_size() + self.tc.get_size()
    }
}

impl<'a> BlobTimestampChunk<'a> {
    pub fn encoding(&self) -> ChunkEncoding {
        self.bc.encoding()
    }

    pub fn num_samples(&self) -> usize {
        self.bc.num_samples()
    }

    pub fn is_empty(&self) -> bool {
        self.bc.is_empty()
    }

    /// The serialized form is the composite envelope; the index is a
    /// RAM-side accelerator and is rebuilt on re-append, not persisted.
    pub fn bytes(&mut self) -> TsdbResult<Cow<'_, [u8]>> {
        self.bc.bytes()
    }

    pub fn compact(&mut self) {
        self.bc.compact();
        self.tc.compact();
    }

    pub fn memory_usage(&self) -> usize {
        self.get_size()
    }

    pub fn appender(&mut self) -> TsdbResult<BlobTimestampAppender<'_, 'a>> {
        let ba = self.bc.appender()?;
        let ta = self.tc.appender()?;
        Ok(BlobTimestampAppender { ba, ta })
    }

    pub fn iterator<'s>(&'s self, reuse: Option<BlobChunkIterator<'_>>) -> BlobChunkIterator<'s> {
        self.bc.iterator(reuse)
    }

    /// Scans the sidecar index alone.
    pub fn timestamp_iterator(&self) -> TimestampIndexIterator<'_> {
        self.tc.iter()
    }

    #[cfg(test)]
    pub(crate) fn index(&self) -> &TimestampIndexChunk<'a> {
        &self.tc
    }
}

pub struct BlobTimestampAppender<'c, 'a> {
    ba: BlobAppender<'c, 'a>,
    ta: TimestampIndexAppender<'c, 'a>,
}

impl BlobTimestampAppender<'_, '_> {
    pub fn append(&mut self, t: Timestamp, v: &[u8]) -> TsdbResult<()> {
        self.ba.append(t, v)?;
        self.ta.append(t)?;
        Ok(())
    }
}
