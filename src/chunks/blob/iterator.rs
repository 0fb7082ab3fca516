use crate::chunks::chunk::ChunkIterator;
use crate::chunks::timestamp::{TimestampChunk, TimestampsIterator};
use crate::chunks::value::{ValueChunk, ValueIterator};
use crate::common::Timestamp;
use crate::error::TsdbError;

/// The finite set of iterator kinds a [`BlobChunk`](super::BlobChunk) hands
/// out. The tag is what iterator reuse preserves across chunks.
pub enum BlobChunkIterator<'a> {
    /// Lockstep over both columns.
    Samples(BlobSamplesIterator<'a>),
    /// Timestamp column only; the value column stays untouched.
    TimestampsOnly(BlobTimestampsIterator<'a>),
}

impl ChunkIterator for BlobChunkIterator<'_> {
    fn next(&mut self) -> bool {
        match self {
            BlobChunkIterator::Samples(it) => it.next(),
            BlobChunkIterator::TimestampsOnly(it) => it.next(),
        }
    }

    fn seek(&mut self, ts: Timestamp) -> bool {
        match self {
            BlobChunkIterator::Samples(it) => it.seek(ts),
            BlobChunkIterator::TimestampsOnly(it) => it.seek(ts),
        }
    }

    fn at(&self) -> (Timestamp, &[u8]) {
        match self {
            BlobChunkIterator::Samples(it) => it.at(),
            BlobChunkIterator::TimestampsOnly(it) => it.at(),
        }
    }

    fn err(&self) -> Option<&TsdbError> {
        match self {
            BlobChunkIterator::Samples(it) => it.err(),
            BlobChunkIterator::TimestampsOnly(it) => it.err(),
        }
    }
}

/// Advances the timestamp and value columns pairwise.
pub struct BlobSamplesIterator<'a> {
    t_it: TimestampsIterator<'a>,
    v_it: ValueIterator<'a>,
    num_read: u16,
    err: Option<TsdbError>,
}

impl<'a> BlobSamplesIterator<'a> {
    pub(crate) fn new(tc: &'a TimestampChunk<'_>, vc: &'a ValueChunk<'_>) -> Self {
        BlobSamplesIterator {
            t_it: tc.iter(),
            v_it: vc.iter(),
            num_read: 0,
            err: None,
        }
    }
}

impl ChunkIterator for BlobSamplesIterator<'_> {
    fn next(&mut self) -> bool {
        if let Some(err) = self.t_it.err() {
            self.err = Some(err.clone());
            return false;
        }
        if let Some(err) = self.v_it.err() {
            self.err = Some(err.clone());
            return false;
        }

        if self.t_it.next() && self.v_it.next() {
            self.num_read += 1;
            return true;
        }
        false
    }

    fn seek(&mut self, ts: Timestamp) -> bool {
        if self.err.is_some() {
            return false;
        }

        while ts > self.t_it.at().0 || self.num_read == 0 {
            if !self.next() {
                return false;
            }
        }
        true
    }

    fn at(&self) -> (Timestamp, &[u8]) {
        (self.t_it.at().0, self.v_it.at().1)
    }

    fn err(&self) -> Option<&TsdbError> {
        self.t_it
            .err()
            .or_else(|| self.v_it.err())
            .or(self.err.as_ref())
    }
}

/// Wraps the timestamp column iterator alone; `at` always reports an empty
/// value.
pub struct BlobTimestampsIterator<'a> {
    t_it: TimestampsIterator<'a>,
}

impl<'a> BlobTimestampsIterator<'a> {
    pub(crate) fn new(tc: &'a TimestampChunk<'_>) -> Self {
        BlobTimestampsIterator { t_it: tc.iter() }
    }
}

impl ChunkIterator for BlobTimestampsIterator<'_> {
    fn next(&mut self) -> bool {
        self.t_it.next()
    }

    fn seek(&mut self, ts: Timestamp) -> bool {
        self.t_it.seek(ts)
    }

    fn at(&self) -> (Timestamp, &[u8]) {
        self.t_it.at()
    }

    fn err(&self) -> Option<&TsdbError> {
        self.t_it.err()
    }
}
