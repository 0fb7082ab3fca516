use crate::chunks::chunk::{owned_capacity, ChunkIterator, CHUNK_COMPACT_CAPACITY_THRESHOLD};
use crate::chunks::timestamp::{encode_double_delta, TimestampsIterator};
use crate::common::encoding::read_u16_be;
use crate::common::Timestamp;
use crate::error::{TsdbError, TsdbResult};
use get_size::GetSize;
use std::borrow::Cow;
use std::mem::size_of;

const COUNT_PREFIX_SIZE: usize = 2;
const INITIAL_CAPACITY: usize = 128;

/// A standalone double-delta timestamp stream used as a fast-seek index
/// next to a composite chunk.
///
/// Unlike the composite's timestamp column, this one is self-contained: its
/// buffer starts with a big-endian `u16` sample count, so it can be handed
/// around without a carrier supplying the count.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimestampIndexChunk<'a> {
    data: Cow<'a, [u8]>,
}

impl TimestampIndexChunk<'static> {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(INITIAL_CAPACITY);
        buf.extend_from_slice(&0u16.to_be_bytes());
        TimestampIndexChunk {
            data: Cow::Owned(buf),
        }
    }
}

impl Default for TimestampIndexChunk<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSize for TimestampIndexChunk<'_> {
    fn get_size(&self) -> usize {
        size_of::<Self>() + owned_capacity(&self.data)
    }
}

impl<'a> TimestampIndexChunk<'a> {
    pub fn load(data: &'a [u8]) -> TsdbResult<Self> {
        if data.len() < COUNT_PREFIX_SIZE {
            return Err(TsdbError::DecodingError(
                "timestamp index shorter than its count prefix".to_string(),
            ));
        }
        Ok(TimestampIndexChunk {
            data: Cow::Borrowed(data),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn num_samples(&self) -> usize {
        self.num() as usize
    }

    fn num(&self) -> u16 {
        read_u16_be(&self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.num() == 0
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self.data, Cow::Owned(_))
    }

    pub fn compact(&mut self) {
        if let Cow::Owned(buf) = &mut self.data {
            if buf.capacity() > buf.len() + CHUNK_COMPACT_CAPACITY_THRESHOLD {
                buf.shrink_to_fit();
            }
        }
    }

    pub fn iter(&self) -> TimestampIndexIterator<'_> {
        TimestampIndexIterator {
            it: TimestampsIterator::new(&self.data[COUNT_PREFIX_SIZE..], self.num()),
        }
    }

    pub fn appender(&mut self) -> TsdbResult<TimestampIndexAppender<'_, 'a>> {
        if !self.is_mutable() {
            return Err(TsdbError::ImmutableChunk);
        }

        let (t, t_delta) = {
            let mut it = self.iter();
            while it.next() {}
            if let Some(err) = it.err() {
                return Err(err.clone());
            }
            (it.it.t, it.it.t_delta)
        };

        Ok(TimestampIndexAppender {
            chunk: self,
            t,
            t_delta,
        })
    }
}

pub struct TimestampIndexAppender<'c, 'a> {
    chunk: &'c mut TimestampIndexChunk<'a>,
    t: i64,
    t_delta: u64,
}

impl TimestampIndexAppender<'_, '_> {
    pub fn append(&mut self, t: Timestamp) -> TsdbResult<()> {
        let num = self.chunk.num();
        if num == u16::MAX {
            return Err(TsdbError::CapacityFull(u16::MAX as usize));
        }
        let Cow::Owned(buf) = &mut self.chunk.data else {
            return Err(TsdbError::ImmutableChunk);
        };

        self.t_delta = encode_double_delta(buf, num, self.t, self.t_delta, t);
        self.t = t;
        buf[..COUNT_PREFIX_SIZE].copy_from_slice(&(num + 1).to_be_bytes());
        Ok(())
    }
}

/// Cursor over the index stream; yields bare timestamps.
pub struct TimestampIndexIterator<'a> {
    it: TimestampsIterator<'a>,
}

impl TimestampIndexIterator<'_> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        ChunkIterator::next(&mut self.it)
    }

    pub fn seek(&mut self, ts: Timestamp) -> bool {
        ChunkIterator::seek(&mut self.it, ts)
    }

    pub fn at(&self) -> Timestamp {
        ChunkIterator::at(&self.it).0
    }

    pub fn err(&self) -> Option<&TsdbError> {
        ChunkIterator::err(&self.it)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chunk: &TimestampIndexChunk<'_>) -> Vec<Timestamp> {
        let mut out = Vec::new();
        let mut it = chunk.iter();
        while it.next() {
            out.push(it.at());
        }
        assert_eq!(it.err(), None);
        out
    }

    #[test]
    fn count_prefix_plus_one_byte_per_sample() {
        let mut chunk = TimestampIndexChunk::new();
        let mut app = chunk.appender().unwrap();
        for i in 0..10_000 {
            app.append(i).unwrap();
        }
        drop(app);

        // First two full samples and the rest one byte each, plus the count.
        assert_eq!(chunk.bytes().len(), 10_002);
        assert_eq!(chunk.num_samples(), 10_000);
    }

    #[test]
    fn loaded_index_round_trips() {
        let mut chunk = TimestampIndexChunk::new();
        let mut app = chunk.appender().unwrap();
        for i in 0..10_000 {
            app.append(i).unwrap();
        }
        drop(app);

        let data = chunk.bytes().to_vec();
        let loaded = TimestampIndexChunk::load(&data).unwrap();
        assert_eq!(loaded.num_samples(), 10_000);
        assert_eq!(collect(&loaded), (0..10_000).collect::<Vec<_>>());
    }

    #[test]
    fn appender_resumes_existing_index() {
        let mut chunk = TimestampIndexChunk::new();
        {
            let mut app = chunk.appender().unwrap();
            for i in 0..5 {
                app.append(i * 1_000).unwrap();
            }
        }
        {
            let mut app = chunk.appender().unwrap();
            for i in 5..10 {
                app.append(i * 1_000).unwrap();
            }
        }

        assert_eq!(collect(&chunk), (0..10).map(|i| i * 1_000).collect::<Vec<_>>());
    }

    #[test]
    fn seek_lands_on_first_gte() {
        let mut chunk = TimestampIndexChunk::new();
        let mut app = chunk.appender().unwrap();
        for i in 0..10 {
            app.append(i * 10).unwrap();
        }
        drop(app);

        let mut it = chunk.iter();
        assert!(it.seek(35));
        assert_eq!(it.at(), 40);
        assert!(!it.seek(1_000));
    }

    #[test]
    fn truncated_index_is_rejected_or_latches() {
        assert!(TimestampIndexChunk::load(&[0]).is_err());

        let mut chunk = TimestampIndexChunk::new();
        let mut app = chunk.appender().unwrap();
        for i in 0..3 {
            app.append(i * 1_000_000).unwrap();
        }
        drop(app);

        let mut data = chunk.bytes().to_vec();
        data.truncate(data.len() - 1);
        let loaded = TimestampIndexChunk::load(&data).unwrap();
        let mut it = loaded.iter();
        assert!(it.next());
        assert!(it.next());
        assert!(!it.next());
        assert!(it.err().is_some());
    }

    #[test]
    fn loaded_index_rejects_appender() {
        let data = vec![0, 0];
        let mut loaded = TimestampIndexChunk::load(&data).unwrap();
        assert_eq!(loaded.appender().err(), Some(TsdbError::ImmutableChunk));
    }
}
