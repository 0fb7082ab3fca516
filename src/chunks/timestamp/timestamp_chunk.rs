use crate::chunks::chunk::{owned_capacity, CHUNK_COMPACT_CAPACITY_THRESHOLD};
use crate::chunks::ChunkIterator;
use crate::common::encoding::{try_read_uvarint, write_uvarint};
use crate::common::Timestamp;
use crate::error::{TsdbError, TsdbResult};
use get_size::GetSize;
use std::borrow::Cow;
use std::mem::size_of;

const INITIAL_CAPACITY: usize = 128;

/// Holds only timestamps, encoded with double delta + uvarint.
///
/// The i-th varint is the absolute first timestamp (i = 0), the first delta
/// (i = 1), or the delta-of-delta wrapped in `u64` two's complement (i >= 2).
/// The sample count is not part of the column bytes; the owning chunk
/// supplies it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimestampChunk<'a> {
    pub(crate) data: Cow<'a, [u8]>,
    pub(crate) num: u16,
}

impl TimestampChunk<'static> {
    pub fn new() -> Self {
        TimestampChunk {
            data: Cow::Owned(Vec::with_capacity(INITIAL_CAPACITY)),
            num: 0,
        }
    }
}

impl Default for TimestampChunk<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSize for TimestampChunk<'_> {
    fn get_size(&self) -> usize {
        size_of::<Self>() + owned_capacity(&self.data)
    }
}

impl<'a> TimestampChunk<'a> {
    /// Wraps a column slice of a loaded envelope. The slice is borrowed,
    /// never copied or mutated.
    pub(crate) fn load(data: &'a [u8], num: u16) -> Self {
        TimestampChunk {
            data: Cow::Borrowed(data),
            num,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn num_samples(&self) -> usize {
        self.num as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num == 0
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

    pub fn iter(&self) -> TimestampsIterator<'_> {
        TimestampsIterator::new(&self.data, self.num)
    }

    /// To append we must know the state the appender would have if all
    /// existing samples had been appended from scratch, so the column is
    /// replayed through to the end.
    pub fn appender(&mut self) -> TsdbResult<TimestampAppender<'_, 'a>> {
        if !self.is_mutable() {
            return Err(TsdbError::ImmutableChunk);
        }

        let (t, t_delta) = {
            let mut it = self.iter();
            while it.next() {}
            if let Some(err) = it.err() {
                return Err(err.clone());
            }
            (it.t, it.t_delta)
        };

        Ok(TimestampAppender {
            chunk: self,
            t,
            t_delta,
        })
    }
}

/// Encodes one timestamp of a double-delta stream into `buf` and returns the
/// new running delta. `num` is the count of samples already in the stream.
pub(crate) fn encode_double_delta(
    buf: &mut Vec<u8>,
    num: u16,
    prev_t: i64,
    prev_delta: u64,
    t: Timestamp,
) -> u64 {
    let (t_delta, encoded) = match num {
        0 => (0, t as u64),
        1 => {
            let delta = (t as u64).wrapping_sub(prev_t as u64);
            (delta, delta)
        }
        _ => {
            let delta = (t as u64).wrapping_sub(prev_t as u64);
            (delta, delta.wrapping_sub(prev_delta))
        }
    };
    write_uvarint(buf, encoded);
    t_delta
}

pub struct TimestampAppender<'c, 'a> {
    chunk: &'c mut TimestampChunk<'a>,
    t: i64,
    t_delta: u64,
}

impl TimestampAppender<'_, '_> {
    pub fn append(&mut self, t: Timestamp) -> TsdbResult<()> {
        if self.chunk.num == u16::MAX {
            return Err(TsdbError::CapacityFull(u16::MAX as usize));
        }
        let Cow::Owned(buf) = &mut self.chunk.data else {
            return Err(TsdbError::ImmutableChunk);
        };

        self.t_delta = encode_double_delta(buf, self.chunk.num, self.t, self.t_delta, t);
        self.t = t;
        self.chunk.num += 1;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct TimestampsIterator<'a> {
    data: &'a [u8],
    pos: usize,
    num_total: u16,
    num_read: u16,
    pub(crate) t: i64,
    pub(crate) t_delta: u64,
    err: Option<TsdbError>,
}

impl<'a> TimestampsIterator<'a> {
    pub(crate) fn new(data: &'a [u8], num_total: u16) -> Self {
        TimestampsIterator {
            data,
            pos: 0,
            num_total,
            num_read: 0,
            t: i64::MIN,
            t_delta: 0,
            err: None,
        }
    }
}

impl ChunkIterator for TimestampsIterator<'_> {
    fn next(&mut self) -> bool {
        if self.err.is_some() || self.num_read == self.num_total {
            return false;
        }

        let mut rest = &self.data[self.pos..];
        let before = rest.len();
        let value = match try_read_uvarint(&mut rest) {
            Ok(value) => value,
            Err(err) => {
                self.err = Some(err);
                return false;
            }
        };
        self.pos += before - rest.len();

        if self.num_read == 0 {
            self.t = value as i64;
        } else if self.num_read == 1 {
            self.t_delta = value;
            self.t = self.t.wrapping_add(self.t_delta as i64);
        } else {
            self.t_delta = (self.t_delta as i64).wrapping_add(value as i64) as u64;
            self.t = self.t.wrapping_add(self.t_delta as i64);
        }

        self.num_read += 1;
        true
    }

    fn seek(&mut self, ts: Timestamp) -> bool {
        if self.err.is_some() {
            return false;
        }

        while ts > self.t || self.num_read == 0 {
            if !self.next() {
                return false;
            }
        }
        true
    }

    fn at(&self) -> (Timestamp, &[u8]) {
        // Bytes are never stored in this column.
        (self.t, &[])
    }

    fn err(&self) -> Option<&TsdbError> {
        self.err.as_ref()
    }
}
