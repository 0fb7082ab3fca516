use crate::chunks::blob::{BlobChunkIterator, BlobSamplesIterator, BlobTimestampsIterator};
use crate::chunks::chunk::ChunkEncoding;
use crate::chunks::timestamp::{TimestampAppender, TimestampChunk};
use crate::chunks::value::{ValueAppender, ValueChunk};
use crate::common::encoding::{read_u16_be, read_u32_be, write_u16_be, write_u32_be};
use crate::common::Timestamp;
use crate::error::{TsdbError, TsdbResult};
use get_size::GetSize;
use std::borrow::Cow;
use std::mem::size_of;

/// `u16` sample count followed by two `u32` column lengths, all big endian.
pub const BLOB_CHUNK_HEADER_SIZE: usize = 10;

/// Combines a timestamp column and a value column over the same samples.
///
/// The two columns are kept apart so that scans which only need timestamps
/// (locating a chunk's time range, seeking) never touch the value column and
/// its zstd frame. A chunk is either mutable, owning growable column
/// buffers, or loaded from an envelope slice whose sub-columns borrow from
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct BlobChunk<'a> {
    pub(crate) tc: TimestampChunk<'a>,
    pub(crate) vc: ValueChunk<'a>,

    /// The envelope verbatim, present only on loaded chunks.
    data: Option<Cow<'a, [u8]>>,
    num: u16,
}

impl BlobChunk<'static> {
    pub fn new() -> Self {
        BlobChunk {
            tc: TimestampChunk::new(),
            vc: ValueChunk::new(),
            data: None,
            num: 0,
        }
    }
}

impl Default for BlobChunk<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSize for BlobChunk<'_> {
    fn get_size(&self) -> usize {
        size_of::<Self>() + self.tc.get_size() + self.vc.get_size()
    }
}

impl<'a> BlobChunk<'a> {
    /// Parses the envelope header and wraps the column subslices. Performs
    /// no decompression and copies nothing; trailing bytes past the declared
    /// columns are tolerated.
    pub fn load(data: &'a [u8]) -> TsdbResult<Self> {
        if data.len() < BLOB_CHUNK_HEADER_SIZE {
            return Err(TsdbError::DecodingError(
                "chunk envelope shorter than its header".to_string(),
            ));
        }

        let num = read_u16_be(data);
        let timestamp_len = read_u32_be(&data[2..]) as usize;
        let value_len = read_u32_be(&data[6..]) as usize;

        let timestamp_start = BLOB_CHUNK_HEADER_SIZE;
        let timestamp_end = timestamp_start + timestamp_len;
        let value_end = timestamp_end + value_len;
        if value_end > data.len() {
            log::warn!(
                "chunk envelope declares {timestamp_len}+{value_len} column bytes in a {} byte buffer",
                data.len()
            );
            return Err(TsdbError::DecodingError(
                "chunk envelope column lengths exceed the buffer".to_string(),
            ));
        }

        Ok(BlobChunk {
            tc: TimestampChunk::load(&data[timestamp_start..timestamp_end], num),
            vc: ValueChunk::load(&data[timestamp_end..value_end], num),
            data: Some(Cow::Borrowed(data)),
            num,
        })
    }

    pub fn encoding(&self) -> ChunkEncoding {
        ChunkEncoding::Blob
    }

    pub fn num_samples(&self) -> usize {
        if self.data.is_none() {
            // The timestamp column is written last, so its count is the
            // authoritative one.
            return self.tc.num_samples();
        }
        self.num as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    pub fn is_mutable(&self) -> bool {
        self.data.is_none()
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        use crate::chunks::ChunkIterator;
        let mut it = self.tc.iter();
        if it.next() {
            return Some(it.at().0);
        }
        None
    }

    pub fn compact(&mut self) {
        self.tc.compact();
        self.vc.compact();
    }

    pub fn memory_usage(&self) -> usize {
        self.get_size()
    }

    /// Serializes the envelope: header, timestamp column verbatim, value
    /// column as a zstd frame. Loaded chunks return their original buffer
    /// unchanged.
    pub fn bytes(&mut self) -> TsdbResult<Cow<'_, [u8]>> {
        if let Some(data) = &self.data {
            return Ok(Cow::Borrowed(data.as_ref()));
        }

        let num = self.tc.num;
        let value_bytes = self.vc.bytes()?;
        let timestamp_bytes = self.tc.bytes();

        let mut out =
            Vec::with_capacity(BLOB_CHUNK_HEADER_SIZE + timestamp_bytes.len() + value_bytes.len());
        write_u16_be(&mut out, num);
        write_u32_be(&mut out, timestamp_bytes.len() as u32);
        write_u32_be(&mut out, value_bytes.len() as u32);
        out.extend_from_slice(timestamp_bytes);
        out.extend_from_slice(value_bytes);
        Ok(Cow::Owned(out))
    }

    pub fn appender(&mut self) -> TsdbResult<BlobAppender<'_, 'a>> {
        if !self.is_mutable() {
            return Err(TsdbError::ImmutableChunk);
        }
        let ta = self.tc.appender()?;
        let va = self.vc.appender()?;
        Ok(BlobAppender { ta, va })
    }

    /// Returns an iterator over the chunk, reusing the kind of `reuse` when
    /// it is the timestamp-only variant: a scan over many chunks keeps
    /// skipping value columns by passing its iterator back in. Anything else
    /// yields a fresh paired iterator.
    pub fn iterator<'s>(&'s self, reuse: Option<BlobChunkIterator<'_>>) -> BlobChunkIterator<'s> {
        if let Some(BlobChunkIterator::TimestampsOnly(_)) = reuse {
            return self.timestamps_only_iterator();
        }
        BlobChunkIterator::Samples(BlobSamplesIterator::new(&self.tc, &self.vc))
    }

    /// Iterates the timestamp column alone; the value column is never
    /// touched, so no decompression happens.
    pub fn timestamps_only_iterator(&self) -> BlobChunkIterator<'_> {
        BlobChunkIterator::TimestampsOnly(BlobTimestampsIterator::new(&self.tc))
    }
}

pub struct BlobAppender<'c, 'a> {
    ta: TimestampAppender<'c, 'a>,
    va: ValueAppender<'c, 'a>,
}

impl BlobAppender<'_, '_> {
    /// Appends the value first and the timestamp second: if the process dies
    /// between the two, the next load sees the (authoritative) timestamp
    /// count and the trailing value record is simply unreachable, never a
    /// phantom sample.
    pub fn append(&mut self, t: Timestamp, v: &[u8]) -> TsdbResult<()> {
        self.va.append(v)?;
        self.ta.append(t)?;
        Ok(())
    }
}
