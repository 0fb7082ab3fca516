use crate::chunks::chunk::{owned_capacity, CHUNK_COMPACT_CAPACITY_THRESHOLD};
use crate::chunks::ChunkIterator;
use crate::common::encoding::{try_read_uvarint, write_uvarint};
use crate::common::Timestamp;
use crate::error::{TsdbError, TsdbResult};
use get_size::GetSize;
use std::borrow::Cow;
use std::mem::size_of;
use std::ops::Range;

/// RFC 8478 frame magic; the value column rejects anything else on read.
pub(crate) const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Flush compresses at the fastest level: profiles are large and chunks are
/// flushed once, so throughput wins over ratio.
const ZSTD_FASTEST_LEVEL: i32 = 1;

/// A single space stands in for the empty blob on the wire. Kept bit-for-bit
/// for compatibility with existing chunk files.
pub(crate) const EMPTY_VALUE_SENTINEL: u8 = b' ';

const INITIAL_CAPACITY: usize = 512;

/// Holds opaque variable-length blobs as `uvarint(len) || bytes` records.
///
/// The in-memory form is uncompressed; `bytes` frames the whole record
/// buffer with zstd and caches the result until the next append. A column
/// built from a loaded envelope carries only the compressed frame and
/// decodes it into iterator-owned scratch on first read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueChunk<'a> {
    pub(crate) data: Cow<'a, [u8]>,
    pub(crate) compressed: Option<Cow<'a, [u8]>>,
    pub(crate) num: u16,
}

impl ValueChunk<'static> {
    pub fn new() -> Self {
        ValueChunk {
            data: Cow::Owned(Vec::with_capacity(INITIAL_CAPACITY)),
            compressed: None,
            num: 0,
        }
    }
}

impl Default for ValueChunk<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl GetSize for ValueChunk<'_> {
    fn get_size(&self) -> usize {
        size_of::<Self>()
            + owned_capacity(&self.data)
            + self.compressed.as_ref().map_or(0, owned_capacity)
    }
}

impl<'a> ValueChunk<'a> {
    /// Wraps the zstd-framed column slice of a loaded envelope. No
    /// decompression happens until an iterator is constructed.
    pub(crate) fn load(compressed: &'a [u8], num: u16) -> Self {
        ValueChunk {
            data: Cow::Borrowed(&[]),
            compressed: Some(Cow::Borrowed(compressed)),
            num,
        }
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

    /// Returns the zstd frame for the column, compressing and caching it on
    /// first call. Loaded columns return their frame verbatim.
    pub fn bytes(&mut self) -> TsdbResult<&[u8]> {
        if self.compressed.is_none() {
            let frame = zstd::encode_all(self.data.as_ref(), ZSTD_FASTEST_LEVEL)
                .map_err(|e| TsdbError::CannotCompress(e.to_string()))?;
            self.compressed = Some(Cow::Owned(frame));
        }
        Ok(self.compressed.as_deref().unwrap_or_default())
    }

    pub fn appender(&mut self) -> TsdbResult<ValueAppender<'_, 'a>> {
        if !self.is_mutable() {
            return Err(TsdbError::ImmutableChunk);
        }
        Ok(ValueAppender { chunk: self })
    }

    pub fn iter(&self) -> ValueIterator<'_> {
        if self.is_mutable() {
            return ValueIterator::over(Cow::Borrowed(self.data.as_ref()), self.num);
        }

        let frame = self.compressed.as_deref().unwrap_or_default();
        match decompress_frame(frame) {
            Ok(raw) => ValueIterator::over(Cow::Owned(raw), self.num),
            Err(err) => {
                log::warn!("failed to decode value column frame: {err}");
                ValueIterator::failed(err)
            }
        }
    }
}

fn decompress_frame(frame: &[u8]) -> TsdbResult<Vec<u8>> {
    if frame.len() < ZSTD_MAGIC.len() || frame[..ZSTD_MAGIC.len()] != ZSTD_MAGIC {
        return Err(TsdbError::CannotDecompress(
            "value column does not start with a zstd frame".to_string(),
        ));
    }
    zstd::decode_all(frame).map_err(|e| TsdbError::CannotDecompress(e.to_string()))
}

pub struct ValueAppender<'c, 'a> {
    chunk: &'c mut ValueChunk<'a>,
}

impl ValueAppender<'_, '_> {
    pub fn append(&mut self, v: &[u8]) -> TsdbResult<()> {
        if self.chunk.num == u16::MAX {
            return Err(TsdbError::CapacityFull(u16::MAX as usize));
        }
        let Cow::Owned(buf) = &mut self.chunk.data else {
            return Err(TsdbError::ImmutableChunk);
        };

        if v.is_empty() {
            write_uvarint(buf, 1);
            buf.push(EMPTY_VALUE_SENTINEL);
        } else {
            write_uvarint(buf, v.len() as u64);
            buf.extend_from_slice(v);
        }

        // The cached frame no longer matches the records.
        self.chunk.compressed = None;
        self.chunk.num += 1;
        Ok(())
    }
}

/// Sequential reader over the record buffer. Owns its decode scratch when
/// the column was loaded compressed, so concurrent readers never share
/// mutable state.
pub struct ValueIterator<'a> {
    data: Cow<'a, [u8]>,
    pos: usize,
    num_total: u16,
    num_read: u16,
    v: Range<usize>,
    err: Option<TsdbError>,
}

impl<'a> ValueIterator<'a> {
    fn over(data: Cow<'a, [u8]>, num_total: u16) -> Self {
        ValueIterator {
            data,
            pos: 0,
            num_total,
            num_read: 0,
            v: 0..0,
            err: None,
        }
    }

    fn failed(err: TsdbError) -> Self {
        ValueIterator {
            data: Cow::Borrowed(&[]),
            pos: 0,
            num_total: 0,
            num_read: 0,
            v: 0..0,
            err: Some(err),
        }
    }
}

impl ChunkIterator for ValueIterator<'_> {
    fn next(&mut self) -> bool {
        if self.err.is_some() || self.num_read == self.num_total {
            return false;
        }

        let mut rest = &self.data[self.pos..];
        let before = rest.len();
        let len = match try_read_uvarint(&mut rest) {
            Ok(len) => len as usize,
            Err(err) => {
                self.err = Some(err);
                return false;
            }
        };
        self.pos += before - rest.len();

        if len > self.data.len() - self.pos {
            self.err = Some(TsdbError::DecodingError(
                "value record length exceeds remaining buffer".to_string(),
            ));
            return false;
        }

        let start = self.pos;
        self.pos += len;

        let blob = &self.data[start..start + len];
        self.v = if blob.len() == 1 && blob[0] == EMPTY_VALUE_SENTINEL {
            0..0
        } else {
            start..start + len
        };
        self.num_read += 1;
        true
    }

    /// The value column knows nothing about time; advancement happens in
    /// lockstep with the timestamp column at the composite level.
    fn seek(&mut self, _ts: Timestamp) -> bool {
        self.err = Some(TsdbError::UnsupportedOperation(
            "seek on a value column iterator",
        ));
        false
    }

    fn at(&self) -> (Timestamp, &[u8]) {
        // Timestamps are never stored in this column.
        (0, &self.data[self.v.clone()])
    }

    fn err(&self) -> Option<&TsdbError> {
        self.err.as_ref()
    }
}
