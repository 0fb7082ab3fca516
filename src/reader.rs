use crate::chunks::{BlobChunk, BlobChunkIterator, ChunkEncoding, ChunkIterator};
use crate::error::TsdbResult;

/// Chunk access capability supplied by the host storage layer. References
/// are opaque to this crate; the host resolves them against its chunk files.
pub trait ChunkReader {
    fn chunk(&self, chunk_ref: u64) -> TsdbResult<BlobChunk<'_>>;

    /// Releases whatever the reader holds open. Default is a no-op for
    /// readers over plain memory.
    fn close(&mut self) -> TsdbResult<()> {
        Ok(())
    }
}

/// Wraps a [`ChunkReader`] so that every chunk it resolves only exposes
/// timestamp iteration. Index scans over many chunks go through this to
/// avoid decompressing any value column.
pub struct TimestampChunkReader<R> {
    inner: R,
}

impl<R: ChunkReader> TimestampChunkReader<R> {
    pub fn new(inner: R) -> Self {
        TimestampChunkReader { inner }
    }

    pub fn chunk(&self, chunk_ref: u64) -> TsdbResult<TimestampOnlyChunk<'_>> {
        Ok(TimestampOnlyChunk {
            chunk: self.inner.chunk(chunk_ref)?,
        })
    }

    pub fn close(&mut self) -> TsdbResult<()> {
        self.inner.close()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// A chunk whose iterators are pinned to the timestamp-only kind, whatever
/// the caller passes in for reuse.
pub struct TimestampOnlyChunk<'a> {
    chunk: BlobChunk<'a>,
}

impl<'a> TimestampOnlyChunk<'a> {
    pub fn encoding(&self) -> ChunkEncoding {
        self.chunk.encoding()
    }

    pub fn num_samples(&self) -> usize {
        self.chunk.num_samples()
    }

    pub fn iterator<'s>(&'s self, reuse: Option<BlobChunkIterator<'_>>) -> BlobChunkIterator<'s> {
        let _ = reuse;
        self.chunk.timestamps_only_iterator()
    }
}

/// Re-encodes a chunk by draining it through an iterator into a fresh
/// mutable chunk. Used by compaction to rewrite chunks loaded from disk;
/// the iterator is returned so the caller can pass it back in for the next
/// chunk.
pub fn reencode_chunk<'a>(
    chunk: &'a BlobChunk<'_>,
    reuse: Option<BlobChunkIterator<'_>>,
) -> TsdbResult<(BlobChunkIterator<'a>, BlobChunk<'static>)> {
    let mut out = BlobChunk::new();
    let mut app = out.appender()?;

    let mut it = chunk.iterator(reuse);
    while it.next() {
        let (t, v) = it.at();
        app.append(t, v)?;
    }
    if let Some(err) = it.err() {
        return Err(err.clone());
    }

    drop(app);
    Ok((it, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Sample;
    use std::collections::HashMap;

    struct MemChunkReader {
        chunks: HashMap<u64, Vec<u8>>,
        closed: bool,
    }

    impl MemChunkReader {
        fn new() -> Self {
            MemChunkReader {
                chunks: HashMap::new(),
                closed: false,
            }
        }
    }

    impl ChunkReader for MemChunkReader {
        fn chunk(&self, chunk_ref: u64) -> TsdbResult<BlobChunk<'_>> {
            let data = self.chunks.get(&chunk_ref).ok_or_else(|| {
                crate::error::TsdbError::DecodingError(format!("no chunk for ref {chunk_ref}"))
            })?;
            BlobChunk::load(data)
        }

        fn close(&mut self) -> TsdbResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn envelope(samples: &[Sample]) -> Vec<u8> {
        let mut chunk = BlobChunk::new();
        let mut app = chunk.appender().unwrap();
        for sample in samples {
            app.append(sample.timestamp, &sample.value).unwrap();
        }
        drop(app);
        chunk.bytes().unwrap().into_owned()
    }

    #[test]
    fn timestamp_reader_pins_iteration_to_timestamps() {
        let samples: Vec<Sample> = (0..10)
            .map(|i| Sample::new(i, format!("conprof-{i}").into_bytes()))
            .collect();
        let mut reader = MemChunkReader::new();
        reader.chunks.insert(1, envelope(&samples));

        let reader = TimestampChunkReader::new(reader);
        let chunk = reader.chunk(1).unwrap();
        assert_eq!(chunk.num_samples(), 10);

        let mut it = chunk.iterator(None);
        assert!(matches!(it, BlobChunkIterator::TimestampsOnly(_)));
        let mut timestamps = Vec::new();
        while it.next() {
            let (t, v) = it.at();
            assert_eq!(v, b"");
            timestamps.push(t);
        }
        assert_eq!(it.err(), None);
        assert_eq!(timestamps, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn close_forwards_to_the_wrapped_reader() {
        let mut reader = TimestampChunkReader::new(MemChunkReader::new());
        reader.close().unwrap();
        assert!(reader.into_inner().closed);
    }

    #[test]
    fn missing_chunk_ref_errors() {
        let reader = TimestampChunkReader::new(MemChunkReader::new());
        assert!(reader.chunk(42).is_err());
    }

    #[test]
    fn reencode_reproduces_the_chunk() {
        let samples: Vec<Sample> = (0..1_000)
            .map(|i| Sample::new(i * 7, format!("conprof-{i}").into_bytes()))
            .collect();
        let data = envelope(&samples);
        let loaded = BlobChunk::load(&data).unwrap();

        let (it, mut rewritten) = reencode_chunk(&loaded, None).unwrap();
        assert!(matches!(it, BlobChunkIterator::Samples(_)));
        assert!(rewritten.is_mutable());
        assert_eq!(rewritten.num_samples(), 1_000);

        let round = rewritten.bytes().unwrap().into_owned();
        let reloaded = BlobChunk::load(&round).unwrap();
        let mut it = reloaded.iterator(None);
        for sample in &samples {
            assert!(it.next());
            let (t, v) = it.at();
            assert_eq!(t, sample.timestamp);
            assert_eq!(v, sample.value.as_slice());
        }
        assert!(!it.next());
    }
}
