use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use profile_chunks::{BlobChunk, BlobChunkIterator, ChunkIterator, Sample};
use std::hint::black_box;

fn make_samples(n: usize) -> Vec<Sample> {
    let mut t = 1_234_123_324i64;
    (0..n)
        .map(|i| {
            t += 100;
            Sample::new(t, format!("conprof-{i}").into_bytes())
        })
        .collect()
}

fn build_chunk(samples: &[Sample]) -> BlobChunk<'static> {
    let mut chunk = BlobChunk::new();
    let mut app = chunk.appender().unwrap();
    for sample in samples {
        app.append(sample.timestamp, &sample.value).unwrap();
    }
    drop(app);
    chunk
}

fn bench_appender(c: &mut Criterion) {
    let samples = make_samples(10_000);
    c.bench_function("blob_chunk_append_10k", |b| {
        b.iter_batched(
            BlobChunk::new,
            |mut chunk| {
                let mut app = chunk.appender().unwrap();
                for sample in &samples {
                    app.append(sample.timestamp, &sample.value).unwrap();
                }
                drop(app);
                chunk
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_iterator(c: &mut Criterion) {
    let samples = make_samples(10_000);
    let chunk = build_chunk(&samples);

    c.bench_function("blob_chunk_iterate_10k", |b| {
        b.iter(|| {
            let mut n = 0usize;
            let mut it = chunk.iterator(None);
            while it.next() {
                let (t, v) = it.at();
                black_box((t, v));
                n += 1;
            }
            n
        })
    });
}

fn bench_seek(c: &mut Criterion) {
    // A run of ~250-sample chunks, seeking each one's last timestamp, the
    // access pattern of locating a series' most recent sample.
    let per_chunk = 251;
    let mut chunks = Vec::new();
    let mut last = Vec::new();
    for i in 0..40 {
        let samples = make_samples(per_chunk)
            .into_iter()
            .map(|mut s| {
                s.timestamp += (i * per_chunk) as i64 * 100;
                s
            })
            .collect::<Vec<_>>();
        last.push(samples.last().unwrap().timestamp);
        chunks.push(build_chunk(&samples));
    }

    c.bench_function("blob_chunk_seek_last_paired", |b| {
        b.iter(|| {
            let mut reuse: Option<BlobChunkIterator<'_>> = None;
            for (chunk, &t) in chunks.iter().zip(&last) {
                let mut it = chunk.iterator(reuse.take());
                if it.seek(t) {
                    black_box(it.at());
                }
                reuse = Some(it);
            }
        })
    });

    c.bench_function("blob_chunk_seek_last_timestamps_only", |b| {
        b.iter(|| {
            let mut reuse = Some(chunks[0].timestamps_only_iterator());
            for (chunk, &t) in chunks.iter().zip(&last) {
                let mut it = chunk.iterator(reuse.take());
                if it.seek(t) {
                    black_box(it.at());
                }
                reuse = Some(it);
            }
        })
    });
}

criterion_group!(benches, bench_appender, bench_iterator, bench_seek);
criterion_main!(benches);
