use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use logsink::buffer::StreamRecord;
use logsink::error::BoxError;
use logsink::stream::{Stream, StreamWriter};

/// Accepts every batch without doing anything with it.
struct DiscardStream;

impl Stream for DiscardStream {
  type Response = usize;

  fn put(&mut self, records: &[StreamRecord]) -> Result<usize, BoxError> {
    Ok(black_box(records.len()))
  }

  fn close(&mut self) -> Result<(), BoxError> {
    Ok(())
  }
}

fn configure_criterion() -> Criterion {
  Criterion::default()
    .sample_size(50)
    .measurement_time(Duration::from_secs(5))
    .warm_up_time(Duration::from_secs(2))
}

fn bench_write(c: &mut Criterion) {
  let mut group = c.benchmark_group("stream_writer_write");

  for size in [16usize, 256, 4096] {
    let record = vec![b'x'; size];
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &record, |b, record| {
      let mut writer = StreamWriter::new(DiscardStream);
      b.iter(|| writer.write(black_box(record)))
    });
  }

  group.finish();
}

fn bench_small_batches(c: &mut Criterion) {
  let record = b"Jan  2 15:04:05.000 [     INFO] 1 app - request served\n";
  c.bench_function("stream_writer_batch_of_10", |b| {
    let mut writer = StreamWriter::with_thresholds(DiscardStream, 10, 1024 * 1024)
      .expect("valid thresholds");
    b.iter(|| writer.write(black_box(record)))
  });
}

criterion_group! {
  name = benches;
  config = configure_criterion();
  targets = bench_write, bench_small_batches
}
criterion_main!(benches);
