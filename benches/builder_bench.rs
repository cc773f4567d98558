//! Criterion benchmarks for building and reading rift objects.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rift::{BufferBuilder, ObjectView};

/// Writes one object: two fixed fields, then a name and a `f32` array behind a
/// two entry offset table.
fn write_record(builder: &mut BufferBuilder, id: u64, samples: &[f32]) {
  let object = builder.begin_object(0xBE7C_0001, 0x0100);
  builder.write_value(id);
  builder.write_value(samples.len() as u32);
  let name = builder.reserve_offset_entry();
  let data = builder.reserve_offset_entry();
  builder.add_variable_field(&object, name, "benchmark record").unwrap();
  builder.add_variable_field(&object, data, samples).unwrap();
  builder.end_object(object).unwrap();
}

fn bench_build(c: &mut Criterion) {
  let mut group = c.benchmark_group("build");
  let samples = (0..256).map(|i| i as f32 * 0.5).collect::<Vec<_>>();

  group.throughput(Throughput::Elements(1));
  group.bench_function("single_object", |b| {
    let mut builder = BufferBuilder::with_capacity(4096);
    let mut id = 0u64;
    b.iter(|| {
      builder.reset();
      write_record(&mut builder, black_box(id), black_box(&samples));
      id = id.wrapping_add(1);
    });
  });

  for count in [16usize, 256] {
    group.throughput(Throughput::Elements(count as u64));
    group.bench_function(format!("batch_{}", count), |b| {
      let mut builder = BufferBuilder::with_capacity(count * 1200);
      b.iter(|| {
        builder.reset();
        for id in 0..count as u64 {
          write_record(&mut builder, id, &samples[..16]);
        }
        black_box(builder.len());
      });
    });
  }

  group.finish();
}

fn bench_read(c: &mut Criterion) {
  let mut group = c.benchmark_group("read");
  let samples = (0..256).map(|i| i as f32).collect::<Vec<_>>();
  let mut builder = BufferBuilder::new();
  write_record(&mut builder, 42, &samples);
  let buffer = builder.into_buffer();

  group.throughput(Throughput::Bytes(buffer.len() as u64));
  group.bench_function("validate", |b| {
    b.iter(|| ObjectView::from_bytes(black_box(&buffer)).unwrap().total_size());
  });

  group.bench_function("sum_sequence", |b| {
    let view = ObjectView::from_bytes(&buffer).unwrap();
    b.iter(|| {
      let seq = view.sequence_field::<f32>(28, 1, 2).unwrap().unwrap();
      seq.iter().map(|v| v.unwrap()).sum::<f32>()
    });
  });

  group.bench_function("text_field", |b| {
    let view = ObjectView::from_bytes(&buffer).unwrap();
    b.iter(|| view.text_field(28, 0, 2).unwrap().unwrap().as_str().unwrap().len());
  });

  group.finish();
}

criterion_group!(benches, bench_build, bench_read);
criterion_main!(benches);
