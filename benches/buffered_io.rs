use bufchan::{BufferedSource, MemoryChannel, SeekableSource, Source, WriteChannel};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const PAYLOAD: usize = 1 << 20;

fn bench_small_writes(c: &mut Criterion) {
    let record = [0xa5u8; 16];
    let mut group = c.benchmark_group("small_writes");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    for capacity in [256usize, 4096, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let chan = WriteChannel::new(Vec::with_capacity(PAYLOAD));
                let mut src = BufferedSource::with_capacity(capacity, chan).unwrap();
                for _ in 0..PAYLOAD / record.len() {
                    src.write_all(black_box(&record)).unwrap();
                }
                black_box(src.into_inner().unwrap());
            })
        });
    }
    group.finish();
}

fn bench_typed_reads(c: &mut Criterion) {
    let data: Vec<u8> = (0..PAYLOAD).map(|i| i as u8).collect();
    let mut group = c.benchmark_group("typed_reads");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    group.bench_function("request_read_u64", |b| {
        b.iter(|| {
            let chan = MemoryChannel::from_bytes(data.clone());
            let mut src = SeekableSource::with_capacity(4096, chan).unwrap();
            let mut sum = 0u64;
            while let Ok(buf) = src.request_read(8) {
                sum = sum.wrapping_add(buf.get_u64().unwrap());
            }
            black_box(sum)
        })
    });
    group.finish();
}

fn bench_random_patches(c: &mut Criterion) {
    let data = vec![0u8; PAYLOAD];
    let positions: Vec<u64> = (0..1024u64).map(|i| (i * 7919) % (PAYLOAD as u64 - 8)).collect();

    c.bench_function("random_patches", |b| {
        b.iter(|| {
            let chan = MemoryChannel::from_bytes(data.clone());
            let mut src = SeekableSource::with_capacity(4096, chan).unwrap();
            for &pos in &positions {
                src.set_position(pos).unwrap();
                src.write_all(&pos.to_be_bytes()).unwrap();
            }
            black_box(src.into_inner().unwrap())
        })
    });
}

criterion_group!(benches, bench_small_writes, bench_typed_reads, bench_random_patches);
criterion_main!(benches);
