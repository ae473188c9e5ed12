// Sealing benchmarks for the Tally ledger.
//
// Covers the raw chained digest, the difficulty check, and the salt search
// at several difficulty targets. The salt search is the cost that matters
// operationally: it runs once per accepted command.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use tally_ledger::sealing::{find_salt, leading_zero_bits, seal};

const FIELDS: [&str; 6] = ["1700000000", "transfer", "alice", "alice", "bob", "5/1"];

fn bench_seal(c: &mut Criterion) {
    let prev = seal(b"", FIELDS);
    c.bench_function("sealing/seal_entry", |b| {
        b.iter(|| seal(&prev, FIELDS));
    });
}

fn bench_leading_zero_bits(c: &mut Criterion) {
    let digest = seal(b"", FIELDS);
    c.bench_function("sealing/leading_zero_bits", |b| {
        b.iter(|| leading_zero_bits(&digest));
    });
}

fn bench_find_salt(c: &mut Criterion) {
    let prev = seal(b"", FIELDS);
    let mut group = c.benchmark_group("sealing/find_salt");
    for difficulty in [4u32, 8, 12] {
        group.bench_with_input(
            BenchmarkId::from_parameter(difficulty),
            &difficulty,
            |b, &difficulty| {
                b.iter(|| find_salt(&prev, FIELDS, difficulty));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_seal, bench_leading_zero_bits, bench_find_salt);
criterion_main!(benches);
