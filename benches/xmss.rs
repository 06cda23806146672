use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use xmss::{generate_seed, verify, verify_mt, Merkle, PrivKeyMT};

fn bench_keygen(c: &mut Criterion) {
    let seed = generate_seed();
    let mut group = c.benchmark_group("keygen");
    group.sample_size(10);
    group.bench_function("merkle_h10", |b| {
        b.iter(|| Merkle::new(10, black_box(&seed)))
    });
    group.bench_function("mt_h20_d2", |b| {
        b.iter(|| PrivKeyMT::new(black_box(&seed), 20, 2).unwrap())
    });
    group.finish();
}

fn bench_sign(c: &mut Criterion) {
    let seed = generate_seed();
    let merkle = Merkle::new(10, &seed);
    let msg = b"This is a test for XMSS.";
    c.bench_function("sign_h10", |b| {
        b.iter_batched(
            || merkle.clone(),
            |mut m| m.sign(black_box(msg)).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_verify(c: &mut Criterion) {
    let seed = generate_seed();
    let mut merkle = Merkle::new(10, &seed);
    let msg = b"This is a test for XMSS.";
    let pk = merkle.public_key();
    let sig = merkle.sign(msg).unwrap();
    c.bench_function("verify_h10", |b| {
        b.iter(|| verify(black_box(&sig), black_box(msg), black_box(&pk)))
    });

    let mut mt = PrivKeyMT::new(&seed, 20, 2).unwrap();
    let mt_pk = mt.public_key().to_bytes();
    let mt_sig = mt.sign(msg).unwrap();
    c.bench_function("verify_mt_h20_d2", |b| {
        b.iter(|| verify_mt(black_box(&mt_sig), black_box(msg), black_box(&mt_pk)))
    });
}

criterion_group!(benches, bench_keygen, bench_sign, bench_verify);
criterion_main!(benches);
