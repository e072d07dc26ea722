use criterion::{black_box, criterion_group, criterion_main, Criterion};
use erbium_aes::{Aes128, CipherContext};

fn cipher(c: &mut Criterion) {
  let mut group = c.benchmark_group("aes128");
  let key = [0x2bu8; 16];

  group.bench_function("set_key", |b| {
         let mut aes = CipherContext::default();
         b.iter(|| aes.set_key(black_box(&key)))
       });

  let aes = CipherContext::new(&key);
  group.bench_function("encrypt", |b| {
         let mut block = [0u8; 16];
         b.iter(|| aes.encrypt(black_box(&mut block)))
       });

  group.bench_function("decrypt", |b| {
         let mut block = [0u8; 16];
         b.iter(|| aes.decrypt(black_box(&mut block)))
       });

  group.bench_function("data_encrypt/1024", |b| {
         let mut data = [0u8; 1024];
         b.iter(|| aes.data_encrypt(black_box(&mut data)))
       });

  group.finish();
}

criterion_group!(benches, cipher);
criterion_main!(benches);
