use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};
use xvc_protocol::{CAPACITY_BYTES, Command, Message};

fn encoded_shift(num_bytes: usize) -> Vec<u8> {
    let msg = Message::Shift {
        num_bits: (num_bytes * 8) as u32,
        tms: vec![0x5A; num_bytes].into_boxed_slice(),
        tdi: vec![0xA5; num_bytes].into_boxed_slice(),
    };
    let mut out = Vec::new();
    msg.write_to(&mut out).expect("Writing to vector shouldn't fail");
    out
}

fn decode_shift(c: &mut Criterion) {
    let mut tms = vec![0; CAPACITY_BYTES];
    let mut tdi = vec![0; CAPACITY_BYTES];
    for num_bytes in [1, 64, CAPACITY_BYTES] {
        let data = encoded_shift(num_bytes);
        c.bench_function(&format!("decode shift {num_bytes} bytes"), |b| {
            b.iter(|| {
                let mut reader = Cursor::new(black_box(&data[..]));
                let cmd = Command::from_reader(&mut reader, &mut tms, &mut tdi)
                    .expect("Command should parse");
                black_box(matches!(cmd, Command::Shift { .. }));
            })
        });
    }
}

fn encode_shift(c: &mut Criterion) {
    c.bench_function("encode shift 2048 bytes", |b| {
        b.iter(|| black_box(encoded_shift(black_box(CAPACITY_BYTES))))
    });
}

criterion_group!(benches, decode_shift, encode_shift);
criterion_main!(benches);
