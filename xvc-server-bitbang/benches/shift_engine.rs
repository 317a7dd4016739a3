//! Per-shift latency of the engine with GPIO accesses reduced to volatile register
//! stores. This is the upper bound for the TCK rate any adapter can reach.
use std::hint::black_box;
use std::ptr::{read_volatile, write_volatile};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use xvc_protocol::{CAPACITY_BYTES, vector_len};
use xvc_server_bitbang::{
    engine::ShiftEngine,
    pins::{JtagPins, Lines},
};

/// Set/clear/level registers in plain memory
#[derive(Default)]
struct MemoryPins {
    set: u32,
    clear: u32,
    level: u32,
}

impl JtagPins for MemoryPins {
    #[inline(always)]
    fn write(&mut self, high: Lines, low: Lines) {
        // SAFETY: both fields are valid, aligned and exclusively borrowed.
        unsafe {
            write_volatile(&mut self.clear, u32::from(low.bits()));
            write_volatile(&mut self.set, u32::from(high.bits()));
        }
    }

    #[inline(always)]
    fn read_tdo(&mut self) -> bool {
        // SAFETY: `level` is valid and aligned.
        unsafe { read_volatile(&self.level) & 1 != 0 }
    }
}

fn shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("shift");
    let mut engine = ShiftEngine::new(MemoryPins::default());
    let tms = vec![0x5A; CAPACITY_BYTES];
    let tdi = vec![0xC3; CAPACITY_BYTES];
    let mut tdo = vec![0; CAPACITY_BYTES];

    for num_bits in [8u32, 13, 256, CAPACITY_BYTES as u32 * 8] {
        let len = vector_len(num_bits);
        group.throughput(Throughput::Elements(u64::from(num_bits)));
        group.bench_with_input(BenchmarkId::from_parameter(num_bits), &num_bits, |b, &bits| {
            b.iter(|| {
                engine.shift_bits(
                    black_box(bits),
                    black_box(&tms[..len]),
                    black_box(&tdi[..len]),
                    &mut tdo[..len],
                );
                black_box(&tdo);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, shift);
criterion_main!(benches);
