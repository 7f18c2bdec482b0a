//! Benchmark for the CPU step loop.
//!
//! Make sure the result of the benchmarked function is used,
//! whether by sending it to black_box, or to return it from the closure.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use tmvm::memory::CODE_BEGIN;
use tmvm::Cpu;

pub fn criterion_benchmark(c: &mut Criterion) {
    // A one-instruction loop: JPS jumps back to the program start forever.
    let mut memory = vec![0u8; 0x4000];
    let program = tmvm::asm::assemble_source("jps\n", "bench").unwrap();
    memory[CODE_BEGIN as usize..CODE_BEGIN as usize + program.len()].copy_from_slice(&program);

    let mut cpu = Cpu::new();

    c.bench_function("step", |b| {
        b.iter(|| black_box(cpu.step(black_box(memory.as_mut_slice()))))
    });

    let mut arithmetic = vec![0u8; 0x4000];
    let program = tmvm::asm::assemble_source("inc a\nadd a, $3\njps\n", "bench").unwrap();
    arithmetic[CODE_BEGIN as usize..CODE_BEGIN as usize + program.len()].copy_from_slice(&program);

    let mut cpu = Cpu::new();

    c.bench_function("step_arithmetic", |b| {
        b.iter(|| {
            black_box(cpu.step(black_box(arithmetic.as_mut_slice())));
            black_box(cpu.step(black_box(arithmetic.as_mut_slice())));
            black_box(cpu.step(black_box(arithmetic.as_mut_slice())))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
