use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prof_core::cpu_6502::{Cpu6502, CpuModel};
use prof_core::memory::LinearMemory;

/// Counted loop: LDX #0; INX; CPX #n; BNE -5; BRK.
fn counted_loop(iterations: u8) -> Vec<u8> {
    vec![
        0x00, 0x08, // load address 0x0800
        0xA2, 0x00, // LDX #0
        0xE8, // INX
        0xE0, iterations, // CPX #n
        0xD0, 0xFB, // BNE back to INX
        0x00, // BRK
    ]
}

fn bench_run_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_run");

    for iterations in [10u8, 100, 200].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            iterations,
            |b, &n| {
                b.iter(|| {
                    let mut cpu =
                        Cpu6502::new(LinearMemory::default(), CpuModel::Mos6502);
                    cpu.load_program(&counted_loop(n)).unwrap();
                    cpu.run(0x0800).unwrap();
                    black_box(cpu.num_cycles());
                });
            },
        );
    }

    group.finish();
}

fn bench_single_instruction(c: &mut Criterion) {
    c.bench_function("cpu_6502_lda_brk", |b| {
        b.iter(|| {
            let mut cpu = Cpu6502::new(LinearMemory::default(), CpuModel::Mos6502);
            cpu.load_program(&[0x00, 0x08, 0xA9, 0x42, 0x00]).unwrap();
            cpu.run(0x0800).unwrap();
            black_box(cpu.a);
        });
    });
}

criterion_group!(benches, bench_run_loop, bench_single_instruction);
criterion_main!(benches);
