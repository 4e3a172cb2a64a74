//! End-to-end profiling sessions: program load, run to BRK, counters,
//! report rendering, and peripherals behind the write-trap wrapper.

use prof_core::cpu_6502::{Cpu6502, CpuModel, RunError};
use prof_core::memory::{
    BankSwitchedMemory, LinearMemory, Memory, MultiplierSink, TrapMemory,
};
use prof_core::stats::{self, LabelMap};

#[test]
fn linear_session_produces_a_hotspot_report() {
    let mut cpu = Cpu6502::new(LinearMemory::default(), CpuModel::Mos6502);
    // Counted loop touching $00F0 every iteration:
    //   LDX #0 ; loop: STX $F0 ; INX ; CPX #5 ; BNE loop ; BRK
    cpu.load_program(&[
        0x00, 0x08, // load at 0x0800
        0xA2, 0x00, // LDX #0
        0x86, 0xF0, // STX $F0
        0xE8, // INX
        0xE0, 0x05, // CPX #5
        0xD0, 0xF9, // BNE -7
        0x00, // BRK
    ])
    .unwrap();
    cpu.run(0x0800).unwrap();

    // Five iterations stored five times.
    assert_eq!(cpu.memory.access_count(0x00F0), 5);
    assert_eq!(cpu.memory.load(0x00F0).unwrap(), 4);

    // Counts over $F0-$F4 are [5,0,0,0,0]; the top-fifth rank cutoff is 5.
    let cutoff = stats::rank_cutoff(&cpu.memory, 0x00F0, 0x00F4, 0.2).unwrap();
    assert_eq!(cutoff, 5);
    let mut labels = LabelMap::new();
    labels.insert(0x00F0, vec!["counter".to_string()]);
    let mut out = Vec::new();
    stats::render_report(&mut cpu.memory, 0x00F0, 0x00F1, cutoff, &labels, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "counter\n*00F0: 04 5\n 00F1: 00 0\n");
}

#[test]
fn banked_session_rolls_back_between_cases() {
    let mut cpu = Cpu6502::new(BankSwitchedMemory::new(), CpuModel::Mos6502);
    // Select RAM bank 3 and mark the window:
    //   LDA #3 ; STA $0000 ; LDA #$AA ; STA $A000 ; BRK
    let program = [
        0x00, 0x08, 0xA9, 0x03, 0x8D, 0x00, 0x00, 0xA9, 0xAA, 0x8D, 0x00, 0xA0, 0x00,
    ];
    cpu.load_program(&program).unwrap();
    cpu.memory.take_snapshot();

    cpu.run(0x0800).unwrap();
    assert_eq!(cpu.memory.load(0x0000).unwrap(), 3);
    assert_eq!(cpu.memory.load(0xA000).unwrap(), 0xAA);

    // Roll back: selector and bank bytes revert, counters do not.
    cpu.memory.restore_snapshot().unwrap();
    assert_eq!(cpu.memory.load(0x0000).unwrap(), 0);
    assert!(cpu.memory.access_count(0x0000) >= 2);

    // The same program runs identically on the restored state.
    cpu.run(0x0800).unwrap();
    assert_eq!(cpu.memory.load(0xA000).unwrap(), 0xAA);
}

#[test]
fn multiplier_peripheral_driven_from_6502_code() {
    let mut mem = TrapMemory::new(LinearMemory::default());
    mem.register_sink(0xD700, Box::new(MultiplierSink::new(0xD710)));
    let mut cpu = Cpu6502::new(mem, CpuModel::Mos6502);
    // Feed 0x1234 * 0x5678 one byte at a time:
    //   LDA #$34 ; STA $D700 ; LDA #$12 ; STA $D700
    //   LDA #$78 ; STA $D700 ; LDA #$56 ; STA $D700 ; BRK
    cpu.load_program(&[
        0x00, 0x08, //
        0xA9, 0x34, 0x8D, 0x00, 0xD7, //
        0xA9, 0x12, 0x8D, 0x00, 0xD7, //
        0xA9, 0x78, 0x8D, 0x00, 0xD7, //
        0xA9, 0x56, 0x8D, 0x00, 0xD7, //
        0x00,
    ])
    .unwrap();
    cpu.run(0x0800).unwrap();
    assert_eq!(cpu.num_cycles(), 4 * (2 + 4) + 7);

    // 0x1234 * 0x5678 = 0x06260060, little-endian at the output address.
    let product = cpu.copy_from_mem(0xD710, 4).unwrap();
    assert_eq!(product, vec![0x60, 0x00, 0x26, 0x06]);
}

#[test]
fn faults_surface_at_the_run_boundary() {
    let mut cpu = Cpu6502::new(LinearMemory::default(), CpuModel::Mos6502);
    cpu.load_program(&[0x00, 0x08, 0xEA, 0xEA, 0x0A]).unwrap();
    match cpu.run(0x0800) {
        Err(RunError::IllegalOpcode { opcode, pc }) => {
            assert_eq!(opcode, 0x0A);
            assert_eq!(pc, 0x0802);
        }
        other => panic!("expected illegal-opcode fault, got {other:?}"),
    }
}

#[test]
fn boxed_backends_run_behind_one_cpu_type() {
    // The CLI picks a backend at runtime; the engine runs Box<dyn Memory>.
    let backends: Vec<Box<dyn Memory>> = vec![
        Box::new(LinearMemory::default()),
        Box::new(BankSwitchedMemory::new()),
    ];
    for backend in backends {
        let mut cpu = Cpu6502::new(backend, CpuModel::Mos6502);
        cpu.load_program(&[0x00, 0x08, 0xA9, 0x42, 0x00]).unwrap();
        cpu.run(0x0800).unwrap();
        assert_eq!(cpu.a, 0x42);
        assert_eq!(cpu.num_cycles(), 9);
    }
}
