use std::io::Cursor;

use mos6502_sim::debugger::DebugSession;
use mos6502_sim::snapshots::MachineSnapshot;
use mos6502_sim::{CpuError, Emulator, Halt};

fn emulator_with(program: &[u8]) -> Emulator {
    let mut emulator = Emulator::new();
    emulator.load_program(program).unwrap();
    emulator
}

#[test]
fn test_simple_calculation() {
    // Calculate 10 + 20 + 30 and store the result
    let mut emulator = emulator_with(&[
        0xA9, 0x0A,       // LDA #$0A    ; A = 10
        0x69, 0x14,       // ADC #$14    ; A = A + 20 = 30
        0x69, 0x1E,       // ADC #$1E    ; A = A + 30 = 60
        0x8D, 0x00, 0x40, // STA $4000
        0x00,             // BRK
    ]);

    let halt = emulator.run().unwrap();

    assert_eq!(halt, Halt::Break { address: 0x0209 });
    assert_eq!(emulator.cpu.get_register_a(), 60);
    assert_eq!(emulator.memory.read(0x4000), emulator.cpu.get_register_a());
    assert!(emulator.cpu.is_halted());
}

#[test]
fn test_sixteen_bit_addition() {
    // $12F0 + $0125 = $1415, little-endian operands at $10/$11 and $12/$13
    let mut emulator = emulator_with(&[
        0x18,       // CLC
        0xA5, 0x10, // LDA $10
        0x65, 0x12, // ADC $12
        0x85, 0x20, // STA $20
        0xA5, 0x11, // LDA $11
        0x65, 0x13, // ADC $13
        0x85, 0x21, // STA $21
        0x00,
    ]);
    emulator.memory.write(0x10, 0xF0);
    emulator.memory.write(0x11, 0x12);
    emulator.memory.write(0x12, 0x25);
    emulator.memory.write(0x13, 0x01);

    emulator.run().unwrap();

    assert_eq!(emulator.memory.read_u16(0x20), 0x1415);
}

#[test]
fn test_indexed_memory_access() {
    let mut emulator = emulator_with(&[
        0xA2, 0x02, // LDX #$02    ; X = 2
        0xB5, 0x50, // LDA $50,X   ; Load from $50 + X = $52
        0x95, 0x60, // STA $60,X   ; Store to $60 + X = $62
        0x00,       // BRK
    ]);
    emulator.memory.write(0x50, 0x10);
    emulator.memory.write(0x51, 0x20);
    emulator.memory.write(0x52, 0x30);

    emulator.run().unwrap();

    assert_eq!(emulator.cpu.get_register_x(), 2);
    assert_eq!(emulator.cpu.get_register_a(), 0x30);
    assert_eq!(emulator.memory.read(0x62), 0x30);
}

#[test]
fn test_zero_page_x_crosses_into_stack_page() {
    let mut emulator = emulator_with(&[
        0xA2, 0xFF, // LDX #$FF
        0xA9, 0x77, // LDA #$77
        0x95, 0x80, // STA $80,X   ; $017F, not $007F
        0x00,
    ]);

    emulator.run().unwrap();

    assert_eq!(emulator.memory.read(0x017F), 0x77);
    assert_eq!(emulator.memory.read(0x007F), 0x00);
}

#[test]
fn test_indirect_addressing_round_trip() {
    let mut emulator = emulator_with(&[
        0xA0, 0x04,       // LDY #$04
        0xA9, 0x99,       // LDA #$99
        0x91, 0x40,       // STA ($40),Y  ; $3004
        0xA2, 0x02,       // LDX #$02
        0xA1, 0x3E,       // LDA ($3E,X)  ; pointer at $40 -> $3000
        0x00,
    ]);
    emulator.memory.write(0x40, 0x00);
    emulator.memory.write(0x41, 0x30);
    emulator.memory.write(0x3000, 0x55);

    emulator.run().unwrap();

    assert_eq!(emulator.memory.read(0x3004), 0x99);
    assert_eq!(emulator.cpu.get_register_a(), 0x55);
}

#[test]
fn test_subroutine_call_and_return() {
    let mut emulator = emulator_with(&[
        0x20, 0x10, 0x02, // JSR $0210
        0xE6, 0x30,       // INC $30
        0x00,             // BRK
    ]);
    emulator.memory.load_program(&[0xE8, 0xE8, 0x60], 0x0210); // INX, INX, RTS

    let halt = emulator.run().unwrap();

    assert_eq!(halt, Halt::Break { address: 0x0205 });
    assert_eq!(emulator.cpu.get_register_x(), 2);
    assert_eq!(emulator.memory.read(0x30), 1);
    assert_eq!(emulator.cpu.get_sp(), 0xFF);
}

#[test]
fn test_unrecognized_opcode_stops_the_run() {
    let mut emulator = emulator_with(&[0xA9, 0x01, 0xEA, 0xA9, 0x02]);

    let err = emulator.run().unwrap_err();

    assert_eq!(err, CpuError::UnrecognizedOpcode { opcode: 0xEA, address: 0x0202 });
    assert_eq!(err.to_string(), "unrecognized opcode $EA at $0202");
    assert_eq!(emulator.cpu.get_register_a(), 0x01);
}

#[test]
fn test_debug_session_matches_free_run() {
    let program = [0xA9, 0x05, 0x38, 0xE9, 0x01, 0x85, 0x40, 0x00];

    let mut free = emulator_with(&program);
    free.run().unwrap();

    let mut stepped = emulator_with(&program);
    let mut session = DebugSession::new(Cursor::new(b"\ndump stack\n\n\n\n".to_vec()), Vec::new());
    session.run(&mut stepped).unwrap();

    assert_eq!(stepped.cpu.get_register_a(), free.cpu.get_register_a());
    assert_eq!(stepped.cpu.cycles, free.cpu.cycles);
    assert_eq!(stepped.memory.read(0x40), 0x04);
}

#[test]
fn test_snapshot_resume() {
    let mut emulator = emulator_with(&[0xA9, 0x10, 0xE8, 0x69, 0x01, 0x00]);
    emulator.step().unwrap();
    let snapshot = MachineSnapshot::capture(&emulator, "mid-run");

    emulator.run().unwrap();

    let mut resumed = Emulator::new();
    snapshot.restore(&mut resumed).unwrap();
    resumed.run().unwrap();

    assert_eq!(resumed.cpu.get_register_a(), emulator.cpu.get_register_a());
    assert_eq!(resumed.cpu.get_register_x(), 1);
    assert_eq!(resumed.instruction_count, emulator.instruction_count);
}
