//! Opcode dispatch table.
//!
//! Each supported opcode maps to its operation, addressing mode and
//! documented cycle count. Adding an official instruction is a matter of
//! adding an entry here and, for a new operation, a handler arm in the CPU.

use crate::addressing::AddressingMode;
use crate::addressing::AddressingMode::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Lda,
    Ldx,
    Ldy,
    Sta,
    Stx,
    Sty,
    Adc,
    Sbc,
    Inc,
    Inx,
    Iny,
    Sec,
    Clc,
    Jsr,
    Rts,
    Brk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub operation: Operation,
    pub mode: AddressingMode,
    pub cycles: u8,
}

impl OpcodeInfo {
    /// Encoded length in bytes, opcode included.
    pub fn length(&self) -> u8 {
        1 + self.mode.operand_len()
    }
}

const fn op(opcode: u8, mnemonic: &'static str, operation: Operation, mode: AddressingMode, cycles: u8) -> OpcodeInfo {
    OpcodeInfo {
        opcode,
        mnemonic,
        operation,
        mode,
        cycles,
    }
}

const INSTRUCTIONS: &[OpcodeInfo] = &[
    // LDA - Load Accumulator
    op(0xA9, "LDA", Operation::Lda, Immediate, 2),
    op(0xA5, "LDA", Operation::Lda, ZeroPage, 3),
    op(0xB5, "LDA", Operation::Lda, ZeroPageX, 4),
    op(0xAD, "LDA", Operation::Lda, Absolute, 4),
    op(0xBD, "LDA", Operation::Lda, AbsoluteX, 4),
    op(0xB9, "LDA", Operation::Lda, AbsoluteY, 4),
    op(0xA1, "LDA", Operation::Lda, IndexedIndirect, 6),
    op(0xB1, "LDA", Operation::Lda, IndirectIndexed, 5),
    // LDX - Load X Register
    op(0xA2, "LDX", Operation::Ldx, Immediate, 2),
    op(0xA6, "LDX", Operation::Ldx, ZeroPage, 3),
    op(0xB6, "LDX", Operation::Ldx, ZeroPageY, 4),
    op(0xAE, "LDX", Operation::Ldx, Absolute, 4),
    op(0xBE, "LDX", Operation::Ldx, AbsoluteY, 4),
    // LDY - Load Y Register
    op(0xA0, "LDY", Operation::Ldy, Immediate, 2),
    op(0xA4, "LDY", Operation::Ldy, ZeroPage, 3),
    op(0xB4, "LDY", Operation::Ldy, ZeroPageX, 4),
    op(0xAC, "LDY", Operation::Ldy, Absolute, 4),
    op(0xBC, "LDY", Operation::Ldy, AbsoluteX, 4),
    // STA - Store Accumulator
    op(0x85, "STA", Operation::Sta, ZeroPage, 3),
    op(0x95, "STA", Operation::Sta, ZeroPageX, 4),
    op(0x8D, "STA", Operation::Sta, Absolute, 4),
    op(0x9D, "STA", Operation::Sta, AbsoluteX, 5),
    op(0x99, "STA", Operation::Sta, AbsoluteY, 5),
    op(0x81, "STA", Operation::Sta, IndexedIndirect, 6),
    op(0x91, "STA", Operation::Sta, IndirectIndexed, 6),
    // STX / STY
    op(0x86, "STX", Operation::Stx, ZeroPage, 3),
    op(0x96, "STX", Operation::Stx, ZeroPageY, 4),
    op(0x8E, "STX", Operation::Stx, Absolute, 4),
    op(0x84, "STY", Operation::Sty, ZeroPage, 3),
    op(0x94, "STY", Operation::Sty, ZeroPageX, 4),
    op(0x8C, "STY", Operation::Sty, Absolute, 4),
    // ADC - Add with Carry
    op(0x69, "ADC", Operation::Adc, Immediate, 2),
    op(0x65, "ADC", Operation::Adc, ZeroPage, 3),
    op(0x75, "ADC", Operation::Adc, ZeroPageX, 4),
    op(0x6D, "ADC", Operation::Adc, Absolute, 4),
    op(0x7D, "ADC", Operation::Adc, AbsoluteX, 4),
    op(0x79, "ADC", Operation::Adc, AbsoluteY, 4),
    op(0x61, "ADC", Operation::Adc, IndexedIndirect, 6),
    op(0x71, "ADC", Operation::Adc, IndirectIndexed, 5),
    // SBC - Subtract with Carry
    op(0xE9, "SBC", Operation::Sbc, Immediate, 2),
    op(0xE5, "SBC", Operation::Sbc, ZeroPage, 3),
    op(0xF5, "SBC", Operation::Sbc, ZeroPageX, 4),
    op(0xED, "SBC", Operation::Sbc, Absolute, 4),
    op(0xFD, "SBC", Operation::Sbc, AbsoluteX, 4),
    op(0xF9, "SBC", Operation::Sbc, AbsoluteY, 4),
    op(0xE1, "SBC", Operation::Sbc, IndexedIndirect, 6),
    op(0xF1, "SBC", Operation::Sbc, IndirectIndexed, 5),
    // INC - Increment Memory
    op(0xE6, "INC", Operation::Inc, ZeroPage, 5),
    op(0xF6, "INC", Operation::Inc, ZeroPageX, 6),
    op(0xEE, "INC", Operation::Inc, Absolute, 6),
    op(0xFE, "INC", Operation::Inc, AbsoluteX, 7),
    // Register increments
    op(0xE8, "INX", Operation::Inx, Implicit, 2),
    op(0xC8, "INY", Operation::Iny, Implicit, 2),
    // Carry flag
    op(0x38, "SEC", Operation::Sec, Implicit, 2),
    op(0x18, "CLC", Operation::Clc, Implicit, 2),
    // Subroutines
    op(0x20, "JSR", Operation::Jsr, Absolute, 6),
    op(0x60, "RTS", Operation::Rts, Implicit, 6),
    // BRK ends the run; it is never executed
    op(0x00, "BRK", Operation::Brk, Implicit, 7),
];

const fn build_table() -> [Option<OpcodeInfo>; 256] {
    let mut table: [Option<OpcodeInfo>; 256] = [None; 256];
    let mut i = 0;
    while i < INSTRUCTIONS.len() {
        let info = INSTRUCTIONS[i];
        table[info.opcode as usize] = Some(info);
        i += 1;
    }
    table
}

pub static OPCODE_TABLE: [Option<OpcodeInfo>; 256] = build_table();

pub const BRK_OPCODE: u8 = 0x00;

pub fn lookup(opcode: u8) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE[opcode as usize].as_ref()
}

/// Get opcode name for metrics and the debugger
pub fn instruction_name(opcode: u8) -> &'static str {
    lookup(opcode).map_or("UNKNOWN", |info| info.mnemonic)
}
