//! Addressing modes and effective-address resolution.
//!
//! Every mode except `Immediate` and `Implicit` resolves to a 16-bit
//! effective address. Indexed modes use a plain 16-bit add and never charge
//! the extra page-crossing cycle real hardware spends.

use crate::cpu::CPU;
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implicit,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndexedIndirect, // ($nn,X)
    IndirectIndexed, // ($nn),Y
}

/// How the operation will touch the resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadModifyWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Value(u8),
    Address(u16),
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    pub fn operand_len(self) -> u8 {
        match self {
            AddressingMode::Implicit => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed => 1,
            AddressingMode::Absolute | AddressingMode::AbsoluteX | AddressingMode::AbsoluteY => 2,
        }
    }

    /// Assembler-style rendering of the operand bytes, e.g. `#$05` or `($80),Y`.
    pub fn format_operand(self, bytes: &[u8]) -> String {
        let byte = bytes.first().copied().unwrap_or(0);
        let word = || {
            let high = bytes.get(1).copied().unwrap_or(0) as u16;
            (high << 8) | byte as u16
        };

        match self {
            AddressingMode::Implicit => String::new(),
            AddressingMode::Immediate => format!("#${:02X}", byte),
            AddressingMode::ZeroPage => format!("${:02X}", byte),
            AddressingMode::ZeroPageX => format!("${:02X},X", byte),
            AddressingMode::ZeroPageY => format!("${:02X},Y", byte),
            AddressingMode::Absolute => format!("${:04X}", word()),
            AddressingMode::AbsoluteX => format!("${:04X},X", word()),
            AddressingMode::AbsoluteY => format!("${:04X},Y", word()),
            AddressingMode::IndexedIndirect => format!("(${:02X},X)", byte),
            AddressingMode::IndirectIndexed => format!("(${:02X}),Y", byte),
        }
    }
}

// Address resolution works on the instruction stream, so it lives on the CPU
impl CPU {
    /// Resolves the operand for `mode`, consuming the operand bytes and one
    /// cycle per bus access or internal step.
    pub(crate) fn resolve(&mut self, memory: &Memory, mode: AddressingMode, access: Access) -> Operand {
        match mode {
            AddressingMode::Implicit => Operand::None,

            AddressingMode::Immediate => Operand::Value(self.fetch_operand_byte(memory)),

            AddressingMode::ZeroPage => Operand::Address(self.fetch_operand_byte(memory) as u16),

            AddressingMode::ZeroPageX => {
                let base = self.fetch_operand_byte(memory) as u16;
                self.tick(); // index add
                Operand::Address(base + self.x as u16)
            }

            AddressingMode::ZeroPageY => {
                let base = self.fetch_operand_byte(memory) as u16;
                self.tick();
                Operand::Address(base + self.y as u16)
            }

            AddressingMode::Absolute => Operand::Address(self.fetch_operand_word(memory)),

            AddressingMode::AbsoluteX => {
                let base = self.fetch_operand_word(memory);
                self.index_fixup(access);
                Operand::Address(base.wrapping_add(self.x as u16))
            }

            AddressingMode::AbsoluteY => {
                let base = self.fetch_operand_word(memory);
                self.index_fixup(access);
                Operand::Address(base.wrapping_add(self.y as u16))
            }

            AddressingMode::IndexedIndirect => {
                let ptr = self.fetch_operand_byte(memory).wrapping_add(self.x);
                self.tick();
                Operand::Address(self.read_zero_page_pointer(memory, ptr))
            }

            AddressingMode::IndirectIndexed => {
                let ptr = self.fetch_operand_byte(memory);
                let base = self.read_zero_page_pointer(memory, ptr);
                self.index_fixup(access);
                Operand::Address(base.wrapping_add(self.y as u16))
            }
        }
    }

    fn fetch_operand_byte(&mut self, memory: &Memory) -> u8 {
        let value = memory.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.tick();
        value
    }

    // Low byte first
    fn fetch_operand_word(&mut self, memory: &Memory) -> u16 {
        let low = self.fetch_operand_byte(memory) as u16;
        let high = self.fetch_operand_byte(memory) as u16;
        (high << 8) | low
    }

    // The pointer's high byte wraps within the zero page
    fn read_zero_page_pointer(&mut self, memory: &Memory, ptr: u8) -> u16 {
        let low = memory.read_zero_page(ptr) as u16;
        self.tick();
        let high = memory.read_zero_page(ptr.wrapping_add(1)) as u16;
        self.tick();
        (high << 8) | low
    }

    // Stores and read-modify-write always spend the fix-up cycle on indexed
    // absolute and ($nn),Y; reads never do since page crossing is not modeled.
    fn index_fixup(&mut self, access: Access) {
        if access != Access::Read {
            self.tick();
        }
    }
}
