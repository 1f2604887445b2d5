use log::{trace, warn};

use crate::addressing::{Access, AddressingMode, Operand};
use crate::error::CpuError;
use crate::flags::StatusFlags;
use crate::memory::{Memory, PROGRAM_BASE, STACK_PAGE};
use crate::metrics::{record_instruction, Timer};
use crate::opcodes::{lookup, OpcodeInfo, Operation};

#[derive(Debug, Clone)]
pub struct CPU {
    // Registers
    pub a: u8,      // Accumulator
    pub x: u8,      // X Index Register
    pub y: u8,      // Y Index Register
    pub pc: u16,    // Program Counter
    pub sp: u8,     // Stack Pointer
    pub flags: StatusFlags,

    // Set to the documented cost minus the opcode fetch when an instruction
    // starts, then counted down once per bus access or internal step.
    pub cycles_remaining: i32,
    pub cycles: u64,
    pub halted: bool,
}

/// An opcode that has been read from memory but not yet executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched {
    pub address: u16,
    pub info: &'static OpcodeInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Instruction(Fetched),
    Break { address: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Halted,
}

impl CPU {
    pub fn new() -> Self {
        CPU {
            a: 0,
            x: 0,
            y: 0,
            pc: PROGRAM_BASE,
            sp: 0xFF,
            flags: StatusFlags::default(),
            cycles_remaining: 0,
            cycles: 0,
            halted: false,
        }
    }

    /// Fetches and executes one instruction.
    pub fn step(&mut self, memory: &mut Memory) -> Result<StepResult, CpuError> {
        if self.halted {
            return Ok(StepResult::Halted);
        }

        match self.fetch(memory)? {
            Fetch::Break { .. } => Ok(StepResult::Halted),
            Fetch::Instruction(fetched) => {
                self.execute(memory, fetched);
                Ok(StepResult::Continue)
            }
        }
    }

    /// Reads the opcode at the program counter and advances past it.
    ///
    /// BRK halts the CPU without executing. An unrecognized opcode halts it
    /// too, with the program counter left on the offending byte.
    pub fn fetch(&mut self, memory: &Memory) -> Result<Fetch, CpuError> {
        let address = self.pc;
        let opcode = memory.read(address);

        let Some(info) = lookup(opcode) else {
            self.halted = true;
            warn!("Unknown opcode: ${:02X} at PC: ${:04X}", opcode, address);
            return Err(CpuError::UnrecognizedOpcode { opcode, address });
        };

        self.pc = self.pc.wrapping_add(1);
        self.cycles += 1;

        if info.operation == Operation::Brk {
            self.halted = true;
            return Ok(Fetch::Break { address });
        }

        Ok(Fetch::Instruction(Fetched { address, info }))
    }

    /// Runs an instruction returned by [`CPU::fetch`].
    ///
    /// # Panics
    ///
    /// If `fetched` is a BRK, which `fetch` never hands out.
    pub fn execute(&mut self, memory: &mut Memory, fetched: Fetched) {
        let info = fetched.info;
        let mode = info.mode;
        let timer = Timer::new();

        self.cycles_remaining = info.cycles as i32 - 1;

        match info.operation {
            Operation::Lda => {
                self.a = self.read_operand(memory, mode);
                self.flags.update_zero_and_negative(self.a);
            }
            Operation::Ldx => {
                self.x = self.read_operand(memory, mode);
                self.flags.update_zero_and_negative(self.x);
            }
            Operation::Ldy => {
                self.y = self.read_operand(memory, mode);
                self.flags.update_zero_and_negative(self.y);
            }
            Operation::Sta => self.store(memory, mode, self.a),
            Operation::Stx => self.store(memory, mode, self.x),
            Operation::Sty => self.store(memory, mode, self.y),
            Operation::Adc => {
                let value = self.read_operand(memory, mode);
                self.adc(value);
            }
            Operation::Sbc => {
                let value = self.read_operand(memory, mode);
                self.sbc(value);
            }
            Operation::Inc => self.inc_memory(memory, mode),
            Operation::Inx => {
                self.x = self.x.wrapping_add(1);
                self.flags.update_zero_and_negative(self.x);
                self.tick();
            }
            Operation::Iny => {
                self.y = self.y.wrapping_add(1);
                self.flags.update_zero_and_negative(self.y);
                self.tick();
            }
            Operation::Sec => {
                self.flags.carry = true;
                self.tick();
            }
            Operation::Clc => {
                self.flags.carry = false;
                self.tick();
            }
            Operation::Jsr => self.jsr(memory, mode),
            Operation::Rts => self.rts(memory),
            Operation::Brk => unreachable!("BRK is handled by fetch and never executed"),
        }

        debug_assert_eq!(
            self.cycles_remaining, 0,
            "{} {:?} left cycles unaccounted",
            info.mnemonic, mode
        );

        trace!(
            "${:04X}: {:02X} {:<3} A={:02X} X={:02X} Y={:02X} SP={:02X} P={}",
            fetched.address,
            info.opcode,
            info.mnemonic,
            self.a,
            self.x,
            self.y,
            self.sp,
            self.flags.bit_string()
        );

        record_instruction(info.opcode, info.mnemonic, info.cycles, timer.elapsed());
    }

    // Getters
    pub fn get_register_a(&self) -> u8 { self.a }
    pub fn get_register_x(&self) -> u8 { self.x }
    pub fn get_register_y(&self) -> u8 { self.y }
    pub fn get_pc(&self) -> u16 { self.pc }
    pub fn get_sp(&self) -> u8 { self.sp }
    pub fn get_status(&self) -> u8 { self.flags.to_byte() }
    pub fn is_halted(&self) -> bool { self.halted }

    pub(crate) fn tick(&mut self) {
        self.cycles_remaining -= 1;
        self.cycles += 1;
    }

    fn read_byte(&mut self, memory: &Memory, address: u16) -> u8 {
        let value = memory.read(address);
        self.tick();
        value
    }

    fn write_byte(&mut self, memory: &mut Memory, address: u16, value: u8) {
        memory.write(address, value);
        self.tick();
    }

    fn read_operand(&mut self, memory: &Memory, mode: AddressingMode) -> u8 {
        match self.resolve(memory, mode, Access::Read) {
            Operand::Value(value) => value,
            Operand::Address(address) => self.read_byte(memory, address),
            Operand::None => unreachable!("{:?} supplies no operand", mode),
        }
    }

    fn effective_address(&mut self, memory: &Memory, mode: AddressingMode, access: Access) -> u16 {
        match self.resolve(memory, mode, access) {
            Operand::Address(address) => address,
            operand => unreachable!("{:?} resolved to {:?}, not an address", mode, operand),
        }
    }

    fn store(&mut self, memory: &mut Memory, mode: AddressingMode, value: u8) {
        let address = self.effective_address(memory, mode, Access::Write);
        self.write_byte(memory, address, value);
    }

    // Read, write back the unmodified value, then write the result
    fn inc_memory(&mut self, memory: &mut Memory, mode: AddressingMode) {
        let address = self.effective_address(memory, mode, Access::ReadModifyWrite);
        let value = self.read_byte(memory, address);
        self.write_byte(memory, address, value);
        let result = value.wrapping_add(1);
        self.write_byte(memory, address, result);
        self.flags.update_zero_and_negative(result);
    }

    // Arithmetic operations
    fn adc(&mut self, value: u8) {
        let carry = self.flags.carry as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        // Operands share a sign that the result does not
        let overflow = (self.a ^ value) & 0x80 == 0 && (self.a ^ result) & 0x80 != 0;

        self.flags.carry = sum > 0xFF;
        self.flags.overflow = overflow;

        self.a = result;
        self.flags.update_zero_and_negative(self.a);
    }

    // Carry in means "no borrow"; subtracting is adding the one's complement
    fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }

    fn jsr(&mut self, memory: &mut Memory, mode: AddressingMode) {
        let target = self.effective_address(memory, mode, Access::Read);
        self.tick(); // internal stack pointer cycle

        // Return address is the last byte of the JSR instruction
        let return_address = self.pc.wrapping_sub(1);
        self.push_word(memory, return_address);
        self.pc = target;
    }

    fn rts(&mut self, memory: &Memory) {
        self.tick(); // dummy read of the next byte
        self.tick(); // stack pointer increment
        let return_address = self.pop_word(memory);
        self.pc = return_address.wrapping_add(1);
        self.tick();
    }

    // Stack operations. The pointer wraps silently in both directions.
    pub fn push_byte(&mut self, memory: &mut Memory, value: u8) {
        memory.write(STACK_PAGE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
        self.tick();
    }

    pub fn pop_byte(&mut self, memory: &Memory) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let value = memory.read(STACK_PAGE | self.sp as u16);
        self.tick();
        value
    }

    // Low byte goes on first, so it comes off last
    pub fn push_word(&mut self, memory: &mut Memory, value: u16) {
        self.push_byte(memory, (value & 0xFF) as u8);
        self.push_byte(memory, (value >> 8) as u8);
    }

    pub fn pop_word(&mut self, memory: &Memory) -> u16 {
        let high = self.pop_byte(memory) as u16;
        let low = self.pop_byte(memory) as u16;
        (high << 8) | low
    }
}

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::OPCODE_TABLE;

    fn load(program: &[u8]) -> (CPU, Memory) {
        let cpu = CPU::new();
        let mut memory = Memory::new();
        memory.load_program(program, PROGRAM_BASE);
        (cpu, memory)
    }

    fn run(cpu: &mut CPU, memory: &mut Memory) {
        for _ in 0..1000 {
            if cpu.step(memory).unwrap() == StepResult::Halted {
                return;
            }
        }
        panic!("program did not halt");
    }

    #[test]
    fn test_power_on_state() {
        let cpu = CPU::new();

        assert_eq!(cpu.get_pc(), 0x0200);
        assert_eq!(cpu.get_sp(), 0xFF);
        assert_eq!(cpu.get_register_a(), 0);
        assert_eq!(cpu.get_register_x(), 0);
        assert_eq!(cpu.get_register_y(), 0);
        assert_eq!(cpu.flags, StatusFlags::default());
        assert!(!cpu.is_halted());
    }

    #[test]
    fn test_load_immediate() {
        for (opcode, register) in [(0xA9, 'A'), (0xA2, 'X'), (0xA0, 'Y')] {
            let (mut cpu, mut memory) = load(&[opcode, 0x42]);

            cpu.step(&mut memory).unwrap();

            let value = match register {
                'A' => cpu.a,
                'X' => cpu.x,
                _ => cpu.y,
            };
            assert_eq!(value, 0x42, "LD{} #$42", register);
            assert_eq!(cpu.pc, 0x0202);
            assert_eq!(cpu.cycles_remaining, 0);
            assert!(!cpu.flags.zero);
            assert!(!cpu.flags.negative);
        }
    }

    #[test]
    fn test_load_sets_zero_and_negative() {
        let (mut cpu, mut memory) = load(&[0xA9, 0x00, 0xA2, 0x80]);

        cpu.step(&mut memory).unwrap();
        assert!(cpu.flags.zero);

        cpu.step(&mut memory).unwrap();
        assert!(!cpu.flags.zero);
        assert!(cpu.flags.negative);
    }

    #[test]
    fn test_adc_immediate() {
        let (mut cpu, mut memory) = load(&[0xA9, 0x50, 0x69, 0x50]);

        cpu.step(&mut memory).unwrap();
        cpu.step(&mut memory).unwrap();

        assert_eq!(cpu.a, 0xA0);
        assert!(cpu.flags.overflow);
        assert!(cpu.flags.negative);
        assert!(!cpu.flags.carry);
        assert!(!cpu.flags.zero);
        assert_eq!(cpu.cycles_remaining, 0);
    }

    #[test]
    fn test_adc_carry_flag() {
        let (mut cpu, mut memory) = load(&[0xA9, 0xFF, 0x69, 0x02]);

        cpu.step(&mut memory).unwrap();
        cpu.step(&mut memory).unwrap();

        assert_eq!(cpu.a, 0x01);
        assert!(cpu.flags.carry);
        assert!(!cpu.flags.overflow);
    }

    #[test]
    fn test_adc_uses_carry_in() {
        let (mut cpu, mut memory) = load(&[0x38, 0xA9, 0x10, 0x69, 0x20]);

        run(&mut cpu, &mut memory);

        assert_eq!(cpu.a, 0x31);
    }

    #[test]
    fn test_adc_flags_for_all_operands() {
        let mut cpu = CPU::new();

        for a in 0..=255u8 {
            for b in 0..=255u8 {
                cpu.a = a;
                cpu.flags.carry = false;
                cpu.adc(b);

                let result = a.wrapping_add(b);
                let signed = a as i8 as i16 + b as i8 as i16;
                assert_eq!(cpu.a, result);
                assert_eq!(cpu.flags.carry, a as u16 + b as u16 > 0xFF);
                assert_eq!(cpu.flags.overflow, !(-128..=127).contains(&signed));
                assert_eq!(cpu.flags.zero, result == 0);
                assert_eq!(cpu.flags.negative, result & 0x80 != 0);
            }
        }
    }

    #[test]
    fn test_sbc_basic() {
        // SEC, LDA #$50, SBC #$20
        let (mut cpu, mut memory) = load(&[0x38, 0xA9, 0x50, 0xE9, 0x20]);

        run(&mut cpu, &mut memory);

        assert_eq!(cpu.a, 0x30);
        assert!(cpu.flags.carry); // no borrow
        assert!(!cpu.flags.overflow);
    }

    #[test]
    fn test_sbc_borrow() {
        // CLC, LDA #$50, SBC #$20 subtracts one more
        let (mut cpu, mut memory) = load(&[0x18, 0xA9, 0x50, 0xE9, 0x20]);
        run(&mut cpu, &mut memory);
        assert_eq!(cpu.a, 0x2F);
        assert!(cpu.flags.carry);

        // SEC, LDA #$20, SBC #$30 borrows
        let (mut cpu, mut memory) = load(&[0x38, 0xA9, 0x20, 0xE9, 0x30]);
        run(&mut cpu, &mut memory);
        assert_eq!(cpu.a, 0xF0);
        assert!(!cpu.flags.carry);
        assert!(cpu.flags.negative);
    }

    #[test]
    fn test_sbc_overflow() {
        // SEC, LDA #$80, SBC #$01: -128 - 1 overflows to +127
        let (mut cpu, mut memory) = load(&[0x38, 0xA9, 0x80, 0xE9, 0x01]);

        run(&mut cpu, &mut memory);

        assert_eq!(cpu.a, 0x7F);
        assert!(cpu.flags.overflow);
        assert!(!cpu.flags.negative);
    }

    #[test]
    fn test_inc_memory_zero_page() {
        let (mut cpu, mut memory) = load(&[0xE6, 0x10, 0xE6, 0x11]);
        memory.write(0x10, 0x41);
        memory.write(0x11, 0xFF);

        cpu.step(&mut memory).unwrap();
        assert_eq!(memory.read(0x10), 0x42);
        assert!(!cpu.flags.zero);

        cpu.step(&mut memory).unwrap();
        assert_eq!(memory.read(0x11), 0x00);
        assert!(cpu.flags.zero);
    }

    #[test]
    fn test_inx_iny_wrap() {
        let (mut cpu, mut memory) = load(&[0xA2, 0xFF, 0xE8, 0xC8]);

        cpu.step(&mut memory).unwrap();
        cpu.step(&mut memory).unwrap();
        assert_eq!(cpu.x, 0x00);
        assert!(cpu.flags.zero);

        cpu.step(&mut memory).unwrap();
        assert_eq!(cpu.y, 0x01);
        assert!(!cpu.flags.zero);
    }

    #[test]
    fn test_sec_clc() {
        let (mut cpu, mut memory) = load(&[0x38, 0x18]);

        cpu.step(&mut memory).unwrap();
        assert!(cpu.flags.carry);

        cpu.step(&mut memory).unwrap();
        assert!(!cpu.flags.carry);
    }

    #[test]
    fn test_store_registers() {
        // LDA #$11, LDX #$22, LDY #$33, STA $0300, STX $10, STY $11
        let (mut cpu, mut memory) = load(&[
            0xA9, 0x11, 0xA2, 0x22, 0xA0, 0x33, 0x8D, 0x00, 0x03, 0x86, 0x10, 0x84, 0x11,
        ]);

        run(&mut cpu, &mut memory);

        assert_eq!(memory.read(0x0300), 0x11);
        assert_eq!(memory.read(0x0010), 0x22);
        assert_eq!(memory.read(0x0011), 0x33);
    }

    #[test]
    fn test_jsr_rts() {
        let (mut cpu, mut memory) = load(&[0x20, 0x21, 0x02]);
        memory.write(0x0221, 0x60); // RTS

        cpu.step(&mut memory).unwrap();

        assert_eq!(cpu.pc, 0x0221);
        assert_eq!(cpu.sp, 0xFD);
        assert_eq!(cpu.cycles_remaining, 0);
        // Low byte pushed first
        assert_eq!(memory.read(0x01FF), 0x02);
        assert_eq!(memory.read(0x01FE), 0x02);

        // The stacked word is the JSR's last byte; RTS adds one to it
        let mut peek = cpu.clone();
        assert_eq!(peek.pop_word(&memory), 0x0202);

        cpu.step(&mut memory).unwrap();

        assert_eq!(cpu.sp, 0xFF);
        assert_eq!(cpu.pc, 0x0203);
        assert_eq!(cpu.cycles_remaining, 0);
    }

    #[test]
    #[should_panic(expected = "BRK is handled by fetch")]
    fn test_execute_rejects_brk() {
        let (mut cpu, mut memory) = load(&[0x00]);
        let info = lookup(0x00).unwrap();

        cpu.execute(&mut memory, Fetched { address: PROGRAM_BASE, info });
    }

    #[test]
    fn test_push_pop_word_order() {
        let mut cpu = CPU::new();
        let mut memory = Memory::new();

        cpu.push_word(&mut memory, 0x1234);

        assert_eq!(memory.read(0x01FF), 0x34);
        assert_eq!(memory.read(0x01FE), 0x12);
        assert_eq!(cpu.pop_word(&memory), 0x1234);
        assert_eq!(cpu.sp, 0xFF);
    }

    #[test]
    fn test_stack_pointer_wraps_silently() {
        let mut cpu = CPU::new();
        let mut memory = Memory::new();
        cpu.sp = 0x00;

        cpu.push_byte(&mut memory, 0xAB);
        assert_eq!(cpu.sp, 0xFF);
        assert_eq!(memory.read(0x0100), 0xAB);

        assert_eq!(cpu.pop_byte(&memory), 0xAB);
        assert_eq!(cpu.sp, 0x00);
    }

    #[test]
    fn test_unrecognized_opcode_halts() {
        let (mut cpu, mut memory) = load(&[0xA9, 0x07, 0xFF, 0xA9, 0x09]);

        cpu.step(&mut memory).unwrap();
        let before = cpu.clone();

        let result = cpu.step(&mut memory);

        assert_eq!(
            result,
            Err(CpuError::UnrecognizedOpcode { opcode: 0xFF, address: 0x0202 })
        );
        assert!(cpu.is_halted());
        assert_eq!(cpu.a, before.a);
        assert_eq!(cpu.x, before.x);
        assert_eq!(cpu.y, before.y);
        assert_eq!(cpu.pc, before.pc);
        assert_eq!(cpu.sp, before.sp);
        assert_eq!(cpu.flags, before.flags);

        // Stays halted
        assert_eq!(cpu.step(&mut memory), Ok(StepResult::Halted));
        assert_eq!(cpu.a, 0x07);
    }

    #[test]
    fn test_brk_halts_silently() {
        let (mut cpu, mut memory) = load(&[0xA9, 0x01, 0x00, 0xA9, 0x02]);

        run(&mut cpu, &mut memory);

        assert!(cpu.is_halted());
        assert_eq!(cpu.a, 0x01);
        assert_eq!(cpu.pc, 0x0203);
    }

    #[test]
    fn test_every_opcode_spends_its_documented_cycles() {
        for info in OPCODE_TABLE.iter().flatten() {
            if info.operation == Operation::Brk {
                continue;
            }

            let (mut cpu, mut memory) = load(&[info.opcode, 0x10, 0x03]);
            cpu.x = 0x01;
            cpu.y = 0x02;
            cpu.sp = 0xFD; // room for RTS to pop

            let before = cpu.cycles;
            cpu.step(&mut memory).unwrap();

            assert_eq!(cpu.cycles_remaining, 0, "{} {:?}", info.mnemonic, info.mode);
            assert_eq!(
                cpu.cycles - before,
                info.cycles as u64,
                "{} {:?}",
                info.mnemonic,
                info.mode
            );
        }
    }

    #[test]
    fn test_program_counter_advances_by_instruction_length() {
        for info in OPCODE_TABLE.iter().flatten() {
            if matches!(info.operation, Operation::Brk | Operation::Jsr | Operation::Rts) {
                continue;
            }

            let (mut cpu, mut memory) = load(&[info.opcode, 0x10, 0x03]);
            cpu.step(&mut memory).unwrap();

            assert_eq!(cpu.pc, PROGRAM_BASE + info.length() as u16, "{}", info.mnemonic);
        }
    }
}
