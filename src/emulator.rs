//! A CPU and its memory, explicitly constructed and driven by the caller.
//!
//! Free-running callers use [`Emulator::run`]. A debugger instead alternates
//! [`Emulator::pause`], which fetches the next opcode and stops before
//! executing it, with [`Emulator::resume`] or [`Emulator::request_exit`].

use log::{debug, info};
use serde::Serialize;

use crate::cpu::{Fetch, Fetched, CPU};
use crate::error::{CpuError, EmulatorError};
use crate::flags::StatusFlags;
use crate::memory::{Memory, PROGRAM_BASE};
use crate::metrics::{record_halt, record_program_load};

/// Why a run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Halt {
    Break { address: u16 },
    OperatorExit,
}

/// State captured after a fetch, before the instruction executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseState {
    pub address: u16,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub operand: String,
    pub bytes: Vec<u8>,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub flags: StatusFlags,
    pub cycles: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Paused(PauseState),
    Halted(Halt),
}

pub struct Emulator {
    pub cpu: CPU,
    pub memory: Memory,
    pub instruction_count: u64,
    pending: Option<Fetched>,
    exit_requested: bool,
    halt: Option<Halt>,
    fault: Option<CpuError>,
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            cpu: CPU::new(),
            memory: Memory::new(),
            instruction_count: 0,
            pending: None,
            exit_requested: false,
            halt: None,
            fault: None,
        }
    }

    /// Copies a program image into memory at the base address.
    pub fn load_program(&mut self, data: &[u8]) -> Result<(), EmulatorError> {
        let loaded = self.memory.load_program(data, PROGRAM_BASE);
        if loaded != data.len() {
            return Err(EmulatorError::ProgramTooLarge {
                len: data.len(),
                base: PROGRAM_BASE,
            });
        }

        record_program_load();
        debug!("Loaded {} bytes at ${:04X}", loaded, PROGRAM_BASE);
        Ok(())
    }

    /// Executes one instruction. Returns the halt reason once the run is over.
    ///
    /// An instruction held by [`Emulator::pause`] is executed rather than
    /// fetching a new one.
    pub fn step(&mut self) -> Result<Option<Halt>, CpuError> {
        if let Some(halt) = self.check_halt()? {
            return Ok(Some(halt));
        }

        if self.pending.is_some() {
            self.resume();
            return Ok(None);
        }

        match self.fetch_next()? {
            Fetch::Instruction(fetched) => {
                self.cpu.execute(&mut self.memory, fetched);
                self.instruction_count += 1;
                Ok(None)
            }
            Fetch::Break { address } => Ok(Some(self.finish(Halt::Break { address }))),
        }
    }

    /// Runs until BRK, an exit request or an unrecognized opcode.
    pub fn run(&mut self) -> Result<Halt, CpuError> {
        loop {
            if let Some(halt) = self.step()? {
                return Ok(halt);
            }
        }
    }

    /// Fetches the next instruction and holds it unexecuted.
    ///
    /// Calling this again while an instruction is held returns the same pause.
    pub fn pause(&mut self) -> Result<Event, CpuError> {
        if let Some(halt) = self.check_halt()? {
            return Ok(Event::Halted(halt));
        }

        if let Some(fetched) = self.pending {
            return Ok(Event::Paused(self.pause_state(fetched)));
        }

        match self.fetch_next()? {
            Fetch::Instruction(fetched) => {
                self.pending = Some(fetched);
                Ok(Event::Paused(self.pause_state(fetched)))
            }
            Fetch::Break { address } => Ok(Event::Halted(self.finish(Halt::Break { address }))),
        }
    }

    /// Executes the held instruction, if any.
    pub fn resume(&mut self) {
        if let Some(fetched) = self.pending.take() {
            self.cpu.execute(&mut self.memory, fetched);
            self.instruction_count += 1;
        }
    }

    /// One-shot exit flag, consumed by the next `step` or `pause`.
    ///
    /// A held instruction is dropped and the program counter moved back to it.
    pub fn request_exit(&mut self) {
        if let Some(fetched) = self.pending.take() {
            self.cpu.pc = fetched.address;
        }
        self.exit_requested = true;
    }

    pub fn is_paused(&self) -> bool {
        self.pending.is_some()
    }

    pub fn halt(&self) -> Option<Halt> {
        self.halt
    }

    /// The error that stopped the run, if it ended on an unrecognized opcode.
    pub fn fault(&self) -> Option<CpuError> {
        self.fault
    }

    // A fault is terminal and is reported again without refetching
    fn check_halt(&mut self) -> Result<Option<Halt>, CpuError> {
        if let Some(err) = self.fault {
            return Err(err);
        }
        if std::mem::take(&mut self.exit_requested) && self.halt.is_none() {
            return Ok(Some(self.finish(Halt::OperatorExit)));
        }
        Ok(self.halt)
    }

    fn fetch_next(&mut self) -> Result<Fetch, CpuError> {
        self.cpu.fetch(&self.memory).map_err(|err| {
            self.fault = Some(err);
            record_halt("unrecognized_opcode");
            err
        })
    }

    fn finish(&mut self, halt: Halt) -> Halt {
        self.halt = Some(halt);
        self.cpu.halted = true;

        let reason = match halt {
            Halt::Break { address } => {
                info!("BRK at ${:04X}", address);
                "break"
            }
            Halt::OperatorExit => {
                info!("Run stopped by operator at ${:04X}", self.cpu.pc);
                "operator_exit"
            }
        };
        info!(
            "{} instructions executed, {} cycles",
            self.instruction_count, self.cpu.cycles
        );
        record_halt(reason);
        halt
    }

    fn pause_state(&self, fetched: Fetched) -> PauseState {
        let info = fetched.info;
        let operand_start = fetched.address.wrapping_add(1);
        let bytes: Vec<u8> = (0..info.mode.operand_len() as u16)
            .map(|offset| self.memory.read(operand_start.wrapping_add(offset)))
            .collect();

        PauseState {
            address: fetched.address,
            opcode: info.opcode,
            mnemonic: info.mnemonic,
            operand: info.mode.format_operand(&bytes),
            bytes,
            a: self.cpu.a,
            x: self.cpu.x,
            y: self.cpu.y,
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            flags: self.cpu.flags,
            cycles: self.cpu.cycles,
        }
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}
