//! # MOS 6502 Instruction-Level Emulator
//!
//! Executes a raw 6502 program image loaded at `$0200`, reproducing the
//! documented cycle cost and flag behaviour of each supported instruction:
//! loads, stores, add/subtract with carry, increments, carry set/clear, and
//! subroutine call/return. `BRK` ends the run.
//!
//! Execution can be paused before every instruction for single-step
//! debugging; see [`emulator::Emulator::pause`] and [`debugger`].
//!
//! ## Example
//!
//! ```rust
//! use mos6502_sim::{Emulator, Halt};
//!
//! let mut emulator = Emulator::new();
//!
//! // LDA #$40, ADC #$02, STA $0300, BRK
//! emulator
//!     .load_program(&[0xA9, 0x40, 0x69, 0x02, 0x8D, 0x00, 0x03, 0x00])
//!     .unwrap();
//!
//! let halt = emulator.run().unwrap();
//!
//! assert_eq!(halt, Halt::Break { address: 0x0207 });
//! assert_eq!(emulator.cpu.get_register_a(), 0x42);
//! assert_eq!(emulator.memory.read(0x0300), 0x42);
//! ```

pub mod addressing;
pub mod config;
pub mod cpu;
pub mod debugger;
pub mod emulator;
pub mod error;
pub mod flags;
pub mod memory;
pub mod metrics;
pub mod opcodes;
pub mod report;
pub mod snapshots;

pub use cpu::CPU;
pub use emulator::{Emulator, Event, Halt};
pub use error::{CpuError, DebugError, EmulatorError};
pub use memory::Memory;
