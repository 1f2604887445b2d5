use std::io;

use thiserror::Error;

/// Failure while executing the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unrecognized opcode ${opcode:02X} at ${address:04X}")]
    UnrecognizedOpcode { opcode: u8, address: u16 },
}

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("malformed debug command: {0}")]
    MalformedCommand(String),

    #[error("debugger I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Cpu(#[from] CpuError),
}

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to read program image: {0}")]
    Io(#[from] io::Error),

    #[error("program of {len} bytes does not fit in memory at ${base:04X}")]
    ProgramTooLarge { len: usize, base: u16 },

    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error(transparent)]
    Debug(#[from] DebugError),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
