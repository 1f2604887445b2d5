use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cpu::CPU;
use crate::emulator::Emulator;
use crate::error::EmulatorError;
use crate::flags::StatusFlags;
use crate::memory::MEMORY_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub flags: StatusFlags,
    pub status: u8,
    pub cycles: u64,
    pub cycles_remaining: i32,
    pub halted: bool,
}

impl CpuSnapshot {
    pub fn capture(cpu: &CPU) -> Self {
        CpuSnapshot {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            pc: cpu.pc,
            sp: cpu.sp,
            flags: cpu.flags,
            status: cpu.get_status(),
            cycles: cpu.cycles,
            cycles_remaining: cpu.cycles_remaining,
            halted: cpu.halted,
        }
    }

    pub fn restore(&self, cpu: &mut CPU) {
        cpu.a = self.a;
        cpu.x = self.x;
        cpu.y = self.y;
        cpu.pc = self.pc;
        cpu.sp = self.sp;
        cpu.flags = self.flags;
        cpu.cycles = self.cycles;
        cpu.cycles_remaining = self.cycles_remaining;
        cpu.halted = self.halted;
    }
}

/// Whole-machine checkpoint: registers plus a run-length compressed memory image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub cpu: CpuSnapshot,
    pub memory_image: Vec<u8>,
    pub size_bytes: u64,
    pub compression_ratio: f32,
    pub instruction_count: u64,
}

impl MachineSnapshot {
    pub fn capture(emulator: &Emulator, name: impl Into<String>) -> Self {
        let memory_image = compress_memory(emulator.memory.as_slice());
        let compression_ratio = memory_image.len() as f32 / MEMORY_SIZE as f32;

        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            cpu: CpuSnapshot::capture(&emulator.cpu),
            size_bytes: memory_image.len() as u64,
            memory_image,
            compression_ratio,
            instruction_count: emulator.instruction_count,
        }
    }

    /// Overwrites registers and all of memory. Any paused instruction or
    /// pending halt in the emulator is discarded.
    pub fn restore(&self, emulator: &mut Emulator) -> Result<(), EmulatorError> {
        let memory = decompress_memory(&self.memory_image)?;

        *emulator = Emulator::new();
        emulator.memory.load_program(&memory, 0);
        self.cpu.restore(&mut emulator.cpu);
        emulator.instruction_count = self.instruction_count;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, EmulatorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EmulatorError> {
        Ok(serde_json::from_str(json)?)
    }
}

// Run-length encoding: RLE_MARKER, count, value. A literal marker byte is
// escaped as RLE_MARKER, 0x00 since a run never has a zero count.
const RLE_MARKER: u8 = 0xFF;

fn compress_memory(memory: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    let mut i = 0;

    while i < memory.len() {
        let value = memory[i];
        let run = memory[i..]
            .iter()
            .take(u8::MAX as usize)
            .take_while(|&&byte| byte == value)
            .count();

        if run > 3 || value == 0 {
            compressed.extend_from_slice(&[RLE_MARKER, run as u8, value]);
        } else {
            for _ in 0..run {
                if value == RLE_MARKER {
                    compressed.extend_from_slice(&[RLE_MARKER, 0x00]);
                } else {
                    compressed.push(value);
                }
            }
        }

        i += run;
    }

    compressed
}

fn decompress_memory(compressed: &[u8]) -> Result<Vec<u8>, EmulatorError> {
    let mut memory = Vec::with_capacity(MEMORY_SIZE);
    let mut bytes = compressed.iter().copied();

    while let Some(byte) = bytes.next() {
        if byte != RLE_MARKER {
            memory.push(byte);
            continue;
        }

        match bytes.next() {
            Some(0x00) => memory.push(RLE_MARKER),
            Some(count) => {
                let value = bytes
                    .next()
                    .ok_or_else(|| EmulatorError::Snapshot("truncated run".to_string()))?;
                memory.extend(std::iter::repeat(value).take(count as usize));
            }
            None => return Err(EmulatorError::Snapshot("truncated escape".to_string())),
        }

        if memory.len() > MEMORY_SIZE {
            break;
        }
    }

    if memory.len() != MEMORY_SIZE {
        return Err(EmulatorError::Snapshot(format!(
            "memory image is {} bytes, expected {}",
            memory.len(),
            MEMORY_SIZE
        )));
    }

    Ok(memory)
}
