use std::fmt::Write;

use crate::cpu::CPU;
use crate::error::EmulatorError;
use crate::memory::Memory;
use crate::snapshots::CpuSnapshot;

const BYTES_PER_LINE: usize = 16;

/// Inclusive hex dump, sixteen bytes per line, each line prefixed with its address.
pub fn hex_dump(memory: &Memory, start: u16, end: u16) -> String {
    let mut out = String::new();
    let bytes = memory.read_range(start, end);

    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let address = start as usize + line * BYTES_PER_LINE;
        let hex: Vec<String> = chunk.iter().map(|byte| format!("{:02X}", byte)).collect();
        let _ = writeln!(out, "{:04X}: {}", address, hex.join(" "));
    }

    out
}

pub fn render_report(cpu: &CPU) -> String {
    format!(
        "CPU State:\nA: ${:02X}\nX: ${:02X}\nY: ${:02X}\nPC: ${:04X}\nSP: ${:02X}\nFlags (CZIDBVN): {}\nCycles: {}\n",
        cpu.get_register_a(),
        cpu.get_register_x(),
        cpu.get_register_y(),
        cpu.get_pc(),
        cpu.get_sp(),
        cpu.flags.bit_string(),
        cpu.cycles,
    )
}

pub fn render_json(cpu: &CPU) -> Result<String, EmulatorError> {
    Ok(serde_json::to_string_pretty(&CpuSnapshot::capture(cpu))?)
}
