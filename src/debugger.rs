//! Interactive single-step debugger.
//!
//! The emulator pauses after every fetch; the operator then either steps
//! (blank line), inspects memory, or exits. Commands:
//!
//! - `dump stack`
//! - `dump memory <start-hex> <end-hex>`
//! - `help`
//! - `exit`

use std::io::{BufRead, Write};
use std::str::FromStr;

use log::debug;

use crate::emulator::{Emulator, Event, Halt, PauseState};
use crate::error::DebugError;
use crate::memory::STACK_PAGE;
use crate::metrics::record_debug_command;
use crate::report::hex_dump;

pub const HELP_TEXT: &str = "\
Commands:
  <enter>                          execute the displayed instruction
  dump stack                       show $0100-$01FF
  dump memory <start> <end>        show an inclusive range, addresses in hex
  help                             show this text
  exit                             stop the run
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    Step,
    DumpStack,
    DumpMemory { start: u16, end: u16 },
    Help,
    Exit,
}

impl DebugCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DebugCommand::Step => "step",
            DebugCommand::DumpStack => "dump_stack",
            DebugCommand::DumpMemory { .. } => "dump_memory",
            DebugCommand::Help => "help",
            DebugCommand::Exit => "exit",
        }
    }
}

impl FromStr for DebugCommand {
    type Err = DebugError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => Ok(DebugCommand::Step),
            ["dump", "stack"] => Ok(DebugCommand::DumpStack),
            ["dump", "memory", start, end] => {
                let start = parse_address(start)
                    .ok_or_else(|| DebugError::MalformedCommand(format!("bad start address '{}'", start)))?;
                let end = parse_address(end)
                    .ok_or_else(|| DebugError::MalformedCommand(format!("bad end address '{}'", end)))?;
                if start > end {
                    return Err(DebugError::MalformedCommand(format!(
                        "start ${:04X} is past end ${:04X}",
                        start, end
                    )));
                }
                Ok(DebugCommand::DumpMemory { start, end })
            }
            ["help"] => Ok(DebugCommand::Help),
            ["exit"] => Ok(DebugCommand::Exit),
            _ => Err(DebugError::MalformedCommand(line.trim().to_string())),
        }
    }
}

/// Parses a 16-bit hex address, with or without a `$` or `0x` prefix.
pub fn parse_address(text: &str) -> Option<u16> {
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The held instruction ran; the caller should pause again.
    Resumed,
    /// Text for the operator; the emulator stays paused.
    Output(String),
    /// The exit flag is set.
    Exit,
}

/// Applies one operator command to a paused emulator.
pub fn respond(emulator: &mut Emulator, command: DebugCommand) -> Reply {
    record_debug_command(command.name());
    debug!("Debugger command: {:?}", command);

    match command {
        DebugCommand::Step => {
            emulator.resume();
            Reply::Resumed
        }
        DebugCommand::DumpStack => Reply::Output(hex_dump(&emulator.memory, STACK_PAGE, STACK_PAGE | 0xFF)),
        DebugCommand::DumpMemory { start, end } => Reply::Output(hex_dump(&emulator.memory, start, end)),
        DebugCommand::Help => Reply::Output(HELP_TEXT.to_string()),
        DebugCommand::Exit => {
            emulator.request_exit();
            Reply::Exit
        }
    }
}

/// Two-line rendering of the pending instruction and register state.
pub fn render_pause(state: &PauseState) -> String {
    let encoded: Vec<String> = std::iter::once(state.opcode)
        .chain(state.bytes.iter().copied())
        .map(|byte| format!("{:02X}", byte))
        .collect();

    let instruction = format!("{} {}", state.mnemonic, state.operand);

    format!(
        "${:04X}: {:<9} {}\n A=${:02X} X=${:02X} Y=${:02X} PC=${:04X} SP=${:02X} CZIDBVN={} cycles={}",
        state.address,
        encoded.join(" "),
        instruction.trim_end(),
        state.a,
        state.x,
        state.y,
        state.pc,
        state.sp,
        state.flags.bit_string(),
        state.cycles,
    )
}

/// Line-oriented debugger front end over any reader and writer.
pub struct DebugSession<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> DebugSession<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Drives the emulator until it halts. End of input acts as `exit`.
    pub fn run(&mut self, emulator: &mut Emulator) -> Result<Halt, DebugError> {
        loop {
            match emulator.pause()? {
                Event::Halted(halt) => return Ok(halt),
                Event::Paused(state) => {
                    writeln!(self.output, "{}", render_pause(&state))?;
                    self.prompt(emulator)?;
                }
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    // Reads commands until one releases the pause
    fn prompt(&mut self, emulator: &mut Emulator) -> Result<(), DebugError> {
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                emulator.request_exit();
                return Ok(());
            }

            let command = match line.parse::<DebugCommand>() {
                Ok(command) => command,
                Err(err) => {
                    writeln!(self.output, "{} (type 'help' for commands)", err)?;
                    continue;
                }
            };

            match respond(emulator, command) {
                Reply::Output(text) => write!(self.output, "{}", text)?,
                Reply::Resumed | Reply::Exit => return Ok(()),
            }
        }
    }
}
