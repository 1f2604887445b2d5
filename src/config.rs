use std::path::PathBuf;

use crate::debugger::parse_address;
use crate::error::EmulatorError;

pub const USAGE: &str = "\
Usage: mos6502_sim --program <file> [OPTIONS]

Options:
  -p, --program <file>       Raw program image, loaded at $0200
  -d, --debug                Pause before every instruction
      --dump <start> <end>   Hex dump an inclusive range after the run
      --json                 Print the final CPU state as JSON
      --snapshot <file>      Write a machine snapshot (JSON) after the run
      --metrics              Print Prometheus metrics after the run
  -v, --verbose              Debug-level logging (RUST_LOG overrides)
  -h, --help                 Show this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub program: PathBuf,
    pub debug: bool,
    pub dump: Option<(u16, u16)>,
    pub json: bool,
    pub snapshot: Option<PathBuf>,
    pub metrics: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Config),
    Help,
}

impl Config {
    /// Parses the arguments that follow the program name.
    pub fn from_args<I>(args: I) -> Result<Command, EmulatorError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut program = None;
        let mut config = Config {
            program: PathBuf::new(),
            debug: false,
            dump: None,
            json: false,
            snapshot: None,
            metrics: false,
            verbose: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-p" | "--program" => {
                    program = Some(PathBuf::from(required(&mut args, &arg)?));
                }
                "-d" | "--debug" => config.debug = true,
                "--dump" => {
                    let start = hex_argument(&mut args, &arg)?;
                    let end = hex_argument(&mut args, &arg)?;
                    if start > end {
                        return Err(usage(format!("--dump start ${:04X} is past end ${:04X}", start, end)));
                    }
                    config.dump = Some((start, end));
                }
                "--json" => config.json = true,
                "--snapshot" => {
                    config.snapshot = Some(PathBuf::from(required(&mut args, &arg)?));
                }
                "--metrics" => config.metrics = true,
                "-v" | "--verbose" => config.verbose = true,
                "-h" | "--help" => return Ok(Command::Help),
                other => return Err(usage(format!("Unknown argument: {}", other))),
            }
        }

        config.program = program.ok_or_else(|| usage("Missing required --program <file>".to_string()))?;
        Ok(Command::Run(config))
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

fn usage(message: String) -> EmulatorError {
    EmulatorError::Usage(message)
}

fn required(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, EmulatorError> {
    args.next()
        .ok_or_else(|| usage(format!("{} needs a value", flag)))
}

fn hex_argument(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<u16, EmulatorError> {
    let value = required(args, flag)?;
    parse_address(&value).ok_or_else(|| usage(format!("{}: '{}' is not a hex address", flag, value)))
}
