use std::fs;
use std::io;
use std::process;

use log::debug;

use mos6502_sim::config::{Command, Config, USAGE};
use mos6502_sim::debugger::DebugSession;
use mos6502_sim::metrics::{gather_text, init_metrics, update_cpu_registers};
use mos6502_sim::report::{hex_dump, render_json, render_report};
use mos6502_sim::snapshots::MachineSnapshot;
use mos6502_sim::{CpuError, DebugError, Emulator, EmulatorError, Halt};

fn main() {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return;
        }
        Err(err) => {
            eprintln!("{}", err);
            eprintln!();
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter())).init();
    init_metrics();

    match run(&config) {
        Ok(status) => process::exit(status),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}

fn run(config: &Config) -> Result<i32, EmulatorError> {
    let image = fs::read(&config.program)?;

    let mut emulator = Emulator::new();
    emulator.load_program(&image)?;

    let outcome: Result<Halt, CpuError> = if config.debug {
        let mut session = DebugSession::new(io::stdin().lock(), io::stdout());
        match session.run(&mut emulator) {
            Ok(halt) => Ok(halt),
            Err(DebugError::Cpu(err)) => Err(err),
            Err(err) => return Err(err.into()),
        }
    } else {
        emulator.run()
    };

    let status = match outcome {
        Ok(halt) => {
            debug!("Run finished: {:?}", halt);
            0
        }
        Err(err) => {
            eprintln!("Halted: {}", err);
            1
        }
    };

    update_cpu_registers(&emulator.cpu);

    if config.json {
        println!("{}", render_json(&emulator.cpu)?);
    } else {
        print!("{}", render_report(&emulator.cpu));
    }

    if let Some((start, end)) = config.dump {
        print!("{}", hex_dump(&emulator.memory, start, end));
    }

    if let Some(path) = &config.snapshot {
        let snapshot = MachineSnapshot::capture(&emulator, config.program.display().to_string());
        fs::write(path, snapshot.to_json()?)?;
        debug!("Snapshot {} written to {}", snapshot.id, path.display());
    }

    if config.metrics {
        print!("{}", gather_text());
    }

    Ok(status)
}
