use std::sync::Once;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use crate::cpu::CPU;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Counter for total CPU instructions executed by opcode
    pub static ref CPU_INSTRUCTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cpu_instructions_total", "Total number of CPU instructions executed by opcode"),
        &["opcode", "instruction"]
    ).expect("Failed to create CPU instructions counter");

    /// Counter for CPU cycles executed
    pub static ref CPU_CYCLES_TOTAL: Counter = Counter::new(
        "cpu_cycles_total", "Total number of documented CPU cycles executed"
    ).expect("Failed to create CPU cycles counter");

    /// Histogram for instruction execution time
    pub static ref INSTRUCTION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("instruction_duration_seconds", "Time spent executing instructions")
            .buckets(vec![0.000001, 0.000005, 0.00001, 0.00005, 0.0001, 0.0005, 0.001]),
        &["instruction"]
    ).expect("Failed to create instruction duration histogram");

    /// Counter for run terminations by reason
    pub static ref CPU_HALTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cpu_halts_total", "Total number of runs halted, by reason"),
        &["reason"]
    ).expect("Failed to create CPU halts counter");

    /// Counter for operator commands entered at the debug prompt
    pub static ref DEBUG_COMMANDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("debug_commands_total", "Total number of debugger commands handled"),
        &["command"]
    ).expect("Failed to create debug commands counter");

    /// Counter for program loads
    pub static ref PROGRAM_LOADS_TOTAL: Counter = Counter::new(
        "program_loads_total", "Total number of programs loaded"
    ).expect("Failed to create program loads counter");

    /// Gauge for CPU register values
    pub static ref CPU_REGISTER_VALUES: GaugeVec = GaugeVec::new(
        Opts::new("cpu_register_value", "Current CPU register values"),
        &["register"]
    ).expect("Failed to create CPU register values gauge");

    /// Gauge for CPU flags
    pub static ref CPU_FLAGS: GaugeVec = GaugeVec::new(
        Opts::new("cpu_flags", "Current CPU flag states (0 or 1)"),
        &["flag"]
    ).expect("Failed to create CPU flags gauge");
}

static INIT: Once = Once::new();

/// Initialize Prometheus metrics by registering them with the global registry.
/// Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(CPU_INSTRUCTIONS_TOTAL.clone()))
            .expect("Failed to register CPU instructions counter");

        REGISTRY
            .register(Box::new(CPU_CYCLES_TOTAL.clone()))
            .expect("Failed to register CPU cycles counter");

        REGISTRY
            .register(Box::new(INSTRUCTION_DURATION.clone()))
            .expect("Failed to register instruction duration histogram");

        REGISTRY
            .register(Box::new(CPU_HALTS_TOTAL.clone()))
            .expect("Failed to register CPU halts counter");

        REGISTRY
            .register(Box::new(DEBUG_COMMANDS_TOTAL.clone()))
            .expect("Failed to register debug commands counter");

        REGISTRY
            .register(Box::new(PROGRAM_LOADS_TOTAL.clone()))
            .expect("Failed to register program loads counter");

        REGISTRY
            .register(Box::new(CPU_REGISTER_VALUES.clone()))
            .expect("Failed to register CPU register values gauge");

        REGISTRY
            .register(Box::new(CPU_FLAGS.clone()))
            .expect("Failed to register CPU flags gauge");
    });
}

/// Record a CPU instruction execution
pub fn record_instruction(opcode: u8, instruction_name: &str, cycles: u8, duration: Duration) {
    CPU_INSTRUCTIONS_TOTAL
        .with_label_values(&[&format!("0x{:02X}", opcode), instruction_name])
        .inc();

    CPU_CYCLES_TOTAL.inc_by(cycles as f64);

    INSTRUCTION_DURATION
        .with_label_values(&[instruction_name])
        .observe(duration.as_secs_f64());
}

pub fn record_halt(reason: &str) {
    CPU_HALTS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_debug_command(command: &str) {
    DEBUG_COMMANDS_TOTAL.with_label_values(&[command]).inc();
}

pub fn record_program_load() {
    PROGRAM_LOADS_TOTAL.inc();
}

/// Update CPU register and flag gauges
pub fn update_cpu_registers(cpu: &CPU) {
    for (register, value) in [
        ("A", cpu.a as f64),
        ("X", cpu.x as f64),
        ("Y", cpu.y as f64),
        ("PC", cpu.pc as f64),
        ("SP", cpu.sp as f64),
    ] {
        CPU_REGISTER_VALUES.with_label_values(&[register]).set(value);
    }

    let flags = &cpu.flags;
    for (flag, set) in [
        ("carry", flags.carry),
        ("zero", flags.zero),
        ("interrupt_disable", flags.interrupt_disable),
        ("decimal_mode", flags.decimal),
        ("break_command", flags.break_command),
        ("overflow", flags.overflow),
        ("negative", flags.negative),
    ] {
        CPU_FLAGS
            .with_label_values(&[flag])
            .set(if set { 1.0 } else { 0.0 });
    }
}

/// Text exposition of everything in the registry
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    // Encoding into a Vec only fails on malformed metric families
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper struct for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
