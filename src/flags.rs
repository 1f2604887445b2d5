use serde::{Deserialize, Serialize};

// Bit positions in the packed status byte
pub const CARRY_FLAG: u8 = 0x01;
pub const ZERO_FLAG: u8 = 0x02;
pub const INTERRUPT_DISABLE: u8 = 0x04;
pub const DECIMAL_MODE: u8 = 0x08;
pub const BREAK_COMMAND: u8 = 0x10;
pub const UNUSED_FLAG: u8 = 0x20;
pub const OVERFLOW_FLAG: u8 = 0x40;
pub const NEGATIVE_FLAG: u8 = 0x80;

/// The processor status register as seven independent flags.
///
/// Only carry, zero, overflow and negative are ever computed by the
/// implemented instructions; the other three are carried along untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_disable: bool,
    pub decimal: bool,
    pub break_command: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl StatusFlags {
    pub fn update_zero_and_negative(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0x80 != 0;
    }

    /// Renders the flags as `0`/`1` in the order
    /// carry, zero, interrupt-disable, decimal, break, overflow, negative.
    pub fn bit_string(&self) -> String {
        [
            self.carry,
            self.zero,
            self.interrupt_disable,
            self.decimal,
            self.break_command,
            self.overflow,
            self.negative,
        ]
        .iter()
        .map(|&set| if set { '1' } else { '0' })
        .collect()
    }

    pub fn to_byte(&self) -> u8 {
        let mut status = UNUSED_FLAG;
        for (set, bit) in [
            (self.carry, CARRY_FLAG),
            (self.zero, ZERO_FLAG),
            (self.interrupt_disable, INTERRUPT_DISABLE),
            (self.decimal, DECIMAL_MODE),
            (self.break_command, BREAK_COMMAND),
            (self.overflow, OVERFLOW_FLAG),
            (self.negative, NEGATIVE_FLAG),
        ] {
            if set {
                status |= bit;
            }
        }
        status
    }

    pub fn from_byte(status: u8) -> Self {
        StatusFlags {
            carry: status & CARRY_FLAG != 0,
            zero: status & ZERO_FLAG != 0,
            interrupt_disable: status & INTERRUPT_DISABLE != 0,
            decimal: status & DECIMAL_MODE != 0,
            break_command: status & BREAK_COMMAND != 0,
            overflow: status & OVERFLOW_FLAG != 0,
            negative: status & NEGATIVE_FLAG != 0,
        }
    }
}
