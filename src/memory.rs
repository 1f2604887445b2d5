pub const MEMORY_SIZE: usize = 65536;

pub const STACK_PAGE: u16 = 0x0100;

// Programs are loaded here; the vector region at $FFFA-$FFFF is never consulted.
pub const PROGRAM_BASE: u16 = 0x0200;

#[derive(Clone)]
pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>, // 64KB memory space
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            data: Box::new([0; MEMORY_SIZE]),
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        self.data[address as usize]
    }

    pub fn read_zero_page(&self, address: u8) -> u8 {
        self.data[address as usize]
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.data[address as usize] = value;
    }

    pub fn write_zero_page(&mut self, address: u8, value: u8) {
        self.data[address as usize] = value;
    }

    /// Writes at an address wider than 16 bits, wrapping it into the 64KB space.
    pub fn write_wide(&mut self, address: usize, value: u8) {
        self.data[address % MEMORY_SIZE] = value;
    }

    /// Inclusive range read, used by the debugger and hex dumps.
    /// An end below the start yields an empty slice.
    pub fn read_range(&self, start: u16, end: u16) -> &[u8] {
        if end < start {
            return &[];
        }
        &self.data[start as usize..=end as usize]
    }

    // Copy a program image into memory, returning how many bytes fit
    pub fn load_program(&mut self, data: &[u8], start_address: u16) -> usize {
        let start = start_address as usize;
        let end = (start + data.len()).min(MEMORY_SIZE);
        let len = end - start;
        self.data[start..end].copy_from_slice(&data[..len]);
        len
    }

    // Read a 16-bit value in little-endian format
    pub fn read_u16(&self, address: u16) -> u16 {
        let low = self.read(address) as u16;
        let high = self.read(address.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").field("size", &MEMORY_SIZE).finish()
    }
}
