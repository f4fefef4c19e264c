use crate::{SerialPort, SerialResult, UartDriver};
use anyhow::Context;
use serialkit_config::{parse_size, MemoryMapConfig, MemoryRange};
use std::fmt::Write;
use std::ops::Range;

// STM8S207 memory map. Both ends are exclusive.
pub const FLASH_START: u64 = 0x8000;
pub const FLASH_END: u64 = 0xFFFF;
pub const RAM_START: u64 = 0x0000;
pub const RAM_END: u64 = 0x1800;

// Legacy firmware printed "In Flash programm : "; scripts matching that
// exact text need updating.
pub const FLASH_LABEL: &str = "In Flash program : ";
pub const RAM_LABEL: &str = "In RAM : ";

pub const HEX_DUMP_ROW: usize = 16;
pub const CLEAR_SCREEN: &[u8] = b"\x1b[H\x1b[2J";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    Flash,
    Ram,
    Unmapped,
}

impl MemoryRegion {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Flash => Some(FLASH_LABEL),
            Self::Ram => Some(RAM_LABEL),
            Self::Unmapped => None,
        }
    }
}

/// Address ranges used to tell flash pointers from RAM pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMap {
    pub flash: Range<u64>,
    pub ram: Range<u64>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            flash: FLASH_START..FLASH_END,
            ram: RAM_START..RAM_END,
        }
    }
}

impl MemoryMap {
    pub fn from_config(config: &MemoryMapConfig) -> anyhow::Result<Self> {
        Ok(Self {
            flash: range_from_config(&config.flash).context("Bad flash range")?,
            ram: range_from_config(&config.ram).context("Bad RAM range")?,
        })
    }

    /// Flash wins if the two ranges overlap.
    pub fn classify(&self, addr: u64) -> MemoryRegion {
        if self.flash.contains(&addr) {
            MemoryRegion::Flash
        } else if self.ram.contains(&addr) {
            MemoryRegion::Ram
        } else {
            MemoryRegion::Unmapped
        }
    }
}

fn range_from_config(range: &MemoryRange) -> anyhow::Result<Range<u64>> {
    let size = parse_size(&range.size)?;
    let end = range
        .base
        .checked_add(size)
        .ok_or_else(|| anyhow::anyhow!("Range at {:#x} overflows", range.base))?;
    Ok(range.base..end)
}

/// Fixed-point rendering with three truncated decimals. Only meaningful
/// for non-negative values; negative input is formatted component-wise
/// and makes no claim to be correct.
pub fn format_float(f: f32) -> String {
    let i = (f * 1000.0) as i32;
    format!("{}.{:03}", i / 1000, i % 1000)
}

pub fn format_address(map: &MemoryMap, addr: u64) -> String {
    let label = map.classify(addr).label().unwrap_or("");
    format!("{} 0x{:06X}\r\n", label, addr)
}

/// One hex dump row: address, up to 16 hex bytes (blank padded), ASCII.
pub fn format_hex_row(addr: u64, chunk: &[u8]) -> String {
    let mut row = String::with_capacity(80);
    // Writing to a String cannot fail.
    let _ = write!(row, "  {:06x}: ", addr);
    for b in chunk {
        let _ = write!(row, " {:02x}", b);
    }
    for _ in chunk.len()..HEX_DUMP_ROW {
        row.push_str("   ");
    }
    row.push_str("  ");
    row.extend(chunk.iter().map(|&b| printable(b)));
    row.push_str("\n\r");
    row
}

fn printable(b: u8) -> char {
    if (0x20..=0x7E).contains(&b) {
        b as char
    } else {
        '.'
    }
}

impl<D: UartDriver> SerialPort<D> {
    pub fn print_float(&mut self, f: f32) -> SerialResult<()> {
        let mut text = format_float(f);
        text.push('\n');
        self.write_bytes(text.as_bytes())
    }

    /// Print which memory `addr` lives in, followed by the address in hex.
    pub fn print_address(&mut self, addr: u64) -> SerialResult<()> {
        let text = format_address(self.memory_map(), addr);
        self.write_bytes(text.as_bytes())
    }

    pub fn print_pointer<T: ?Sized>(&mut self, ptr: *const T) -> SerialResult<()> {
        self.print_address(ptr.cast::<u8>() as usize as u64)
    }

    /// Hex/ASCII dump of `data`, labelling rows from `base`.
    pub fn hex_dump_at(&mut self, base: u64, data: &[u8]) -> SerialResult<()> {
        tracing::debug!("Dumping {} bytes from {:#x}", data.len(), base);
        for (row, chunk) in data.chunks(HEX_DUMP_ROW).enumerate() {
            let addr = base.wrapping_add((row * HEX_DUMP_ROW) as u64);
            self.write_bytes(format_hex_row(addr, chunk).as_bytes())?;
        }
        Ok(())
    }

    /// Hex/ASCII dump of `data`, labelled with its own address.
    pub fn hex_dump(&mut self, data: &[u8]) -> SerialResult<()> {
        self.hex_dump_at(data.as_ptr() as usize as u64, data)
    }

    pub fn clear_screen(&mut self) -> SerialResult<()> {
        self.write_bytes(CLEAR_SCREEN)
    }
}
