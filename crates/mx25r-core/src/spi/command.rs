//! Command descriptor

use super::{AddressWidth, InterfaceMode, Lines};
use crate::error::{Error, Result};

/// Direction of the data phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// No data phase
    #[default]
    None,
    /// Device to host
    Read,
    /// Host to device
    Write,
}

/// How the controller should use a submitted command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// Regular command followed by an explicit transmit/receive
    #[default]
    Indirect,
    /// Read template for memory-mapped mode; the address comes from the
    /// host access and the data phase is unbounded
    MemoryMappedRead,
}

/// A single flash command as handed to the bus controller
///
/// The descriptor carries no buffers: the data phase is a separate
/// `transmit`/`receive` call of exactly `data_len` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// The opcode byte
    pub opcode: u8,

    /// Regular or memory-mapped template
    pub operation: OperationType,

    /// Interface mode the line counts were derived from
    pub io_mode: InterfaceMode,

    /// Lines used for the instruction phase
    pub instruction_lines: Lines,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Lines used for the address phase
    pub address_lines: Lines,

    /// Number of dummy cycles after address
    pub dummy_cycles: u8,

    /// Lines used for the data phase
    pub data_lines: Lines,

    /// Number of bytes in the data phase
    pub data_len: u32,

    /// Direction of the data phase
    pub direction: Direction,
}

impl Command {
    /// Create a simple command with no address or data (e.g., WREN, WRDI)
    pub const fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            operation: OperationType::Indirect,
            io_mode: InterfaceMode::Spi,
            instruction_lines: Lines::One,
            address: None,
            address_width: AddressWidth::None,
            address_lines: Lines::None,
            dummy_cycles: 0,
            data_lines: Lines::None,
            data_len: 0,
            direction: Direction::None,
        }
    }

    /// Create a read register command with no address (e.g., RDSR)
    pub const fn read_reg(opcode: u8, len: u32) -> Self {
        let mut cmd = Self::simple(opcode);
        cmd.data_lines = Lines::One;
        cmd.data_len = len;
        cmd.direction = Direction::Read;
        cmd
    }

    /// Create a write register command with no address (e.g., WRSR)
    pub const fn write_reg(opcode: u8, len: u32) -> Self {
        let mut cmd = Self::simple(opcode);
        cmd.data_lines = Lines::One;
        cmd.data_len = len;
        cmd.direction = Direction::Write;
        cmd
    }

    /// Create an erase command with 3-byte address
    pub const fn erase_3b(opcode: u8, addr: u32) -> Self {
        let mut cmd = Self::simple(opcode);
        cmd.address = Some(addr);
        cmd.address_width = AddressWidth::ThreeByte;
        cmd.address_lines = Lines::One;
        cmd
    }

    /// Create an array read command for `mode` with 3-byte address
    pub fn read(mode: InterfaceMode, addr: u32, len: u32) -> Self {
        let params = mode.read_params();
        Self {
            opcode: params.opcode,
            operation: OperationType::Indirect,
            io_mode: mode,
            instruction_lines: mode.instruction_lines(),
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            address_lines: params.address_lines,
            dummy_cycles: params.dummy_cycles,
            data_lines: params.data_lines,
            data_len: len,
            direction: Direction::Read,
        }
    }

    /// Create the memory-mapped read template for `mode`
    pub fn memory_mapped_read(mode: InterfaceMode) -> Self {
        let mut cmd = Self::read(mode, 0, 0);
        cmd.operation = OperationType::MemoryMappedRead;
        cmd.address = None;
        cmd
    }

    /// Create a page program command for `mode` with 3-byte address
    ///
    /// Returns `Error::UnsupportedMode` if the part cannot program in `mode`.
    pub fn program(mode: InterfaceMode, addr: u32, len: u32) -> Result<Self> {
        let params = mode.program_params().ok_or(Error::UnsupportedMode)?;
        Ok(Self {
            opcode: params.opcode,
            operation: OperationType::Indirect,
            io_mode: mode,
            instruction_lines: mode.instruction_lines(),
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            address_lines: params.address_lines,
            dummy_cycles: 0,
            data_lines: params.data_lines,
            data_len: len,
            direction: Direction::Write,
        })
    }

    /// Add an address phase using the address lines of `io_mode`
    pub fn with_address(mut self, width: AddressWidth, addr: u32) -> Self {
        self.address = Some(addr);
        self.address_width = width;
        self.address_lines = self.io_mode.address_lines();
        self
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Returns true if this command has an address phase
    pub fn has_address(&self) -> bool {
        self.address_width != AddressWidth::None
    }

    /// Returns true if this command has a data phase
    pub fn has_data(&self) -> bool {
        self.direction != Direction::None
    }

    /// Check that every phase agrees with `io_mode`
    ///
    /// The dispatcher calls this before handing the command to the bus
    /// controller, so inconsistent descriptors never reach the hardware.
    pub fn validate(&self) -> Result<()> {
        if self.instruction_lines != self.io_mode.instruction_lines() {
            return Err(Error::InvalidCommand);
        }

        let memory_mapped = self.operation == OperationType::MemoryMappedRead;

        if self.has_address() {
            if self.address_lines != self.io_mode.address_lines() {
                return Err(Error::InvalidCommand);
            }
            match (memory_mapped, self.address) {
                (false, Some(addr)) if self.address_width.fits(addr) => {}
                (true, None) => {}
                _ => return Err(Error::InvalidCommand),
            }
        } else if self.address.is_some() || self.address_lines.is_present() {
            return Err(Error::InvalidCommand);
        }

        match self.direction {
            Direction::None => {
                if memory_mapped || self.data_lines.is_present() || self.data_len != 0 {
                    return Err(Error::InvalidCommand);
                }
            }
            Direction::Read | Direction::Write => {
                if self.data_lines != self.io_mode.data_lines() {
                    return Err(Error::InvalidCommand);
                }
                let len_ok = if memory_mapped {
                    self.direction == Direction::Read && self.data_len == 0
                } else {
                    self.data_len > 0
                };
                if !len_ok {
                    return Err(Error::InvalidCommand);
                }
            }
        }

        Ok(())
    }
}
