//! Interface modes and their per-mode command parameters

use super::opcodes;
use crate::error::{Error, Result};

/// Dummy cycles for FAST_READ, DREAD and QREAD
pub const DUMMY_CYCLES_READ: u8 = 8;
/// Dummy cycles for 2READ (1-2-2), mode bits included
pub const DUMMY_CYCLES_READ_DUAL: u8 = 4;
/// Dummy cycles for 4READ (1-4-4), mode bits included
pub const DUMMY_CYCLES_READ_QUAD: u8 = 6;

/// Number of bus lines carrying one phase of a command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lines {
    /// Phase is absent
    #[default]
    None,
    /// One line (standard SPI)
    One,
    /// Two lines
    Two,
    /// Four lines
    Four,
}

impl Lines {
    /// Returns the number of physical lines
    pub const fn count(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Returns true if the phase is present
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Interface mode for array reads and programs
///
/// The notation `a-b-c` gives the number of lines used for the
/// instruction, address and data phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum InterfaceMode {
    /// Standard SPI: 1-1-1, power-on default
    #[default]
    Spi = 0,
    /// Dual Output: 1-1-2
    DualOut = 1,
    /// Dual I/O: 1-2-2
    DualIo = 2,
    /// Quad Output: 1-1-4
    QuadOut = 3,
    /// Quad I/O: 1-4-4
    QuadIo = 4,
}

/// Read command parameters for one interface mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadParams {
    /// Read opcode
    pub opcode: u8,
    /// Lines used for the address phase
    pub address_lines: Lines,
    /// Lines used for the data phase
    pub data_lines: Lines,
    /// Dummy cycles between address and data
    pub dummy_cycles: u8,
}

/// Page program parameters for one interface mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramParams {
    /// Program opcode
    pub opcode: u8,
    /// Lines used for the address phase
    pub address_lines: Lines,
    /// Lines used for the data phase
    pub data_lines: Lines,
}

/// Read parameters indexed by `InterfaceMode as usize`
static READ_PARAMS: [ReadParams; 5] = [
    ReadParams {
        opcode: opcodes::FAST_READ,
        address_lines: Lines::One,
        data_lines: Lines::One,
        dummy_cycles: DUMMY_CYCLES_READ,
    },
    ReadParams {
        opcode: opcodes::DREAD,
        address_lines: Lines::One,
        data_lines: Lines::Two,
        dummy_cycles: DUMMY_CYCLES_READ,
    },
    ReadParams {
        opcode: opcodes::READ_2IO,
        address_lines: Lines::Two,
        data_lines: Lines::Two,
        dummy_cycles: DUMMY_CYCLES_READ_DUAL,
    },
    ReadParams {
        opcode: opcodes::QREAD,
        address_lines: Lines::One,
        data_lines: Lines::Four,
        dummy_cycles: DUMMY_CYCLES_READ,
    },
    ReadParams {
        opcode: opcodes::READ_4IO,
        address_lines: Lines::Four,
        data_lines: Lines::Four,
        dummy_cycles: DUMMY_CYCLES_READ_QUAD,
    },
];

static PROGRAM_SPI: ProgramParams = ProgramParams {
    opcode: opcodes::PP,
    address_lines: Lines::One,
    data_lines: Lines::One,
};

static PROGRAM_QUAD_IO: ProgramParams = ProgramParams {
    opcode: opcodes::PP_4IO,
    address_lines: Lines::Four,
    data_lines: Lines::Four,
};

impl InterfaceMode {
    /// All supported modes, in raw value order
    pub const ALL: [Self; 5] = [
        Self::Spi,
        Self::DualOut,
        Self::DualIo,
        Self::QuadOut,
        Self::QuadIo,
    ];

    /// Returns the lines used for the instruction phase
    pub const fn instruction_lines(&self) -> Lines {
        Lines::One
    }

    /// Returns the lines used for the address phase
    pub const fn address_lines(&self) -> Lines {
        match self {
            Self::Spi | Self::DualOut | Self::QuadOut => Lines::One,
            Self::DualIo => Lines::Two,
            Self::QuadIo => Lines::Four,
        }
    }

    /// Returns the lines used for the data phase
    pub const fn data_lines(&self) -> Lines {
        match self {
            Self::Spi => Lines::One,
            Self::DualOut | Self::DualIo => Lines::Two,
            Self::QuadOut | Self::QuadIo => Lines::Four,
        }
    }

    /// Returns the read command parameters for this mode
    pub fn read_params(&self) -> &'static ReadParams {
        &READ_PARAMS[*self as usize]
    }

    /// Returns the page program parameters, if this mode can program
    ///
    /// Only 1-1-1 and 1-4-4 programming exist on this part.
    pub fn program_params(&self) -> Option<&'static ProgramParams> {
        match self {
            Self::Spi => Some(&PROGRAM_SPI),
            Self::QuadIo => Some(&PROGRAM_QUAD_IO),
            Self::DualOut | Self::DualIo | Self::QuadOut => None,
        }
    }

    /// Returns true if this mode requires the QE bit to be set
    pub const fn requires_quad(&self) -> bool {
        matches!(self, Self::QuadOut | Self::QuadIo)
    }
}

impl TryFrom<u8> for InterfaceMode {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(Error::UnsupportedMode)
    }
}
