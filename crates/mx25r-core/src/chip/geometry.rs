//! Flash geometry and timing

use crate::spi::opcodes;

/// Total flash size: 32 Mbit
pub const FLASH_SIZE: u32 = 32 * 1024 * 1024 / 8;
/// Program page size
pub const PAGE_SIZE: u32 = 256;
/// Sector erase size
pub const SECTOR_4K: u32 = 4 * 1024;
/// Sub-block erase size
pub const BLOCK_32K: u32 = 32 * 1024;
/// Block erase size
pub const BLOCK_64K: u32 = 64 * 1024;

/// JEDEC manufacturer ID (Macronix)
pub const MANUFACTURER_ID: u8 = 0xC2;
/// JEDEC memory type
pub const MEMORY_TYPE: u8 = 0x28;
/// JEDEC memory density
pub const MEMORY_DENSITY: u8 = 0x16;
/// Electronic signature returned by RES
pub const ELECTRONIC_ID: u8 = 0x15;

// Maximum operation times, in milliseconds

/// Chip erase
pub const CHIP_ERASE_MAX_TIME_MS: u32 = 240_000;
/// 64KB block erase
pub const BLOCK_64K_ERASE_MAX_TIME_MS: u32 = 3_500;
/// 32KB block erase
pub const BLOCK_32K_ERASE_MAX_TIME_MS: u32 = 1_050;
/// 4KB sector erase
pub const SECTOR_4K_ERASE_MAX_TIME_MS: u32 = 240;
/// Status/configuration register write
pub const WRITE_REG_MAX_TIME_MS: u32 = 40;
/// Software reset issued during a chip erase
pub const RESET_MAX_TIME_MS: u32 = 100;

/// Interval between status register polls, in microseconds
pub const AUTOPOLLING_INTERVAL_US: u32 = 0x10;

/// Erase granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EraseGranularity {
    /// 4KB sector erase
    Sector4K,
    /// 32KB sub-block erase
    SubBlock32K,
    /// 64KB block erase
    Block64K,
    /// Whole chip erase
    Chip,
}

impl EraseGranularity {
    /// Returns the erase opcode
    pub const fn opcode(&self) -> u8 {
        match self {
            Self::Sector4K => opcodes::SE_20,
            Self::SubBlock32K => opcodes::BE_52,
            Self::Block64K => opcodes::BE_D8,
            Self::Chip => opcodes::CE_60,
        }
    }

    /// Returns the opcode for an addressed erase, `None` for whole chip
    pub const fn block_opcode(&self) -> Option<u8> {
        match self {
            Self::Chip => None,
            _ => Some(self.opcode()),
        }
    }

    /// Returns the number of bytes erased
    pub const fn size(&self) -> u32 {
        match self {
            Self::Sector4K => SECTOR_4K,
            Self::SubBlock32K => BLOCK_32K,
            Self::Block64K => BLOCK_64K,
            Self::Chip => FLASH_SIZE,
        }
    }

    /// Returns the datasheet maximum erase time in milliseconds
    pub const fn max_erase_time_ms(&self) -> u32 {
        match self {
            Self::Sector4K => SECTOR_4K_ERASE_MAX_TIME_MS,
            Self::SubBlock32K => BLOCK_32K_ERASE_MAX_TIME_MS,
            Self::Block64K => BLOCK_64K_ERASE_MAX_TIME_MS,
            Self::Chip => CHIP_ERASE_MAX_TIME_MS,
        }
    }
}

/// Memory organisation of the flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashGeometry {
    /// Size of the flash in bytes
    pub flash_size: u32,
    /// Size of a block for the erase operation
    pub erase_block_size: u32,
    /// Number of blocks for the erase operation
    pub erase_blocks_number: u32,
    /// Size of a sub-block for the erase operation
    pub erase_sub_block_size: u32,
    /// Number of sub-blocks for the erase operation
    pub erase_sub_blocks_number: u32,
    /// Size of a sector for the erase operation
    pub erase_sector_size: u32,
    /// Number of sectors for the erase operation
    pub erase_sectors_number: u32,
    /// Size of a page for the program operation
    pub prog_page_size: u32,
    /// Number of pages for the program operation
    pub prog_pages_number: u32,
}

impl FlashGeometry {
    /// Geometry of the MX25R3235F
    pub const MX25R3235F: Self = Self {
        flash_size: FLASH_SIZE,
        erase_block_size: BLOCK_64K,
        erase_blocks_number: FLASH_SIZE / BLOCK_64K,
        erase_sub_block_size: BLOCK_32K,
        erase_sub_blocks_number: FLASH_SIZE / BLOCK_32K,
        erase_sector_size: SECTOR_4K,
        erase_sectors_number: FLASH_SIZE / SECTOR_4K,
        prog_page_size: PAGE_SIZE,
        prog_pages_number: FLASH_SIZE / PAGE_SIZE,
    };

    /// Returns the erase unit count for a granularity
    pub const fn units(&self, granularity: EraseGranularity) -> u32 {
        match granularity {
            EraseGranularity::Sector4K => self.erase_sectors_number,
            EraseGranularity::SubBlock32K => self.erase_sub_blocks_number,
            EraseGranularity::Block64K => self.erase_blocks_number,
            EraseGranularity::Chip => 1,
        }
    }

    /// Returns true if `[addr, addr + len)` stays within one program page
    pub const fn fits_in_page(&self, addr: u32, len: u32) -> bool {
        len <= self.prog_page_size && (addr % self.prog_page_size) + len <= self.prog_page_size
    }
}
