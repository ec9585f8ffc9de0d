//! MX25R3235F command opcodes
//!
//! Values are taken from the Macronix MX25R3235F datasheet. Most of them
//! match the common JEDEC conventions; the quad page program (0x38) and the
//! security register commands (0x2B/0x2F) are Macronix specific.

// ============================================================================
// Read commands - 3-byte address
// ============================================================================

/// Normal Read (no dummy cycles, low frequency)
pub const READ: u8 = 0x03;
/// Fast Read (1-1-1)
pub const FAST_READ: u8 = 0x0B;
/// Dual Output Read (1-1-2)
pub const DREAD: u8 = 0x3B;
/// Dual I/O Read (1-2-2)
pub const READ_2IO: u8 = 0xBB;
/// Quad Output Read (1-1-4)
pub const QREAD: u8 = 0x6B;
/// Quad I/O Read (1-4-4)
pub const READ_4IO: u8 = 0xEB;

// ============================================================================
// Program commands
// ============================================================================

/// Page Program (1-1-1)
pub const PP: u8 = 0x02;
/// Quad Page Program (1-4-4)
pub const PP_4IO: u8 = 0x38;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_60: u8 = 0x60;
/// Chip Erase (alternate opcode)
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Suspend/Resume
// ============================================================================

/// Program/Erase Suspend
pub const SUSPEND: u8 = 0x75;
/// Program/Erase Suspend (alternate opcode)
pub const SUSPEND_B0: u8 = 0xB0;
/// Program/Erase Resume
pub const RESUME: u8 = 0x7A;
/// Program/Erase Resume (alternate opcode)
pub const RESUME_30: u8 = 0x30;

// ============================================================================
// Identification
// ============================================================================

/// Read Identification (manufacturer, memory type, density)
pub const RDID: u8 = 0x9F;
/// Read Electronic Signature / Release from Deep Power Down
pub const RES: u8 = 0xAB;
/// Read Electronic Manufacturer & Device ID
pub const REMS: u8 = 0x90;
/// Read SFDP (JEDEC JESD216)
pub const RDSFDP: u8 = 0x5A;

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program/erase/register write
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit
pub const WRDI: u8 = 0x04;

// ============================================================================
// Register operations
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Read Configuration Registers (returns CR1 then CR2)
pub const RDCR: u8 = 0x15;
/// Write Status and Configuration Registers (SR, CR1, CR2 burst)
pub const WRSR: u8 = 0x01;
/// Read Security Register
pub const RDSCUR: u8 = 0x2B;
/// Write Security Register
pub const WRSCUR: u8 = 0x2F;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power Down
pub const DP: u8 = 0xB9;

// ============================================================================
// Burst and secured OTP
// ============================================================================

/// Set Burst Length (wrap-around read length)
pub const SBL: u8 = 0xC0;
/// Enter Secured OTP
pub const ENSO: u8 = 0xB1;
/// Exit Secured OTP
pub const EXSO: u8 = 0xC1;

// ============================================================================
// Reset / misc
// ============================================================================

/// No Operation
pub const NOP: u8 = 0x00;
/// Reset Enable
pub const RSTEN: u8 = 0x66;
/// Reset Memory
pub const RST: u8 = 0x99;
/// Release Read Enhanced (exit performance-enhance mode)
pub const RRE: u8 = 0xFF;
