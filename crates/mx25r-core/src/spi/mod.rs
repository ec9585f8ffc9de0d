//! SPI types and command structures
//!
//! This module provides the command descriptor, the interface modes with
//! their per-mode parameter tables, and the MX25R3235F opcodes.

mod address;
mod command;
mod io_mode;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::{Command, Direction, OperationType};
pub use io_mode::{InterfaceMode, Lines, ProgramParams, ReadParams};
