//! mx25r-core - Command-level driver for the MX25R3235F serial NOR flash
//!
//! This crate turns flash operations (read, program, erase, register
//! access, reset, power-down) into command descriptors and dispatches them
//! through a host bus controller. It is designed to be `no_std` compatible
//! and owns no state: the controller is borrowed for every call.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation
//! - `serde` - Derive `Serialize`/`Deserialize` for the descriptive types
//!
//! # Example
//!
//! ```ignore
//! use mx25r_core::{bus::BusController, protocol, spi::InterfaceMode};
//!
//! fn dump_first_page<B: BusController>(bus: &mut B) -> mx25r_core::Result<[u8; 256]> {
//!     let id = protocol::read_id(bus)?;
//!     log::info!("JEDEC ID: {:02X?}", id);
//!
//!     let mut page = [0u8; 256];
//!     protocol::read(bus, InterfaceMode::QuadIo, 0, &mut page)?;
//!     Ok(page)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod chip;
pub mod error;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result};
