//! Bus controller abstraction
//!
//! The driver never touches hardware registers itself. A host integration
//! implements [`BusController`] on top of its (X/O/Q)SPI peripheral, and
//! test code implements it on top of an emulator or a recording stub.

mod traits;

pub use traits::*;
