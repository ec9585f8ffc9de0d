//! MX25R3235F chip description
//!
//! Geometry, timing and register layouts of the part. Everything here is
//! compile-time data taken from the datasheet.

mod geometry;
pub mod registers;

pub use geometry::*;
