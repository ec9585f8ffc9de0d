//! Protocol implementations
//!
//! This module contains the MX25R3235F command sequences. Each function
//! builds a descriptor, validates it, submits it and runs at most one data
//! phase through the bus controller.

mod mx25r;

pub use mx25r::*;
