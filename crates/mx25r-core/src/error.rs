//! Error types for mx25r-core
//!
//! This module provides a no_std compatible error type shared by the
//! dispatcher and bus controller implementations.

/// Legacy status code for success
pub const STATUS_OK: i32 = 0;
/// Legacy status code for any failure
pub const STATUS_ERROR: i32 = -1;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    // Caller errors
    /// Interface mode is not implemented for the requested operation
    #[error("interface mode not supported for this operation")]
    UnsupportedMode,
    /// Erase granularity is not valid for the requested operation
    #[error("erase granularity not supported for this operation")]
    UnsupportedGranularity,
    /// Command descriptor line counts or phases are inconsistent
    #[error("command descriptor is inconsistent with its interface mode")]
    InvalidCommand,

    // Bus errors
    /// Bus transaction did not complete within its timeout
    #[error("bus transaction timed out")]
    BusTimeout,
    /// Command submission, transmit or receive failed
    #[error("bus transaction failed")]
    BusError,

    // Polling errors
    /// Status register did not reach the expected state in time
    #[error("status polling timed out")]
    Timeout,
}

impl Error {
    /// Returns true for errors raised by the bus controller
    pub const fn is_bus_error(&self) -> bool {
        matches!(self, Self::BusTimeout | Self::BusError)
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Collapse a result into the flat `0` / `-1` status code
///
/// Every error kind maps to [`STATUS_ERROR`].
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(_) => STATUS_ERROR,
    }
}
