//! Bus controller trait definitions

use crate::error::Result;
use crate::spi::Command;

/// Timeout applied to every bus transaction, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u32 = 5_000;

/// Timeout counter behaviour in memory-mapped mode
///
/// With the counter enabled the controller releases chip select after
/// `period` idle clock cycles, which costs a new command on the next access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeoutPolicy {
    /// Keep chip select asserted between accesses
    #[default]
    Disabled,
    /// Release chip select after `period` idle cycles
    Enabled {
        /// Idle cycles before release
        period: u16,
    },
}

/// Host bus controller
///
/// This trait represents a controller that can run a command descriptor
/// followed by an optional data phase. A transaction is:
///
/// 1. `submit_command()` with the descriptor (opcode, address, line counts,
///    dummy cycles, data length)
/// 2. for commands with a data phase, exactly one `transmit()` or
///    `receive()` of `cmd.data_len` bytes
///
/// Implementations report failures as `Error::BusTimeout` when the
/// `timeout_ms` budget elapsed and `Error::BusError` otherwise. Clock, pin
/// and timing setup are the implementation's concern.
///
/// ## Example
///
/// ```ignore
/// impl BusController for Xspi {
///     fn submit_command(&mut self, cmd: &Command, timeout_ms: u32) -> Result<()> {
///         self.hal.command(&to_hal(cmd), timeout_ms).map_err(map_hal_error)
///     }
///     // ...
/// }
/// ```
pub trait BusController {
    /// Submit a command descriptor
    ///
    /// For `OperationType::MemoryMappedRead` descriptors this only stores
    /// the read template; `configure_memory_map()` follows.
    fn submit_command(&mut self, cmd: &Command, timeout_ms: u32) -> Result<()>;

    /// Send the data phase of the last submitted command
    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> Result<()>;

    /// Receive the data phase of the last submitted command
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<()>;

    /// Switch the controller to memory-mapped reads using the last
    /// submitted read template
    fn configure_memory_map(&mut self, policy: TimeoutPolicy) -> Result<()>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<B: BusController + ?Sized> BusController for &mut B {
    fn submit_command(&mut self, cmd: &Command, timeout_ms: u32) -> Result<()> {
        (**self).submit_command(cmd, timeout_ms)
    }

    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> Result<()> {
        (**self).transmit(data, timeout_ms)
    }

    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<()> {
        (**self).receive(buf, timeout_ms)
    }

    fn configure_memory_map(&mut self, policy: TimeoutPolicy) -> Result<()> {
        (**self).configure_memory_map(policy)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

// Boxed controllers allow trait objects at the host integration boundary
#[cfg(feature = "alloc")]
impl<B: BusController + ?Sized> BusController for alloc::boxed::Box<B> {
    fn submit_command(&mut self, cmd: &Command, timeout_ms: u32) -> Result<()> {
        (**self).submit_command(cmd, timeout_ms)
    }

    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> Result<()> {
        (**self).transmit(data, timeout_ms)
    }

    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<()> {
        (**self).receive(buf, timeout_ms)
    }

    fn configure_memory_map(&mut self, policy: TimeoutPolicy) -> Result<()> {
        (**self).configure_memory_map(policy)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
