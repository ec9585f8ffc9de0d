//! MX25R3235F command dispatcher
//!
//! Every function here is a straight-line sequence: build a [`Command`],
//! reject it if its line counts disagree with its interface mode, submit
//! it, then transmit or receive the payload. Nothing is retried and no
//! operation waits for the chip to become ready; use [`wait_ready`] or
//! [`wait_write_enabled`] explicitly when that is needed.
//!
//! ## Register writes
//!
//! Status, configuration 1 and configuration 2 share a single write
//! command taking all three bytes. Writing one of them reads the other two
//! first. This read-modify-write spans three bus transactions and is not
//! atomic: callers sharing the chip must hold one lock around the whole
//! call.

use crate::bus::{BusController, TimeoutPolicy, DEFAULT_TIMEOUT_MS};
use crate::chip::registers::Status;
use crate::chip::{EraseGranularity, FlashGeometry, AUTOPOLLING_INTERVAL_US, RESET_MAX_TIME_MS};
use crate::error::{Error, Result};
use crate::spi::{opcodes, AddressWidth, Command, InterfaceMode};

/// Dummy cycles RES needs before the electronic ID (three dummy bytes)
const RES_DUMMY_CYCLES: u8 = 24;
/// Dummy cycles required by RDSFDP
const SFDP_DUMMY_CYCLES: u8 = 8;

// ============================================================================
// Dispatch helpers
// ============================================================================

/// Validate and submit a command without touching the data phase
fn dispatch<B: BusController + ?Sized>(bus: &mut B, cmd: &Command) -> Result<()> {
    if let Err(e) = cmd.validate() {
        log::warn!("rejecting inconsistent command 0x{:02X}: {:?}", cmd.opcode, cmd);
        return Err(e);
    }
    log::trace!(
        "cmd 0x{:02X} {:?} addr={:?} dummy={} len={}",
        cmd.opcode,
        cmd.io_mode,
        cmd.address,
        cmd.dummy_cycles,
        cmd.data_len
    );
    bus.submit_command(cmd, DEFAULT_TIMEOUT_MS)
}

/// Issue a command that has neither address nor data phase
fn send_simple<B: BusController + ?Sized>(bus: &mut B, opcode: u8) -> Result<()> {
    dispatch(bus, &Command::simple(opcode))
}

/// Submit `cmd` then receive its payload into `buf`
fn dispatch_read<B: BusController + ?Sized>(
    bus: &mut B,
    cmd: &Command,
    buf: &mut [u8],
) -> Result<()> {
    dispatch(bus, cmd)?;
    bus.receive(buf, DEFAULT_TIMEOUT_MS)
}

/// Submit `cmd` then transmit `data` as its payload
fn dispatch_write<B: BusController + ?Sized>(bus: &mut B, cmd: &Command, data: &[u8]) -> Result<()> {
    dispatch(bus, cmd)?;
    bus.transmit(data, DEFAULT_TIMEOUT_MS)
}

fn payload_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::InvalidCommand)
}

// ============================================================================
// Array commands
// ============================================================================

/// Read `buf.len()` bytes starting at `addr`
///
/// Opcode, line counts and dummy cycles come from the per-mode table
/// ([`InterfaceMode::read_params`]). On success the whole buffer is filled.
pub fn read<B: BusController + ?Sized>(
    bus: &mut B,
    mode: InterfaceMode,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    let cmd = Command::read(mode, addr, payload_len(buf.len())?);
    dispatch_read(bus, &cmd, buf)
}

/// Read with a raw interface mode value (0 = 1-1-1 ... 4 = 1-4-4)
///
/// Values outside the five defined modes fail with `Error::UnsupportedMode`.
pub fn read_raw<B: BusController + ?Sized>(
    bus: &mut B,
    mode: u8,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    read(bus, InterfaceMode::try_from(mode)?, addr, buf)
}

/// Program up to one page starting at `addr`
///
/// Only [`InterfaceMode::Spi`] and [`InterfaceMode::QuadIo`] can program;
/// other modes fail with `Error::UnsupportedMode` before the bus is used.
///
/// The caller must keep `data` within one page
/// ([`FlashGeometry::fits_in_page`]) and must have set the write enable
/// latch. A write crossing a page boundary wraps inside the page on the
/// chip; the driver does not check for it.
pub fn program_page<B: BusController + ?Sized>(
    bus: &mut B,
    mode: InterfaceMode,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let cmd = Command::program(mode, addr, payload_len(data.len())?)?;
    dispatch_write(bus, &cmd, data)
}

/// Program with a raw interface mode value
pub fn program_page_raw<B: BusController + ?Sized>(
    bus: &mut B,
    mode: u8,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    program_page(bus, InterfaceMode::try_from(mode)?, addr, data)
}

/// Erase the sector or block containing `addr`
///
/// `EraseGranularity::Chip` is rejected with
/// `Error::UnsupportedGranularity`; use [`chip_erase`] instead.
pub fn erase_block<B: BusController + ?Sized>(
    bus: &mut B,
    addr: u32,
    granularity: EraseGranularity,
) -> Result<()> {
    let opcode = granularity
        .block_opcode()
        .ok_or(Error::UnsupportedGranularity)?;
    dispatch(bus, &Command::erase_3b(opcode, addr))
}

/// Erase the entire chip
pub fn chip_erase<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, EraseGranularity::Chip.opcode())
}

/// Switch the controller to memory-mapped reads in `mode`
///
/// Uses the same opcode table as [`read`] and disables the controller's
/// timeout counter. There is no counterpart: leaving memory-mapped mode
/// means reconfiguring the controller.
pub fn enable_memory_mapped_mode<B: BusController + ?Sized>(
    bus: &mut B,
    mode: InterfaceMode,
) -> Result<()> {
    log::debug!("entering memory-mapped mode ({:?})", mode);
    dispatch(bus, &Command::memory_mapped_read(mode))?;
    bus.configure_memory_map(TimeoutPolicy::Disabled)
}

/// Suspend an ongoing program or erase
///
/// Nothing checks that such an operation is running.
pub fn suspend<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::SUSPEND)
}

/// Resume a suspended program or erase
pub fn resume<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::RESUME)
}

// ============================================================================
// Register commands
// ============================================================================

/// Send the Write Enable command
///
/// Only the latch command is issued. Poll with [`wait_write_enabled`] if
/// the caller needs to know the latch is set.
pub fn write_enable<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::WREN)
}

/// Send the Write Disable command
pub fn write_disable<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::WRDI)
}

/// Read the status register
pub fn read_status_register<B: BusController + ?Sized>(bus: &mut B) -> Result<u8> {
    let mut buf = [0u8; 1];
    dispatch_read(bus, &Command::read_reg(opcodes::RDSR, 1), &mut buf)?;
    Ok(buf[0])
}

/// Read the status register as flags
pub fn read_status<B: BusController + ?Sized>(bus: &mut B) -> Result<Status> {
    read_status_register(bus).map(Status::from_bits_retain)
}

fn read_cfg_pair<B: BusController + ?Sized>(bus: &mut B) -> Result<[u8; 2]> {
    let mut buf = [0u8; 2];
    dispatch_read(bus, &Command::read_reg(opcodes::RDCR, 2), &mut buf)?;
    Ok(buf)
}

/// Read configuration register 1
pub fn read_cfg_register<B: BusController + ?Sized>(bus: &mut B) -> Result<u8> {
    read_cfg_pair(bus).map(|cr| cr[0])
}

/// Read configuration register 2
pub fn read_cfg2_register<B: BusController + ?Sized>(bus: &mut B) -> Result<u8> {
    read_cfg_pair(bus).map(|cr| cr[1])
}

/// Write the status + configuration burst `[SR, CR1, CR2]`
fn write_status_cfg<B: BusController + ?Sized>(bus: &mut B, regs: [u8; 3]) -> Result<()> {
    log::debug!(
        "WRSR burst: SR=0x{:02X} CR1=0x{:02X} CR2=0x{:02X}",
        regs[0],
        regs[1],
        regs[2]
    );
    dispatch_write(bus, &Command::write_reg(opcodes::WRSR, 3), &regs)
}

/// Write the status register, preserving both configuration registers
///
/// The write enable latch must be set by the caller.
pub fn write_status_register<B: BusController + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    let cr1 = read_cfg_register(bus)?;
    let cr2 = read_cfg2_register(bus)?;
    write_status_cfg(bus, [value, cr1, cr2])
}

/// Write configuration register 1, preserving status and configuration 2
pub fn write_cfg_register<B: BusController + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    let sr = read_status_register(bus)?;
    let cr2 = read_cfg2_register(bus)?;
    write_status_cfg(bus, [sr, value, cr2])
}

/// Write configuration register 2, preserving status and configuration 1
pub fn write_cfg2_register<B: BusController + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    let sr = read_status_register(bus)?;
    let cr1 = read_cfg_register(bus)?;
    write_status_cfg(bus, [sr, cr1, value])
}

/// Read the security register
pub fn read_security_register<B: BusController + ?Sized>(bus: &mut B) -> Result<u8> {
    let mut buf = [0u8; 1];
    dispatch_read(bus, &Command::read_reg(opcodes::RDSCUR, 1), &mut buf)?;
    Ok(buf[0])
}

/// Write the security register
pub fn write_security_register<B: BusController + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    dispatch_write(bus, &Command::write_reg(opcodes::WRSCUR, 1), &[value])
}

/// Set the wrap-around burst length
pub fn set_burst_length<B: BusController + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    dispatch_write(bus, &Command::write_reg(opcodes::SBL, 1), &[value])
}

// ============================================================================
// Identification
// ============================================================================

/// Read the JEDEC ID: manufacturer, memory type, memory density
pub fn read_id<B: BusController + ?Sized>(bus: &mut B) -> Result<[u8; 3]> {
    let mut id = [0u8; 3];
    dispatch_read(bus, &Command::read_reg(opcodes::RDID, 3), &mut id)?;
    Ok(id)
}

/// Read the electronic signature (RES)
pub fn read_electronic_id<B: BusController + ?Sized>(bus: &mut B) -> Result<u8> {
    let mut buf = [0u8; 1];
    let cmd = Command::read_reg(opcodes::RES, 1).with_dummy_cycles(RES_DUMMY_CYCLES);
    dispatch_read(bus, &cmd, &mut buf)?;
    Ok(buf[0])
}

/// Read manufacturer and device ID (REMS), manufacturer first
pub fn read_manufacturer_device_id<B: BusController + ?Sized>(bus: &mut B) -> Result<[u8; 2]> {
    let mut buf = [0u8; 2];
    let cmd = Command::read_reg(opcodes::REMS, 2).with_address(AddressWidth::ThreeByte, 0);
    dispatch_read(bus, &cmd, &mut buf)?;
    Ok(buf)
}

/// Read SFDP (Serial Flash Discoverable Parameters)
pub fn read_sfdp<B: BusController + ?Sized>(bus: &mut B, addr: u32, buf: &mut [u8]) -> Result<()> {
    let cmd = Command::read_reg(opcodes::RDSFDP, payload_len(buf.len())?)
        .with_address(AddressWidth::ThreeByte, addr)
        .with_dummy_cycles(SFDP_DUMMY_CYCLES);
    dispatch_read(bus, &cmd, buf)
}

/// Return the memory organisation of the chip
pub const fn flash_info() -> FlashGeometry {
    FlashGeometry::MX25R3235F
}

// ============================================================================
// Reset, power and secured OTP
// ============================================================================

/// Send the Reset Enable command
pub fn reset_enable<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::RSTEN)
}

/// Send the Reset Memory command (must follow Reset Enable)
pub fn reset_memory<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::RST)
}

/// Send the full software reset sequence and wait out the reset time
pub fn software_reset<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    reset_enable(bus)?;
    reset_memory(bus)?;
    bus.delay_us(RESET_MAX_TIME_MS * 1000);
    Ok(())
}

/// Send the No Operation command
pub fn no_operation<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::NOP)
}

/// Enter deep power-down
pub fn enter_power_down<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::DP)
}

/// Release from deep power-down
pub fn release_power_down<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::RES)
}

/// Leave the performance-enhance (continuous read) mode
pub fn release_read_enhanced<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::RRE)
}

/// Enter the secured OTP area
pub fn enter_secured_otp<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::ENSO)
}

/// Exit the secured OTP area
pub fn exit_secured_otp<B: BusController + ?Sized>(bus: &mut B) -> Result<()> {
    send_simple(bus, opcodes::EXSO)
}

// ============================================================================
// Status polling
// ============================================================================

/// Check if a program, erase or register write is in progress
pub fn is_busy<B: BusController + ?Sized>(bus: &mut B) -> Result<bool> {
    Ok(read_status(bus)?.contains(Status::WIP))
}

/// Check if the Write Enable Latch is set
pub fn is_write_enabled<B: BusController + ?Sized>(bus: &mut B) -> Result<bool> {
    Ok(read_status(bus)?.contains(Status::WEL))
}

fn poll_status<B, F>(bus: &mut B, timeout_ms: u32, done: F) -> Result<()>
where
    B: BusController + ?Sized,
    F: Fn(Status) -> bool,
{
    let max_polls = (timeout_ms.saturating_mul(1000) / AUTOPOLLING_INTERVAL_US).max(1);

    for _ in 0..max_polls {
        if done(read_status(bus)?) {
            return Ok(());
        }
        bus.delay_us(AUTOPOLLING_INTERVAL_US);
    }

    Err(Error::Timeout)
}

/// Wait for the WIP bit to clear
///
/// Polls every [`AUTOPOLLING_INTERVAL_US`] until WIP clears or `timeout_ms`
/// elapses (`Error::Timeout`). Pick the timeout from the chip timing
/// constants, e.g. [`EraseGranularity::max_erase_time_ms`].
pub fn wait_ready<B: BusController + ?Sized>(bus: &mut B, timeout_ms: u32) -> Result<()> {
    poll_status(bus, timeout_ms, |sr| !sr.contains(Status::WIP))
}

/// Wait for the WEL bit to be set after [`write_enable`]
pub fn wait_write_enabled<B: BusController + ?Sized>(bus: &mut B, timeout_ms: u32) -> Result<()> {
    poll_status(bus, timeout_ms, |sr| sr.contains(Status::WEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::{Direction, Lines, OperationType};
    use std::collections::VecDeque;
    use std::vec;
    use std::vec::Vec;

    // Adds logging to the test automatically
    // control with RUST_LOG="LEVEL"
    use test_log::test;

    /// Bus stub recording every call, answering receives from a queue
    #[derive(Default)]
    struct RecordingBus {
        commands: Vec<Command>,
        transmitted: Vec<Vec<u8>>,
        receives: usize,
        responses: VecDeque<Vec<u8>>,
        memory_map: Option<TimeoutPolicy>,
        submit_error: Option<Error>,
        receive_error: Option<Error>,
        delayed_us: u64,
    }

    impl RecordingBus {
        fn with_responses(responses: &[&[u8]]) -> Self {
            Self {
                responses: responses.iter().map(|r| r.to_vec()).collect(),
                ..Default::default()
            }
        }

        fn failing_submit(err: Error) -> Self {
            Self {
                submit_error: Some(err),
                ..Default::default()
            }
        }

        fn last(&self) -> &Command {
            self.commands.last().expect("no command submitted")
        }

        fn opcodes(&self) -> Vec<u8> {
            self.commands.iter().map(|c| c.opcode).collect()
        }
    }

    impl BusController for RecordingBus {
        fn submit_command(&mut self, cmd: &Command, timeout_ms: u32) -> Result<()> {
            assert_eq!(timeout_ms, DEFAULT_TIMEOUT_MS);
            if let Some(err) = self.submit_error {
                return Err(err);
            }
            self.commands.push(*cmd);
            Ok(())
        }

        fn transmit(&mut self, data: &[u8], _timeout_ms: u32) -> Result<()> {
            self.transmitted.push(data.to_vec());
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<()> {
            self.receives += 1;
            if let Some(err) = self.receive_error {
                return Err(err);
            }
            let response = self.responses.pop_front().unwrap_or_default();
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = response.get(i).copied().unwrap_or(0);
            }
            Ok(())
        }

        fn configure_memory_map(&mut self, policy: TimeoutPolicy) -> Result<()> {
            self.memory_map = Some(policy);
            Ok(())
        }

        fn delay_us(&mut self, us: u32) {
            self.delayed_us += us as u64;
        }
    }

    #[test]
    fn test_read_selects_table_entry_for_every_mode() {
        for mode in InterfaceMode::ALL {
            let mut bus = RecordingBus::with_responses(&[&[0xA5; 8]]);
            let mut buf = [0u8; 8];
            read(&mut bus, mode, 0x1234, &mut buf).unwrap();

            let params = mode.read_params();
            let cmd = bus.last();
            assert_eq!(cmd.opcode, params.opcode);
            assert_eq!(cmd.address, Some(0x1234));
            assert_eq!(cmd.address_width, AddressWidth::ThreeByte);
            assert_eq!(cmd.address_lines, params.address_lines);
            assert_eq!(cmd.data_lines, params.data_lines);
            assert_eq!(cmd.dummy_cycles, params.dummy_cycles);
            assert_eq!(cmd.data_len, 8);
            assert_eq!(cmd.direction, Direction::Read);
            assert_eq!(buf, [0xA5; 8]);
        }
    }

    #[test]
    fn test_read_raw_rejects_undefined_modes() {
        for raw in 5..=u8::MAX {
            let mut bus = RecordingBus::default();
            let mut buf = [0u8; 4];
            assert_eq!(
                read_raw(&mut bus, raw, 0, &mut buf),
                Err(Error::UnsupportedMode)
            );
            assert!(bus.commands.is_empty());
        }
    }

    #[test]
    fn test_read_raw_quad_io() {
        let mut bus = RecordingBus::default();
        let mut buf = [0u8; 2];
        read_raw(&mut bus, 4, 0x10, &mut buf).unwrap();
        assert_eq!(bus.last().opcode, opcodes::READ_4IO);
    }

    #[test]
    fn test_read_empty_buffer_rejected_before_dispatch() {
        let mut bus = RecordingBus::default();
        assert_eq!(
            read(&mut bus, InterfaceMode::Spi, 0, &mut []),
            Err(Error::InvalidCommand)
        );
        assert!(bus.commands.is_empty());
    }

    #[test]
    fn test_program_page_modes() {
        let data = [0x11u8; 16];

        let mut bus = RecordingBus::default();
        program_page(&mut bus, InterfaceMode::Spi, 0x100, &data).unwrap();
        assert_eq!(bus.last().opcode, opcodes::PP);
        assert_eq!(bus.last().data_lines, Lines::One);
        assert_eq!(bus.transmitted, vec![data.to_vec()]);

        let mut bus = RecordingBus::default();
        program_page(&mut bus, InterfaceMode::QuadIo, 0x100, &data).unwrap();
        let cmd = bus.last();
        assert_eq!(cmd.opcode, opcodes::PP_4IO);
        assert_eq!(cmd.address_lines, Lines::Four);
        assert_eq!(cmd.data_lines, Lines::Four);
        assert_eq!(cmd.dummy_cycles, 0);
        assert_eq!(cmd.direction, Direction::Write);

        for mode in [
            InterfaceMode::DualOut,
            InterfaceMode::DualIo,
            InterfaceMode::QuadOut,
        ] {
            let mut bus = RecordingBus::default();
            assert_eq!(
                program_page(&mut bus, mode, 0, &data),
                Err(Error::UnsupportedMode)
            );
            assert!(bus.commands.is_empty());
            assert!(bus.transmitted.is_empty());
        }
    }

    #[test]
    fn test_program_page_raw() {
        let mut bus = RecordingBus::default();
        assert_eq!(
            program_page_raw(&mut bus, 2, 0, &[0]),
            Err(Error::UnsupportedMode)
        );
        assert_eq!(
            program_page_raw(&mut bus, 9, 0, &[0]),
            Err(Error::UnsupportedMode)
        );
        program_page_raw(&mut bus, 0, 0, &[0]).unwrap();
        assert_eq!(bus.opcodes(), vec![opcodes::PP]);
    }

    #[test]
    fn test_erase_block_opcodes() {
        let cases = [
            (EraseGranularity::Sector4K, 0x20),
            (EraseGranularity::SubBlock32K, 0x52),
            (EraseGranularity::Block64K, 0xD8),
        ];
        for (granularity, opcode) in cases {
            let mut bus = RecordingBus::default();
            erase_block(&mut bus, 0x10000, granularity).unwrap();
            let cmd = bus.last();
            assert_eq!(cmd.opcode, opcode);
            assert_eq!(cmd.address, Some(0x10000));
            assert_eq!(cmd.address_lines, Lines::One);
            assert_eq!(cmd.direction, Direction::None);
            assert_eq!(bus.receives, 0);
            assert!(bus.transmitted.is_empty());
        }
    }

    #[test]
    fn test_erase_block_rejects_chip_granularity() {
        let mut bus = RecordingBus::default();
        assert_eq!(
            erase_block(&mut bus, 0, EraseGranularity::Chip),
            Err(Error::UnsupportedGranularity)
        );
        assert!(bus.commands.is_empty());
    }

    #[test]
    fn test_chip_erase_has_no_address() {
        let mut bus = RecordingBus::default();
        chip_erase(&mut bus).unwrap();
        let cmd = bus.last();
        assert_eq!(cmd.opcode, 0x60);
        assert_eq!(cmd.address, None);
        assert_eq!(cmd.address_width, AddressWidth::None);
        assert_eq!(cmd.address_lines, Lines::None);
    }

    #[test]
    fn test_memory_mapped_uses_read_table() {
        for mode in InterfaceMode::ALL {
            let mut bus = RecordingBus::default();
            enable_memory_mapped_mode(&mut bus, mode).unwrap();
            let cmd = bus.last();
            assert_eq!(cmd.operation, OperationType::MemoryMappedRead);
            assert_eq!(cmd.opcode, mode.read_params().opcode);
            assert_eq!(cmd.dummy_cycles, mode.read_params().dummy_cycles);
            assert_eq!(cmd.address, None);
            assert_eq!(cmd.data_len, 0);
            assert_eq!(bus.memory_map, Some(TimeoutPolicy::Disabled));
        }
    }

    #[test]
    fn test_fixed_opcode_commands() {
        type Op = fn(&mut RecordingBus) -> Result<()>;
        let cases: [(Op, u8); 13] = [
            (suspend, 0x75),
            (resume, 0x7A),
            (write_enable, 0x06),
            (write_disable, 0x04),
            (reset_enable, 0x66),
            (reset_memory, 0x99),
            (no_operation, 0x00),
            (enter_power_down, 0xB9),
            (release_power_down, 0xAB),
            (release_read_enhanced, 0xFF),
            (enter_secured_otp, 0xB1),
            (exit_secured_otp, 0xC1),
            (chip_erase, 0x60),
        ];
        for (op, opcode) in cases {
            let mut bus = RecordingBus::default();
            op(&mut bus).unwrap();
            assert_eq!(bus.opcodes(), vec![opcode]);
            let cmd = bus.last();
            assert!(!cmd.has_address());
            assert!(!cmd.has_data());
            assert_eq!(bus.receives, 0);
            assert!(bus.transmitted.is_empty());
        }
    }

    #[test]
    fn test_write_enable_does_not_poll() {
        let mut bus = RecordingBus::default();
        write_enable(&mut bus).unwrap();
        assert_eq!(bus.commands.len(), 1);
        assert_eq!(bus.receives, 0);
    }

    #[test]
    fn test_read_cfg_registers_pick_their_byte() {
        let mut bus = RecordingBus::with_responses(&[&[0x08, 0x02], &[0x08, 0x02]]);
        assert_eq!(read_cfg_register(&mut bus).unwrap(), 0x08);
        assert_eq!(read_cfg2_register(&mut bus).unwrap(), 0x02);
        assert!(bus.commands.iter().all(|c| c.opcode == opcodes::RDCR));
        assert!(bus.commands.iter().all(|c| c.data_len == 2));
    }

    #[test]
    fn test_write_status_register_preserves_cfg() {
        // Two RDCR reads: CR1 from the first, CR2 from the second
        let mut bus = RecordingBus::with_responses(&[&[0x08, 0x55], &[0x77, 0x02]]);
        write_status_register(&mut bus, 0x40).unwrap();

        assert_eq!(bus.opcodes(), vec![opcodes::RDCR, opcodes::RDCR, opcodes::WRSR]);
        assert_eq!(bus.last().data_len, 3);
        assert_eq!(bus.transmitted, vec![vec![0x40, 0x08, 0x02]]);
    }

    #[test]
    fn test_write_cfg_register_preserves_status_and_cfg2() {
        let mut bus = RecordingBus::with_responses(&[&[0x40], &[0x00, 0x02]]);
        write_cfg_register(&mut bus, 0x08).unwrap();
        assert_eq!(bus.opcodes(), vec![opcodes::RDSR, opcodes::RDCR, opcodes::WRSR]);
        assert_eq!(bus.transmitted, vec![vec![0x40, 0x08, 0x02]]);
    }

    #[test]
    fn test_write_cfg2_register_preserves_status_and_cfg1() {
        let mut bus = RecordingBus::with_responses(&[&[0x40], &[0x08, 0x00]]);
        write_cfg2_register(&mut bus, 0x02).unwrap();
        assert_eq!(bus.opcodes(), vec![opcodes::RDSR, opcodes::RDCR, opcodes::WRSR]);
        assert_eq!(bus.transmitted, vec![vec![0x40, 0x08, 0x02]]);
    }

    #[test]
    fn test_register_write_aborts_on_failed_read() {
        let mut bus = RecordingBus {
            receive_error: Some(Error::BusTimeout),
            ..Default::default()
        };
        assert_eq!(write_status_register(&mut bus, 0x40), Err(Error::BusTimeout));
        assert_eq!(bus.opcodes(), vec![opcodes::RDCR]);
        assert!(bus.transmitted.is_empty());
    }

    #[test]
    fn test_security_register() {
        let mut bus = RecordingBus::with_responses(&[&[0x0C]]);
        assert_eq!(read_security_register(&mut bus).unwrap(), 0x0C);
        write_security_register(&mut bus, 0x02).unwrap();
        assert_eq!(bus.opcodes(), vec![opcodes::RDSCUR, opcodes::WRSCUR]);
        assert_eq!(bus.transmitted, vec![vec![0x02]]);
    }

    #[test]
    fn test_read_id_returns_bytes_unmodified() {
        let mut bus = RecordingBus::with_responses(&[&[0xC2, 0x28, 0x16]]);
        assert_eq!(read_id(&mut bus).unwrap(), [0xC2, 0x28, 0x16]);
        let cmd = bus.last();
        assert_eq!(cmd.opcode, opcodes::RDID);
        assert_eq!(cmd.data_len, 3);
        assert!(!cmd.has_address());
    }

    #[test]
    fn test_identification_variants() {
        let mut bus = RecordingBus::with_responses(&[&[0x15], &[0xC2, 0x15]]);
        assert_eq!(read_electronic_id(&mut bus).unwrap(), 0x15);
        assert_eq!(bus.last().dummy_cycles, 24);
        assert_eq!(read_manufacturer_device_id(&mut bus).unwrap(), [0xC2, 0x15]);
        assert_eq!(bus.last().address, Some(0));
    }

    #[test]
    fn test_read_sfdp_descriptor() {
        let mut bus = RecordingBus::with_responses(&[b"SFDP"]);
        let mut buf = [0u8; 4];
        read_sfdp(&mut bus, 0, &mut buf).unwrap();
        assert_eq!(&buf, b"SFDP");
        let cmd = bus.last();
        assert_eq!(cmd.opcode, opcodes::RDSFDP);
        assert_eq!(cmd.dummy_cycles, 8);
        assert_eq!(cmd.address_width, AddressWidth::ThreeByte);
    }

    #[test]
    fn test_flash_info() {
        let info = flash_info();
        assert_eq!(info.flash_size, 4 * 1024 * 1024);
        assert_eq!(info.prog_page_size, 256);
        assert_eq!(info.erase_sectors_number, info.flash_size / 4096);
        assert_eq!(info.erase_blocks_number, info.flash_size / 65536);
        assert_eq!(info.erase_sectors_number, 1024);
        assert_eq!(info.erase_blocks_number, 64);
    }

    #[test]
    fn test_failed_submit_skips_data_phase() {
        type Op = fn(&mut RecordingBus) -> Result<()>;
        let ops: [Op; 38] = [
            |b| read(b, InterfaceMode::QuadIo, 0, &mut [0u8; 4]),
            |b| read_raw(b, 1, 0, &mut [0u8; 4]),
            |b| program_page(b, InterfaceMode::Spi, 0, &[0u8; 4]),
            |b| program_page_raw(b, 4, 0, &[0u8; 4]),
            |b| erase_block(b, 0, EraseGranularity::Sector4K),
            chip_erase,
            |b| enable_memory_mapped_mode(b, InterfaceMode::DualIo),
            suspend,
            resume,
            write_enable,
            write_disable,
            |b| read_status_register(b).map(|_| ()),
            |b| read_status(b).map(|_| ()),
            |b| write_status_register(b, 0x40),
            |b| read_cfg_register(b).map(|_| ()),
            |b| write_cfg_register(b, 0x08),
            |b| read_cfg2_register(b).map(|_| ()),
            |b| write_cfg2_register(b, 0x02),
            |b| read_security_register(b).map(|_| ()),
            |b| write_security_register(b, 0),
            |b| read_id(b).map(|_| ()),
            reset_enable,
            reset_memory,
            no_operation,
            enter_power_down,
            release_power_down,
            |b| read_electronic_id(b).map(|_| ()),
            |b| read_manufacturer_device_id(b).map(|_| ()),
            |b| read_sfdp(b, 0, &mut [0u8; 8]),
            |b| set_burst_length(b, 0x60),
            release_read_enhanced,
            enter_secured_otp,
            exit_secured_otp,
            software_reset,
            |b| is_busy(b).map(|_| ()),
            |b| is_write_enabled(b).map(|_| ()),
            |b| wait_ready(b, 1),
            |b| wait_write_enabled(b, 1),
        ];
        for (i, op) in ops.iter().enumerate() {
            let mut bus = RecordingBus::failing_submit(Error::BusError);
            assert_eq!(op(&mut bus), Err(Error::BusError), "operation #{}", i);
            assert_eq!(bus.receives, 0, "operation #{}", i);
            assert!(bus.transmitted.is_empty(), "operation #{}", i);
            assert_eq!(bus.memory_map, None, "operation #{}", i);
        }
    }

    #[test]
    fn test_bus_timeout_is_propagated() {
        let mut bus = RecordingBus::failing_submit(Error::BusTimeout);
        assert_eq!(read_id(&mut bus), Err(Error::BusTimeout));
    }

    #[test]
    fn test_receive_failure_reported() {
        let mut bus = RecordingBus {
            receive_error: Some(Error::BusError),
            ..Default::default()
        };
        let mut buf = [0u8; 4];
        assert_eq!(
            read(&mut bus, InterfaceMode::Spi, 0, &mut buf),
            Err(Error::BusError)
        );
        assert_eq!(bus.commands.len(), 1);
    }

    #[test]
    fn test_wait_ready_polls_until_wip_clears() {
        let mut bus = RecordingBus::with_responses(&[&[0x03], &[0x01], &[0x00]]);
        wait_ready(&mut bus, 10).unwrap();
        assert_eq!(bus.receives, 3);
        assert_eq!(bus.delayed_us, 2 * AUTOPOLLING_INTERVAL_US as u64);
    }

    #[test]
    fn test_wait_ready_times_out() {
        let mut bus = RecordingBus {
            responses: (0..64).map(|_| vec![0x01]).collect(),
            ..Default::default()
        };
        // 1 ms budget at a 16 us interval allows 62 polls
        assert_eq!(wait_ready(&mut bus, 1), Err(Error::Timeout));
        assert_eq!(bus.receives, 1000 / AUTOPOLLING_INTERVAL_US as usize);
    }

    #[test]
    fn test_wait_write_enabled() {
        let mut bus = RecordingBus::with_responses(&[&[0x00], &[0x02]]);
        wait_write_enabled(&mut bus, 1).unwrap();
        assert_eq!(bus.receives, 2);
    }

    #[test]
    fn test_software_reset_waits() {
        let mut bus = RecordingBus::default();
        software_reset(&mut bus).unwrap();
        assert_eq!(bus.opcodes(), vec![opcodes::RSTEN, opcodes::RST]);
        assert_eq!(bus.delayed_us, RESET_MAX_TIME_MS as u64 * 1000);
    }

    #[test]
    fn test_works_through_mut_reference() {
        let mut bus = RecordingBus::with_responses(&[&[0xC2, 0x28, 0x16]]);
        let mut by_ref = &mut bus;
        assert_eq!(read_id(&mut by_ref).unwrap()[0], 0xC2);
    }
}
