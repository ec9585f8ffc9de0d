//! mx25r-dummy - In-memory MX25R3235F emulator for testing
//!
//! This crate provides a bus controller that emulates the flash chip in
//! memory. It follows the chip closely enough to exercise the driver end to
//! end: the write enable latch gates every modifying command, a page program
//! wraps inside its page, quad modes need the QE bit, deep power-down
//! ignores everything but a release, and program or erase can be
//! suspended while the chip reports busy.
//!
//! Every call made on the controller is appended to a transaction log, and
//! faults can be injected per call type.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use mx25r_core::bus::TimeoutPolicy;
use mx25r_core::chip::{
    ELECTRONIC_ID, FLASH_SIZE, MANUFACTURER_ID, MEMORY_DENSITY, MEMORY_TYPE, PAGE_SIZE,
};
use mx25r_core::error::Error;
use mx25r_core::spi::Command;

#[cfg(feature = "alloc")]
use mx25r_core::{
    bus::BusController,
    chip::registers::{Config1, Config2, Security, Status},
    chip::{BLOCK_32K, BLOCK_64K, SECTOR_4K},
    error::Result,
    spi::{opcodes, Direction, InterfaceMode, OperationType},
};

/// Size of the secured OTP area (8 Kbit)
pub const OTP_SIZE: usize = 1024;

/// Burst length after power-up or reset: wrap-around disabled
pub const DEFAULT_BURST_LENGTH: u8 = 0x10;

/// SFDP header followed by the JEDEC basic parameter header
pub const DEFAULT_SFDP: [u8; 16] = [
    b'S', b'F', b'D', b'P', 0x06, 0x01, 0x00, 0xFF, // SFDP header, rev 1.6, 1 header
    0x00, 0x06, 0x01, 0x10, 0x30, 0x00, 0x00, 0xFF, // basic table, 16 dwords at 0x30
];

/// Errors injected into the controller calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// Returned by every `submit_command`
    pub submit: Option<Error>,
    /// Returned by every `transmit`
    pub transmit: Option<Error>,
    /// Returned by every `receive`
    pub receive: Option<Error>,
}

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC ID: manufacturer, memory type, memory density
    pub jedec_id: [u8; 3],
    /// Electronic signature returned by RES and REMS
    pub electronic_id: u8,
    /// Flash size in bytes, a non-zero power of two
    pub size: usize,
    /// Page size for programming, a non-zero power of two
    pub page_size: usize,
    /// Initial status register
    pub status: u8,
    /// Initial configuration register 1
    pub cfg1: u8,
    /// Initial configuration register 2
    pub cfg2: u8,
    /// Initial security register
    pub security: u8,
    /// SFDP table contents, 0xFF beyond its end
    pub sfdp: &'static [u8],
    /// Status reads reporting WIP after a program, erase or register write
    pub busy_polls: u32,
    /// Injected faults
    pub faults: Faults,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            jedec_id: [MANUFACTURER_ID, MEMORY_TYPE, MEMORY_DENSITY],
            electronic_id: ELECTRONIC_ID,
            size: FLASH_SIZE as usize,
            page_size: PAGE_SIZE as usize,
            status: 0,
            cfg1: 0,
            cfg2: 0,
            security: 0,
            sfdp: &DEFAULT_SFDP,
            busy_polls: 0,
            faults: Faults::default(),
        }
    }
}

/// One call made on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// `submit_command`
    Command(Command),
    /// `transmit` of the given length
    Transmit(usize),
    /// `receive` of the given length
    Receive(usize),
    /// `configure_memory_map`
    MemoryMap(TimeoutPolicy),
    /// `delay_us`
    Delay(u32),
}

/// Slow operation the chip can be busy with
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusyOp {
    Program,
    Erase,
    Register,
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy)]
struct Pending {
    cmd: Command,
    /// Accepted on the bus but dropped by the chip
    ignored: bool,
}

/// Dummy flash controller
///
/// Emulates the MX25R3235F behind a bus controller.
#[cfg(feature = "alloc")]
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    otp: Vec<u8>,
    status: Status,
    cfg1: Config1,
    cfg2: Config2,
    security: Security,
    burst_length: u8,
    pending: Option<Pending>,
    busy: Option<(BusyOp, u32)>,
    suspended: Option<(BusyOp, u32)>,
    reset_enabled: bool,
    deep_power_down: bool,
    otp_mode: bool,
    mapped_template: Option<Command>,
    memory_mapped: bool,
    log: Vec<Transaction>,
}

#[cfg(feature = "alloc")]
impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    ///
    /// # Panics
    ///
    /// If `size` or `page_size` is not a non-zero power of two.
    pub fn new(config: DummyConfig) -> Self {
        assert!(
            config.size.is_power_of_two(),
            "flash size must be a non-zero power of two"
        );
        assert!(
            config.page_size.is_power_of_two(),
            "page size must be a non-zero power of two"
        );
        let data = vec![0xFF; config.size];
        Self {
            data,
            otp: vec![0xFF; OTP_SIZE],
            status: Status::from_bits_retain(config.status),
            cfg1: Config1::from_bits_retain(config.cfg1),
            cfg2: Config2::from_bits_retain(config.cfg2),
            security: Security::from_bits_retain(config.security),
            burst_length: DEFAULT_BURST_LENGTH,
            pending: None,
            busy: None,
            suspended: None,
            reset_enabled: false,
            deep_power_down: false,
            otp_mode: false,
            mapped_template: None,
            memory_mapped: false,
            log: Vec::new(),
            config,
        }
    }

    /// Create a new dummy flash with default configuration (MX25R3235F)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a reference to the secured OTP area
    pub fn otp(&self) -> &[u8] {
        &self.otp
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Current status register, WIP included
    pub fn status(&self) -> Status {
        if self.busy.is_some() {
            self.status | Status::WIP
        } else {
            self.status
        }
    }

    /// Current configuration registers
    pub fn cfg(&self) -> (Config1, Config2) {
        (self.cfg1, self.cfg2)
    }

    /// Current security register
    pub fn security(&self) -> Security {
        self.security
    }

    /// Last value written with Set Burst Length
    pub fn burst_length(&self) -> u8 {
        self.burst_length
    }

    /// Returns true while in deep power-down
    pub fn is_deep_power_down(&self) -> bool {
        self.deep_power_down
    }

    /// Returns true while reads go to the secured OTP area
    pub fn is_otp_mode(&self) -> bool {
        self.otp_mode
    }

    /// Returns true once memory-mapped mode is configured
    pub fn is_memory_mapped(&self) -> bool {
        self.memory_mapped
    }

    /// Interface mode of the active memory-mapped template
    pub fn mapped_mode(&self) -> Option<InterfaceMode> {
        self.mapped_template
            .filter(|_| self.memory_mapped)
            .map(|cmd| cmd.io_mode)
    }

    /// Replace the injected faults
    pub fn set_faults(&mut self, faults: Faults) {
        self.config.faults = faults;
    }

    /// All controller calls so far, oldest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Opcodes of every submitted command, oldest first
    pub fn submitted_opcodes(&self) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|t| match t {
                Transaction::Command(cmd) => Some(cmd.opcode),
                _ => None,
            })
            .collect()
    }

    /// Clear the transaction log
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Host read through the memory-mapped window
    pub fn mapped_read(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        let cmd = match (self.memory_mapped, self.mapped_template) {
            (true, Some(cmd)) => cmd,
            _ => {
                log::warn!("memory-mapped read while not in memory-mapped mode");
                return Err(Error::BusError);
            }
        };
        if self.dropped_by_chip(&cmd) {
            buf.fill(0xFF);
        } else {
            self.read_array(offset, buf);
        }
        Ok(())
    }

    /// Leave memory-mapped mode by reconfiguring the controller
    pub fn abort_memory_map(&mut self) {
        self.memory_mapped = false;
        self.mapped_template = None;
    }

    fn memory(&self) -> &[u8] {
        if self.otp_mode {
            &self.otp
        } else {
            &self.data
        }
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        if self.otp_mode {
            &mut self.otp
        } else {
            &mut self.data
        }
    }

    /// Returns true if the chip would not respond to `cmd` right now
    fn dropped_by_chip(&self, cmd: &Command) -> bool {
        if self.deep_power_down && cmd.opcode != opcodes::RES {
            log::warn!("0x{:02X} ignored in deep power-down", cmd.opcode);
            return true;
        }

        if let Some((op, _)) = self.busy {
            if !matches!(
                cmd.opcode,
                opcodes::RDSR | opcodes::RDSCUR | opcodes::SUSPEND | opcodes::RSTEN | opcodes::RST
            ) {
                log::warn!("0x{:02X} ignored while busy with {:?}", cmd.opcode, op);
                return true;
            }
        }

        if cmd.io_mode.requires_quad() && !self.status.contains(Status::QE) {
            log::warn!("0x{:02X} ignored in {:?}: QE not set", cmd.opcode, cmd.io_mode);
            return true;
        }

        false
    }

    fn start_busy(&mut self, op: BusyOp) {
        if self.config.busy_polls > 0 {
            self.busy = Some((op, self.config.busy_polls));
        }
    }

    fn require_wel(&self, what: &str) -> bool {
        if !self.status.contains(Status::WEL) {
            log::warn!("{} rejected: write enable latch not set", what);
            return false;
        }
        true
    }

    fn read_status_byte(&mut self) -> u8 {
        let status = self.status();
        if let Some((op, left)) = self.busy {
            self.busy = (left > 1).then_some((op, left - 1));
        }
        status.bits()
    }

    fn read_array(&self, addr: u32, buf: &mut [u8]) {
        let mem = self.memory();
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = mem[(addr as usize + i) % mem.len()];
        }
    }

    fn handle_page_program(&mut self, addr: u32, data: &[u8]) {
        if !self.require_wel("page program") {
            return;
        }
        if self.otp_mode && self.security.contains(Security::LDSO) {
            log::warn!("secured OTP program rejected: area is locked");
            self.status.remove(Status::WEL);
            return;
        }

        let page = self.config.page_size;
        let addr = addr as usize;
        let base = addr & !(page - 1);
        let start = addr - base;

        // Only the last page worth of data is latched
        let skip = data.len().saturating_sub(page);
        let mem = self.memory_mut();
        let len = mem.len();
        for (i, &byte) in data.iter().enumerate().skip(skip) {
            // Flash programming: can only change 1 -> 0
            mem[(base + (start + i) % page) % len] &= byte;
        }

        self.status.remove(Status::WEL);
        self.start_busy(BusyOp::Program);
    }

    fn handle_erase(&mut self, addr: u32, erase_size: usize) {
        if !self.require_wel("erase") {
            return;
        }
        if self.otp_mode {
            log::warn!("erase ignored in secured OTP mode");
            self.status.remove(Status::WEL);
            return;
        }

        let aligned = (addr as usize & !(erase_size - 1)) % self.data.len();
        let end = core::cmp::min(aligned + erase_size, self.data.len());
        self.data[aligned..end].fill(0xFF);

        self.status.remove(Status::WEL);
        self.start_busy(BusyOp::Erase);
    }

    fn handle_write_status(&mut self, data: &[u8]) {
        if !self.require_wel("status write") {
            return;
        }
        let latched = Status::WIP | Status::WEL;
        if let Some(&sr) = data.first() {
            self.status = (self.status & latched) | (Status::from_bits_retain(sr) - latched);
        }
        if let Some(&cfg1) = data.get(1) {
            self.cfg1 = Config1::from_bits_retain(cfg1);
        }
        if let Some(&cfg2) = data.get(2) {
            self.cfg2 = Config2::from_bits_retain(cfg2);
        }
        self.status.remove(Status::WEL);
        self.start_busy(BusyOp::Register);
    }

    fn handle_suspend(&mut self) {
        match self.busy {
            Some((op @ (BusyOp::Program | BusyOp::Erase), left)) => {
                self.security.insert(if op == BusyOp::Program {
                    Security::PSB
                } else {
                    Security::ESB
                });
                self.suspended = Some((op, left));
                self.busy = None;
            }
            _ => log::warn!("suspend ignored: no program or erase in progress"),
        }
    }

    fn handle_resume(&mut self) {
        match self.suspended.take() {
            Some((op, left)) => {
                self.security.remove(Security::PSB | Security::ESB);
                self.busy = Some((op, left));
            }
            None => log::warn!("resume ignored: nothing suspended"),
        }
    }

    fn reset(&mut self) {
        log::debug!("software reset");
        self.status.remove(Status::WEL);
        self.security.remove(Security::PSB | Security::ESB);
        self.busy = None;
        self.suspended = None;
        self.otp_mode = false;
        self.burst_length = DEFAULT_BURST_LENGTH;
    }

    /// Execute a command without data phase
    fn execute(&mut self, cmd: &Command) -> Result<()> {
        let addr = cmd.address.unwrap_or(0);

        match cmd.opcode {
            opcodes::WREN => self.status.insert(Status::WEL),
            opcodes::WRDI => self.status.remove(Status::WEL),

            opcodes::SE_20 => self.handle_erase(addr, SECTOR_4K as usize),
            opcodes::BE_52 => self.handle_erase(addr, BLOCK_32K as usize),
            opcodes::BE_D8 => self.handle_erase(addr, BLOCK_64K as usize),
            opcodes::CE_60 | opcodes::CE_C7 => {
                let size = self.data.len();
                self.handle_erase(0, size);
            }

            opcodes::SUSPEND | opcodes::SUSPEND_B0 => self.handle_suspend(),
            opcodes::RESUME | opcodes::RESUME_30 => self.handle_resume(),

            opcodes::RSTEN => self.reset_enabled = true,
            opcodes::RST => {
                if core::mem::take(&mut self.reset_enabled) {
                    self.reset();
                } else {
                    log::warn!("reset ignored: not preceded by reset enable");
                }
            }

            opcodes::DP => self.deep_power_down = true,
            opcodes::RES => {}
            opcodes::ENSO => self.otp_mode = true,
            opcodes::EXSO => self.otp_mode = false,
            opcodes::NOP | opcodes::RRE => {}

            _ => {
                log::warn!("unsupported opcode 0x{:02X}", cmd.opcode);
                return Err(Error::BusError);
            }
        }

        Ok(())
    }

    /// Produce the data phase of a read command
    fn respond(&mut self, cmd: &Command, buf: &mut [u8]) -> Result<()> {
        let addr = cmd.address.unwrap_or(0);

        match cmd.opcode {
            opcodes::RDSR => {
                let status = self.read_status_byte();
                buf.fill(status);
            }
            opcodes::RDCR => {
                let cr = [self.cfg1.bits(), self.cfg2.bits()];
                for (byte, value) in buf.iter_mut().zip(cr.iter().cycle()) {
                    *byte = *value;
                }
            }
            opcodes::RDSCUR => buf.fill(self.security.bits()),
            opcodes::RDID => {
                for (byte, value) in buf.iter_mut().zip(self.config.jedec_id.iter().cycle()) {
                    *byte = *value;
                }
            }
            opcodes::RES => buf.fill(self.config.electronic_id),
            opcodes::REMS => {
                let mut id = [self.config.jedec_id[0], self.config.electronic_id];
                if addr & 1 != 0 {
                    id.swap(0, 1);
                }
                for (byte, value) in buf.iter_mut().zip(id.iter().cycle()) {
                    *byte = *value;
                }
            }
            opcodes::RDSFDP => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = self
                        .config
                        .sfdp
                        .get(addr as usize + i)
                        .copied()
                        .unwrap_or(0xFF);
                }
            }
            opcodes::READ
            | opcodes::FAST_READ
            | opcodes::DREAD
            | opcodes::READ_2IO
            | opcodes::QREAD
            | opcodes::READ_4IO => self.read_array(addr, buf),

            _ => {
                log::warn!("unsupported read opcode 0x{:02X}", cmd.opcode);
                return Err(Error::BusError);
            }
        }

        Ok(())
    }

    /// Consume the data phase of a write command
    fn apply(&mut self, cmd: &Command, data: &[u8]) -> Result<()> {
        let addr = cmd.address.unwrap_or(0);

        match cmd.opcode {
            opcodes::PP | opcodes::PP_4IO => self.handle_page_program(addr, data),
            opcodes::WRSR => self.handle_write_status(data),
            opcodes::WRSCUR => {
                if self.require_wel("security write") {
                    // Only the lock-down bit is writable, and only to one
                    let value = Security::from_bits_retain(data.first().copied().unwrap_or(0));
                    self.security.insert(value & Security::LDSO);
                    self.status.remove(Status::WEL);
                }
            }
            opcodes::SBL => {
                if let Some(&value) = data.first() {
                    self.burst_length = value;
                }
            }

            _ => {
                log::warn!("unsupported write opcode 0x{:02X}", cmd.opcode);
                return Err(Error::BusError);
            }
        }

        Ok(())
    }

    fn take_pending(&mut self, direction: Direction, len: usize) -> Result<Pending> {
        let pending = match self.pending.take() {
            Some(p) if p.cmd.direction == direction => p,
            _ => {
                log::warn!("{:?} data phase without a matching command", direction);
                return Err(Error::BusError);
            }
        };
        if pending.cmd.data_len as usize != len {
            log::warn!(
                "data phase of {} bytes for 0x{:02X}, expected {}",
                len,
                pending.cmd.opcode,
                pending.cmd.data_len
            );
            return Err(Error::BusError);
        }
        Ok(pending)
    }
}

#[cfg(feature = "alloc")]
impl BusController for DummyFlash {
    fn submit_command(&mut self, cmd: &Command, _timeout_ms: u32) -> Result<()> {
        if let Some(err) = self.config.faults.submit {
            return Err(err);
        }
        self.log.push(Transaction::Command(*cmd));
        self.pending = None;

        if self.memory_mapped {
            log::warn!("0x{:02X} submitted while memory-mapped", cmd.opcode);
            return Err(Error::BusError);
        }
        if cmd.validate().is_err() {
            log::warn!("controller rejected inconsistent command {:?}", cmd);
            return Err(Error::BusError);
        }

        let reset_enabled = self.reset_enabled;
        self.reset_enabled = false;

        let ignored = self.dropped_by_chip(cmd);
        if cmd.opcode == opcodes::RES {
            self.deep_power_down = false;
        }
        if cmd.opcode == opcodes::RST {
            self.reset_enabled = reset_enabled;
        }

        if cmd.operation == OperationType::MemoryMappedRead {
            self.mapped_template = Some(*cmd);
            return Ok(());
        }

        match cmd.direction {
            Direction::None if ignored => Ok(()),
            Direction::None => self.execute(cmd),
            Direction::Read | Direction::Write => {
                self.pending = Some(Pending { cmd: *cmd, ignored });
                Ok(())
            }
        }
    }

    fn transmit(&mut self, data: &[u8], _timeout_ms: u32) -> Result<()> {
        if let Some(err) = self.config.faults.transmit {
            return Err(err);
        }
        self.log.push(Transaction::Transmit(data.len()));

        let pending = self.take_pending(Direction::Write, data.len())?;
        if pending.ignored {
            return Ok(());
        }
        self.apply(&pending.cmd, data)
    }

    fn receive(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<()> {
        if let Some(err) = self.config.faults.receive {
            return Err(err);
        }
        self.log.push(Transaction::Receive(buf.len()));

        let pending = self.take_pending(Direction::Read, buf.len())?;
        if pending.ignored {
            // Nothing drives the data lines
            buf.fill(0xFF);
            return Ok(());
        }
        self.respond(&pending.cmd, buf)
    }

    fn configure_memory_map(&mut self, policy: TimeoutPolicy) -> Result<()> {
        self.log.push(Transaction::MemoryMap(policy));
        if self.mapped_template.is_none() {
            log::warn!("memory map configured without a read template");
            return Err(Error::BusError);
        }
        self.memory_mapped = true;
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        // No delay needed for in-memory operations
        self.log.push(Transaction::Delay(us));
    }
}
