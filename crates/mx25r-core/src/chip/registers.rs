//! Register bit definitions

use bitflags::bitflags;

bitflags! {
    /// Status register (RDSR, first byte of WRSR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Write in progress
        const WIP  = 0x01;
        /// Write enable latch
        const WEL  = 0x02;
        /// Block protect bits BP0..BP3
        const BP   = 0x3C;
        /// Quad enable
        const QE   = 0x40;
        /// Status register write disable
        const SRWD = 0x80;
    }
}

bitflags! {
    /// Configuration register 1 (first RDCR byte, second WRSR byte)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Config1: u8 {
        /// Top / bottom protection select (OTP)
        const TB = 0x08;
    }
}

bitflags! {
    /// Configuration register 2 (second RDCR byte, third WRSR byte)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Config2: u8 {
        /// Low power / high performance switch
        const LH_SWITCH = 0x02;
    }
}

bitflags! {
    /// Security register (RDSCUR / WRSCUR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Security: u8 {
        /// Secured OTP indicator
        const SOI    = 0x01;
        /// Lock-down secured OTP
        const LDSO   = 0x02;
        /// Program suspended
        const PSB    = 0x04;
        /// Erase suspended
        const ESB    = 0x08;
        /// Last program failed
        const P_FAIL = 0x20;
        /// Last erase failed
        const E_FAIL = 0x40;
    }
}

impl Status {
    /// Block protect level (BP3..BP0) as a number
    pub const fn block_protect_level(&self) -> u8 {
        (self.bits() & Self::BP.bits()) >> 2
    }
}
