//! Address width types

/// Address width for flash commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 3-byte (24-bit) address - supports up to 16 MiB
    ThreeByte,
    /// 4-byte (32-bit) address - supports up to 4 GiB
    FourByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Returns the number of address bits
    pub const fn bits(&self) -> u8 {
        self.bytes() * 8
    }

    /// Returns true if `address` can be expressed in this width
    pub const fn fits(&self, address: u32) -> bool {
        match self {
            Self::None => address == 0,
            Self::ThreeByte => address <= 0x00FF_FFFF,
            Self::FourByte => true,
        }
    }
}
