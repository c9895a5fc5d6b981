//! Device profile type definitions

use alloc::string::String;
use core::fmt;

use crate::error::{Error, Result};
use crate::window::WINDOW_SIZE;

/// Geometry and write behaviour of one parallel flash part
///
/// Looked up once per session by (vendor ID, device ID) and read-only from
/// then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// JEDEC vendor ID (byte at offset 0 in software-ID mode)
    pub vendor_id: u8,
    /// Device ID (byte at offset 1 in software-ID mode)
    pub device_id: u8,
    /// Vendor name (e.g., "SST/Microchip")
    pub vendor: String,
    /// Part name (e.g., "SST39SF010")
    pub name: String,
    /// Erase/program page size in bytes
    pub page_size: u32,
    /// Pages must be erased before they are programmed
    pub requires_erase: bool,
    /// A whole page can be loaded after one program command; otherwise
    /// every byte needs its own command
    pub supports_page_write: bool,
}

impl DeviceProfile {
    /// Create a profile
    pub fn new(
        vendor_id: u8,
        device_id: u8,
        vendor: &str,
        name: &str,
        page_size: u32,
        requires_erase: bool,
        supports_page_write: bool,
    ) -> Self {
        Self {
            vendor_id,
            device_id,
            vendor: String::from(vendor),
            name: String::from(name),
            page_size,
            requires_erase,
            supports_page_write,
        }
    }

    /// Check if this profile matches the given ID pair
    pub fn matches_id(&self, vendor_id: u8, device_id: u8) -> bool {
        self.vendor_id == vendor_id && self.device_id == device_id
    }

    /// Check that the page size is a power of two that divides the window
    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two() || self.page_size > WINDOW_SIZE {
            return Err(Error::InvalidProfile);
        }
        Ok(())
    }

    /// How data is handed to the part after a program command
    pub fn write_mode(&self) -> WriteMode {
        if self.supports_page_write {
            WriteMode::Page
        } else {
            WriteMode::Byte
        }
    }
}

/// Program granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// One program command per byte
    Byte,
    /// One program command per page
    Page,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => write!(f, "byte"),
            Self::Page => write!(f, "page"),
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.vendor, self.name)
    }
}

/// JEDEC vendor IDs of the supported parts
pub mod vendor {
    /// AMD
    pub const AMD: u8 = 0x01;
    /// Atmel
    pub const ATMEL: u8 = 0x1F;
    /// SST (Greenliant, Microchip)
    pub const SST: u8 = 0xBF;
    /// Winbond
    pub const WINBOND: u8 = 0xDA;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_page_size() {
        let mut p = DeviceProfile::new(0x1F, 0xD5, "Atmel", "AT29C010", 128, false, true);
        assert!(p.validate().is_ok());
        p.page_size = 96;
        assert_eq!(p.validate(), Err(Error::InvalidProfile));
        p.page_size = 0;
        assert_eq!(p.validate(), Err(Error::InvalidProfile));
        p.page_size = 0x20000;
        assert_eq!(p.validate(), Err(Error::InvalidProfile));
    }
}
