//! Loading extra device profiles from RON files
//!
//! A file describes one vendor and its parts:
//!
//! ```ron
//! (
//!     vendor: "SST/Microchip",
//!     vendor_id: 0xBF,
//!     chips: [
//!         (name: "SST39SF020A", device_id: 0xB6, page_size: KiB(4), requires_erase: true),
//!         (name: "SST29EE020", device_id: 0x10, page_size: B(128), page_write: true),
//!     ],
//! )
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use std::fs;
use std::io;
use std::path::Path;

use super::registry::ProfileRegistry;
use super::types::DeviceProfile;

/// Error type for profile database operations
#[derive(Debug, thiserror::Error)]
pub enum ProfileDbError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A profile breaks the page size invariant
    #[error("Validation error: {name} has page size {page_size}, which must be a power of two dividing 64 KiB")]
    Validation {
        /// Part name
        name: String,
        /// Offending page size in bytes
        page_size: u64,
    },
}

/// Size with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
}

impl Size {
    /// Convert to bytes
    pub fn to_bytes(self) -> u64 {
        match self {
            Size::B(n) => n as u64,
            Size::KiB(n) => n as u64 * 1024,
        }
    }
}

/// Single part definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    device_id: u8,
    page_size: Size,
    #[serde(default)]
    requires_erase: bool,
    #[serde(default)]
    page_write: bool,
}

/// Vendor definition containing multiple parts
#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    vendor_id: u8,
    chips: Vec<ChipDef>,
}

impl ProfileRegistry {
    /// Load profiles from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ProfileDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load profiles from a RON string
    ///
    /// Nothing is added unless every part in the file is valid.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ProfileDbError> {
        let vendor_def: VendorDef = ron::from_str(content)?;

        let mut staged = self.clone();
        let mut count = 0;
        for chip_def in vendor_def.chips {
            let bytes = chip_def.page_size.to_bytes();
            let invalid = || ProfileDbError::Validation {
                name: chip_def.name.clone(),
                page_size: bytes,
            };
            let page_size = u32::try_from(bytes).map_err(|_| invalid())?;
            let profile = DeviceProfile::new(
                vendor_def.vendor_id,
                chip_def.device_id,
                &vendor_def.vendor,
                &chip_def.name,
                page_size,
                chip_def.requires_erase,
                chip_def.page_write,
            );
            staged.insert(profile).map_err(|_| invalid())?;
            count += 1;
        }

        *self = staged;
        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ProfileDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }
}
