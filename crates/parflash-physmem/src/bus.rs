//! Parallel bus over mapped physical memory

use parflash_core::error::{Error as CoreError, Result as CoreResult};
use parflash_core::programmer::ParallelMaster;
use parflash_core::window::WindowAddress;

use crate::error::Result;
use crate::physmap::PhysMap;

/// Start of the legacy option ROM / BIOS area
pub const ROM_AREA_BASE: u64 = 0xC0000;
/// Size of the legacy ROM area, up to the 1 MiB boundary
pub const ROM_AREA_SIZE: usize = 0x40000;

/// Memory-mapped flash access through /dev/mem
pub struct PhysMemBus {
    map: PhysMap,
}

impl PhysMemBus {
    /// Map the whole legacy ROM area
    pub fn open() -> Result<Self> {
        Self::with_range(ROM_AREA_BASE, ROM_AREA_SIZE)
    }

    /// Map `size` bytes of physical memory at `base`
    pub fn with_range(base: u64, size: usize) -> Result<Self> {
        Ok(Self {
            map: PhysMap::new(base, size)?,
        })
    }

    /// Physical range covered by the mapping
    pub fn range(&self) -> core::ops::Range<u64> {
        self.map.phys_addr()..self.map.phys_addr() + self.map.size() as u64
    }

    fn offset_of(&self, addr: WindowAddress) -> CoreResult<usize> {
        range_offset(self.map.phys_addr(), self.map.size(), addr.physical())
            .ok_or(CoreError::AddressOutOfBounds)
    }
}

/// Offset of `physical` inside `base..base + size`
fn range_offset(base: u64, size: usize, physical: u64) -> Option<usize> {
    let offset = physical.checked_sub(base)?;
    if offset < size as u64 {
        Some(offset as usize)
    } else {
        None
    }
}

impl ParallelMaster for PhysMemBus {
    fn read(&mut self, addr: WindowAddress) -> CoreResult<u8> {
        let offset = self.offset_of(addr)?;
        Ok(self.map.read8(offset))
    }

    fn write(&mut self, addr: WindowAddress, value: u8) -> CoreResult<()> {
        let offset = self.offset_of(addr)?;
        self.map.write8(offset, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_offset() {
        assert_eq!(range_offset(ROM_AREA_BASE, ROM_AREA_SIZE, 0xC0000), Some(0));
        assert_eq!(
            range_offset(ROM_AREA_BASE, ROM_AREA_SIZE, 0xFFFFF),
            Some(0x3FFFF)
        );
        assert_eq!(range_offset(ROM_AREA_BASE, ROM_AREA_SIZE, 0x100000), None);
        assert_eq!(range_offset(ROM_AREA_BASE, ROM_AREA_SIZE, 0xBFFFF), None);
    }
}
