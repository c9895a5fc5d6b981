//! Physical memory mapping for ROM access
//!
//! This module provides safe wrappers around physical memory mapping
//! using /dev/mem on Linux. The flash part is decoded somewhere in the
//! legacy ROM area below 1 MiB and is read and written there directly.
//!
//! # Safety
//!
//! Accessing physical memory is inherently unsafe and requires root privileges.
//! The mapping functions ensure proper alignment and size constraints.

use crate::error::{PhysMemError, Result};

/// A mapped region of physical memory
#[cfg(target_os = "linux")]
pub struct PhysMap {
    /// Pointer to the first requested byte
    ptr: *mut u8,
    /// Requested size
    size: usize,
    /// Size of the page-aligned mapping
    map_size: usize,
    /// Physical address (for error reporting)
    phys_addr: u64,
}

#[cfg(target_os = "linux")]
impl PhysMap {
    /// Map a region of physical memory
    ///
    /// # Arguments
    ///
    /// * `phys_addr` - Physical address to map
    /// * `size` - Size of the region to map
    pub fn new(phys_addr: u64, size: usize) -> Result<Self> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        // O_SYNC for uncached access; the part's status reads must hit the bus
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(|source| PhysMemError::OpenFailed { source })?;

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;
        let offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = (size + offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_addr as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(PhysMemError::MemoryMap {
                address: phys_addr,
                size,
                source: std::io::Error::last_os_error(),
            });
        }

        log::debug!(
            "Mapped {:#x} bytes of physical memory at {:#x}",
            size,
            phys_addr
        );

        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(offset) },
            size,
            map_size,
            phys_addr,
        })
    }

    /// Read an 8-bit value from the mapped region
    ///
    /// The offset must be within the mapped region.
    #[inline]
    pub fn read8(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.size);
        unsafe { core::ptr::read_volatile(self.ptr.add(offset)) }
    }

    /// Write an 8-bit value to the mapped region
    ///
    /// The offset must be within the mapped region.
    #[inline]
    pub fn write8(&self, offset: usize, value: u8) {
        debug_assert!(offset < self.size);
        unsafe {
            core::ptr::write_volatile(self.ptr.add(offset), value);
        }
    }

    /// Get the physical address of this mapping
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Get the size of this mapping
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(target_os = "linux")]
impl Drop for PhysMap {
    fn drop(&mut self) {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let offset = (self.phys_addr as usize) & (page_size - 1);
        unsafe {
            libc::munmap(self.ptr.sub(offset) as *mut libc::c_void, self.map_size);
        }
    }
}

// Stub for non-Linux platforms
#[cfg(not(target_os = "linux"))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PhysMap {
    pub fn new(_phys_addr: u64, _size: usize) -> Result<Self> {
        Err(PhysMemError::NotSupported(
            "Physical memory mapping only supported on Linux",
        ))
    }

    pub fn read8(&self, _offset: usize) -> u8 {
        0xFF
    }

    pub fn write8(&self, _offset: usize, _value: u8) {}

    pub fn phys_addr(&self) -> u64 {
        0
    }

    pub fn size(&self) -> usize {
        0
    }
}
