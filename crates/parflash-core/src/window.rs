//! Physical address windows
//!
//! The platform can only address a fixed-size span of physical memory at a
//! time (one 64 KiB real-mode segment in the reference hardware). Every bus
//! access goes through a [`WindowAddress`], which can only be built with an
//! offset that lies inside its window. Moving between windows is the job of
//! [`crate::address::AddressSpace`].

use core::fmt;

use crate::error::{Error, Result};

/// Size of one addressable window in bytes
pub const WINDOW_SIZE: u32 = 0x1_0000;

const WINDOW_MASK: u64 = WINDOW_SIZE as u64 - 1;

/// A window-aligned span of physical address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalWindow {
    base: u64,
}

impl PhysicalWindow {
    /// Create a window at `base`, which must be aligned to [`WINDOW_SIZE`]
    pub const fn new(base: u64) -> Result<Self> {
        if base & WINDOW_MASK != 0 {
            return Err(Error::InvalidWindow);
        }
        Ok(Self { base })
    }

    /// The window that contains the physical address `addr`
    pub const fn containing(addr: u64) -> Self {
        Self {
            base: addr & !WINDOW_MASK,
        }
    }

    /// Physical base address of the window
    pub const fn base(self) -> u64 {
        self.base
    }

    /// Real-mode segment value of the window base
    pub const fn segment(self) -> u64 {
        self.base >> 4
    }

    /// Validate an offset inside this window
    pub const fn at(self, offset: u32) -> Result<WindowAddress> {
        if offset >= WINDOW_SIZE {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(WindowAddress {
            window: self,
            offset,
        })
    }

    /// The window directly after this one
    pub fn next(self) -> Result<Self> {
        self.base
            .checked_add(WINDOW_SIZE as u64)
            .map(|base| Self { base })
            .ok_or(Error::AddressOutOfBounds)
    }
}

impl fmt::Display for PhysicalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}:0000", self.segment())
    }
}

/// A validated byte address: a window plus an offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowAddress {
    window: PhysicalWindow,
    offset: u32,
}

impl WindowAddress {
    /// Address of the physical byte `addr`, in the window that contains it
    pub const fn from_physical(addr: u64) -> Self {
        Self {
            window: PhysicalWindow::containing(addr),
            offset: (addr & WINDOW_MASK) as u32,
        }
    }

    /// The window this address lives in
    pub const fn window(self) -> PhysicalWindow {
        self.window
    }

    /// Offset inside the window, always below [`WINDOW_SIZE`]
    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Absolute physical address
    pub const fn physical(self) -> u64 {
        self.window.base + self.offset as u64
    }

    /// Address `delta` bytes further on, which must stay in the same window
    pub const fn add(self, delta: u32) -> Result<Self> {
        match self.offset.checked_add(delta) {
            Some(offset) => self.window.at(offset),
            None => Err(Error::AddressOutOfBounds),
        }
    }

    /// Bytes left in the window from this address onwards
    pub const fn remaining(self) -> u32 {
        WINDOW_SIZE - self.offset
    }
}

impl fmt::Display for WindowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}:{:04X}", self.window.segment(), self.offset)
    }
}
