//! Programmer trait definitions

use crate::error::{Error, Result};
use crate::window::{WindowAddress, WINDOW_SIZE};

/// Parallel bus master trait
///
/// This trait represents memory-mapped access to the flash part. The only
/// addresses it accepts are [`WindowAddress`]es, which are validated to lie
/// inside one window; the implementation is responsible for mapping windows
/// onto whatever physical access mechanism it has.
///
/// Reads take `&mut self` because reading a flash part in the middle of an
/// erase or program cycle has side effects (status toggling).
///
/// ## Example
///
/// ```ignore
/// impl ParallelMaster for PhysMemBus {
///     fn read(&mut self, addr: WindowAddress) -> Result<u8> {
///         let offset = self.offset_of(addr)?;
///         Ok(self.map.read8(offset))
///     }
///
///     fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()> {
///         let offset = self.offset_of(addr)?;
///         self.map.write8(offset, value);
///         Ok(())
///     }
/// }
/// ```
pub trait ParallelMaster {
    /// Read one byte
    fn read(&mut self, addr: WindowAddress) -> Result<u8>;

    /// Write one byte
    fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()>;

    /// Read consecutive bytes starting at `start`
    ///
    /// The run must not leave the window.
    fn read_into(&mut self, start: WindowAddress, buf: &mut [u8]) -> Result<()> {
        if start.offset() as usize + buf.len() > WINDOW_SIZE as usize {
            return Err(Error::AddressOutOfBounds);
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.read(start.add(i as u32)?)?;
        }
        Ok(())
    }
}

impl<M: ParallelMaster + ?Sized> ParallelMaster for &mut M {
    fn read(&mut self, addr: WindowAddress) -> Result<u8> {
        (**self).read(addr)
    }

    fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()> {
        (**self).write(addr, value)
    }

    fn read_into(&mut self, start: WindowAddress, buf: &mut [u8]) -> Result<()> {
        (**self).read_into(start, buf)
    }
}

/// Maskable interrupt control
///
/// Command bytes must reach the flash within the part's internal timing
/// window; an interrupt handler running between two of them can abort the
/// sequence. Use through [`crate::critical::CriticalSection`].
pub trait InterruptControl {
    /// Mask interrupts
    fn disable(&mut self);

    /// Unmask interrupts
    fn enable(&mut self);
}

impl<I: InterruptControl + ?Sized> InterruptControl for &mut I {
    fn disable(&mut self) {
        (**self).disable()
    }

    fn enable(&mut self) {
        (**self).enable()
    }
}

/// Interrupt control for platforms where nothing can be masked
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterruptControl;

impl InterruptControl for NoInterruptControl {
    fn disable(&mut self) {
        log::trace!("Interrupt masking not available");
    }

    fn enable(&mut self) {}
}
