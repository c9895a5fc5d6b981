//! x86 I/O port access

use crate::error::{PhysMemError, Result};

/// POST code port, shown on diagnostic cards
pub const POST_CODE_PORT: u16 = 0x80;

/// Capability to use `in`/`out` from user space
///
/// Holding one means the process has raised its I/O privilege level.
#[derive(Debug, Clone, Copy)]
pub struct PortIo {
    _private: (),
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
impl PortIo {
    /// Raise the I/O privilege level to 3
    pub fn acquire() -> Result<Self> {
        if unsafe { libc::iopl(3) } != 0 {
            return Err(PhysMemError::PortAccess(std::io::Error::last_os_error()));
        }
        log::debug!("I/O privilege level raised");
        Ok(Self { _private: () })
    }

    /// Read a byte from `port`
    #[inline]
    pub fn inb(&self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                out("al") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    /// Write a byte to `port`
    #[inline]
    pub fn outb(&self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
impl PortIo {
    pub fn acquire() -> Result<Self> {
        Err(PhysMemError::NotSupported(
            "I/O port access only supported on Linux x86",
        ))
    }

    pub fn inb(&self, _port: u16) -> u8 {
        0xFF
    }

    pub fn outb(&self, _port: u16, _value: u8) {}
}
