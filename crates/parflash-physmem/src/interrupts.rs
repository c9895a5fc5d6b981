//! CPU interrupt masking

use parflash_core::programmer::InterruptControl;

use crate::port::PortIo;

/// XT-style NMI mask register
#[cfg_attr(not(any(target_arch = "x86", target_arch = "x86_64")), allow(dead_code))]
const XT_NMI_MASK_PORT: u16 = 0xA0;

/// How non-maskable interrupts are held off along with `cli`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NmiMask {
    /// Leave NMIs alone
    #[default]
    None,
    /// XT-class boards: write 0x00/0x80 to port 0xA0
    Xt,
}

/// Masks maskable interrupts with `cli`/`sti`
///
/// User space may only do this with IOPL 3, and recent Linux kernels no
/// longer grant it even then, so this is opt-in.
#[derive(Debug)]
#[cfg_attr(not(any(target_arch = "x86", target_arch = "x86_64")), allow(dead_code))]
pub struct CpuInterrupts {
    io: PortIo,
    nmi: NmiMask,
}

impl CpuInterrupts {
    /// Create a controller; `io` proves the I/O privilege level was raised
    pub fn new(io: PortIo, nmi: NmiMask) -> Self {
        Self { io, nmi }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl InterruptControl for CpuInterrupts {
    fn disable(&mut self) {
        unsafe {
            core::arch::asm!("cli", options(nomem, nostack));
        }
        if self.nmi == NmiMask::Xt {
            self.io.outb(XT_NMI_MASK_PORT, 0x00);
        }
    }

    fn enable(&mut self) {
        if self.nmi == NmiMask::Xt {
            self.io.outb(XT_NMI_MASK_PORT, 0x80);
        }
        unsafe {
            core::arch::asm!("sti", options(nomem, nostack));
        }
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
impl InterruptControl for CpuInterrupts {
    fn disable(&mut self) {
        log::trace!("Interrupt masking not available on this architecture");
    }

    fn enable(&mut self) {}
}
