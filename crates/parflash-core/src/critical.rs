//! Scoped interrupt masking

use crate::programmer::InterruptControl;

/// Interrupts stay masked for as long as this guard lives
///
/// Dropping the guard unmasks them again, so every exit path out of a
/// command sequence (including `?` on an error) restores them.
pub struct CriticalSection<'a, I: InterruptControl + ?Sized> {
    irq: &'a mut I,
}

impl<'a, I: InterruptControl + ?Sized> CriticalSection<'a, I> {
    /// Mask interrupts until the returned guard is dropped
    pub fn enter(irq: &'a mut I) -> Self {
        irq.disable();
        Self { irq }
    }
}

impl<I: InterruptControl + ?Sized> Drop for CriticalSection<'_, I> {
    fn drop(&mut self) {
        self.irq.enable();
    }
}
