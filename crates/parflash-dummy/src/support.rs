//! Deterministic clock and interrupt controller for tests

use alloc::vec::Vec;

use parflash_core::clock::Clock;
use parflash_core::programmer::InterruptControl;

/// A clock that returns at once and records what it was asked to wait
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    waits: Vec<u32>,
}

impl ManualClock {
    /// Create a clock with no recorded waits
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait so far, in microseconds
    pub fn waits(&self) -> &[u32] {
        &self.waits
    }

    /// Total simulated time in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.waits.iter().map(|&us| us as u64).sum()
    }
}

impl Clock for ManualClock {
    fn wait_us(&mut self, us: u32) {
        self.waits.push(us);
    }
}

/// Interrupt controller that counts mask/unmask calls
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingInterrupts {
    disabled: u32,
    enabled: u32,
}

impl CountingInterrupts {
    /// Create a controller with interrupts unmasked
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether interrupts are currently masked
    pub fn masked(&self) -> bool {
        self.disabled > self.enabled
    }

    /// Number of times interrupts were masked
    pub fn disable_count(&self) -> u32 {
        self.disabled
    }

    /// Number of times interrupts were unmasked
    pub fn enable_count(&self) -> u32 {
        self.enabled
    }
}

impl InterruptControl for CountingInterrupts {
    fn disable(&mut self) {
        self.disabled += 1;
    }

    fn enable(&mut self) {
        self.enabled += 1;
    }
}
