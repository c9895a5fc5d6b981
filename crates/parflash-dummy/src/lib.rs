//! parflash-dummy - In-memory parallel flash emulator for testing
//!
//! This crate provides a simulated JEDEC parallel flash part sitting on a
//! memory-mapped bus. It understands the software command sequences
//! (software-ID entry and exit, sector erase, byte and page program) and
//! reports erase/program completion through data polling, with knobs to
//! make a part slow or to never finish at all. It's useful for testing and
//! development without real hardware.
//!
//! Alongside the flash it provides [`ManualClock`], a clock that only
//! records the delays asked of it, and [`CountingInterrupts`], which tracks
//! interrupt masking.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod flash;
mod support;

pub use config::{DummyConfig, IdEntry, Latch, PRESETS};
pub use flash::DummyFlash;
pub use support::{CountingInterrupts, ManualClock};
