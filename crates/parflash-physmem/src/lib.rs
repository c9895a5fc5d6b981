//! parflash-physmem - Direct physical memory access to parallel flash
//!
//! This crate provides the "physmem" programmer: the flash part is decoded
//! in the legacy ROM area (0xC0000-0xFFFFF) and driven with plain loads and
//! stores through a /dev/mem mapping.
//!
//! # Overview
//!
//! - [`PhysMemBus`] - `ParallelMaster` over the mapped ROM area
//! - [`PortIo`] - x86 `in`/`out` after raising the I/O privilege level
//! - [`PitTimer`] - 8254 PIT channel 2 as a `TickTimer`
//! - [`CpuInterrupts`] - `cli`/`sti`, optionally with the XT NMI mask
//! - [`PostCodeProgress`] - page index on the POST code port
//!
//! # Warnings
//!
//! Everything here needs root. Port access and interrupt masking are x86
//! only, and recent Linux kernels refuse `cli` from user space even with
//! IOPL 3, so masking is only done when asked for (`irq=cli`).

pub mod bus;
pub mod error;
pub mod interrupts;
pub mod options;
pub mod physmap;
pub mod pit;
pub mod port;
pub mod post;

pub use bus::{PhysMemBus, ROM_AREA_BASE, ROM_AREA_SIZE};
pub use error::{PhysMemError, Result};
pub use interrupts::{CpuInterrupts, NmiMask};
pub use options::{IrqMode, PhysMemOptions, TimerSource};
pub use physmap::PhysMap;
pub use pit::{PitTimer, PIT_FREQUENCY_HZ};
pub use port::PortIo;
pub use post::PostCodeProgress;
