//! parflash-core - Core library for JEDEC parallel flash programming
//!
//! This crate drives 5V parallel flash parts (AT29C010, SST39SF010, W29EE011,
//! Am29F010, ...) that are mapped directly into the processor's address space
//! and are programmed through the JEDEC "software command" sequences. It is
//! `no_std` compatible; only heap allocation is required.
//!
//! The pieces, leaf first:
//!
//! - [`clock`] - busy-wait delays with a guaranteed lower bound
//! - [`window`] / [`address`] - the 64 KiB window model and the mapping of a
//!   flat ROM image onto it
//! - [`chip`] - device profiles and the profile registry
//! - [`protocol`] - the raw JEDEC command sequences
//! - [`flash`] - identification, erase/program engines, verify and read-back
//!
//! # Features
//!
//! - `std` - Calibrated wall-clock delays and RON profile database loading
//!
//! # Example
//!
//! ```ignore
//! use parflash_core::address::AddressSpace;
//! use parflash_core::chip::ProfileRegistry;
//! use parflash_core::flash::{self, NoProgress};
//!
//! let space = AddressSpace::from_segment(0xF800, image.len() as u64)?;
//! let session = flash::identify(&mut bus, &mut clock, &mut irq, &space, &ProfileRegistry::builtin())?;
//! let report = flash::program(&mut bus, &mut clock, &mut irq, &session, &space, &image, &mut NoProgress)?;
//! let diff = flash::verify(&mut bus, &space, &image)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod address;
pub mod chip;
pub mod clock;
pub mod critical;
pub mod error;
pub mod flash;
pub mod programmer;
pub mod protocol;
pub mod window;

pub use error::{Error, Geometry, Result};
