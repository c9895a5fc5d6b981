//! Device profiles and the profile registry
//!
//! This module provides the [`DeviceProfile`] describing a parallel flash
//! part, and the [`ProfileRegistry`] used to look parts up by the ID bytes
//! returned in software-ID mode.

mod registry;
mod types;

#[cfg(feature = "std")]
mod database;

pub use registry::ProfileRegistry;
pub use types::*;

#[cfg(feature = "std")]
pub use database::*;
