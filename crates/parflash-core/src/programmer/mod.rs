//! Programmer traits and abstractions
//!
//! This module defines the traits a platform backend implements to give the
//! protocol code access to the flash part and to the interrupt mask.

mod traits;

pub use traits::*;
