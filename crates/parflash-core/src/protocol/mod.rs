//! Protocol implementations
//!
//! This module contains the JEDEC software command sequences used by 5V
//! parallel flash parts.

mod jedec;

pub use jedec::*;
