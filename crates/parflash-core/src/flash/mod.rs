//! High-level flash operations
//!
//! This module provides identification of the part, the per-page erase and
//! program engines, and the program/verify/read operations built on them.

mod engine;
mod operations;
mod session;

pub use engine::{erase_page, program_page};
pub use operations::*;
pub use session::*;
