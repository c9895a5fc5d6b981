//! Identify command

use parflash_core::chip::ProfileRegistry;

use super::{identify_session, print_session, resolve_space};
use crate::programmers::Programmer;

/// Run the identify command
///
/// Without `-a` the system BIOS area is tried, F000 first, then E000.
pub fn run_identify(
    prog: &mut Programmer<'_>,
    registry: &ProfileRegistry,
    segment: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let space = resolve_space(segment, 1)?;
    let session = identify_session(prog, &space, registry)?;
    print_session(&session);
    println!(
        "Write mode: {}, erase before write: {}",
        session.profile().write_mode(),
        if session.profile().requires_erase { "yes" } else { "no" }
    );
    Ok(())
}
