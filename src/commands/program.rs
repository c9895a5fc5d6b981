//! Program command: erase, program and verify

use parflash_core::address::AddressSpace;
use parflash_core::chip::ProfileRegistry;
use parflash_core::flash::{self, FlashSession, ProgramReport};
use std::path::Path;

use super::progress::IndicatifProgress;
use super::verify::verify_image;
use super::{identify_session, load_image, print_session, resolve_space};
use crate::programmers::Programmer;

/// Program with a progress bar, mirrored to the POST code port if enabled
fn program_with_progress(
    prog: &mut Programmer<'_>,
    session: &FlashSession,
    space: &AddressSpace,
    image: &[u8],
) -> parflash_core::Result<ProgramReport> {
    let mut bar = IndicatifProgress::new();

    #[cfg(feature = "physmem")]
    if let Some(io) = prog.post {
        let mut post = parflash_physmem::PostCodeProgress::new(io, &mut bar);
        return flash::program(
            &mut *prog.bus,
            &mut *prog.clock,
            &mut *prog.irq,
            session,
            space,
            image,
            &mut post,
        );
    }

    flash::program(
        &mut *prog.bus,
        &mut *prog.clock,
        &mut *prog.irq,
        session,
        space,
        image,
        &mut bar,
    )
}

/// Run the program command
pub fn run_program(
    prog: &mut Programmer<'_>,
    registry: &ProfileRegistry,
    segment: Option<u16>,
    input: &Path,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_image(input)?;
    let space = resolve_space(segment, image.len() as u64)?;

    let session = identify_session(prog, &space, registry)?;
    print_session(&session);

    // Caught again by program(); checked here so nothing is printed first
    space.check_geometry(session.profile())?;

    println!(
        "Programming {} bytes at {:04X}:0000...",
        image.len(),
        space.origin() >> 4
    );
    let report = program_with_progress(prog, &session, &space, &image)?;

    if !report.erase_clean() {
        println!(
            "WARNING: erase timed out on {} page(s): {:?}",
            report.erase_timeouts.len(),
            report.erase_timeouts
        );
    }
    println!("Programmed {} pages", report.pages_programmed);

    if verify {
        let diff = verify_image(prog, &space, &image)?;
        if !diff.is_clean() {
            return Err(format!("Verification failed: {} bytes differ", diff.count()).into());
        }
    }
    Ok(())
}
