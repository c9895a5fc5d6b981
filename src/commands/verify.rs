//! Verify command

use parflash_core::address::AddressSpace;
use parflash_core::flash::{self, DifferenceReport};
use std::path::Path;

use super::{load_image, resolve_space};
use crate::programmers::Programmer;

/// Mismatches printed before the rest are only counted
const MAX_PRINTED_MISMATCHES: usize = 32;

/// Compare the flash in `space` with `image` and print the differences
pub fn verify_image(
    prog: &mut Programmer<'_>,
    space: &AddressSpace,
    image: &[u8],
) -> Result<DifferenceReport, Box<dyn std::error::Error>> {
    println!("Verifying {} bytes at {:05X}...", image.len(), space.origin());
    let report = flash::verify(&mut *prog.bus, space, image)?;

    for mismatch in report.mismatches.iter().take(MAX_PRINTED_MISMATCHES) {
        println!("  {}", mismatch);
    }
    if report.count() > MAX_PRINTED_MISMATCHES {
        println!(
            "  ... and {} more",
            report.count() - MAX_PRINTED_MISMATCHES
        );
    }

    if report.is_clean() {
        println!("No differences found");
    } else {
        println!("WARNING: {} differences found", report.count());
    }
    Ok(report)
}

/// Run the verify command
pub fn run_verify(
    prog: &mut Programmer<'_>,
    segment: Option<u16>,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_image(input)?;
    let space = resolve_space(segment, image.len() as u64)?;

    let report = verify_image(prog, &space, &image)?;
    if !report.is_clean() {
        return Err(format!("Verification failed: {} bytes differ", report.count()).into());
    }
    Ok(())
}
