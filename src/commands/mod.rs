//! CLI command implementations
//!
//! Every command works on a [`Programmer`](crate::programmers::Programmer),
//! so the same code drives the real ROM area and the simulated part.
//!
//! The helpers here place images in the ROM area: the origin segment comes
//! from `-a` or is picked from the image size, the way BIOS images are
//! usually laid out.

mod checksum;
mod identify;
mod list;
mod program;
mod progress;
mod read;
mod verify;

pub use checksum::{run_checksum, run_checksum_file};
pub use identify::run_identify;
pub use list::{list_chips, list_programmers};
pub use program::run_program;
pub use read::run_read;
pub use verify::run_verify;

use parflash_core::address::AddressSpace;
use parflash_core::chip::ProfileRegistry;
use parflash_core::flash::{self, FlashSession, SYSTEM_ROM_BASE};
use parflash_core::Error;
use std::fs;
use std::path::Path;

use crate::programmers::Programmer;

/// Segment used when neither `-a` nor the image size says otherwise
pub const DEFAULT_SEGMENT: u16 = 0xF800;

/// End of the real-mode address space
const ONE_MIB: u64 = 0x10_0000;

/// Default origin segment for an image of `image_size` bytes
///
/// Full-size BIOS images end at the top of the first megabyte.
pub fn default_segment(image_size: u64) -> u16 {
    match image_size {
        0x6000 => 0xFA00,
        0x10000 => 0xF000,
        0x20000 => 0xE000,
        _ => DEFAULT_SEGMENT,
    }
}

/// Place `image_size` bytes at `segment`, or at the default for the size
///
/// The image must end at or below 1 MiB.
pub fn resolve_space(
    segment: Option<u16>,
    image_size: u64,
) -> Result<AddressSpace, Box<dyn std::error::Error>> {
    let segment = match segment {
        Some(segment) => segment,
        None => {
            let segment = default_segment(image_size);
            log::debug!(
                "Using default segment {:04X} for {} bytes",
                segment,
                image_size
            );
            segment
        }
    };

    let space = AddressSpace::from_segment(segment, image_size)?;
    if space.end() > ONE_MIB {
        return Err(format!(
            "ROM image of {} bytes at {:04X}:0000 extends beyond 1 MiB",
            image_size, segment
        )
        .into());
    }
    Ok(space)
}

/// Read an image file, rejecting empty files
pub fn load_image(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    if data.is_empty() {
        return Err(format!("File {} is empty", path.display()).into());
    }
    println!(
        "Loaded flash ROM image from {}, size {} bytes",
        path.display(),
        data.len()
    );
    Ok(data)
}

/// Identify the part behind `space`, with hints when nothing answers
pub fn identify_session(
    prog: &mut Programmer<'_>,
    space: &AddressSpace,
    registry: &ProfileRegistry,
) -> Result<FlashSession, Box<dyn std::error::Error>> {
    match flash::identify(
        &mut *prog.bus,
        &mut *prog.clock,
        &mut *prog.irq,
        space,
        registry,
    ) {
        Ok(session) => Ok(session),
        Err(Error::NoDeviceResponded) if space.origin() >= SYSTEM_ROM_BASE => Err(
            "Cannot detect flash ROM type at F000 or E000.\n\
             Make sure that the flash ROM is not write protected and that the board \
             decodes the whole part (on XT boards check the ROM size switches)."
                .into(),
        ),
        Err(Error::NoDeviceResponded) => Err(format!(
            "Cannot detect flash ROM type at {:04X}.\n\
             Make sure that the flash ROM is not write protected.",
            space.origin() >> 4
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Print what identification found
pub fn print_session(session: &FlashSession) {
    let profile = session.profile();
    println!(
        "Detected flash ROM at {:04X}: {} {}, page size {} bytes",
        session.base() >> 4,
        profile.vendor,
        profile.name,
        profile.page_size
    );
    log::debug!(
        "ID {:02X}/{:02X}, {} write, erase {}, command pair {:?}",
        profile.vendor_id,
        profile.device_id,
        profile.write_mode(),
        if profile.requires_erase { "required" } else { "not needed" },
        session.pair()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_segment() {
        assert_eq!(default_segment(24576), 0xFA00);
        assert_eq!(default_segment(32768), 0xF800);
        assert_eq!(default_segment(65536), 0xF000);
        assert_eq!(default_segment(131072), 0xE000);
        assert_eq!(default_segment(8192), 0xF800);
    }

    #[test]
    fn test_default_sizes_end_at_one_mib() {
        for size in [24576u64, 32768, 65536, 131072] {
            let space = resolve_space(None, size).unwrap();
            assert_eq!(space.end(), ONE_MIB);
        }
    }

    #[test]
    fn test_explicit_segment() {
        let space = resolve_space(Some(0xC800), 16384).unwrap();
        assert_eq!(space.origin(), 0xC8000);
    }

    #[test]
    fn test_beyond_one_mib() {
        assert!(resolve_space(Some(0xF800), 65536).is_err());
        assert!(resolve_space(None, 0x40000).is_err());
    }

    #[cfg(feature = "dummy")]
    fn scratch_file(name: &str, data: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("parflash-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_program_and_verify_on_dummy() {
        use crate::programmers::with_programmer;

        let image: Vec<u8> = (0..32768u32).map(|i| (i % 251) as u8).collect();
        let path = scratch_file("program.bin", &image);
        let registry = ProfileRegistry::builtin();

        with_programmer("dummy:chip=at29c010", |mut prog| {
            run_program(&mut prog, &registry, None, &path, true)
        })
        .unwrap();
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_verify_blank_dummy_fails() {
        use crate::programmers::with_programmer;

        let path = scratch_file("verify.bin", &[0x55; 16384]);
        let result = with_programmer("dummy", |mut prog| {
            run_verify(&mut prog, Some(0xE000), &path)
        });
        assert!(result.is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_read_back_preloaded_dummy() {
        use crate::programmers::with_programmer;

        let contents: Vec<u8> = (0..0x20000u32).map(|i| (i >> 8) as u8).collect();
        let preload = scratch_file("preload.bin", &contents);
        let output = std::env::temp_dir()
            .join(format!("parflash-{}", std::process::id()))
            .join("read.bin");
        let programmer = format!("dummy:image={}", preload.display());

        with_programmer(&programmer, |mut prog| {
            run_read(&mut prog, Some(0xF000), &output, 0x10000)
        })
        .unwrap();

        assert_eq!(fs::read(&output).unwrap(), &contents[0x10000..]);
    }
}
