//! Chip identification and the per-run flash session

use crate::address::AddressSpace;
use crate::chip::{DeviceProfile, ProfileRegistry};
use crate::clock::{
    Clock, BYTE_WRITE_TIMEOUT_POLLS, ERASE_TIMEOUT_POLLS, IDENTIFY_DELAY_US,
    PAGE_WRITE_TIMEOUT_POLLS, WRITE_DELAY_US,
};
use crate::critical::CriticalSection;
use crate::error::{Error, Result};
use crate::programmer::{InterruptControl, ParallelMaster};
use crate::protocol::{self, CommandAddressPair, CommandPort};

/// Lowest physical address of the system BIOS area
///
/// Images placed here belong to the motherboard flash, whose command
/// interface is tried at 0xF0000 and then 0xE0000.
pub const SYSTEM_ROM_BASE: u64 = 0xE0000;

const SYSTEM_ROM_BASES: [u64; 2] = [0xF0000, 0xE0000];

/// Polling budgets for erase and program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay between completion polls in microseconds
    pub poll_delay_us: u32,
    /// Maximum polls for one page erase
    pub erase_polls: u32,
    /// Maximum polls for one page write
    pub page_write_polls: u32,
    /// Maximum polls for one byte write
    pub byte_write_polls: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_delay_us: WRITE_DELAY_US,
            erase_polls: ERASE_TIMEOUT_POLLS,
            page_write_polls: PAGE_WRITE_TIMEOUT_POLLS,
            byte_write_polls: BYTE_WRITE_TIMEOUT_POLLS,
        }
    }
}

/// State established by a successful identification
///
/// Holds the matched profile and the command port (chip base plus address
/// pair) the part answered on. Erase and program must go through the same
/// port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashSession {
    profile: DeviceProfile,
    port: CommandPort,
    timing: Timing,
}

impl FlashSession {
    /// Create a session for an already known part
    pub fn new(profile: DeviceProfile, port: CommandPort) -> Self {
        Self {
            profile,
            port,
            timing: Timing::default(),
        }
    }

    /// Replace the polling budgets
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// The identified part
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Command port the part answered on
    pub fn port(&self) -> &CommandPort {
        &self.port
    }

    /// Physical address the part starts at
    pub fn base(&self) -> u64 {
        self.port.base()
    }

    /// Command address pair the part answered to
    pub fn pair(&self) -> CommandAddressPair {
        self.port.pair()
    }

    /// Polling budgets
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Page size of the part
    pub fn page_size(&self) -> u32 {
        self.profile.page_size
    }
}

/// ID bytes read in software-ID mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareId {
    /// Vendor ID
    pub vendor_id: u8,
    /// Device ID
    pub device_id: u8,
    /// Port the part answered on
    pub port: CommandPort,
}

/// Read the software ID of a part starting at physical `base`
///
/// Returns `None` when none of the entry sequences changed what offsets 0
/// and 1 read back. The exit sequence is always issued before returning,
/// so the part is back in read mode whatever happened.
pub fn read_software_id<M, C, I>(
    master: &mut M,
    clock: &mut C,
    irq: &mut I,
    base: u64,
) -> Result<Option<SoftwareId>>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
    I: InterruptControl + ?Sized,
{
    let baseline = protocol::read_id(master, base)?;
    log::trace!(
        "Resting contents at 0x{:05X}: {:02X} {:02X}",
        base,
        baseline.0,
        baseline.1
    );

    let _cs = CriticalSection::enter(irq);

    let mut port = CommandPort::new(base, CommandAddressPair::Standard);
    let attempt = enter_id_mode(master, clock, &mut port, baseline);

    let exit = protocol::exit_software_id(master, &port);
    clock.wait_us(IDENTIFY_DELAY_US);

    let (vendor_id, device_id) = attempt?;
    exit?;

    if (vendor_id, device_id) == baseline {
        log::debug!("No software-ID response at 0x{:05X}", base);
        return Ok(None);
    }

    log::debug!(
        "Software-ID at 0x{:05X}: vendor 0x{:02X}, device 0x{:02X} ({:?} command addresses)",
        base,
        vendor_id,
        device_id,
        port.pair()
    );
    Ok(Some(SoftwareId {
        vendor_id,
        device_id,
        port,
    }))
}

/// Try the entry sequences in turn until the ID bytes differ from `baseline`
///
/// Leaves `port` set to the address pair of the last attempt.
fn enter_id_mode<M, C>(
    master: &mut M,
    clock: &mut C,
    port: &mut CommandPort,
    baseline: (u8, u8),
) -> Result<(u8, u8)>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
{
    let base = port.base();

    protocol::enter_software_id(master, port)?;
    clock.wait_us(IDENTIFY_DELAY_US);
    let mut id = protocol::read_id(master, base)?;

    if id == baseline {
        log::trace!("Trying alternate software-ID entry");
        protocol::enter_alt_software_id(master, port)?;
        clock.wait_us(IDENTIFY_DELAY_US);
        id = protocol::read_id(master, base)?;
    }

    if id == baseline {
        log::trace!("Trying 0x555/0x2AA command addresses");
        *port = CommandPort::new(base, CommandAddressPair::Alternate);
        protocol::enter_alt_software_id(master, port)?;
        clock.wait_us(IDENTIFY_DELAY_US);
        id = protocol::read_id(master, base)?;
    }

    Ok(id)
}

/// Identify the part starting at physical `base`
pub fn identify_at<M, C, I>(
    master: &mut M,
    clock: &mut C,
    irq: &mut I,
    base: u64,
    registry: &ProfileRegistry,
) -> Result<FlashSession>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
    I: InterruptControl + ?Sized,
{
    let id = read_software_id(master, clock, irq, base)?.ok_or(Error::NoDeviceResponded)?;

    let profile = registry
        .find(id.vendor_id, id.device_id)
        .ok_or(Error::UnsupportedDevice {
            vendor_id: id.vendor_id,
            device_id: id.device_id,
        })?;

    log::info!(
        "Detected flash ROM at 0x{:05X}, type: {}, page size: {} bytes",
        base,
        profile,
        profile.page_size
    );

    Ok(FlashSession::new(profile.clone(), id.port))
}

/// Physical bases where the part holding `space` may start
///
/// The system BIOS flash is tried at 0xF0000 first and then 0xE0000;
/// anywhere else the part starts at the image origin.
pub fn candidate_bases(space: &AddressSpace) -> impl Iterator<Item = u64> {
    let system_rom = space.origin() >= SYSTEM_ROM_BASE;
    let own = (!system_rom).then_some(space.origin());
    SYSTEM_ROM_BASES
        .into_iter()
        .filter(move |_| system_rom)
        .chain(own)
}

/// Identify the part that holds `space`
///
/// Tries every base from [`candidate_bases`]. A part that answers with
/// an unknown ID ends the search: asking elsewhere would not make it
/// supported.
pub fn identify<M, C, I>(
    master: &mut M,
    clock: &mut C,
    irq: &mut I,
    space: &AddressSpace,
    registry: &ProfileRegistry,
) -> Result<FlashSession>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
    I: InterruptControl + ?Sized,
{
    for base in candidate_bases(space) {
        match identify_at(master, clock, irq, base, registry) {
            Err(Error::NoDeviceResponded) => continue,
            other => return other,
        }
    }

    Err(Error::NoDeviceResponded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_bases() {
        let bios = AddressSpace::from_segment(0xF800, 32768).unwrap();
        assert!(candidate_bases(&bios).eq([0xF0000, 0xE0000]));

        let option_rom = AddressSpace::from_segment(0xC800, 16384).unwrap();
        assert!(candidate_bases(&option_rom).eq([0xC8000]));

        let low = AddressSpace::from_segment(0xD000, 65536).unwrap();
        assert!(candidate_bases(&low).eq([0xD0000]));
    }

    #[test]
    fn test_default_timing() {
        let t = Timing::default();
        assert_eq!(t.poll_delay_us, 50);
        assert_eq!(t.erase_polls, 2000);
        assert_eq!(t.byte_write_polls, 200);
    }
}
