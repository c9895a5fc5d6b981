//! JEDEC software command protocol
//!
//! Every command starts with the unlock cycle: `0xAA` written to the first
//! command address and `0x55` to the second. The command byte then goes to
//! the first command address again (or, for sector erase, to the sector
//! itself). Command addresses are offsets from the part's own base, which
//! need not be window aligned.
//!
//! Completion of an erase or program cycle is detected by reading back a
//! byte until it shows the expected value (data polling).

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::programmer::ParallelMaster;
use crate::window::WindowAddress;

/// First unlock byte
pub const UNLOCK_1: u8 = 0xAA;
/// Second unlock byte
pub const UNLOCK_2: u8 = 0x55;
/// Enter software-ID mode
pub const SOFTWARE_ID: u8 = 0x90;
/// Erase setup, must be followed by a second unlock and an erase command
pub const ERASE_SETUP: u8 = 0x80;
/// Alternate software-ID entry, issued after an erase setup cycle
pub const ALT_SOFTWARE_ID: u8 = 0x60;
/// Leave software-ID mode (also resets the command state machine)
pub const SOFTWARE_ID_EXIT: u8 = 0xF0;
/// Sector/page erase, written to the page address
pub const SECTOR_ERASE: u8 = 0x30;
/// Byte/page program
pub const PROGRAM: u8 = 0xA0;

/// Value of an erased byte
pub const ERASED_VALUE: u8 = 0xFF;

/// The two window offsets that unlock the command interface
///
/// Parts decode a different number of address lines for commands, so the
/// pair that works is discovered during identification and then used for
/// every later command in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandAddressPair {
    /// `0x5555` / `0x2AAA`
    #[default]
    Standard,
    /// `0x555` / `0x2AA`
    Alternate,
}

impl CommandAddressPair {
    /// Offset receiving `0xAA` and the command byte
    pub const fn first(self) -> u32 {
        match self {
            Self::Standard => 0x5555,
            Self::Alternate => 0x555,
        }
    }

    /// Offset receiving `0x55`
    pub const fn second(self) -> u32 {
        match self {
            Self::Standard => 0x2AAA,
            Self::Alternate => 0x2AA,
        }
    }
}

/// Command interface of a part: the physical address the part starts at
/// plus the command address pair it answers to
///
/// Command offsets are added to the part's base, so a part that does not
/// start on a window boundary still sees `0x5555` on its own address lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPort {
    base: u64,
    pair: CommandAddressPair,
}

impl CommandPort {
    /// Create a command port for a part starting at physical `base`
    pub const fn new(base: u64, pair: CommandAddressPair) -> Self {
        Self { base, pair }
    }

    /// Physical address of the part's first byte
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Command address pair in use
    pub const fn pair(&self) -> CommandAddressPair {
        self.pair
    }

    /// Bus address of `offset` bytes into the part
    pub fn address(&self, offset: u32) -> Result<WindowAddress> {
        chip_address(self.base, offset)
    }

    /// Issue the two unlock cycles
    pub fn unlock<M: ParallelMaster + ?Sized>(&self, master: &mut M) -> Result<()> {
        master.write(self.address(self.pair.first())?, UNLOCK_1)?;
        master.write(self.address(self.pair.second())?, UNLOCK_2)
    }

    /// Issue the unlock cycles followed by `command` at the first address
    pub fn command<M: ParallelMaster + ?Sized>(&self, master: &mut M, command: u8) -> Result<()> {
        self.unlock(master)?;
        master.write(self.address(self.pair.first())?, command)
    }
}

fn chip_address(base: u64, offset: u32) -> Result<WindowAddress> {
    base.checked_add(offset as u64)
        .map(WindowAddress::from_physical)
        .ok_or(Error::AddressOutOfBounds)
}

/// Read the (vendor, device) byte pair at offsets 0 and 1 of the part
/// starting at `base`
pub fn read_id<M: ParallelMaster + ?Sized>(master: &mut M, base: u64) -> Result<(u8, u8)> {
    let vendor = master.read(chip_address(base, 0)?)?;
    let device = master.read(chip_address(base, 1)?)?;
    Ok((vendor, device))
}

/// Enter software-ID mode with the `0x90` command
pub fn enter_software_id<M: ParallelMaster + ?Sized>(
    master: &mut M,
    port: &CommandPort,
) -> Result<()> {
    port.command(master, SOFTWARE_ID)
}

/// Enter software-ID mode with the `0x80`, `0x60` command pair
pub fn enter_alt_software_id<M: ParallelMaster + ?Sized>(
    master: &mut M,
    port: &CommandPort,
) -> Result<()> {
    port.command(master, ERASE_SETUP)?;
    port.command(master, ALT_SOFTWARE_ID)
}

/// Leave software-ID mode
pub fn exit_software_id<M: ParallelMaster + ?Sized>(
    master: &mut M,
    port: &CommandPort,
) -> Result<()> {
    port.command(master, SOFTWARE_ID_EXIT)
}

/// Start erasing the page at `page`
///
/// Returns immediately; use [`poll_until`] on the page to wait for it.
pub fn start_page_erase<M: ParallelMaster + ?Sized>(
    master: &mut M,
    port: &CommandPort,
    page: WindowAddress,
) -> Result<()> {
    port.command(master, ERASE_SETUP)?;
    port.unlock(master)?;
    master.write(page, SECTOR_ERASE)
}

/// Arm the program command; the next write(s) are latched as data
pub fn start_program<M: ParallelMaster + ?Sized>(
    master: &mut M,
    port: &CommandPort,
) -> Result<()> {
    port.command(master, PROGRAM)
}

/// Read `addr` until it shows `expected`
///
/// Reads at most `max_polls` times, waiting `delay_us` between reads.
/// Returns the number of reads it took, or `Error::Timeout` when the budget
/// runs out.
pub fn poll_until<M: ParallelMaster + ?Sized, C: Clock + ?Sized>(
    master: &mut M,
    clock: &mut C,
    addr: WindowAddress,
    expected: u8,
    max_polls: u32,
    delay_us: u32,
) -> Result<u32> {
    for poll in 0..max_polls {
        if master.read(addr)? == expected {
            return Ok(poll + 1);
        }
        clock.wait_us(delay_us);
    }

    Err(Error::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::PhysicalWindow;
    use alloc::vec::Vec;

    /// Records writes; reads come from a fixed script
    struct Recorder {
        writes: Vec<(u64, u8)>,
        reads: Vec<u8>,
        read_count: usize,
    }

    impl ParallelMaster for Recorder {
        fn read(&mut self, _addr: WindowAddress) -> Result<u8> {
            let value = self.reads.get(self.read_count).copied().unwrap_or(0);
            self.read_count += 1;
            Ok(value)
        }

        fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()> {
            self.writes.push((addr.physical(), value));
            Ok(())
        }
    }

    struct CountingClock(u32);

    impl Clock for CountingClock {
        fn wait_us(&mut self, _us: u32) {
            self.0 += 1;
        }
    }

    fn recorder(reads: &[u8]) -> Recorder {
        Recorder {
            writes: Vec::new(),
            reads: reads.into(),
            read_count: 0,
        }
    }

    #[test]
    fn test_erase_sequence() {
        let port = CommandPort::new(0xF0000, CommandAddressPair::Standard);
        let mut m = recorder(&[]);
        let page = port.address(0x8000).unwrap();
        start_page_erase(&mut m, &port, page).unwrap();
        assert_eq!(
            m.writes,
            [
                (0xF5555, 0xAA),
                (0xF2AAA, 0x55),
                (0xF5555, 0x80),
                (0xF5555, 0xAA),
                (0xF2AAA, 0x55),
                (0xF8000, 0x30),
            ]
        );
    }

    #[test]
    fn test_alternate_pair_offsets() {
        let port = CommandPort::new(0xE0000, CommandAddressPair::Alternate);
        let mut m = recorder(&[]);
        enter_alt_software_id(&mut m, &port).unwrap();
        assert_eq!(
            m.writes,
            [
                (0xE0555, 0xAA),
                (0xE02AA, 0x55),
                (0xE0555, 0x80),
                (0xE0555, 0xAA),
                (0xE02AA, 0x55),
                (0xE0555, 0x60),
            ]
        );
    }

    #[test]
    fn test_commands_relative_to_unaligned_base() {
        let port = CommandPort::new(0xC8000, CommandAddressPair::Standard);
        let mut m = recorder(&[]);
        enter_software_id(&mut m, &port).unwrap();
        assert_eq!(m.writes, [(0xCD555, 0xAA), (0xCAAAA, 0x55), (0xCD555, 0x90)]);

        // 0xEC000 + 0x5555 lands in the next window
        let port = CommandPort::new(0xEC000, CommandAddressPair::Standard);
        let addr = port.address(CommandAddressPair::Standard.first()).unwrap();
        assert_eq!(addr.window().base(), 0xF0000);
        assert_eq!(addr.offset(), 0x1555);
    }

    #[test]
    fn test_read_id_at_base() {
        struct IdAt(u64);

        impl ParallelMaster for IdAt {
            fn read(&mut self, addr: WindowAddress) -> Result<u8> {
                Ok(match addr.physical().checked_sub(self.0) {
                    Some(0) => 0x1F,
                    Some(1) => 0xD5,
                    _ => 0xFF,
                })
            }

            fn write(&mut self, _addr: WindowAddress, _value: u8) -> Result<()> {
                Ok(())
            }
        }

        assert_eq!(read_id(&mut IdAt(0xC8000), 0xC8000), Ok((0x1F, 0xD5)));
        assert_eq!(read_id(&mut IdAt(0xC8000), 0xC0000), Ok((0xFF, 0xFF)));
        assert_eq!(read_id(&mut IdAt(0xC8000), u64::MAX), Err(Error::AddressOutOfBounds));
    }

    #[test]
    fn test_poll_until_counts_reads() {
        let window = PhysicalWindow::new(0xF0000).unwrap();
        let addr = window.at(0).unwrap();

        let mut m = recorder(&[0x00, 0x7F, 0xFF]);
        let mut clock = CountingClock(0);
        assert_eq!(poll_until(&mut m, &mut clock, addr, 0xFF, 10, 50), Ok(3));
        assert_eq!(clock.0, 2);

        let mut m = recorder(&[]);
        let mut clock = CountingClock(0);
        assert_eq!(
            poll_until(&mut m, &mut clock, addr, 0xFF, 10, 50),
            Err(Error::Timeout)
        );
        assert_eq!(m.read_count, 10);
        assert_eq!(clock.0, 10);
    }
}
