//! Per-page erase and program cycles
//!
//! These run with interrupts already masked by the caller and use the
//! command port from the session. Page addresses come from
//! [`AddressSpace::pages`](crate::address::AddressSpace::pages), so a page
//! never straddles a window.

use crate::address::Page;
use crate::chip::WriteMode;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::programmer::ParallelMaster;
use crate::protocol::{self, ERASED_VALUE};

use super::session::FlashSession;

/// Erase one page and wait for it to read back as erased
///
/// Returns the number of polls it took. Running out of polls is reported
/// as [`Error::EraseTimeout`].
pub fn erase_page<M, C>(
    master: &mut M,
    clock: &mut C,
    session: &FlashSession,
    page: &Page,
) -> Result<u32>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
{
    let timing = session.timing();
    protocol::start_page_erase(master, session.port(), page.address)?;
    protocol::poll_until(
        master,
        clock,
        page.address,
        ERASED_VALUE,
        timing.erase_polls,
        timing.poll_delay_us,
    )
    .map_err(|e| match e {
        Error::Timeout => Error::EraseTimeout { page: page.index },
        other => other,
    })
}

/// Program one page with `data`
///
/// `data` must be exactly one page long. Page-write parts take the whole
/// page after a single program command and are polled on the last byte.
/// Byte-write parts take one program command per byte and stop at the
/// first byte that does not read back.
pub fn program_page<M, C>(
    master: &mut M,
    clock: &mut C,
    session: &FlashSession,
    page: &Page,
    data: &[u8],
) -> Result<()>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
{
    if data.len() as u64 != session.page_size() as u64 || data.is_empty() {
        return Err(Error::AddressOutOfBounds);
    }
    // The last byte must be in the same window as the first
    let last = page.address.add(data.len() as u32 - 1)?;

    match session.profile().write_mode() {
        WriteMode::Page => write_whole_page(master, clock, session, page, data, last),
        WriteMode::Byte => write_bytes(master, clock, session, page, data),
    }
}

fn write_whole_page<M, C>(
    master: &mut M,
    clock: &mut C,
    session: &FlashSession,
    page: &Page,
    data: &[u8],
    last: crate::window::WindowAddress,
) -> Result<()>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
{
    let timing = session.timing();
    protocol::start_program(master, session.port())?;
    for (i, &byte) in data.iter().enumerate() {
        master.write(page.address.add(i as u32)?, byte)?;
    }

    let expected = data[data.len() - 1];
    match protocol::poll_until(
        master,
        clock,
        last,
        expected,
        timing.page_write_polls,
        timing.poll_delay_us,
    ) {
        Ok(_) => Ok(()),
        Err(Error::Timeout) => Err(Error::PageWriteFailure {
            page: page.index,
            address: last.physical(),
        }),
        Err(e) => Err(e),
    }
}

fn write_bytes<M, C>(
    master: &mut M,
    clock: &mut C,
    session: &FlashSession,
    page: &Page,
    data: &[u8],
) -> Result<()>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
{
    let timing = session.timing();
    for (i, &byte) in data.iter().enumerate() {
        let addr = page.address.add(i as u32)?;
        protocol::start_program(master, session.port())?;
        master.write(addr, byte)?;
        match protocol::poll_until(
            master,
            clock,
            addr,
            byte,
            timing.byte_write_polls,
            timing.poll_delay_us,
        ) {
            Ok(_) => {}
            Err(Error::Timeout) => {
                return Err(Error::PageWriteFailure {
                    page: page.index,
                    address: addr.physical(),
                })
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressSpace;
    use crate::chip::ProfileRegistry;
    use crate::protocol::{CommandAddressPair, CommandPort};
    use crate::window::WindowAddress;
    use alloc::vec::Vec;

    /// Echoes back the last value written to each address, or 0xFF
    #[derive(Default)]
    struct Echo {
        writes: Vec<(u64, u8)>,
        stuck_at: Option<u64>,
        reads: usize,
    }

    impl ParallelMaster for Echo {
        fn read(&mut self, addr: WindowAddress) -> Result<u8> {
            self.reads += 1;
            if self.stuck_at == Some(addr.physical()) {
                return Ok(0x00);
            }
            Ok(self
                .writes
                .iter()
                .rev()
                .find(|(a, _)| *a == addr.physical())
                .map(|(_, v)| *v)
                .unwrap_or(0xFF))
        }

        fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()> {
            self.writes.push((addr.physical(), value));
            Ok(())
        }
    }

    struct NoWait;

    impl Clock for NoWait {
        fn wait_us(&mut self, _us: u32) {}
    }

    fn session(vendor: u8, device: u8) -> FlashSession {
        let registry = ProfileRegistry::builtin();
        let profile = registry.find(vendor, device).unwrap().clone();
        FlashSession::new(profile, CommandPort::new(0xF0000, CommandAddressPair::Standard))
    }

    #[test]
    fn test_byte_mode_issues_command_per_byte() {
        // SST 39SF010: 4 KiB pages, byte program
        let s = session(0xBF, 0xB5);
        let space = AddressSpace::from_segment(0xF800, 4096).unwrap();
        let page = space.pages(4096).next().unwrap().unwrap();
        let data = [0x5Au8; 4096];
        let mut m = Echo::default();
        program_page(&mut m, &mut NoWait, &s, &page, &data).unwrap();
        let commands = m.writes.iter().filter(|w| **w == (0xF5555, 0xA0)).count();
        assert_eq!(commands, 4096);
    }

    #[test]
    fn test_page_mode_single_command() {
        // Atmel 29C010: 128 byte pages, page write
        let s = session(0x1F, 0xD5);
        let space = AddressSpace::from_segment(0xF800, 256).unwrap();
        let page = space.pages(128).nth(1).unwrap().unwrap();
        let data: Vec<u8> = (0..128u8).collect();
        let mut m = Echo::default();
        program_page(&mut m, &mut NoWait, &s, &page, &data).unwrap();
        assert_eq!(m.writes.len(), 3 + 128);
        assert_eq!(m.writes[3], (0xF8080, 0));
        assert_eq!(m.writes.last(), Some(&(0xF80FF, 127)));
    }

    #[test]
    fn test_byte_failure_names_address() {
        let s = session(0xBF, 0xB5);
        let space = AddressSpace::from_segment(0xF800, 4096).unwrap();
        let page = space.pages(4096).next().unwrap().unwrap();
        let data = [0x12u8; 4096];
        let mut m = Echo {
            stuck_at: Some(0xF8003),
            ..Default::default()
        };
        let err = program_page(&mut m, &mut NoWait, &s, &page, &data).unwrap_err();
        assert_eq!(
            err,
            Error::PageWriteFailure {
                page: 0,
                address: 0xF8003
            }
        );
        // Nothing programmed past the failing byte
        assert!(!m.writes.iter().any(|(a, _)| *a == 0xF8004));
    }

    #[test]
    fn test_erase_timeout_names_page() {
        let s = session(0xBF, 0xB5);
        let space = AddressSpace::from_segment(0xF800, 8192).unwrap();
        let page = space.pages(4096).nth(1).unwrap().unwrap();
        let mut m = Echo {
            stuck_at: Some(0xF9000),
            ..Default::default()
        };
        let err = erase_page(&mut m, &mut NoWait, &s, &page).unwrap_err();
        assert_eq!(err, Error::EraseTimeout { page: 1 });
        assert_eq!(m.reads, 2000);
    }

    #[test]
    fn test_wrong_data_length() {
        let s = session(0x1F, 0xD5);
        let space = AddressSpace::from_segment(0xF800, 128).unwrap();
        let page = space.pages(128).next().unwrap().unwrap();
        let mut m = Echo::default();
        assert_eq!(
            program_page(&mut m, &mut NoWait, &s, &page, &[0u8; 64]),
            Err(Error::AddressOutOfBounds)
        );
        assert!(m.writes.is_empty());
    }
}
