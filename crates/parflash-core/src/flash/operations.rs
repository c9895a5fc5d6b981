//! High-level flash operations

use alloc::vec::Vec;
use core::fmt;

use crate::address::AddressSpace;
use crate::clock::Clock;
use crate::critical::CriticalSection;
use crate::error::{Error, Result};
use crate::programmer::{InterruptControl, ParallelMaster};

use super::engine;
use super::session::FlashSession;

/// Bytes read from the bus per request when verifying or dumping
const READ_CHUNK_SIZE: u32 = 4096;

// =============================================================================
// Progress reporting
// =============================================================================

/// What is currently happening to a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePhase {
    /// Erase command issued, waiting for the page to read back erased
    Erasing,
    /// Program command issued, data being loaded or polled
    Writing,
    /// Page finished
    Done,
}

/// Callback for progress reporting during programming
pub trait PageProgress {
    /// Called once before the first page
    fn started(&mut self, total_pages: u32);

    /// Called on every phase change of a page
    ///
    /// Runs inside the interrupt-masked section, between bus cycles.
    fn page_status(&mut self, page: u32, phase: PagePhase);

    /// Called after the last page, only when programming succeeded, once
    /// interrupts are enabled again
    fn finished(&mut self, report: &ProgramReport);
}

/// A no-op progress reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl PageProgress for NoProgress {
    fn started(&mut self, _total_pages: u32) {}
    fn page_status(&mut self, _page: u32, _phase: PagePhase) {}
    fn finished(&mut self, _report: &ProgramReport) {}
}

// =============================================================================
// Programming
// =============================================================================

/// Outcome of a programming run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReport {
    /// Pages erased (where needed) and programmed
    pub pages_programmed: u32,
    /// Indices of pages whose erase did not complete in time
    ///
    /// These pages were programmed anyway; verify will show whether the
    /// data took.
    pub erase_timeouts: Vec<u32>,
}

impl ProgramReport {
    /// Whether every erase completed within its budget
    pub fn erase_clean(&self) -> bool {
        self.erase_timeouts.is_empty()
    }
}

/// Erase (where the part needs it) and program `image` into `space`
///
/// Image size and page geometry are checked before the bus is touched.
/// The whole batch runs with interrupts masked; they are unmasked again on
/// every return path. A page that fails to program aborts the run; an erase
/// timeout is logged, recorded in the report and programming carries on.
pub fn program<M, C, I, P>(
    master: &mut M,
    clock: &mut C,
    irq: &mut I,
    session: &FlashSession,
    space: &AddressSpace,
    image: &[u8],
    progress: &mut P,
) -> Result<ProgramReport>
where
    M: ParallelMaster + ?Sized,
    C: Clock + ?Sized,
    I: InterruptControl + ?Sized,
    P: PageProgress + ?Sized,
{
    space.check_image(image)?;
    space.check_geometry(session.profile())?;

    let page_size = session.page_size();
    let total_pages = (space.image_size() / page_size as u64) as u32;
    let erase = session.profile().requires_erase;

    log::info!(
        "Programming {} pages of {} bytes ({} write{})",
        total_pages,
        page_size,
        session.profile().write_mode(),
        if erase { ", erase first" } else { "" }
    );

    let mut report = ProgramReport::default();
    progress.started(total_pages);

    let cs = CriticalSection::enter(irq);

    for page in space.pages(page_size) {
        let page = page?;
        let start = page.logical as usize;
        let data = &image[start..start + page_size as usize];

        if erase {
            progress.page_status(page.index, PagePhase::Erasing);
            match engine::erase_page(master, clock, session, &page) {
                Ok(polls) => log::trace!("Page {} erased after {} polls", page.index, polls),
                Err(Error::EraseTimeout { page: index }) => {
                    log::warn!("Erase timeout on page {} at {}", index, page.address);
                    report.erase_timeouts.push(index);
                }
                Err(e) => return Err(e),
            }
        }

        progress.page_status(page.index, PagePhase::Writing);
        if let Err(e) = engine::program_page(master, clock, session, &page, data) {
            log::error!("Programming page {} failed: {}", page.index, e);
            return Err(e);
        }

        report.pages_programmed += 1;
        progress.page_status(page.index, PagePhase::Done);
    }

    drop(cs);
    progress.finished(&report);
    Ok(report)
}

// =============================================================================
// Verification
// =============================================================================

/// One byte that differs between flash and image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Offset into the image
    pub logical: u64,
    /// Physical address as window and offset
    pub address: crate::window::WindowAddress,
    /// Byte read from flash
    pub flash: u8,
    /// Byte in the image
    pub image: u8,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offset 0x{:05X} ({}): flash 0x{:02X}, image 0x{:02X}",
            self.logical, self.address, self.flash, self.image
        )
    }
}

/// Result of comparing flash against an image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DifferenceReport {
    /// Number of bytes compared
    pub bytes_compared: u64,
    /// Every byte that differed, in address order
    pub mismatches: Vec<Mismatch>,
}

impl DifferenceReport {
    /// Number of differing bytes
    pub fn count(&self) -> usize {
        self.mismatches.len()
    }

    /// True only when no byte differed
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compare the flash contents of `space` with `image`
///
/// Differences are collected, not returned as errors; an `Err` means the
/// bus itself failed or the image does not fit `space`.
pub fn verify<M: ParallelMaster + ?Sized>(
    master: &mut M,
    space: &AddressSpace,
    image: &[u8],
) -> Result<DifferenceReport> {
    space.check_image(image)?;

    let mut report = DifferenceReport::default();
    let mut buf = [0u8; READ_CHUNK_SIZE as usize];

    for span in space.spans(READ_CHUNK_SIZE) {
        let span = span?;
        let chunk = &mut buf[..span.len as usize];
        master.read_into(span.start, chunk)?;

        let expected = &image[span.logical as usize..][..span.len as usize];
        for (i, (&flash, &want)) in chunk.iter().zip(expected).enumerate() {
            if flash != want {
                let mismatch = Mismatch {
                    logical: span.logical + i as u64,
                    address: span.start.add(i as u32)?,
                    flash,
                    image: want,
                };
                log::debug!("Verify mismatch at {}", mismatch);
                report.mismatches.push(mismatch);
            }
        }
        report.bytes_compared += span.len as u64;
    }

    if report.is_clean() {
        log::info!("Verified {} bytes", report.bytes_compared);
    } else {
        log::warn!(
            "{} of {} bytes differ",
            report.count(),
            report.bytes_compared
        );
    }
    Ok(report)
}

// =============================================================================
// Read-back
// =============================================================================

/// Failure while copying flash contents into a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError<E> {
    /// Reading the bus failed
    Flash(Error),
    /// The sink rejected the data
    Sink(E),
}

impl<E> From<Error> for ReadError<E> {
    fn from(e: Error) -> Self {
        Self::Flash(e)
    }
}

impl<E: fmt::Debug> fmt::Display for ReadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flash(e) => write!(f, "{}", e),
            Self::Sink(e) => write!(f, "output error: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for ReadError<E> {}

/// Copy the flash contents of `space` into `sink`
///
/// Returns the number of bytes written.
pub fn read_image<M, W>(
    master: &mut M,
    space: &AddressSpace,
    sink: &mut W,
) -> core::result::Result<u64, ReadError<W::Error>>
where
    M: ParallelMaster + ?Sized,
    W: embedded_io::Write + ?Sized,
{
    let mut buf = [0u8; READ_CHUNK_SIZE as usize];
    let mut total = 0u64;

    for span in space.spans(READ_CHUNK_SIZE) {
        let span = span?;
        let chunk = &mut buf[..span.len as usize];
        master.read_into(span.start, chunk)?;
        sink.write_all(chunk).map_err(ReadError::Sink)?;
        total += span.len as u64;
    }
    sink.flush().map_err(ReadError::Sink)?;

    log::debug!("Read {} bytes from 0x{:05X}", total, space.origin());
    Ok(total)
}

/// Read the flash contents of `space` into `buf`
///
/// `buf` must be exactly as long as the image.
pub fn read_into<M: ParallelMaster + ?Sized>(
    master: &mut M,
    space: &AddressSpace,
    buf: &mut [u8],
) -> Result<()> {
    space.check_image(buf)?;
    for span in space.spans(READ_CHUNK_SIZE) {
        let span = span?;
        let start = span.logical as usize;
        master.read_into(span.start, &mut buf[start..start + span.len as usize])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ProfileRegistry;
    use crate::protocol::{CommandAddressPair, CommandPort};
    use crate::window::WindowAddress;
    use alloc::vec;
    use core::cell::Cell;

    /// Plain RAM over 0xC0000..0x100000
    struct Ram {
        mem: Vec<u8>,
        reads: usize,
    }

    impl Ram {
        fn new() -> Self {
            Self {
                mem: vec![0xFF; 0x40000],
                reads: 0,
            }
        }

        fn index(addr: WindowAddress) -> usize {
            (addr.physical() - 0xC0000) as usize
        }
    }

    impl ParallelMaster for Ram {
        fn read(&mut self, addr: WindowAddress) -> Result<u8> {
            self.reads += 1;
            Ok(self.mem[Self::index(addr)])
        }

        fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()> {
            self.mem[Self::index(addr)] = value;
            Ok(())
        }
    }

    struct Collect(Vec<u8>);

    impl embedded_io::ErrorType for Collect {
        type Error = core::convert::Infallible;
    }

    impl embedded_io::Write for Collect {
        fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, Self::Error> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> core::result::Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_verify_reports_each_difference() {
        let space = AddressSpace::from_segment(0xE800, 0x10000).unwrap();
        let image = vec![0xFFu8; 0x10000];
        let mut ram = Ram::new();
        // One byte either side of the window boundary
        ram.mem[0x2FFFF] = 0x00;
        ram.mem[0x30000] = 0x12;

        let report = verify(&mut ram, &space, &image).unwrap();
        assert_eq!(report.bytes_compared, 0x10000);
        assert_eq!(report.count(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.mismatches[0].logical, 0x7FFF);
        assert_eq!(report.mismatches[0].address.window().base(), 0xE0000);
        assert_eq!(report.mismatches[1].logical, 0x8000);
        assert_eq!(report.mismatches[1].address.window().base(), 0xF0000);
        assert_eq!(report.mismatches[1].address.offset(), 0);
        assert_eq!(report.mismatches[1].flash, 0x12);
        assert_eq!(report.mismatches[1].image, 0xFF);
    }

    #[test]
    fn test_verify_rejects_wrong_image_size() {
        let space = AddressSpace::from_segment(0xF800, 0x8000).unwrap();
        let mut ram = Ram::new();
        assert!(matches!(
            verify(&mut ram, &space, &[0u8; 16]),
            Err(Error::GeometryMismatch(_))
        ));
        assert_eq!(ram.reads, 0);
    }

    #[test]
    fn test_read_image_into_sink() {
        let space = AddressSpace::from_segment(0xEF00, 0x2000).unwrap();
        let mut ram = Ram::new();
        for (i, b) in ram.mem[0x2F000..0x31000].iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut sink = Collect(Vec::new());
        assert_eq!(read_image(&mut ram, &space, &mut sink), Ok(0x2000));
        assert_eq!(sink.0.len(), 0x2000);
        assert_eq!(sink.0[0x1000], 0x00);
        assert_eq!(sink.0[0x1FFF], 0xFF);

        let mut buf = vec![0u8; 0x2000];
        read_into(&mut ram, &space, &mut buf).unwrap();
        assert_eq!(buf, sink.0);
    }

    struct Mask<'a>(&'a Cell<bool>);

    impl InterruptControl for Mask<'_> {
        fn disable(&mut self) {
            self.0.set(true);
        }

        fn enable(&mut self) {
            self.0.set(false);
        }
    }

    struct MaskWatch<'a> {
        masked: &'a Cell<bool>,
        during: Vec<bool>,
        at_finish: Option<bool>,
    }

    impl PageProgress for MaskWatch<'_> {
        fn started(&mut self, _total_pages: u32) {}

        fn page_status(&mut self, _page: u32, _phase: PagePhase) {
            self.during.push(self.masked.get());
        }

        fn finished(&mut self, _report: &ProgramReport) {
            self.at_finish = Some(self.masked.get());
        }
    }

    struct NoWait;

    impl Clock for NoWait {
        fn wait_us(&mut self, _us: u32) {}
    }

    #[test]
    fn test_finished_runs_unmasked() {
        // AT29C010: page write, no erase
        let profile = ProfileRegistry::builtin().find(0x1F, 0xD5).unwrap().clone();
        let session = FlashSession::new(
            profile,
            CommandPort::new(0xF0000, CommandAddressPair::Standard),
        );
        let space = AddressSpace::from_segment(0xF800, 256).unwrap();
        let masked = Cell::new(false);
        let mut watch = MaskWatch {
            masked: &masked,
            during: Vec::new(),
            at_finish: None,
        };

        let report = program(
            &mut Ram::new(),
            &mut NoWait,
            &mut Mask(&masked),
            &session,
            &space,
            &[0x5A; 256],
            &mut watch,
        )
        .unwrap();

        assert_eq!(report.pages_programmed, 2);
        assert_eq!(watch.during.len(), 4);
        assert!(watch.during.iter().all(|&m| m));
        assert_eq!(watch.at_finish, Some(false));
    }

    #[test]
    fn test_report_erase_clean() {
        let mut report = ProgramReport::default();
        assert!(report.erase_clean());
        report.erase_timeouts.push(3);
        assert!(!report.erase_clean());
    }
}
