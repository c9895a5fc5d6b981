//! POST code output during programming

use parflash_core::flash::{PagePhase, PageProgress, ProgramReport};

use crate::port::{PortIo, POST_CODE_PORT};

/// Forwards progress to `inner` and shows the current page on port 0x80
///
/// With the console gone (e.g. the video BIOS being reflashed) a POST card
/// is the only way to see how far programming got.
pub struct PostCodeProgress<'a, P: PageProgress + ?Sized> {
    io: PortIo,
    inner: &'a mut P,
}

impl<'a, P: PageProgress + ?Sized> PostCodeProgress<'a, P> {
    /// Wrap `inner`
    pub fn new(io: PortIo, inner: &'a mut P) -> Self {
        Self { io, inner }
    }
}

impl<P: PageProgress + ?Sized> PageProgress for PostCodeProgress<'_, P> {
    fn started(&mut self, total_pages: u32) {
        self.inner.started(total_pages);
    }

    fn page_status(&mut self, page: u32, phase: PagePhase) {
        if phase != PagePhase::Done {
            self.io.outb(POST_CODE_PORT, page as u8);
        }
        self.inner.page_status(page, phase);
    }

    fn finished(&mut self, report: &ProgramReport) {
        self.inner.finished(report);
    }
}
