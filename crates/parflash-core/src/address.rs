//! Logical image offsets to physical window addresses
//!
//! A ROM image is a flat run of bytes starting at some physical origin. The
//! bus can only be addressed one [`PhysicalWindow`] at a time, so images that
//! cross a 64 KiB boundary (any image over 64 KiB, or a smaller one at an
//! unaligned origin) must be split. [`AddressSpace`] is the single place that
//! does this arithmetic.

use crate::chip::DeviceProfile;
use crate::error::{Error, Geometry, Result};
use crate::window::{PhysicalWindow, WindowAddress, WINDOW_SIZE};

/// A ROM image placed at a physical origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    origin: u64,
    image_size: u64,
}

impl AddressSpace {
    /// Place an image of `image_size` bytes at the physical address `origin`
    pub fn new(origin: u64, image_size: u64) -> Result<Self> {
        if image_size == 0 {
            return Err(Geometry::EmptyImage.into());
        }
        if origin.checked_add(image_size).is_none() {
            return Err(Geometry::BeyondAddressSpace { origin, image_size }.into());
        }
        Ok(Self { origin, image_size })
    }

    /// Place an image at a real-mode segment (`segment:0000`)
    pub fn from_segment(segment: u16, image_size: u64) -> Result<Self> {
        Self::new((segment as u64) << 4, image_size)
    }

    /// Physical origin address
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Image size in bytes
    pub fn image_size(&self) -> u64 {
        self.image_size
    }

    /// Physical address one past the last byte of the image
    pub fn end(&self) -> u64 {
        self.origin + self.image_size
    }

    /// The window containing the first byte of the image
    pub fn base_window(&self) -> PhysicalWindow {
        PhysicalWindow::containing(self.origin)
    }

    /// Translate a logical image offset into a window address
    pub fn translate(&self, logical: u64) -> Result<WindowAddress> {
        if logical >= self.image_size {
            return Err(Error::AddressOutOfBounds);
        }
        let phys = self.origin + logical;
        let window = self.advance_window(self.base_window(), phys - self.base_window().base())?;
        window.at((phys - window.base()) as u32)
    }

    /// The window containing the address `bytes` past the start of `window`
    pub fn advance_window(&self, window: PhysicalWindow, bytes: u64) -> Result<PhysicalWindow> {
        let target = window
            .base()
            .checked_add(bytes)
            .ok_or(Error::AddressOutOfBounds)?;
        Ok(PhysicalWindow::containing(target))
    }

    /// Check the image against a device's page geometry
    ///
    /// Must pass before any destructive operation is started.
    pub fn check_geometry(&self, profile: &DeviceProfile) -> Result<()> {
        let page_size = profile.page_size;
        if self.image_size % page_size as u64 != 0 {
            return Err(Geometry::ImageNotPageMultiple {
                image_size: self.image_size,
                page_size,
            }
            .into());
        }
        if self.origin % page_size as u64 != 0 {
            return Err(Geometry::OriginNotPageAligned {
                origin: self.origin,
                page_size,
            }
            .into());
        }
        Ok(())
    }

    /// Check that a buffer is exactly the size of this address space
    pub fn check_image(&self, image: &[u8]) -> Result<()> {
        if image.len() as u64 != self.image_size {
            return Err(Geometry::ImageSizeMismatch {
                expected: self.image_size,
                actual: image.len() as u64,
            }
            .into());
        }
        Ok(())
    }

    /// Iterate over the image in device pages
    ///
    /// The geometry must have been checked with [`Self::check_geometry`];
    /// a page then never straddles a window.
    pub fn pages(&self, page_size: u32) -> Pages<'_> {
        Pages {
            space: self,
            page_size,
            next: 0,
        }
    }

    /// Iterate over the image in runs that never cross a window boundary
    /// and are at most `max_len` bytes long
    pub fn spans(&self, max_len: u32) -> Spans<'_> {
        Spans {
            space: self,
            max_len: max_len.clamp(1, WINDOW_SIZE),
            next: 0,
        }
    }
}

/// One device page of the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Index of the page within the image
    pub index: u32,
    /// Logical offset of the first byte
    pub logical: u64,
    /// Window address of the first byte
    pub address: WindowAddress,
}

/// Iterator returned by [`AddressSpace::pages`]
#[derive(Debug)]
pub struct Pages<'a> {
    space: &'a AddressSpace,
    page_size: u32,
    next: u64,
}

impl Iterator for Pages<'_> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.space.image_size || self.page_size == 0 {
            return None;
        }
        let logical = self.next;
        self.next += self.page_size as u64;
        let index = (logical / self.page_size as u64) as u32;
        Some(self.space.translate(logical).map(|address| Page {
            index,
            logical,
            address,
        }))
    }
}

/// A contiguous run of the image inside one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Logical offset of the first byte
    pub logical: u64,
    /// Window address of the first byte
    pub start: WindowAddress,
    /// Length in bytes
    pub len: u32,
}

/// Iterator returned by [`AddressSpace::spans`]
#[derive(Debug)]
pub struct Spans<'a> {
    space: &'a AddressSpace,
    max_len: u32,
    next: u64,
}

impl Iterator for Spans<'_> {
    type Item = Result<Span>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.space.image_size {
            return None;
        }
        let logical = self.next;
        let start = match self.space.translate(logical) {
            Ok(start) => start,
            Err(e) => {
                self.next = self.space.image_size;
                return Some(Err(e));
            }
        };
        let left = self.space.image_size - logical;
        let len = (start.remaining().min(self.max_len) as u64).min(left) as u32;
        self.next += len as u64;
        Some(Ok(Span {
            logical,
            start,
            len,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ProfileRegistry;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    #[test]
    fn test_translate_unaligned_origin() {
        let space = AddressSpace::from_segment(0xF800, 32768).unwrap();
        let first = space.translate(0).unwrap();
        assert_eq!(first.window().base(), 0xF0000);
        assert_eq!(first.offset(), 0x8000);
        let last = space.translate(32767).unwrap();
        assert_eq!(last.physical(), 0xFFFFF);
        assert_eq!(space.translate(32768), Err(Error::AddressOutOfBounds));
    }

    #[test]
    fn test_translate_crosses_window() {
        let space = AddressSpace::from_segment(0xE000, 0x20000).unwrap();
        let before = space.translate(0xFFFF).unwrap();
        let after = space.translate(0x10000).unwrap();
        assert_eq!(before.window().base(), 0xE0000);
        assert_eq!(before.offset(), 0xFFFF);
        assert_eq!(after.window().base(), 0xF0000);
        assert_eq!(after.offset(), 0);
    }

    #[test]
    fn test_empty_image_rejected() {
        assert_eq!(
            AddressSpace::new(0xF0000, 0),
            Err(Error::GeometryMismatch(Geometry::EmptyImage))
        );
        assert!(matches!(
            AddressSpace::new(u64::MAX, 2),
            Err(Error::GeometryMismatch(Geometry::BeyondAddressSpace { .. }))
        ));
    }

    #[test]
    fn test_geometry_rejects_partial_page() {
        let registry = ProfileRegistry::builtin();
        let am29f010 = registry.find(0x01, 0x20).unwrap();
        let space = AddressSpace::from_segment(0xFA00, 24576).unwrap();
        assert_eq!(
            space.check_geometry(am29f010),
            Err(Error::GeometryMismatch(Geometry::ImageNotPageMultiple {
                image_size: 24576,
                page_size: 16384,
            }))
        );
    }

    #[test]
    fn test_geometry_rejects_unaligned_origin() {
        let registry = ProfileRegistry::builtin();
        let sst = registry.find(0xBF, 0xB5).unwrap();
        // 0xF880:0000 is 0xF8800, not on a 4 KiB boundary
        let space = AddressSpace::from_segment(0xF880, 8192).unwrap();
        assert!(matches!(
            space.check_geometry(sst),
            Err(Error::GeometryMismatch(Geometry::OriginNotPageAligned { .. }))
        ));
    }

    #[test]
    fn test_pages_and_spans() {
        let space = AddressSpace::from_segment(0xE800, 0x10000).unwrap();
        let pages: Vec<Page> = space.pages(16384).map(|p| p.unwrap()).collect();
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[1].address.physical(), 0xEC000);
        assert_eq!(pages[2].address.window().base(), 0xF0000);
        assert_eq!(pages[3].index, 3);

        let spans: Vec<Span> = space.spans(0x6000).map(|s| s.unwrap()).collect();
        let lens: Vec<u32> = spans.iter().map(|s| s.len).collect();
        assert_eq!(lens, [0x6000, 0x2000, 0x6000, 0x2000]);
        assert_eq!(spans[2].start.window().base(), 0xF0000);
    }

    proptest! {
        #[test]
        fn translate_stays_in_window(
            segment in 0xC000u16..=0xFFFF,
            size in 1u64..0x40000,
            pick in any::<u64>(),
        ) {
            let space = AddressSpace::from_segment(segment, size).unwrap();
            let logical = pick % size;
            let addr = space.translate(logical).unwrap();
            prop_assert_eq!(addr.window().base() % WINDOW_SIZE as u64, 0);
            prop_assert!(addr.offset() < WINDOW_SIZE);
            prop_assert_eq!(addr.physical(), space.origin() + logical);
        }

        #[test]
        fn boundary_advances_one_stride(
            segment in 0xC000u16..=0xFFFF,
            size in 2u64..0x40000,
            boundary in 1u64..4,
        ) {
            let space = AddressSpace::from_segment(segment, size).unwrap();
            let edge = space.base_window().base() + boundary * WINDOW_SIZE as u64;
            prop_assume!(edge > space.origin() && edge < space.end());
            let logical = edge - space.origin();
            let at = space.translate(logical).unwrap();
            let before = space.translate(logical - 1).unwrap();
            prop_assert_eq!(at.window().base(), before.window().base() + WINDOW_SIZE as u64);
            prop_assert_eq!(at.offset(), 0);
            prop_assert_eq!(before.offset(), WINDOW_SIZE - 1);
        }

        #[test]
        fn spans_cover_image_exactly(
            segment in 0xC000u16..=0xFFFF,
            size in 1u64..0x40000,
            max_len in 1u32..0x20000,
        ) {
            let space = AddressSpace::from_segment(segment, size).unwrap();
            let mut expected = 0u64;
            for span in space.spans(max_len) {
                let span = span.unwrap();
                prop_assert_eq!(span.logical, expected);
                prop_assert!(span.len > 0);
                prop_assert!(span.start.offset() as u64 + span.len as u64 <= WINDOW_SIZE as u64);
                expected += span.len as u64;
            }
            prop_assert_eq!(expected, size);
        }
    }
}
