//! Error types for parflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Details about an image/device geometry problem
///
/// All of these are detected before the flash is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Image size is not a whole number of device pages
    ImageNotPageMultiple {
        /// Image size in bytes
        image_size: u64,
        /// Device page size in bytes
        page_size: u32,
    },
    /// Origin address does not start on a page boundary
    OriginNotPageAligned {
        /// Physical origin address
        origin: u64,
        /// Device page size in bytes
        page_size: u32,
    },
    /// Image buffer length differs from the address space size
    ImageSizeMismatch {
        /// Size the address space was built for
        expected: u64,
        /// Length of the supplied buffer
        actual: u64,
    },
    /// Image is empty
    EmptyImage,
    /// Image extends past the end of the physical address space
    BeyondAddressSpace {
        /// Physical origin address
        origin: u64,
        /// Image size in bytes
        image_size: u64,
    },
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Timing errors
    /// Delay calibration measured no elapsed time
    CalibrationFailure,
    /// Polling budget exhausted before the flash reported completion
    Timeout,

    // Identification errors
    /// Software-ID mode never engaged (reads matched the resting contents)
    NoDeviceResponded,
    /// Device answered with an ID that is not in the profile registry
    UnsupportedDevice {
        /// Vendor ID read from the device
        vendor_id: u8,
        /// Device ID read from the device
        device_id: u8,
    },

    // Operation errors
    /// Page erase did not complete within its polling budget
    EraseTimeout {
        /// Index of the page within the image
        page: u32,
    },
    /// Page program did not read back correctly within its polling budget
    PageWriteFailure {
        /// Index of the page within the image
        page: u32,
        /// Physical address of the byte that failed to latch
        address: u64,
    },

    // Address/size errors
    /// Image does not fit the device or address space geometry
    GeometryMismatch(Geometry),
    /// Address is outside the window or the mapped region
    AddressOutOfBounds,
    /// Window base is not aligned to the window size
    InvalidWindow,

    // Registry errors
    /// Device profile violates the page size invariant
    InvalidProfile,
}

impl From<Geometry> for Error {
    fn from(geometry: Geometry) -> Self {
        Error::GeometryMismatch(geometry)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageNotPageMultiple {
                image_size,
                page_size,
            } => write!(
                f,
                "image size ({}) is not a multiple of the flash page size ({})",
                image_size, page_size
            ),
            Self::OriginNotPageAligned { origin, page_size } => write!(
                f,
                "origin 0x{:05X} does not start on a {} byte page boundary",
                origin, page_size
            ),
            Self::ImageSizeMismatch { expected, actual } => write!(
                f,
                "image buffer is {} bytes, expected {} bytes",
                actual, expected
            ),
            Self::EmptyImage => write!(f, "image is empty"),
            Self::BeyondAddressSpace { origin, image_size } => write!(
                f,
                "{} byte image at 0x{:05X} extends beyond the address space",
                image_size, origin
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CalibrationFailure => {
                write!(f, "delay calibration failed: clock resolution too coarse")
            }
            Self::Timeout => write!(f, "operation timed out"),
            Self::NoDeviceResponded => write!(f, "no flash device responded to identification"),
            Self::UnsupportedDevice {
                vendor_id,
                device_id,
            } => write!(
                f,
                "unsupported flash ROM type: vendor ID 0x{:02X}, device ID 0x{:02X}",
                vendor_id, device_id
            ),
            Self::EraseTimeout { page } => write!(f, "erase of page {} timed out", page),
            Self::PageWriteFailure { page, address } => write!(
                f,
                "programming page {} failed at address 0x{:05X}",
                page, address
            ),
            Self::GeometryMismatch(geometry) => write!(f, "geometry mismatch: {}", geometry),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidWindow => write!(f, "window base is not window aligned"),
            Self::InvalidProfile => {
                write!(f, "device profile page size must be a power of two dividing the window")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
