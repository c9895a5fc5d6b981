//! Checksum command: 16-bit additive checksum of an image or the ROM

use core::convert::Infallible;
use parflash_core::flash;
use std::path::Path;

use super::{load_image, resolve_space};
use crate::programmers::Programmer;

/// Wrapping 16-bit sum of all bytes
///
/// A valid option ROM sums to zero in its low byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum16 {
    sum: u16,
    len: u64,
}

impl Checksum16 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.sum = self.sum.wrapping_add(b as u16);
        }
        self.len += data.len() as u64;
    }

    pub fn value(&self) -> u16 {
        self.sum
    }

    pub fn byte_count(&self) -> u64 {
        self.len
    }
}

impl embedded_io::ErrorType for Checksum16 {
    type Error = Infallible;
}

impl embedded_io::Write for Checksum16 {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn print_checksum(what: &str, sum: &Checksum16) {
    println!(
        "Checksum of {} ({} bytes): 0x{:04X}",
        what,
        sum.byte_count(),
        sum.value()
    );
    if sum.value() & 0xFF != 0 {
        log::debug!(
            "Low byte is 0x{:02X}; an option ROM image would sum to 00",
            sum.value() & 0xFF
        );
    }
}

/// Run the checksum command on a file
pub fn run_checksum_file(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_image(input)?;
    let mut sum = Checksum16::new();
    sum.update(&image);
    print_checksum(&input.display().to_string(), &sum);
    Ok(())
}

/// Run the checksum command
///
/// With `input` the file is summed and the programmer is never opened.
pub fn run_checksum(
    prog: &mut Programmer<'_>,
    segment: Option<u16>,
    size: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let space = resolve_space(segment, size)?;
    let mut sum = Checksum16::new();
    flash::read_image(&mut *prog.bus, &space, &mut sum)?;
    print_checksum(&format!("ROM at {:05X}", space.origin()), &sum);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Write;

    fn checksum16(data: &[u8]) -> u16 {
        let mut sum = Checksum16::new();
        sum.update(data);
        sum.value()
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum16(&[]), 0);
        assert_eq!(checksum16(&[0x01, 0x02, 0xFF]), 0x0102);
        assert_eq!(checksum16(&vec![0xFF; 32768]), 0x8000);
        assert_eq!(checksum16(&vec![0xFF; 65536]), 0x0000);
    }

    #[test]
    fn test_sink_matches_slice() {
        let data: Vec<u8> = (0..10000u32).map(|i| (i * 7) as u8).collect();
        let mut sink = Checksum16::new();
        for chunk in data.chunks(333) {
            sink.write_all(chunk).unwrap();
        }
        assert_eq!(sink.value(), checksum16(&data));
        assert_eq!(sink.byte_count(), 10000);
    }
}
