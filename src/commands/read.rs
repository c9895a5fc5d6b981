//! Read command: save the ROM contents to a file

use indicatif::ProgressBar;
use parflash_core::flash;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::progress::create_byte_bar;
use super::resolve_space;
use crate::programmers::Programmer;

/// Failure writing the output file
#[derive(Debug)]
pub struct SinkError(pub io::Error);

impl embedded_io::Error for SinkError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

/// Buffered file output that advances a progress bar
pub struct FileSink {
    out: BufWriter<File>,
    bar: ProgressBar,
}

impl FileSink {
    pub fn create(path: &Path, bar: ProgressBar) -> io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            bar,
        })
    }
}

impl embedded_io::ErrorType for FileSink {
    type Error = SinkError;
}

impl embedded_io::Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let n = self.out.write(buf).map_err(SinkError)?;
        self.bar.inc(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.out.flush().map_err(SinkError)
    }
}

/// Run the read command
pub fn run_read(
    prog: &mut Programmer<'_>,
    segment: Option<u16>,
    output: &Path,
    size: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let space = resolve_space(segment, size)?;
    println!(
        "Saving ROM content at {:05X} to {}, size {} bytes",
        space.origin(),
        output.display(),
        size
    );

    let pb = create_byte_bar(size, "Reading")?;
    let mut sink = FileSink::create(output, pb.clone())
        .map_err(|e| format!("Failed to create {}: {}", output.display(), e))?;

    match flash::read_image(&mut *prog.bus, &space, &mut sink) {
        Ok(total) => {
            pb.finish_with_message("Read complete");
            log::info!("Wrote {} bytes to {}", total, output.display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Read failed!");
            Err(e.into())
        }
    }
}
