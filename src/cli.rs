//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lowest segment a ROM may be placed at
pub const MIN_SEGMENT: u16 = 0xC000;

/// Parse a real-mode segment in C000-FFFF, written in hex
pub fn parse_segment(s: &str) -> Result<u16, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let segment =
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex segment: {}", e))?;
    if segment < MIN_SEGMENT {
        return Err(format!(
            "Segment {:04X} is outside the ROM area (C000-FFFF)",
            segment
        ));
    }
    Ok(segment)
}

/// Parse a size as decimal, hex (0x...) or with a K suffix (KiB)
pub fn parse_size(s: &str) -> Result<u64, String> {
    let size = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))?
    } else if let Some(kib) = s.strip_suffix('K').or_else(|| s.strip_suffix('k')) {
        kib.parse::<u64>()
            .map_err(|e| format!("Invalid number: {}", e))?
            .checked_mul(1024)
            .ok_or_else(|| "Size too large".to_string())?
    } else {
        s.parse::<u64>().map_err(|e| format!("Invalid number: {}", e))?
    };
    if size == 0 {
        return Err("Size must not be zero".into());
    }
    Ok(size)
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "parflash")]
#[command(author, version, about = "JEDEC parallel flash ROM programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra device profiles (a .ron file or a directory of them)
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    /// Programmer to use, with options (e.g. dummy:chip=at29c010)
    #[arg(short, long, global = true, default_value = "physmem", help = programmer_help())]
    pub programmer: String,

    /// ROM segment in hex (C000-FFFF); defaults by image size
    #[arg(short = 'a', long, global = true, value_parser = parse_segment)]
    pub address: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the flash part
    Identify,

    /// Save the ROM contents to a file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of bytes to read
        #[arg(short, long, value_parser = parse_size, default_value = "32768")]
        size: u64,
    },

    /// Erase and program the flash from an image file
    Program {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Skip the verification pass after programming
        #[arg(long)]
        no_verify: bool,
    },

    /// Compare the flash contents with an image file
    Verify {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// 16-bit additive checksum of an image file, or of the ROM
    Checksum {
        /// Image file (the ROM is read when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of ROM bytes to sum
        #[arg(short, long, value_parser = parse_size, default_value = "32768")]
        size: u64,
    },

    /// List supported programmers
    ListProgrammers,

    /// List known flash parts
    ListChips {
        /// Filter by vendor name
        #[arg(long)]
        vendor: Option<String>,

        /// Filter by part name
        #[arg(long)]
        name: Option<String>,
    },
}
