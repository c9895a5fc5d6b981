//! parflash - A JEDEC parallel flash ROM programmer
//!
//! Identifies and reprograms 5V parallel flash parts (AT29C010, SST39SF010,
//! W29EE011, Am29F010, ...) that sit directly in the processor's address
//! space, such as a PC's BIOS ROM or an option ROM on an expansion card.
//!
//! # Architecture
//!
//! All protocol logic lives in `parflash-core`. A programmer supplies three
//! things to it:
//! - a `ParallelMaster` for loads and stores to the flash
//! - a `Clock` for the command and polling delays
//! - an `InterruptControl` to mask interrupts around command sequences
//!
//! `physmem` provides these for the real ROM area through /dev/mem and x86
//! port I/O; `dummy` provides a simulated part for trying things out.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use parflash_core::chip::ProfileRegistry;
use programmers::with_programmer;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let registry = match load_registry(cli.chip_db.as_deref()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("{} device profiles known", registry.len());

    let segment = cli.address;

    match cli.command {
        Commands::Identify => with_programmer(&cli.programmer, |mut prog| {
            commands::run_identify(&mut prog, &registry, segment)
        }),
        Commands::Read { output, size } => with_programmer(&cli.programmer, |mut prog| {
            commands::run_read(&mut prog, segment, &output, size)
        }),
        Commands::Program { input, no_verify } => {
            with_programmer(&cli.programmer, |mut prog| {
                commands::run_program(&mut prog, &registry, segment, &input, !no_verify)
            })
        }
        Commands::Verify { input } => with_programmer(&cli.programmer, |mut prog| {
            commands::run_verify(&mut prog, segment, &input)
        }),
        Commands::Checksum {
            input: Some(input), ..
        } => commands::run_checksum_file(&input),
        Commands::Checksum { input: None, size } => {
            with_programmer(&cli.programmer, |mut prog| {
                commands::run_checksum(&mut prog, segment, size)
            })
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListChips { vendor, name } => {
            commands::list_chips(&registry, vendor.as_deref(), name.as_deref());
            Ok(())
        }
    }
}

/// Built-in profiles plus any from `path` (a .ron file or a directory)
fn load_registry(path: Option<&Path>) -> Result<ProfileRegistry, Box<dyn std::error::Error>> {
    let mut registry = ProfileRegistry::builtin();

    if let Some(path) = path {
        let count = if path.is_dir() {
            registry.load_dir(path)?
        } else if path.is_file() {
            registry.load_file(path)?
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        };
        log::debug!("Loaded {} profiles from {}", count, path.display());
    }

    Ok(registry)
}
