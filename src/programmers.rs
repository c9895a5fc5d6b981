//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use parflash_core::clock::Clock;
use parflash_core::programmer::{InterruptControl, ParallelMaster};

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "physmem")]
    programmers.push(ProgrammerInfo {
        name: "physmem",
        aliases: &["internal"],
        description: "Flash in the legacy ROM area via /dev/mem (irq=off|cli|cli-nmi,timer=calibrated|pit,post=on|off) - requires root",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated flash part for testing (chip=<part>,base=<hex>,image=<file>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:10} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Everything a flash operation needs from the host
pub struct Programmer<'a> {
    /// Memory-mapped access to the flash
    pub bus: &'a mut dyn ParallelMaster,
    /// Delay source
    pub clock: &'a mut dyn Clock,
    /// Interrupt masking around command sequences
    pub irq: &'a mut dyn InterruptControl,
    /// Port for POST codes, when they were asked for
    #[cfg(feature = "physmem")]
    pub post: Option<parflash_physmem::PortIo>,
}

/// Execute a function with the specified programmer
///
/// The programmer string can be just the name (e.g., "physmem") or include
/// parameters (e.g., "dummy:chip=at29c010").
pub fn with_programmer<F>(programmer: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(Programmer<'_>) -> Result<(), Box<dyn std::error::Error>>,
{
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "physmem")]
        "physmem" => open_physmem(&options, f),

        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options, f),

        _ => {
            // Ignore options for unknown programmers
            let _ = options;
            Err(unknown_programmer_error(name))
        }
    }
}

#[cfg(feature = "physmem")]
fn open_physmem<F>(options: &[(&str, &str)], f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(Programmer<'_>) -> Result<(), Box<dyn std::error::Error>>,
{
    use parflash_core::clock::{CalibratedClock, TickClock};
    use parflash_core::programmer::NoInterruptControl;
    use parflash_physmem::{
        CpuInterrupts, IrqMode, PhysMemBus, PhysMemOptions, PitTimer, PortIo, TimerSource,
    };

    let opts = PhysMemOptions::from_options(options)?;
    log::debug!("physmem options: {:?}", opts);

    let io = if opts.needs_port_io() {
        Some(PortIo::acquire()?)
    } else {
        None
    };

    let mut bus = PhysMemBus::open().map_err(|e| {
        format!(
            "Failed to map the ROM area: {}\nMake sure you are root and the kernel allows /dev/mem access below 1 MiB.",
            e
        )
    })?;
    let mapped = bus.range();
    log::debug!("Mapped 0x{:05X}-0x{:05X}", mapped.start, mapped.end - 1);

    let mut clock: Box<dyn Clock> = match (opts.timer, io) {
        (TimerSource::Pit, Some(io)) => Box::new(TickClock::new(PitTimer::new(io))),
        _ => Box::new(CalibratedClock::calibrate()?),
    };

    let mut irq: Box<dyn InterruptControl> = match (opts.irq, io) {
        (IrqMode::Cli(nmi), Some(io)) => Box::new(CpuInterrupts::new(io, nmi)),
        _ => Box::new(NoInterruptControl),
    };

    f(Programmer {
        bus: &mut bus,
        clock: clock.as_mut(),
        irq: irq.as_mut(),
        post: if opts.post_codes { io } else { None },
    })
}

#[cfg(feature = "dummy")]
fn open_dummy<F>(options: &[(&str, &str)], f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(Programmer<'_>) -> Result<(), Box<dyn std::error::Error>>,
{
    use parflash_dummy::{CountingInterrupts, DummyConfig, DummyFlash, ManualClock, PRESETS};

    let mut config = DummyConfig::default();
    let mut image = None;

    for (key, value) in options {
        match *key {
            "chip" => {
                config = DummyConfig::preset(value).ok_or_else(|| {
                    format!("Unknown dummy chip '{}' (use: {})", value, PRESETS.join(", "))
                })?;
            }
            "base" => {
                let hex = value.trim_start_matches("0x").trim_start_matches("0X");
                let base = u64::from_str_radix(hex, 16)
                    .map_err(|e| format!("Invalid dummy base '{}': {}", value, e))?;
                config = config.at_base(base);
            }
            "image" => image = Some(std::fs::read(value)?),
            _ => log::warn!("Unknown dummy programmer option: {}={}", key, value),
        }
    }

    log::info!(
        "Simulating {} at 0x{:05X} ({} bytes)",
        config.name,
        config.base,
        config.size
    );

    let mut flash = match image {
        Some(data) => DummyFlash::with_data(config, &data),
        None => DummyFlash::new(config),
    };
    let mut clock = ManualClock::new();
    let mut irq = CountingInterrupts::new();

    f(Programmer {
        bus: &mut flash,
        clock: &mut clock,
        irq: &mut irq,
        #[cfg(feature = "physmem")]
        post: None,
    })?;

    log::debug!(
        "Simulated bus: {} reads, {} writes, {} us of delays",
        flash.read_count(),
        flash.write_count(),
        clock.elapsed_us()
    );
    Ok(())
}

/// Parse a programmer string like "name:key=value,key2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'parflash list-programmers' for more details");
    msg.into()
}
