//! Programmer parameters

use crate::error::{PhysMemError, Result};
use crate::interrupts::NmiMask;

/// Interrupt handling while commands are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrqMode {
    /// Do not touch the interrupt flag
    #[default]
    Off,
    /// `cli`/`sti` around command sequences
    ///
    /// A whole programming run is one masked section, so the progress bar
    /// is redrawn with interrupts off. It only moves once per page.
    Cli(NmiMask),
}

/// Delay source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerSource {
    /// Spin loop calibrated against the wall clock
    #[default]
    Calibrated,
    /// 8254 PIT channel 2
    Pit,
}

/// Options for the physmem programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhysMemOptions {
    /// Interrupt handling
    pub irq: IrqMode,
    /// Delay source
    pub timer: TimerSource,
    /// Write the page index to the POST code port while programming
    pub post_codes: bool,
}

impl PhysMemOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any option needs I/O port access
    pub fn needs_port_io(&self) -> bool {
        self.irq != IrqMode::Off || self.timer == TimerSource::Pit || self.post_codes
    }

    /// Parse options from key-value pairs (from CLI)
    ///
    /// Supported options:
    /// - irq=off|cli|cli-nmi
    /// - timer=calibrated|pit
    /// - post=on|off
    pub fn from_options(options: &[(&str, &str)]) -> Result<Self> {
        let mut opts = Self::default();

        for (key, value) in options {
            match *key {
                "irq" => {
                    opts.irq = match *value {
                        "off" => IrqMode::Off,
                        "cli" => IrqMode::Cli(NmiMask::None),
                        "cli-nmi" => IrqMode::Cli(NmiMask::Xt),
                        _ => {
                            return Err(PhysMemError::InvalidParameter(format!(
                                "irq={} (use: off, cli, or cli-nmi)",
                                value
                            )))
                        }
                    };
                }
                "timer" => {
                    opts.timer = match *value {
                        "calibrated" | "spin" => TimerSource::Calibrated,
                        "pit" => TimerSource::Pit,
                        _ => {
                            return Err(PhysMemError::InvalidParameter(format!(
                                "timer={} (use: calibrated or pit)",
                                value
                            )))
                        }
                    };
                }
                "post" => {
                    opts.post_codes = match *value {
                        "on" | "yes" | "1" => true,
                        "off" | "no" | "0" => false,
                        _ => {
                            return Err(PhysMemError::InvalidParameter(format!(
                                "post={} (use: on or off)",
                                value
                            )))
                        }
                    };
                }
                _ => {
                    log::warn!("Unknown physmem programmer option: {}={}", key, value);
                }
            }
        }

        Ok(opts)
    }
}
