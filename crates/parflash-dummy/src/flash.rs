//! Simulated JEDEC parallel flash

use alloc::vec;
use alloc::vec::Vec;

use parflash_core::error::Result;
use parflash_core::programmer::ParallelMaster;
use parflash_core::protocol::{
    ALT_SOFTWARE_ID, ERASED_VALUE, ERASE_SETUP, PROGRAM, SECTOR_ERASE, SOFTWARE_ID,
    SOFTWARE_ID_EXIT, UNLOCK_1, UNLOCK_2,
};
use parflash_core::window::WindowAddress;

use crate::config::{DummyConfig, IdEntry, Latch};

/// Bit 7 reads inverted while a cycle is in progress
const DATA_POLL_BIT: u8 = 0x80;

/// Value read where nothing is decoded
const OPEN_BUS: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandState {
    Idle,
    Unlock1,
    Unlock2,
    ProgramByte,
    PageLoad,
}

/// A cycle that has been started but is not yet visible
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    Erase { start: usize },
    Program { bytes: Vec<(usize, u8)> },
    PageWrite { start: usize, bytes: Vec<(usize, u8)> },
}

#[derive(Debug, Clone)]
struct Pending {
    effect: Effect,
    /// Busy reads left; `None` never completes
    remaining: Option<u32>,
}

/// Dummy parallel flash
///
/// Emulates one part decoded at [`DummyConfig::base`]. Reads outside the
/// part return open bus (`0xFF`) and writes there are ignored.
#[derive(Debug)]
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    state: CommandState,
    erase_armed: bool,
    id_mode: bool,
    page_buffer: Vec<(usize, u8)>,
    pending: Option<Pending>,
    silent: bool,
    reads: u64,
    writes: Vec<(u64, u8)>,
}

impl DummyFlash {
    /// Create a new dummy flash with the given configuration, fully erased
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![ERASED_VALUE; config.size];
        Self {
            config,
            data,
            state: CommandState::Idle,
            erase_armed: false,
            id_mode: false,
            page_buffer: Vec::new(),
            pending: None,
            silent: false,
            reads: 0,
            writes: Vec::new(),
        }
    }

    /// Create a new dummy flash with default configuration (SST39SF010)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Memory that decodes like the part but ignores every command
    pub fn unresponsive(config: DummyConfig) -> Self {
        let mut flash = Self::new(config);
        flash.silent = true;
        flash
    }

    /// Get a reference to the array contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the array contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Array contents at physical addresses `start..start + len`
    pub fn contents_at(&self, start: u64, len: usize) -> Option<&[u8]> {
        let offset = start.checked_sub(self.config.base)? as usize;
        self.data.get(offset..offset.checked_add(len)?)
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Whether the part is currently in software-ID mode
    pub fn in_id_mode(&self) -> bool {
        self.id_mode
    }

    /// Whether an erase or program cycle is still running
    pub fn busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of bus reads so far
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// Number of bus writes so far
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Every bus write so far as (physical address, value)
    pub fn write_log(&self) -> &[(u64, u8)] {
        &self.writes
    }

    /// Total bus accesses so far
    pub fn access_count(&self) -> u64 {
        self.reads + self.writes.len() as u64
    }

    fn offset_of(&self, physical: u64) -> Option<usize> {
        if physical >= self.config.base && physical < self.config.end() {
            Some((physical - self.config.base) as usize)
        } else {
            None
        }
    }

    fn page_start(&self, offset: usize) -> usize {
        offset & !(self.config.page_size - 1)
    }

    fn is_first(&self, offset: usize) -> bool {
        offset as u32 & self.config.command_mask == self.config.pair.first()
    }

    fn is_second(&self, offset: usize) -> bool {
        offset as u32 & self.config.command_mask == self.config.pair.second()
    }

    /// Value a location will hold once `effect` has been applied
    fn final_value(&self, effect: &Effect, offset: usize) -> u8 {
        match effect {
            Effect::Erase { start } => {
                if (*start..start + self.config.page_size).contains(&offset) {
                    ERASED_VALUE
                } else {
                    self.data[offset]
                }
            }
            Effect::Program { bytes } => bytes
                .iter()
                .rev()
                .find(|(o, _)| *o == offset)
                .map(|(_, v)| self.programmed(offset, *v))
                .unwrap_or(self.data[offset]),
            Effect::PageWrite { start, bytes } => {
                if !(*start..start + self.config.page_size).contains(&offset) {
                    return self.data[offset];
                }
                bytes
                    .iter()
                    .rev()
                    .find(|(o, _)| *o == offset)
                    .map(|(_, v)| self.programmed(offset, *v))
                    .unwrap_or(if self.config.requires_erase {
                        self.data[offset]
                    } else {
                        ERASED_VALUE
                    })
            }
        }
    }

    /// Flash can only clear bits; self-erasing parts take the value as is
    fn programmed(&self, offset: usize, value: u8) -> u8 {
        if self.config.requires_erase {
            self.data[offset] & value
        } else {
            value
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Erase { start } => {
                let end = start + self.config.page_size;
                self.data[start..end].fill(ERASED_VALUE);
            }
            Effect::Program { ref bytes } => {
                for &(offset, value) in bytes {
                    self.data[offset] = self.programmed(offset, value);
                }
            }
            Effect::PageWrite { start, ref bytes } => {
                if !self.config.requires_erase {
                    let end = start + self.config.page_size;
                    self.data[start..end].fill(ERASED_VALUE);
                }
                for &(offset, value) in bytes {
                    self.data[offset] = self.programmed(offset, value);
                }
            }
        }
    }

    fn start_cycle(&mut self, effect: Effect, latch: Latch) {
        match latch {
            Latch::Immediate => self.apply(effect),
            Latch::AfterPolls(polls) => {
                self.pending = Some(Pending {
                    effect,
                    remaining: Some(polls),
                })
            }
            Latch::Never => {
                self.pending = Some(Pending {
                    effect,
                    remaining: None,
                })
            }
        }
    }

    fn commit_page_load(&mut self) {
        let bytes = core::mem::take(&mut self.page_buffer);
        self.state = CommandState::Idle;
        let Some(&(first, _)) = bytes.first() else {
            return;
        };
        let start = self.page_start(first);
        // Bytes outside the first loaded page are dropped, as on the part
        let bytes = bytes
            .into_iter()
            .filter(|(o, _)| self.page_start(*o) == start)
            .collect();
        self.start_cycle(Effect::PageWrite { start, bytes }, self.config.program_latch);
    }

    fn read_offset(&mut self, offset: usize) -> u8 {
        if self.state == CommandState::PageLoad {
            self.commit_page_load();
        }

        let busy = match self.pending.as_mut() {
            Some(Pending {
                remaining: Some(0), ..
            }) => false,
            Some(Pending {
                remaining: Some(left),
                ..
            }) => {
                *left -= 1;
                true
            }
            Some(Pending {
                remaining: None, ..
            }) => true,
            None => false,
        };

        if busy {
            if let Some(p) = &self.pending {
                return self.final_value(&p.effect, offset) ^ DATA_POLL_BIT;
            }
        } else if let Some(done) = self.pending.take() {
            self.apply(done.effect);
        }

        if self.id_mode {
            match offset & 0xFF {
                0 => return self.config.vendor_id,
                1 => return self.config.device_id,
                _ => {}
            }
        }

        self.data[offset]
    }

    fn write_offset(&mut self, offset: usize, value: u8) {
        if self.silent {
            return;
        }
        if self.pending.take().is_some() {
            log::trace!("Dummy flash: cycle abandoned by write at 0x{:05X}", offset);
        }

        match self.state {
            CommandState::PageLoad => {
                self.page_buffer.push((offset, value));
                return;
            }
            CommandState::ProgramByte => {
                self.state = CommandState::Idle;
                self.start_cycle(
                    Effect::Program {
                        bytes: vec![(offset, value)],
                    },
                    self.config.program_latch,
                );
                return;
            }
            CommandState::Idle => {
                if value == UNLOCK_1 && self.is_first(offset) {
                    self.state = CommandState::Unlock1;
                } else if value == SOFTWARE_ID_EXIT {
                    self.id_mode = false;
                    self.erase_armed = false;
                }
            }
            CommandState::Unlock1 => {
                self.state = if value == UNLOCK_2 && self.is_second(offset) {
                    CommandState::Unlock2
                } else {
                    CommandState::Idle
                };
            }
            CommandState::Unlock2 => {
                self.state = CommandState::Idle;
                self.command(offset, value);
            }
        }
    }

    fn command(&mut self, offset: usize, value: u8) {
        let armed = core::mem::take(&mut self.erase_armed);

        if value == SECTOR_ERASE && armed {
            let start = self.page_start(offset);
            log::trace!("Dummy flash: erase page at 0x{:05X}", start);
            self.start_cycle(Effect::Erase { start }, self.config.erase_latch);
            return;
        }
        if !self.is_first(offset) {
            return;
        }

        match value {
            SOFTWARE_ID if self.config.id_entry == IdEntry::Command90 => self.id_mode = true,
            ERASE_SETUP => self.erase_armed = true,
            ALT_SOFTWARE_ID if armed && self.config.id_entry == IdEntry::EraseSetup60 => {
                self.id_mode = true
            }
            SOFTWARE_ID_EXIT => self.id_mode = false,
            PROGRAM => {
                self.state = if self.config.page_write {
                    CommandState::PageLoad
                } else {
                    CommandState::ProgramByte
                };
            }
            _ => {}
        }
    }
}

impl ParallelMaster for DummyFlash {
    fn read(&mut self, addr: WindowAddress) -> Result<u8> {
        self.reads += 1;
        Ok(match self.offset_of(addr.physical()) {
            Some(offset) => self.read_offset(offset),
            None => OPEN_BUS,
        })
    }

    fn write(&mut self, addr: WindowAddress, value: u8) -> Result<()> {
        self.writes.push((addr.physical(), value));
        if let Some(offset) = self.offset_of(addr.physical()) {
            self.write_offset(offset, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parflash_core::protocol::{self, CommandAddressPair, CommandPort};
    use parflash_core::window::PhysicalWindow;

    fn port(base: u64) -> CommandPort {
        CommandPort::new(base, CommandAddressPair::Standard)
    }

    #[test]
    fn test_software_id() {
        let mut flash = DummyFlash::new_default();
        assert_eq!(protocol::read_id(&mut flash, 0xF0000).unwrap(), (0xFF, 0xFF));

        protocol::enter_software_id(&mut flash, &port(0xF0000)).unwrap();
        assert!(flash.in_id_mode());
        assert_eq!(protocol::read_id(&mut flash, 0xF0000).unwrap(), (0xBF, 0xB5));

        protocol::exit_software_id(&mut flash, &port(0xF0000)).unwrap();
        assert!(!flash.in_id_mode());
        assert_eq!(protocol::read_id(&mut flash, 0xF0000).unwrap(), (0xFF, 0xFF));
    }

    #[test]
    fn test_byte_program_clears_bits_only() {
        let mut flash = DummyFlash::new_default();
        let p = port(0xF0000);
        let addr = PhysicalWindow::new(0xF0000).unwrap().at(0x100).unwrap();

        protocol::start_program(&mut flash, &p).unwrap();
        flash.write(addr, 0xF0).unwrap();
        assert_eq!(flash.read(addr).unwrap(), 0xF0);

        protocol::start_program(&mut flash, &p).unwrap();
        flash.write(addr, 0x0F).unwrap();
        assert_eq!(flash.read(addr).unwrap(), 0x00);

        protocol::start_page_erase(&mut flash, &p, addr).unwrap();
        assert_eq!(flash.read(addr).unwrap(), 0xFF);
    }

    #[test]
    fn test_page_load_commits_on_read() {
        let mut flash = DummyFlash::new(DummyConfig::at29c010());
        let window = PhysicalWindow::new(0xF0000).unwrap();
        flash.data_mut()[0x10000..0x10080].fill(0x00);

        protocol::start_program(&mut flash, &port(0xF0000)).unwrap();
        for i in 0..4u32 {
            flash.write(window.at(i).unwrap(), 0xA0 + i as u8).unwrap();
        }
        assert_eq!(flash.data()[0x10000], 0x00);

        assert_eq!(flash.read(window.at(3).unwrap()).unwrap(), 0xA3);
        // Bytes not loaded are left erased
        assert_eq!(flash.read(window.at(4).unwrap()).unwrap(), 0xFF);
    }

    #[test]
    fn test_data_polling_until_latch() {
        let config = DummyConfig::sst39sf010().with_erase_latch(Latch::AfterPolls(3));
        let mut flash = DummyFlash::new(config);
        let addr = PhysicalWindow::new(0xF0000).unwrap().at(0x2000).unwrap();
        flash.data_mut()[0x12000] = 0x00;

        protocol::start_page_erase(&mut flash, &port(0xF0000), addr).unwrap();
        assert!(flash.busy());
        assert_eq!(flash.read(addr).unwrap(), 0x7F);
        assert_eq!(flash.read(addr).unwrap(), 0x7F);
        assert_eq!(flash.read(addr).unwrap(), 0x7F);
        assert_eq!(flash.read(addr).unwrap(), 0xFF);
        assert!(!flash.busy());
    }

    #[test]
    fn test_outside_part_is_open_bus() {
        let mut flash = DummyFlash::new_default();
        let addr = PhysicalWindow::new(0xC0000).unwrap().at(0).unwrap();
        flash.write(addr, 0x00).unwrap();
        assert_eq!(flash.read(addr).unwrap(), 0xFF);
        assert_eq!(flash.access_count(), 2);
    }

    #[test]
    fn test_unresponsive_ignores_commands() {
        let mut flash = DummyFlash::unresponsive(DummyConfig::default());
        protocol::enter_software_id(&mut flash, &port(0xF0000)).unwrap();
        assert!(!flash.in_id_mode());
        assert_eq!(flash.write_count(), 3);
    }
}
