//! Configuration for the simulated part

use parflash_core::chip::vendor;
use parflash_core::protocol::CommandAddressPair;

/// How the part reacts to software-ID entry commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdEntry {
    /// Enters ID mode on `0x90`
    #[default]
    Command90,
    /// Only enters ID mode on the `0x80`, `0x60` pair
    EraseSetup60,
}

/// When an erase or program cycle becomes visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Latch {
    /// Completes before the next read
    #[default]
    Immediate,
    /// Reads show the complement of bit 7 for this many reads, then complete
    AfterPolls(u32),
    /// Never completes; the next command abandons the cycle
    Never,
}

/// Configuration for the dummy flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Part name, used to pick a preset
    pub name: &'static str,
    /// Vendor ID returned in software-ID mode
    pub vendor_id: u8,
    /// Device ID returned in software-ID mode
    pub device_id: u8,
    /// Physical address the part is decoded at
    pub base: u64,
    /// Part size in bytes, a power of two
    pub size: usize,
    /// Erase/program page size
    pub page_size: usize,
    /// Byte programs can only clear bits
    pub requires_erase: bool,
    /// Program command is followed by a page load instead of one byte
    pub page_write: bool,
    /// Command addresses the part decodes
    pub pair: CommandAddressPair,
    /// Address lines compared when decoding command cycles
    pub command_mask: u32,
    /// Accepted software-ID entry sequence
    pub id_entry: IdEntry,
    /// Erase completion behaviour
    pub erase_latch: Latch,
    /// Program completion behaviour
    pub program_latch: Latch,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self::sst39sf010()
    }
}

/// Names accepted by [`DummyConfig::preset`]
pub const PRESETS: &[&str] = &["am29f010", "at29c010", "sst29ee010", "sst39sf010", "w29ee011"];

impl DummyConfig {
    fn part(
        name: &'static str,
        vendor_id: u8,
        device_id: u8,
        page_size: usize,
        requires_erase: bool,
        page_write: bool,
    ) -> Self {
        Self {
            name,
            vendor_id,
            device_id,
            base: 0xE0000,
            size: 128 * 1024,
            page_size,
            requires_erase,
            page_write,
            pair: CommandAddressPair::Standard,
            command_mask: 0x7FFF,
            id_entry: IdEntry::Command90,
            erase_latch: Latch::Immediate,
            program_latch: Latch::Immediate,
        }
    }

    /// AMD Am29F010: 16 KiB sectors, byte program
    pub fn am29f010() -> Self {
        Self::part("am29f010", vendor::AMD, 0x20, 16384, true, false)
    }

    /// Atmel AT29C010: 128 byte pages, page write
    pub fn at29c010() -> Self {
        Self::part("at29c010", vendor::ATMEL, 0xD5, 128, false, true)
    }

    /// SST 29EE010: 128 byte pages, page write
    pub fn sst29ee010() -> Self {
        Self::part("sst29ee010", vendor::SST, 0x07, 128, false, true)
    }

    /// SST 39SF010: 4 KiB sectors, byte program
    pub fn sst39sf010() -> Self {
        Self::part("sst39sf010", vendor::SST, 0xB5, 4096, true, false)
    }

    /// Winbond W29EE011: 128 byte pages, page write
    pub fn w29ee011() -> Self {
        Self::part("w29ee011", vendor::WINBOND, 0xC1, 128, false, true)
    }

    /// Look up a preset by (case-insensitive) name
    pub fn preset(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "am29f010" => Some(Self::am29f010()),
            "at29c010" => Some(Self::at29c010()),
            "sst29ee010" => Some(Self::sst29ee010()),
            "sst39sf010" => Some(Self::sst39sf010()),
            "w29ee011" => Some(Self::w29ee011()),
            _ => None,
        }
    }

    /// Decode the part at another physical address
    pub fn at_base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Answer to a different command address pair
    pub fn with_pair(mut self, pair: CommandAddressPair) -> Self {
        self.pair = pair;
        self
    }

    /// Accept a different software-ID entry sequence
    pub fn with_id_entry(mut self, id_entry: IdEntry) -> Self {
        self.id_entry = id_entry;
        self
    }

    /// Change erase completion behaviour
    pub fn with_erase_latch(mut self, latch: Latch) -> Self {
        self.erase_latch = latch;
        self
    }

    /// Change program completion behaviour
    pub fn with_program_latch(mut self, latch: Latch) -> Self {
        self.program_latch = latch;
        self
    }

    /// Physical address one past the last byte of the part
    pub fn end(&self) -> u64 {
        self.base + self.size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parflash_core::chip::ProfileRegistry;

    #[test]
    fn test_presets_are_in_builtin_registry() {
        let registry = ProfileRegistry::builtin();
        for name in PRESETS {
            let config = DummyConfig::preset(name).unwrap();
            let profile = registry.find(config.vendor_id, config.device_id).unwrap();
            assert_eq!(profile.page_size as usize, config.page_size, "{}", name);
            assert_eq!(profile.requires_erase, config.requires_erase, "{}", name);
            assert_eq!(profile.supports_page_write, config.page_write, "{}", name);
        }
        assert!(DummyConfig::preset("AT29C010").is_some());
        assert!(DummyConfig::preset("w25q128").is_none());
    }
}
