//! Device profile registry

use alloc::string::ToString;
use alloc::vec::Vec;

use super::types::{vendor, DeviceProfile};
use crate::error::Result;

/// Lookup table from (vendor ID, device ID) to [`DeviceProfile`]
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<DeviceProfile>,
}

impl ProfileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Registry holding the parts known to work
    pub fn builtin() -> Self {
        let profiles = [
            DeviceProfile::new(vendor::AMD, 0x20, "AMD", "Am29F010", 16384, true, false),
            DeviceProfile::new(vendor::ATMEL, 0xD5, "Atmel", "AT29C010", 128, false, true),
            DeviceProfile::new(vendor::WINBOND, 0xC1, "Winbond", "W29EE011", 128, false, true),
            DeviceProfile::new(
                vendor::SST,
                0x07,
                "SST/Greenliant",
                "SST29EE010/GLS29EE010",
                128,
                false,
                true,
            ),
            DeviceProfile::new(vendor::SST, 0xB5, "SST/Microchip", "SST39SF010", 4096, true, false),
        ];
        Self {
            profiles: profiles.into(),
        }
    }

    /// Add a profile, replacing any existing entry with the same ID pair
    ///
    /// The profile is validated first.
    pub fn insert(&mut self, profile: DeviceProfile) -> Result<()> {
        profile.validate()?;
        match self
            .profiles
            .iter_mut()
            .find(|p| p.matches_id(profile.vendor_id, profile.device_id))
        {
            Some(existing) => {
                log::debug!(
                    "Replacing profile {} with {} for ID {:02X}:{:02X}",
                    existing,
                    profile,
                    profile.vendor_id,
                    profile.device_id
                );
                *existing = profile;
            }
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Find a profile by its ID pair
    pub fn find(&self, vendor_id: u8, device_id: u8) -> Option<&DeviceProfile> {
        self.profiles
            .iter()
            .find(|p| p.matches_id(vendor_id, device_id))
    }

    /// Find profiles by part name (case-insensitive partial match)
    pub fn find_by_name(&self, name: &str) -> Vec<&DeviceProfile> {
        let name_lower = name.to_lowercase();
        self.profiles
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&name_lower))
            .collect()
    }

    /// Find profiles by vendor name (case-insensitive partial match)
    pub fn find_by_vendor(&self, vendor: &str) -> Vec<&DeviceProfile> {
        let vendor_lower = vendor.to_lowercase();
        self.profiles
            .iter()
            .filter(|p| p.vendor.to_lowercase().contains(&vendor_lower))
            .collect()
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate over all profiles
    pub fn iter(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_builtin_profiles_valid() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.len(), 5);
        for profile in registry.iter() {
            assert!(profile.validate().is_ok(), "{} invalid", profile);
        }
    }

    #[test]
    fn test_find() {
        let registry = ProfileRegistry::builtin();
        let at = registry.find(0x1F, 0xD5).unwrap();
        assert_eq!(at.name, "AT29C010");
        assert!(at.supports_page_write);
        assert!(!at.requires_erase);

        let sst = registry.find(0xBF, 0xB5).unwrap();
        assert_eq!(sst.page_size, 4096);
        assert!(sst.requires_erase);

        assert!(registry.find(0xBF, 0xB6).is_none());
        assert_eq!(registry.find_by_vendor("sst").len(), 2);
        assert_eq!(registry.find_by_name("29ee0").len(), 2);
    }

    #[test]
    fn test_insert_replaces_and_validates() {
        let mut registry = ProfileRegistry::builtin();
        registry
            .insert(DeviceProfile::new(0x1F, 0xD5, "Atmel", "AT29C010A", 128, false, true))
            .unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.find(0x1F, 0xD5).unwrap().name, "AT29C010A");

        let bad = DeviceProfile::new(0x1F, 0x35, "Atmel", "AT29LV010", 100, false, true);
        assert_eq!(registry.insert(bad), Err(Error::InvalidProfile));
        assert_eq!(registry.len(), 5);
    }
}
