//! List commands implementation

use parflash_core::chip::{DeviceProfile, ProfileRegistry};

use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in programmers::available_programmers() {
        if p.aliases.is_empty() {
            println!("  {:10} - {}", p.name, p.description);
        } else {
            println!(
                "  {:10} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}

/// List all known flash parts
pub fn list_chips(
    registry: &ProfileRegistry,
    vendor_filter: Option<&str>,
    name_filter: Option<&str>,
) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<16} {:<24} {:>6} {:>10} {:>6} {:>6}",
        "Vendor", "Name", "ID", "Page", "Erase", "Write"
    );
    println!("{}", "-".repeat(74));

    for chip in select_chips(registry, vendor_filter, name_filter) {
        println!(
            "{:<16} {:<24} {:>6} {:>10} {:>6} {:>6}",
            chip.vendor,
            chip.name,
            format!("{:02X}/{:02X}", chip.vendor_id, chip.device_id),
            format_size(chip.page_size),
            if chip.requires_erase { "yes" } else { "no" },
            chip.write_mode().to_string()
        );
    }
}

/// Profiles matching both filters, in registry order
fn select_chips<'a>(
    registry: &'a ProfileRegistry,
    vendor_filter: Option<&str>,
    name_filter: Option<&str>,
) -> Vec<&'a DeviceProfile> {
    let mut chips = match vendor_filter {
        Some(vendor) => registry.find_by_vendor(vendor),
        None => registry.iter().collect(),
    };
    if let Some(name) = name_filter {
        let named = registry.find_by_name(name);
        chips.retain(|chip| {
            named
                .iter()
                .any(|n| n.matches_id(chip.vendor_id, chip.device_id))
        });
    }
    chips
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(128), "128 B");
        assert_eq!(format_size(4096), "4 KiB");
        assert_eq!(format_size(16384), "16 KiB");
    }

    #[test]
    fn test_select_chips_filters() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(select_chips(&registry, None, None).len(), registry.len());

        let names = |chips: Vec<&DeviceProfile>| -> Vec<String> {
            chips.iter().map(|c| c.name.to_string()).collect()
        };
        assert_eq!(
            names(select_chips(&registry, None, Some("29ee0"))),
            ["W29EE011", "SST29EE010/GLS29EE010"]
        );
        assert_eq!(
            names(select_chips(&registry, Some("sst"), Some("29EE"))),
            ["SST29EE010/GLS29EE010"]
        );
        assert!(select_chips(&registry, Some("atmel"), Some("39sf")).is_empty());
    }
}
