//! List commands implementation

use spinand_core::chip::{manufacturer, BUILTIN_CHIPS};

use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    let programmers = programmers::available_programmers();
    if programmers.is_empty() {
        println!("No programmers available (recompile with programmer features enabled)");
        return;
    }

    println!("Supported programmers:");
    println!();
    for p in &programmers {
        println!("  {:10} - {}", p.name, p.description);
        if !p.aliases.is_empty() {
            println!("  {:10}   aliases: {}", "", p.aliases.join(", "));
        }
    }
}

/// List all supported chips
pub fn list_chips(vendor_filter: Option<&str>) {
    println!("Supported SPI NAND chips:");
    println!();
    println!(
        "{:<12} {:<24} {:>8} {:>10} {:>6} {:>6}",
        "Vendor", "Name", "Size", "Page", "Family", "ID"
    );
    println!("{}", "-".repeat(71));

    for chip in BUILTIN_CHIPS {
        let vendor = manufacturer::name(chip.manufacturer_id).unwrap_or("Unknown");
        if let Some(filter) = vendor_filter {
            if !vendor.to_lowercase().contains(&filter.to_lowercase()) {
                continue;
            }
        }

        let geo = &chip.geometry;
        println!(
            "{:<12} {:<24} {:>8} {:>10} {:>6} {:02X} {:02X}",
            vendor,
            chip.name,
            format_size(geo.total_size),
            format!("{}+{}", geo.page_size, geo.oob_size),
            chip.family.name(),
            chip.manufacturer_id,
            chip.device_id
        );
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
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
        assert_eq!(format_size(256 * 1024 * 1024), "256 MiB");
        assert_eq!(format_size(4096), "4 KiB");
        assert_eq!(format_size(64), "64 B");
    }
}
