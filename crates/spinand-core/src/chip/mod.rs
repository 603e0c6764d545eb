//! SPI NAND chip types and table
//!
//! This module describes the chips the driver knows about: ID bytes,
//! vendor family, geometry and spare-area ECC layout.

mod builtin;
mod types;

pub use builtin::{BUILTIN_CHIPS, GD5F_LAYOUT, MT29F_LAYOUT};
pub use types::*;

/// NAND manufacturer IDs
pub mod manufacturer {
    /// GigaDevice
    pub const GIGADEVICE: u8 = 0xC8;
    /// Micron
    pub const MICRON: u8 = 0x2C;

    /// Vendor name for a manufacturer ID
    pub fn name(id: u8) -> Option<&'static str> {
        match id {
            GIGADEVICE => Some("GigaDevice"),
            MICRON => Some("Micron"),
            _ => None,
        }
    }
}

/// Find a built-in chip by its ID bytes
pub fn find_chip(manufacturer: u8, device: u8) -> Option<&'static NandChip> {
    BUILTIN_CHIPS
        .iter()
        .find(|chip| chip.matches_id(manufacturer, device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::VendorFamily;

    #[test]
    fn test_find_chip() {
        let chip = find_chip(0xC8, 0xB4).unwrap();
        assert_eq!(chip.family, VendorFamily::Gd5f);
        assert_eq!(chip.geometry.page_size, 4096);

        let chip = find_chip(0x2C, 0x22).unwrap();
        assert_eq!(chip.family, VendorFamily::Mt29f);
        assert_eq!(chip.geometry.total_size, 256 * 1024 * 1024);

        assert!(find_chip(0xEF, 0xAA).is_none());
        // Device byte alone is not enough
        assert!(find_chip(0x2C, 0xB4).is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in BUILTIN_CHIPS.iter().enumerate() {
            for b in &BUILTIN_CHIPS[i + 1..] {
                assert!(!a.matches_id(b.manufacturer_id, b.device_id));
            }
        }
    }

    #[test]
    fn test_geometry() {
        let geo = find_chip(0xC8, 0xA4).unwrap().geometry;
        assert_eq!(geo.pages_per_block(), 64);
        assert_eq!(geo.page_count(), 131072);
        assert_eq!(geo.block_count(), 2048);
        assert_eq!(geo.raw_page_size(), 4096 + 256);
        assert_eq!(geo.block_start(130), 128);

        let geo = find_chip(0x2C, 0x32).unwrap().geometry;
        assert_eq!(geo.pages_per_block(), 64);
        assert_eq!(geo.page_count(), 262144);
    }

    #[test]
    fn test_ecc_layouts() {
        assert_eq!(GD5F_LAYOUT.ecc_bytes(), 128);
        assert_eq!(GD5F_LAYOUT.free_bytes(), 127);
        assert!(GD5F_LAYOUT.ecc_positions().eq(128u16..256));

        assert_eq!(MT29F_LAYOUT.ecc_bytes(), 32);
        let positions: [u16; 8] = [8, 9, 10, 11, 12, 13, 14, 15];
        assert!(MT29F_LAYOUT.ecc_positions().take(8).eq(positions));
        assert_eq!(MT29F_LAYOUT.ecc_positions().last(), Some(63));

        // ECC bytes must fit inside the spare area of every chip using the layout
        for chip in BUILTIN_CHIPS {
            let last = chip.ecc_layout.ecc_positions().last().unwrap();
            assert!((last as u32) < chip.geometry.oob_size);
        }
    }
}
