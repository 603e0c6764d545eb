//! Built-in SPI NAND chip table

use super::manufacturer;
use super::types::{EccLayout, Geometry, NandChip, OobRegion};
use crate::ecc::VendorFamily;

const KIB: u32 = 1024;
const MIB: u64 = 1024 * 1024;

/// GD5F: 128 ECC bytes in the upper half of the 256-byte spare area
pub static GD5F_LAYOUT: EccLayout = EccLayout {
    ecc: &[OobRegion::new(128, 128)],
    free: &[OobRegion::new(1, 127)],
};

/// MT29F: 8 ECC bytes at the end of each 16-byte spare section
pub static MT29F_LAYOUT: EccLayout = EccLayout {
    ecc: &[
        OobRegion::new(8, 8),
        OobRegion::new(24, 8),
        OobRegion::new(40, 8),
        OobRegion::new(56, 8),
    ],
    free: &[],
};

const GD5F_4G: Geometry = Geometry {
    total_size: 512 * MIB,
    page_size: 4 * KIB,
    block_size: 256 * KIB,
    oob_size: 256,
    ecc_strength: 8,
    ecc_step: 512,
};

const MT29F_2K: Geometry = Geometry {
    total_size: 512 * MIB,
    page_size: 2 * KIB,
    block_size: 128 * KIB,
    oob_size: 64,
    ecc_strength: 4,
    ecc_step: 512,
};

/// Every chip this crate can identify
pub static BUILTIN_CHIPS: &[NandChip] = &[
    NandChip {
        name: "GD5F4GQ4 512MiB 3.3V",
        manufacturer_id: manufacturer::GIGADEVICE,
        device_id: 0xB4,
        family: VendorFamily::Gd5f,
        geometry: GD5F_4G,
        ecc_layout: &GD5F_LAYOUT,
    },
    NandChip {
        name: "GD5F4GQ4 512MiB 1.8V",
        manufacturer_id: manufacturer::GIGADEVICE,
        device_id: 0xA4,
        family: VendorFamily::Gd5f,
        geometry: GD5F_4G,
        ecc_layout: &GD5F_LAYOUT,
    },
    NandChip {
        name: "MT29F4G 512MiB 3.3V",
        manufacturer_id: manufacturer::MICRON,
        device_id: 0x32,
        family: VendorFamily::Mt29f,
        geometry: MT29F_2K,
        ecc_layout: &MT29F_LAYOUT,
    },
    NandChip {
        name: "MT29F2G 256MiB 3.3V",
        manufacturer_id: manufacturer::MICRON,
        device_id: 0x22,
        family: VendorFamily::Mt29f,
        geometry: Geometry {
            total_size: 256 * MIB,
            ..MT29F_2K
        },
        ecc_layout: &MT29F_LAYOUT,
    },
];
