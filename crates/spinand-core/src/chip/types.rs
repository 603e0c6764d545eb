//! SPI NAND chip type definitions

use crate::ecc::VendorFamily;

/// A contiguous run of bytes in the spare (OOB) area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OobRegion {
    /// Offset within the spare area
    pub offset: u16,
    /// Length in bytes
    pub length: u16,
}

impl OobRegion {
    /// Create a new OOB region
    pub const fn new(offset: u16, length: u16) -> Self {
        Self { offset, length }
    }

    /// First offset past the region
    pub const fn end(&self) -> u16 {
        self.offset + self.length
    }
}

/// Placement of on-die ECC bytes in the spare area
///
/// Only described here; the flash layer above decides what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EccLayout {
    /// Regions holding ECC bytes
    pub ecc: &'static [OobRegion],
    /// Regions free for the user
    pub free: &'static [OobRegion],
}

impl EccLayout {
    /// Total number of ECC bytes
    pub fn ecc_bytes(&self) -> u32 {
        self.ecc.iter().map(|r| r.length as u32).sum()
    }

    /// Iterate over every ECC byte position
    pub fn ecc_positions(&self) -> impl Iterator<Item = u16> + '_ {
        self.ecc.iter().flat_map(|r| r.offset..r.end())
    }

    /// Total number of free spare bytes
    pub fn free_bytes(&self) -> u32 {
        self.free.iter().map(|r| r.length as u32).sum()
    }
}

/// Array geometry and ECC requirements of a chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Total array size in bytes (main area only)
    pub total_size: u64,
    /// Main area of one page in bytes
    pub page_size: u32,
    /// Erase block size in bytes
    pub block_size: u32,
    /// Spare area of one page in bytes
    pub oob_size: u32,
    /// Bits correctable per ECC step
    pub ecc_strength: u8,
    /// Bytes covered by one ECC step
    pub ecc_step: u16,
}

impl Geometry {
    /// Number of pages in the array
    pub const fn page_count(&self) -> u32 {
        (self.total_size / self.page_size as u64) as u32
    }

    /// Number of pages in one erase block
    pub const fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }

    /// Number of erase blocks in the array
    pub const fn block_count(&self) -> u32 {
        (self.total_size / self.block_size as u64) as u32
    }

    /// Page plus spare area, i.e. the size of the cache register
    pub const fn raw_page_size(&self) -> u32 {
        self.page_size + self.oob_size
    }

    /// First page of the block containing `page`
    pub const fn block_start(&self, page: u32) -> u32 {
        page - page % self.pages_per_block()
    }
}

/// SPI NAND chip definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NandChip {
    /// Chip description (e.g., "GD5F4GQ4 3.3V")
    pub name: &'static str,
    /// Manufacturer ID (first READ_ID byte)
    pub manufacturer_id: u8,
    /// Device ID (second READ_ID byte)
    pub device_id: u8,
    /// Vendor family; selects ECC decoding
    pub family: VendorFamily,
    /// Array geometry
    pub geometry: Geometry,
    /// Spare area ECC placement
    pub ecc_layout: &'static EccLayout,
}

impl NandChip {
    /// Check if this chip matches the given ID bytes
    pub fn matches_id(&self, manufacturer: u8, device: u8) -> bool {
        self.manufacturer_id == manufacturer && self.device_id == device
    }
}
