//! SPI NAND opcodes and feature register definitions
//!
//! Command set shared by the GigaDevice GD5F and Micron MT29F serial NAND
//! families.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before program execute and block erase
pub const WRITE_ENABLE: u8 = 0x06;
/// Write Disable - clears WEL
pub const WRITE_DISABLE: u8 = 0x04;

// ============================================================================
// Feature registers
// ============================================================================

/// Get Feature - read a feature register
pub const GET_FEATURE: u8 = 0x0F;
/// Set Feature - write a feature register
pub const SET_FEATURE: u8 = 0x1F;

// ============================================================================
// Read path
// ============================================================================

/// Page Read - transfer a page from the array into the cache register
pub const PAGE_READ: u8 = 0x13;
/// Read From Cache (1-1-1)
pub const READ_CACHE: u8 = 0x03;
/// Fast Read From Cache (1-1-1)
pub const FAST_READ_CACHE: u8 = 0x0B;
/// Read From Cache x2 (1-1-2)
pub const READ_CACHE_X2: u8 = 0x3B;
/// Read From Cache x4 (1-1-4)
pub const READ_CACHE_X4: u8 = 0x6B;
/// Read From Cache Dual I/O (1-2-2)
pub const READ_CACHE_DUAL_IO: u8 = 0xBB;
/// Read From Cache Quad I/O (1-4-4)
pub const READ_CACHE_QUAD_IO: u8 = 0xEB;

// ============================================================================
// Identification
// ============================================================================

/// Read ID
pub const READ_ID: u8 = 0x9F;

// ============================================================================
// Program path
// ============================================================================

/// Program Load - reset the cache to 0xFF and load data (1-1-1)
pub const PROGRAM_LOAD: u8 = 0x02;
/// Program Load x4 (1-1-4)
pub const PROGRAM_LOAD_X4: u8 = 0x32;
/// Program Execute - program the cache register into a page
pub const PROGRAM_EXEC: u8 = 0x10;
/// Program Load Random Data - load data without resetting the cache (1-1-1)
pub const PROGRAM_LOAD_RANDOM: u8 = 0x84;
/// Program Load Random Data x4 (1-1-4)
pub const PROGRAM_LOAD_RANDOM_X4: u8 = 0xC4;

// ============================================================================
// Erase / reset
// ============================================================================

/// Block Erase (addressed by any page within the block)
pub const BLOCK_ERASE: u8 = 0xD8;
/// Reset
pub const RESET: u8 = 0xFF;

// ============================================================================
// Feature register addresses
// ============================================================================

/// Block protection register
pub const REG_PROTECTION: u8 = 0xA0;
/// Configuration (OTP / ECC enable) register
pub const REG_CONFIG: u8 = 0xB0;
/// Status register
pub const REG_STATUS: u8 = 0xC0;

// ============================================================================
// Register bits
// ============================================================================

/// Status: operation in progress
pub const STATUS_OIP: u8 = 1 << 0;
/// Status: write enable latch
pub const STATUS_WEL: u8 = 1 << 1;
/// Status: erase failed
pub const STATUS_E_FAIL: u8 = 1 << 2;
/// Status: program failed
pub const STATUS_P_FAIL: u8 = 1 << 3;
/// Status: shift of the vendor ECC field
pub const STATUS_ECC_SHIFT: u8 = 4;

/// Configuration: on-die ECC enable
pub const CONFIG_ECC_EN: u8 = 1 << 4;
