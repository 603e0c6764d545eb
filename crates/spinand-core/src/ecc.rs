//! Vendor variants and ECC status decoding
//!
//! Both supported families report the outcome of the last page read in a
//! bit field of the status register starting at bit 4, but with different
//! widths and encodings.

use core::fmt;

use crate::spi::opcodes::STATUS_ECC_SHIFT;

/// Length of the ID returned by READ_ID for both supported families
pub const READ_ID_LEN: usize = 2;

const MT29F_ECC_MASK: u8 = 0b011;
const MT29F_ECC_UNCORR: u8 = 0b010;

const GD5F_ECC_MASK: u8 = 0b111;
const GD5F_ECC_UNCORR: u8 = 0b111;

/// Variant a device instance is bound with
///
/// `Generic` leaves the family to identification; the other two pin it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Accept any device found in the chip table
    #[default]
    Generic,
    /// Micron MT29F family
    Mt29f,
    /// GigaDevice GD5F family
    Gd5f,
}

impl Variant {
    /// Number of ID bytes READ_ID returns for this variant
    ///
    /// Both families are read with two ID bytes; a part needing a dummy
    /// byte or a third ID byte needs its own variant.
    pub const fn read_id_len(&self) -> usize {
        match self {
            Self::Generic | Self::Mt29f | Self::Gd5f => READ_ID_LEN,
        }
    }

    /// Family this variant pins, if any
    pub const fn family(&self) -> Option<VendorFamily> {
        match self {
            Self::Generic => None,
            Self::Mt29f => Some(VendorFamily::Mt29f),
            Self::Gd5f => Some(VendorFamily::Gd5f),
        }
    }

    /// Parse a compatible-style name ("spi-nand", "mt29f", "gd5f")
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "spi-nand" | "generic" => Some(Self::Generic),
            "mt29f" => Some(Self::Mt29f),
            "gd5f" => Some(Self::Gd5f),
            _ => None,
        }
    }
}

/// Resolved vendor family of an identified device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VendorFamily {
    /// Micron MT29F: 2-bit ECC field
    Mt29f,
    /// GigaDevice GD5F: 3-bit ECC field
    Gd5f,
}

impl VendorFamily {
    /// Decode the ECC field of a raw status register value
    pub const fn decode_ecc(&self, status: u8) -> EccStatus {
        match self {
            Self::Mt29f => {
                let field = (status >> STATUS_ECC_SHIFT) & MT29F_ECC_MASK;
                if field == MT29F_ECC_UNCORR {
                    EccStatus::Uncorrectable
                } else {
                    EccStatus::Corrected(field)
                }
            }
            Self::Gd5f => {
                let field = (status >> STATUS_ECC_SHIFT) & GD5F_ECC_MASK;
                if field == GD5F_ECC_UNCORR {
                    EccStatus::Uncorrectable
                } else if field > 1 {
                    // Non-linear above the first step: 2 -> 4 bits, ..., 6 -> 8 bits
                    EccStatus::Corrected(field + 2)
                } else {
                    EccStatus::Corrected(0)
                }
            }
        }
    }

    /// Lowercase family name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mt29f => "mt29f",
            Self::Gd5f => "gd5f",
        }
    }
}

impl fmt::Display for VendorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of on-die ECC for the last page read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EccStatus {
    /// Data is good; `n` bit flips were corrected (0 means none)
    Corrected(u8),
    /// Too many bit flips; data is not trustworthy
    Uncorrectable,
}

impl EccStatus {
    /// Number of corrected bits, or `None` if the page was uncorrectable
    pub const fn corrected_bits(&self) -> Option<u8> {
        match self {
            Self::Corrected(n) => Some(*n),
            Self::Uncorrectable => None,
        }
    }

    /// Returns true if the page could not be corrected
    pub const fn is_uncorrectable(&self) -> bool {
        matches!(self, Self::Uncorrectable)
    }
}

impl fmt::Display for EccStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrected(0) => write!(f, "no errors"),
            Self::Corrected(n) => write!(f, "{} bit(s) corrected", n),
            Self::Uncorrectable => write!(f, "uncorrectable"),
        }
    }
}

/// Decode a raw status register value with the policy of `family`
pub const fn decode_status(family: VendorFamily, status: u8) -> EccStatus {
    family.decode_ecc(status)
}
