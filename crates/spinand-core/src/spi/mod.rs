//! SPI NAND types and command structures
//!
//! This module provides the command descriptor, its per-operation
//! builders, lane widths, address packing and the SPI NAND opcodes.

pub mod address;
mod command;
mod lanes;
pub mod opcodes;

pub use address::{decode_row, encode_column, encode_row, MAX_ROW_ADDRESS};
pub use command::{SpiNandCommand, MAX_COMMAND_LEN};
pub use lanes::LaneWidth;
