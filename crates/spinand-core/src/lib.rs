//! spinand-core - Command protocol layer for SPI NAND flash
//!
//! This crate turns generic NAND operations (reset, feature register
//! access, page read/program, cache load/read, block erase, ID read) into
//! the exact byte sequences a SPI NAND chip expects, and decodes the
//! vendor specific ECC bits of the status register. It is designed to be
//! `no_std` compatible for use in embedded environments.
//!
//! # Features
//!
//! - `std` - Enable standard library support
//! - `is_sync` - Compile the bus trait and all operations as blocking code
//!
//! # Example
//!
//! ```ignore
//! use spinand_core::{device::SpiNand, ecc::Variant, bus::SpiBus};
//!
//! fn dump_status<B: SpiBus>(bus: B) {
//!     let mut nand = SpiNand::new(bus, Variant::Generic);
//!     match nand.identify() {
//!         Ok(chip) => println!("Found: {} ({} MiB)", chip.name, chip.geometry.total_size >> 20),
//!         Err(e) => println!("Identification failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod chip;
pub mod device;
pub mod ecc;
pub mod error;
pub mod protocol;
pub mod spi;

#[cfg(test)]
mod testing;

pub use error::{Error, ProtocolError, Result};
