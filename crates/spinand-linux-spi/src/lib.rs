//! spinand-linux-spi - Linux spidev bus for SPI NAND
//!
//! This crate drives SPI NAND chips through the `/dev/spidevX.Y` device
//! interface, including dual and quad data phases when the controller and
//! wiring support them.
//!
//! # Example
//!
//! ```no_run
//! use spinand_core::device::SpiNand;
//! use spinand_core::ecc::Variant;
//! use spinand_core::bus::BusMode;
//! use spinand_linux_spi::{LinuxSpiConfig, LinuxSpiNand};
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0")
//!     .with_speed(20_000_000)
//!     .with_bus_mode(BusMode::RX_QUAD);
//! let bus = LinuxSpiNand::open(&config)?;
//!
//! let mut nand = SpiNand::new(bus, Variant::Generic);
//! nand.reset()?;
//! let chip = nand.identify()?;
//! println!("Found {}", chip.name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with spinand CLI
//!
//! ```bash
//! # Probe with default settings (2 MHz, mode 0, single line)
//! spinand probe -p linux_spi:dev=/dev/spidev0.0
//!
//! # Quad reads at 20 MHz
//! spinand read -p linux_spi:dev=/dev/spidev0.0,spispeed=20000,rx=4 -o nand.bin
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - Dual/quad transfers need a controller driver that honours
//!   `tx_nbits`/`rx_nbits`

pub mod device;
pub mod error;

// Re-exports
pub use device::{mode, parse_options, LinuxSpiConfig, LinuxSpiNand};
pub use error::{LinuxSpiError, Result};

/// Open a Linux SPI NAND bus from programmer options
///
/// This is a convenience function for use in the CLI programmer dispatch.
/// See [`parse_options`] for the accepted keys.
pub fn open_linux_spi(options: &[(&str, &str)]) -> Result<LinuxSpiNand> {
    let config = parse_options(options)?;
    LinuxSpiNand::open(&config)
}
