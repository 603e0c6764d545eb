//! SPI NAND operations
//!
//! One function per NAND command. Each builds a fresh descriptor and sends
//! it through [`send_command`] as a single bus transaction.
//!
//! Uses `maybe_async` to support both sync and async modes:
//! - With `is_sync` feature: blocking/synchronous
//! - Without `is_sync` feature: async (for Embassy, tokio)
//!
//! Page addresses are range checked against the 24-bit row address only;
//! chip bounds are the device's business.

use super::send_command;
use crate::bus::SpiBus;
use crate::ecc::{Variant, READ_ID_LEN};
use crate::error::Result;
use crate::spi::SpiNandCommand;
use maybe_async::maybe_async;

/// Reset the device
#[maybe_async]
pub async fn reset<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(), B::Error> {
    log::debug!("spinand: reset");
    send_command(bus, SpiNandCommand::reset()).await
}

/// Read a feature register
#[maybe_async]
pub async fn read_register<B: SpiBus + ?Sized>(bus: &mut B, reg: u8) -> Result<u8, B::Error> {
    let mut buf = [0u8; 1];
    send_command(bus, SpiNandCommand::read_register(reg, &mut buf)).await?;
    log::trace!("spinand: reg 0x{:02X} = 0x{:02X}", reg, buf[0]);
    Ok(buf[0])
}

/// Write a feature register
#[maybe_async]
pub async fn write_register<B: SpiBus + ?Sized>(
    bus: &mut B,
    reg: u8,
    value: u8,
) -> Result<(), B::Error> {
    log::debug!("spinand: reg 0x{:02X} <- 0x{:02X}", reg, value);
    send_command(bus, SpiNandCommand::write_register(reg, &value)).await
}

/// Send the Write Enable command
#[maybe_async]
pub async fn write_enable<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(), B::Error> {
    send_command(bus, SpiNandCommand::write_enable()).await
}

/// Send the Write Disable command
#[maybe_async]
pub async fn write_disable<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(), B::Error> {
    send_command(bus, SpiNandCommand::write_disable()).await
}

/// Program the cache register into `page`
///
/// Needs a preceding [`write_enable`]; completion is signalled by the OIP
/// status bit.
#[maybe_async]
pub async fn write_page<B: SpiBus + ?Sized>(bus: &mut B, page: u32) -> Result<(), B::Error> {
    log::debug!("spinand: program execute page 0x{:06X}", page);
    send_command(bus, SpiNandCommand::write_page(page)?).await
}

/// Transfer `page` from the array into the cache register
#[maybe_async]
pub async fn load_page<B: SpiBus + ?Sized>(bus: &mut B, page: u32) -> Result<(), B::Error> {
    log::debug!("spinand: page read 0x{:06X}", page);
    send_command(bus, SpiNandCommand::load_page(page)?).await
}

/// Erase the block containing `page`
#[maybe_async]
pub async fn block_erase<B: SpiBus + ?Sized>(bus: &mut B, page: u32) -> Result<(), B::Error> {
    log::debug!("spinand: block erase at page 0x{:06X}", page);
    send_command(bus, SpiNandCommand::block_erase(page)?).await
}

/// Load `data` into the cache register at `offset`, resetting the rest
#[maybe_async]
pub async fn store_cache<B: SpiBus + ?Sized>(
    bus: &mut B,
    offset: u16,
    data: &[u8],
) -> Result<(), B::Error> {
    log::debug!(
        "spinand: program load {} bytes at column 0x{:04X}",
        data.len(),
        offset
    );
    let cmd = SpiNandCommand::store_cache(bus.mode(), offset, data);
    send_command(bus, cmd).await
}

/// Load `data` into the cache register at `offset`, keeping the rest
#[maybe_async]
pub async fn store_cache_random<B: SpiBus + ?Sized>(
    bus: &mut B,
    offset: u16,
    data: &[u8],
) -> Result<(), B::Error> {
    log::debug!(
        "spinand: random program load {} bytes at column 0x{:04X}",
        data.len(),
        offset
    );
    let cmd = SpiNandCommand::store_cache_random(bus.mode(), offset, data);
    send_command(bus, cmd).await
}

/// Read `buf.len()` bytes of the cache register starting at `offset`
///
/// The widest receive mode the bus supports is used.
#[maybe_async]
pub async fn read_cache<B: SpiBus + ?Sized>(
    bus: &mut B,
    offset: u16,
    buf: &mut [u8],
) -> Result<(), B::Error> {
    log::debug!(
        "spinand: read cache {} bytes at column 0x{:04X}",
        buf.len(),
        offset
    );
    let cmd = SpiNandCommand::read_cache(bus.mode(), offset, buf);
    send_command(bus, cmd).await
}

/// Read the manufacturer and device ID bytes
#[maybe_async]
pub async fn read_id<B: SpiBus + ?Sized>(
    bus: &mut B,
    variant: Variant,
) -> Result<[u8; READ_ID_LEN], B::Error> {
    let mut id = [0u8; READ_ID_LEN];
    send_command(bus, SpiNandCommand::read_id(variant, &mut id)?).await?;
    log::debug!("spinand: read id {:02X?}", id);
    Ok(id)
}
