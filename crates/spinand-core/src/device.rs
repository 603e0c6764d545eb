//! SPI NAND device instance
//!
//! [`SpiNand`] owns a bus, remembers the variant it was bound with and
//! tracks whether identification succeeded. Operations are the same as the
//! free functions in [`crate::protocol`], gated on that state.

use bitflags::bitflags;
use maybe_async::maybe_async;

use crate::bus::SpiBus;
use crate::chip::{find_chip, manufacturer, NandChip};
use crate::ecc::{EccStatus, Variant, VendorFamily, READ_ID_LEN};
use crate::error::{Error, ProtocolError, Result};
use crate::protocol;
use crate::spi::opcodes;

bitflags! {
    /// Status register (0xC0) bits shared by all supported families
    ///
    /// The vendor ECC field above bit 3 is dropped; decode it with
    /// [`SpiNand::ecc_status`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// Operation in progress
        const OIP = opcodes::STATUS_OIP;
        /// Write enable latch
        const WEL = opcodes::STATUS_WEL;
        /// Last erase failed
        const E_FAIL = opcodes::STATUS_E_FAIL;
        /// Last program failed
        const P_FAIL = opcodes::STATUS_P_FAIL;
    }
}

/// Identification state of a device instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No successful identification yet
    Unidentified,
    /// Identified as the given chip
    Ready(&'static NandChip),
    /// Identification found an unsupported device
    Failed,
}

/// A SPI NAND chip on a bus
pub struct SpiNand<B> {
    bus: B,
    variant: Variant,
    state: State,
}

impl<B: SpiBus> SpiNand<B> {
    /// Bind a bus to a variant; the chip is not touched until [`Self::identify`]
    pub fn new(bus: B, variant: Variant) -> Self {
        Self {
            bus,
            variant,
            state: State::Unidentified,
        }
    }

    /// The variant this instance was bound with
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Current identification state
    pub fn state(&self) -> State {
        self.state
    }

    /// The identified chip
    pub fn chip(&self) -> Option<&'static NandChip> {
        match self.state {
            State::Ready(chip) => Some(chip),
            _ => None,
        }
    }

    /// Vendor family of the identified chip
    pub fn family(&self) -> Option<VendorFamily> {
        self.chip().map(|chip| chip.family)
    }

    /// Get a reference to the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Get a mutable reference to the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus
    }

    fn usable(&self) -> core::result::Result<(), ProtocolError> {
        match self.state {
            State::Failed => Err(ProtocolError::DeviceUnusable),
            _ => Ok(()),
        }
    }

    fn ready(&self) -> core::result::Result<&'static NandChip, ProtocolError> {
        match self.state {
            State::Ready(chip) => Ok(chip),
            State::Unidentified => Err(ProtocolError::NotIdentified),
            State::Failed => Err(ProtocolError::DeviceUnusable),
        }
    }

    fn check_page(&self, page: u32) -> core::result::Result<(), ProtocolError> {
        let chip = self.ready()?;
        if page >= chip.geometry.page_count() {
            log::error!(
                "spinand: page 0x{:X} beyond {} ({} pages)",
                page,
                chip.name,
                chip.geometry.page_count()
            );
            return Err(ProtocolError::AddressOutOfRange(page));
        }
        Ok(())
    }

    fn check_column(&self, offset: u16, len: usize) -> core::result::Result<(), ProtocolError> {
        let chip = self.ready()?;
        let end = offset as usize + len;
        if end > chip.geometry.raw_page_size() as usize {
            // The device wraps or ignores the excess; pass it through
            log::warn!(
                "spinand: cache access 0x{:X}..0x{:X} runs past the {}-byte page",
                offset,
                end,
                chip.geometry.raw_page_size()
            );
        }
        Ok(())
    }
}

#[maybe_async]
impl<B: SpiBus> SpiNand<B> {
    /// Read the ID and match it against the chip table
    ///
    /// On a match the instance becomes ready. An unknown ID, or a known ID
    /// whose family contradicts the bound variant, fails the instance for
    /// good. A transport error leaves the state unchanged.
    pub async fn identify(&mut self) -> Result<&'static NandChip, B::Error> {
        self.usable()?;

        let [mfr, dev] = protocol::read_id(&mut self.bus, self.variant).await?;

        let chip = find_chip(mfr, dev).filter(|chip| match self.variant.family() {
            Some(family) => family == chip.family,
            None => true,
        });

        match chip {
            Some(chip) => {
                log::info!(
                    "spinand: found {} {} ({} MiB, {} byte pages)",
                    manufacturer::name(mfr).unwrap_or("unknown"),
                    chip.name,
                    chip.geometry.total_size >> 20,
                    chip.geometry.page_size
                );
                self.state = State::Ready(chip);
                Ok(chip)
            }
            None => {
                if let Some(found) = find_chip(mfr, dev) {
                    log::error!(
                        "spinand: {} is a {} part, bound as {:?}",
                        found.name,
                        found.family,
                        self.variant
                    );
                } else {
                    log::error!("spinand: unknown device {:02X} {:02X}", mfr, dev);
                }
                self.state = State::Failed;
                Err(Error::Protocol(ProtocolError::UnknownDevice {
                    manufacturer: mfr,
                    device: dev,
                }))
            }
        }
    }

    /// Reset the device
    pub async fn reset(&mut self) -> Result<(), B::Error> {
        self.usable()?;
        protocol::reset(&mut self.bus).await
    }

    /// Read the raw ID bytes without matching them
    pub async fn read_id(&mut self) -> Result<[u8; READ_ID_LEN], B::Error> {
        self.usable()?;
        protocol::read_id(&mut self.bus, self.variant).await
    }

    /// Read a feature register
    pub async fn read_register(&mut self, reg: u8) -> Result<u8, B::Error> {
        self.ready()?;
        protocol::read_register(&mut self.bus, reg).await
    }

    /// Write a feature register
    pub async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), B::Error> {
        self.ready()?;
        protocol::write_register(&mut self.bus, reg, value).await
    }

    /// Send the Write Enable command
    pub async fn write_enable(&mut self) -> Result<(), B::Error> {
        self.ready()?;
        protocol::write_enable(&mut self.bus).await
    }

    /// Send the Write Disable command
    pub async fn write_disable(&mut self) -> Result<(), B::Error> {
        self.ready()?;
        protocol::write_disable(&mut self.bus).await
    }

    /// Program the cache register into `page`
    pub async fn write_page(&mut self, page: u32) -> Result<(), B::Error> {
        self.check_page(page)?;
        protocol::write_page(&mut self.bus, page).await
    }

    /// Transfer `page` from the array into the cache register
    pub async fn load_page(&mut self, page: u32) -> Result<(), B::Error> {
        self.check_page(page)?;
        protocol::load_page(&mut self.bus, page).await
    }

    /// Erase the block containing `page`
    pub async fn block_erase(&mut self, page: u32) -> Result<(), B::Error> {
        self.check_page(page)?;
        protocol::block_erase(&mut self.bus, page).await
    }

    /// Load `data` into the cache register at `offset`, resetting the rest
    pub async fn store_cache(&mut self, offset: u16, data: &[u8]) -> Result<(), B::Error> {
        self.check_column(offset, data.len())?;
        protocol::store_cache(&mut self.bus, offset, data).await
    }

    /// Load `data` into the cache register at `offset`, keeping the rest
    pub async fn store_cache_random(&mut self, offset: u16, data: &[u8]) -> Result<(), B::Error> {
        self.check_column(offset, data.len())?;
        protocol::store_cache_random(&mut self.bus, offset, data).await
    }

    /// Read from the cache register starting at `offset`
    pub async fn read_cache(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), B::Error> {
        self.check_column(offset, buf.len())?;
        protocol::read_cache(&mut self.bus, offset, buf).await
    }

    /// Read the raw status register
    pub async fn read_status(&mut self) -> Result<u8, B::Error> {
        self.read_register(opcodes::REG_STATUS).await
    }

    /// Read the status register and keep the common flag bits
    pub async fn status_flags(&mut self) -> Result<StatusFlags, B::Error> {
        let status = self.read_status().await?;
        Ok(StatusFlags::from_bits_truncate(status))
    }

    /// ECC outcome of the last page read
    pub async fn ecc_status(&mut self) -> Result<EccStatus, B::Error> {
        let chip = self.ready()?;
        let status = self.read_status().await?;
        Ok(chip.family.decode_ecc(status))
    }

    /// Returns true while a page read, program or erase is running
    pub async fn is_busy(&mut self) -> Result<bool, B::Error> {
        Ok(self.status_flags().await?.contains(StatusFlags::OIP))
    }

    /// Clear all block protection bits
    pub async fn unlock_all(&mut self) -> Result<(), B::Error> {
        self.write_register(opcodes::REG_PROTECTION, 0).await
    }

    /// Turn on-die ECC on or off, leaving the other configuration bits alone
    pub async fn set_ecc_enabled(&mut self, enabled: bool) -> Result<(), B::Error> {
        let config = self.read_register(opcodes::REG_CONFIG).await?;
        let config = if enabled {
            config | opcodes::CONFIG_ECC_EN
        } else {
            config & !opcodes::CONFIG_ECC_EN
        };
        self.write_register(opcodes::REG_CONFIG, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusMode;
    use crate::testing::{MockBus, MockError};
    use std::vec;

    #[maybe_async]
    async fn identified(id: [u8; 2], variant: Variant) -> SpiNand<MockBus> {
        let mut bus = MockBus::new(BusMode::QUAD);
        bus.respond(&id);
        let mut nand = SpiNand::new(bus, variant);
        nand.identify().await.unwrap();
        nand
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_identify_generic() {
        let nand = identified([0x2C, 0x22], Variant::Generic).await;
        let chip = nand.chip().unwrap();
        assert_eq!(chip.name, "MT29F2G 256MiB 3.3V");
        assert_eq!(nand.family(), Some(VendorFamily::Mt29f));
        assert_eq!(nand.bus().headers(), vec![vec![opcodes::READ_ID]]);
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_unknown_device_poisons_instance() {
        let mut bus = MockBus::default();
        bus.respond(&[0xEF, 0xAA]);
        let mut nand = SpiNand::new(bus, Variant::Generic);

        let err = nand.identify().await.unwrap_err();
        assert_eq!(
            err,
            Error::Protocol(ProtocolError::UnknownDevice {
                manufacturer: 0xEF,
                device: 0xAA
            })
        );
        assert_eq!(nand.state(), State::Failed);

        let sent = nand.bus().transactions.len();
        let reset = nand.reset().await;
        assert_eq!(
            reset.unwrap_err().protocol(),
            Some(ProtocolError::DeviceUnusable)
        );
        let load = nand.load_page(0).await;
        assert_eq!(
            load.unwrap_err().protocol(),
            Some(ProtocolError::DeviceUnusable)
        );
        let again = nand.identify().await;
        assert_eq!(
            again.unwrap_err().protocol(),
            Some(ProtocolError::DeviceUnusable)
        );
        assert_eq!(nand.bus().transactions.len(), sent);
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_pinned_variant_mismatch() {
        let mut bus = MockBus::default();
        bus.respond(&[0xC8, 0xB4]);
        let mut nand = SpiNand::new(bus, Variant::Mt29f);
        let err = nand.identify().await.unwrap_err();
        assert_eq!(
            err.protocol(),
            Some(ProtocolError::UnknownDevice {
                manufacturer: 0xC8,
                device: 0xB4
            })
        );
        assert_eq!(nand.state(), State::Failed);
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_transport_error_does_not_poison() {
        let mut bus = MockBus::default();
        bus.fail_next = true;
        bus.respond(&[0xC8, 0xA4]);
        let mut nand = SpiNand::new(bus, Variant::Gd5f);

        let err = nand.identify().await.unwrap_err();
        assert_eq!(err, Error::Transport(MockError));
        assert_eq!(nand.state(), State::Unidentified);

        let chip = nand.identify().await.unwrap();
        assert_eq!(chip.device_id, 0xA4);
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_requires_identification() {
        let mut nand = SpiNand::new(MockBus::default(), Variant::Generic);
        let load = nand.load_page(0).await;
        assert_eq!(
            load.unwrap_err().protocol(),
            Some(ProtocolError::NotIdentified)
        );
        let status = nand.read_status().await;
        assert_eq!(
            status.unwrap_err().protocol(),
            Some(ProtocolError::NotIdentified)
        );
        assert!(nand.bus().transactions.is_empty());

        // Reset and ReadId are allowed before identification
        nand.reset().await.unwrap();
        nand.read_id().await.unwrap();
        assert_eq!(nand.bus().transactions.len(), 2);
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_page_bounds() {
        let mut nand = identified([0x2C, 0x22], Variant::Mt29f).await;
        let pages = nand.chip().unwrap().geometry.page_count();
        nand.load_page(pages - 1).await.unwrap();
        let err = nand.block_erase(pages).await.unwrap_err();
        assert_eq!(err.protocol(), Some(ProtocolError::AddressOutOfRange(pages)));
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_ecc_status() {
        let mut nand = identified([0x2C, 0x32], Variant::Generic).await;
        nand.bus_mut().respond(&[0b0010_0000]);
        let ecc = nand.ecc_status().await.unwrap();
        assert_eq!(ecc, EccStatus::Uncorrectable);

        let mut nand = identified([0xC8, 0xB4], Variant::Generic).await;
        nand.bus_mut().respond(&[0b0101_0001]);
        let ecc = nand.ecc_status().await.unwrap();
        assert_eq!(ecc, EccStatus::Corrected(7));
        nand.bus_mut().respond(&[0b0101_0001]);
        let busy = nand.is_busy().await.unwrap();
        assert!(busy);
    }

    #[maybe_async::test(feature = "is_sync", async(not(feature = "is_sync"), tokio::test))]
    async fn test_set_ecc_enabled_keeps_other_bits() {
        let mut nand = identified([0xC8, 0xB4], Variant::Gd5f).await;
        nand.bus_mut().respond(&[0b0101_0001]);
        nand.set_ecc_enabled(false).await.unwrap();
        nand.unlock_all().await.unwrap();

        let bus = nand.release();
        assert_eq!(
            bus.headers()[1..],
            [
                vec![opcodes::GET_FEATURE, opcodes::REG_CONFIG],
                vec![opcodes::SET_FEATURE, opcodes::REG_CONFIG],
                vec![opcodes::SET_FEATURE, opcodes::REG_PROTECTION],
            ]
        );
        assert_eq!(
            bus.transactions[2][1],
            crate::testing::Recorded::Write(vec![0b0100_0001], crate::spi::LaneWidth::Single)
        );
    }
}
