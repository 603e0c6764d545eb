//! spinand-dummy - In-memory SPI NAND emulator for testing
//!
//! This crate provides a bus that answers SPI NAND commands from memory.
//! It models the feature registers, the cache register, a page array with
//! spare area, the write enable latch and the vendor ECC field, so the
//! whole protocol layer can be exercised without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use spinand_core::bus::{BusMode, Leg, SpiBus};
use spinand_core::chip::{manufacturer, NandChip, BUILTIN_CHIPS};
use spinand_core::spi::{decode_row, opcodes, LaneWidth};

/// Protection register bits that lock the whole array
const PROTECTION_LOCK_MASK: u8 = 0x38;

/// Configuration for the dummy NAND
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Manufacturer ID byte
    pub manufacturer_id: u8,
    /// Device ID byte
    pub device_id: u8,
    /// Lines the emulated bus offers
    pub bus_mode: BusMode,
    /// Data bytes per page
    pub page_size: usize,
    /// Spare bytes per page
    pub oob_size: usize,
    /// Pages per erase block
    pub pages_per_block: u32,
    /// Total number of pages
    pub page_count: u32,
    /// Array is write protected after reset, like real parts
    pub locked: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        let mut config = Self::from_chip(&BUILTIN_CHIPS[3]);
        config.bus_mode = BusMode::QUAD;
        config
    }
}

impl DummyConfig {
    /// Emulate a chip from the built-in table
    pub fn from_chip(chip: &NandChip) -> Self {
        let geo = &chip.geometry;
        Self {
            manufacturer_id: chip.manufacturer_id,
            device_id: chip.device_id,
            bus_mode: BusMode::empty(),
            page_size: geo.page_size as usize,
            oob_size: geo.oob_size as usize,
            pages_per_block: geo.pages_per_block(),
            page_count: geo.page_count(),
            locked: true,
        }
    }

    /// Bytes in one page including the spare area
    pub fn raw_page_size(&self) -> usize {
        self.page_size + self.oob_size
    }
}

/// Transactions the emulator refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyError {
    /// Opcode is not implemented
    UnsupportedOpcode(u8),
    /// Command bytes or data leg do not fit the opcode
    MalformedCommand(u8),
    /// Data leg uses a lane width the opcode or the bus does not allow
    LaneWidth {
        /// Opcode of the rejected command
        opcode: u8,
        /// Lines requested by the data leg
        lines: u8,
    },
}

impl fmt::Display for DummyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOpcode(op) => write!(f, "unsupported opcode 0x{:02X}", op),
            Self::MalformedCommand(op) => write!(f, "malformed command 0x{:02X}", op),
            Self::LaneWidth { opcode, lines } => write!(
                f,
                "opcode 0x{:02X} cannot use {} data lines on this bus",
                opcode, lines
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DummyError {}

/// Dummy SPI NAND
///
/// Emulates a SPI NAND chip in memory. Operations complete instantly, so
/// OIP never reads back as set. Untouched pages read as 0xFF.
pub struct DummyNand {
    config: DummyConfig,
    pages: BTreeMap<u32, Vec<u8>>,
    cache: Vec<u8>,
    protection: u8,
    configuration: u8,
    write_enabled: bool,
    erase_failed: bool,
    program_failed: bool,
    ecc_field: u8,
    ecc_faults: BTreeMap<u32, u8>,
}

impl DummyNand {
    /// Create a new dummy NAND with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let cache = vec![0xFF; config.raw_page_size()];
        let protection = if config.locked {
            PROTECTION_LOCK_MASK
        } else {
            0
        };
        Self {
            config,
            pages: BTreeMap::new(),
            cache,
            protection,
            configuration: opcodes::CONFIG_ECC_EN,
            write_enabled: false,
            erase_failed: false,
            program_failed: false,
            ecc_field: 0,
            ecc_faults: BTreeMap::new(),
        }
    }

    /// Create a new dummy NAND with default configuration (MT29F2G, quad bus)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Raw contents of a page, including the spare area
    pub fn page(&self, page: u32) -> Vec<u8> {
        self.pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| vec![0xFF; self.config.raw_page_size()])
    }

    /// Make the next page read of `page` report `field` in the ECC bits of
    /// the status register
    pub fn inject_ecc(&mut self, page: u32, field: u8) {
        self.ecc_faults.insert(page, field & 0x0F);
    }

    /// Current status register value
    pub fn status(&self) -> u8 {
        let mut status = self.ecc_field << opcodes::STATUS_ECC_SHIFT;
        if self.write_enabled {
            status |= opcodes::STATUS_WEL;
        }
        if self.erase_failed {
            status |= opcodes::STATUS_E_FAIL;
        }
        if self.program_failed {
            status |= opcodes::STATUS_P_FAIL;
        }
        status
    }

    fn header<'l>(legs: &'l [Leg<'_>]) -> Result<&'l [u8], DummyError> {
        match legs.first() {
            Some(Leg::Write {
                data,
                width: LaneWidth::Single,
            }) if !data.is_empty() => Ok(*data),
            Some(Leg::Write { data, .. }) if !data.is_empty() => Err(DummyError::LaneWidth {
                opcode: data[0],
                lines: legs[0].width().lines(),
            }),
            _ => Err(DummyError::MalformedCommand(0)),
        }
    }

    fn row(op: u8, cmd: &[u8]) -> Result<u32, DummyError> {
        match cmd {
            [_, a, b, c] => Ok(decode_row([*a, *b, *c])),
            _ => Err(DummyError::MalformedCommand(op)),
        }
    }

    fn column(op: u8, cmd: &[u8]) -> Result<usize, DummyError> {
        match cmd {
            [_, hi, lo] | [_, _, hi, lo] | [_, _, hi, lo, _] => {
                Ok(u16::from_be_bytes([*hi, *lo]) as usize)
            }
            _ => Err(DummyError::MalformedCommand(op)),
        }
    }

    fn allowed(
        op: u8,
        width: LaneWidth,
        expected: LaneWidth,
        max: LaneWidth,
    ) -> Result<(), DummyError> {
        if width != expected || width.lines() > max.lines() {
            log::warn!(
                "dummy: opcode 0x{:02X} with {} lines refused",
                op,
                width.lines()
            );
            return Err(DummyError::LaneWidth {
                opcode: op,
                lines: width.lines(),
            });
        }
        Ok(())
    }

    fn read_register(&self, reg: u8) -> u8 {
        match reg {
            opcodes::REG_PROTECTION => self.protection,
            opcodes::REG_CONFIG => self.configuration,
            opcodes::REG_STATUS => self.status(),
            _ => 0,
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        match reg {
            opcodes::REG_PROTECTION => self.protection = value,
            opcodes::REG_CONFIG => self.configuration = value,
            // Status is read-only
            _ => log::debug!("dummy: write to reg 0x{:02X} ignored", reg),
        }
    }

    fn handle_page_read(&mut self, page: u32) {
        let raw = self.config.raw_page_size();
        match self.pages.get(&page) {
            Some(data) => self.cache.copy_from_slice(data),
            None => self.cache = vec![0xFF; raw],
        }
        self.ecc_field = if self.configuration & opcodes::CONFIG_ECC_EN != 0 {
            self.ecc_faults.remove(&page).unwrap_or(0)
        } else {
            0
        };
    }

    fn writable(&self, page: u32) -> bool {
        self.write_enabled
            && self.protection & PROTECTION_LOCK_MASK == 0
            && page < self.config.page_count
    }

    fn handle_program_exec(&mut self, page: u32) {
        if !self.writable(page) {
            log::debug!("dummy: program of page 0x{:X} failed", page);
            self.program_failed = true;
            self.write_enabled = false;
            return;
        }

        let raw = self.config.raw_page_size();
        let stored = self.pages.entry(page).or_insert_with(|| vec![0xFF; raw]);
        // NAND programming can only change 1 -> 0
        for (byte, &new) in stored.iter_mut().zip(&self.cache) {
            *byte &= new;
        }
        self.program_failed = false;
        self.write_enabled = false;
    }

    fn handle_block_erase(&mut self, page: u32) {
        if !self.writable(page) {
            log::debug!("dummy: erase at page 0x{:X} failed", page);
            self.erase_failed = true;
            self.write_enabled = false;
            return;
        }

        let first = page - page % self.config.pages_per_block;
        let last = first + self.config.pages_per_block;
        self.pages.retain(|&p, _| p < first || p >= last);
        self.erase_failed = false;
        self.write_enabled = false;
    }

    fn handle_program_load(
        &mut self,
        op: u8,
        cmd: &[u8],
        data: &[u8],
        reset: bool,
    ) -> Result<(), DummyError> {
        let offset = Self::column(op, cmd)?;
        if reset {
            self.cache.fill(0xFF);
        }
        let end = core::cmp::min(offset + data.len(), self.cache.len());
        if offset < end {
            self.cache[offset..end].copy_from_slice(&data[..end - offset]);
        }
        Ok(())
    }

    fn handle_read_cache(&self, op: u8, cmd: &[u8], buf: &mut [u8]) -> Result<(), DummyError> {
        let offset = Self::column(op, cmd)?;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.cache.get(offset + i).copied().unwrap_or(0xFF);
        }
        Ok(())
    }
}

impl SpiBus for DummyNand {
    type Error = DummyError;

    fn mode(&self) -> BusMode {
        self.config.bus_mode
    }

    fn transfer(&mut self, legs: &mut [Leg<'_>]) -> Result<(), DummyError> {
        let cmd: Vec<u8> = Self::header(legs)?.to_vec();
        let op = cmd[0];
        let max_tx = LaneWidth::for_tx(self.config.bus_mode);
        let max_rx = LaneWidth::for_rx(self.config.bus_mode);

        match (op, legs.get_mut(1)) {
            (opcodes::RESET, None) => {
                self.write_enabled = false;
                self.erase_failed = false;
                self.program_failed = false;
                self.ecc_field = 0;
                self.cache.fill(0xFF);
                Ok(())
            }
            (opcodes::WRITE_ENABLE, None) => {
                self.write_enabled = true;
                Ok(())
            }
            (opcodes::WRITE_DISABLE, None) => {
                self.write_enabled = false;
                Ok(())
            }
            (opcodes::READ_ID, Some(Leg::Read { buf, width })) => {
                Self::allowed(op, *width, LaneWidth::Single, max_rx)?;
                let id = [self.config.manufacturer_id, self.config.device_id];
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = id.get(i).copied().unwrap_or(0);
                }
                log::trace!(
                    "dummy: read id ({})",
                    manufacturer::name(id[0]).unwrap_or("unknown vendor")
                );
                Ok(())
            }
            (opcodes::GET_FEATURE, Some(Leg::Read { buf, width })) if cmd.len() == 2 => {
                Self::allowed(op, *width, LaneWidth::Single, max_rx)?;
                buf.fill(self.read_register(cmd[1]));
                Ok(())
            }
            (opcodes::SET_FEATURE, Some(Leg::Write { data, width })) if cmd.len() == 2 => {
                Self::allowed(op, *width, LaneWidth::Single, max_tx)?;
                let value = *data.first().ok_or(DummyError::MalformedCommand(op))?;
                self.write_register(cmd[1], value);
                Ok(())
            }
            (opcodes::PAGE_READ, None) => {
                let page = Self::row(op, &cmd)?;
                self.handle_page_read(page);
                Ok(())
            }
            (opcodes::PROGRAM_EXEC, None) => {
                let page = Self::row(op, &cmd)?;
                self.handle_program_exec(page);
                Ok(())
            }
            (opcodes::BLOCK_ERASE, None) => {
                let page = Self::row(op, &cmd)?;
                self.handle_block_erase(page);
                Ok(())
            }
            (
                opcodes::PROGRAM_LOAD | opcodes::PROGRAM_LOAD_RANDOM,
                Some(Leg::Write { data, width }),
            ) => {
                Self::allowed(op, *width, LaneWidth::Single, max_tx)?;
                self.handle_program_load(op, &cmd, data, op == opcodes::PROGRAM_LOAD)
            }
            (
                opcodes::PROGRAM_LOAD_X4 | opcodes::PROGRAM_LOAD_RANDOM_X4,
                Some(Leg::Write { data, width }),
            ) => {
                Self::allowed(op, *width, LaneWidth::Quad, max_tx)?;
                self.handle_program_load(op, &cmd, data, op == opcodes::PROGRAM_LOAD_X4)
            }
            (opcodes::READ_CACHE | opcodes::FAST_READ_CACHE, Some(Leg::Read { buf, width })) => {
                Self::allowed(op, *width, LaneWidth::Single, max_rx)?;
                self.handle_read_cache(op, &cmd, buf)
            }
            (opcodes::READ_CACHE_X2, Some(Leg::Read { buf, width })) => {
                Self::allowed(op, *width, LaneWidth::Dual, max_rx)?;
                self.handle_read_cache(op, &cmd, buf)
            }
            (opcodes::READ_CACHE_X4, Some(Leg::Read { buf, width })) => {
                Self::allowed(op, *width, LaneWidth::Quad, max_rx)?;
                self.handle_read_cache(op, &cmd, buf)
            }
            (
                opcodes::RESET
                | opcodes::WRITE_ENABLE
                | opcodes::WRITE_DISABLE
                | opcodes::READ_ID
                | opcodes::GET_FEATURE
                | opcodes::SET_FEATURE
                | opcodes::PAGE_READ
                | opcodes::PROGRAM_EXEC
                | opcodes::BLOCK_ERASE
                | opcodes::PROGRAM_LOAD
                | opcodes::PROGRAM_LOAD_RANDOM
                | opcodes::PROGRAM_LOAD_X4
                | opcodes::PROGRAM_LOAD_RANDOM_X4
                | opcodes::READ_CACHE
                | opcodes::FAST_READ_CACHE
                | opcodes::READ_CACHE_X2
                | opcodes::READ_CACHE_X4,
                _,
            ) => Err(DummyError::MalformedCommand(op)),

            // Unknown opcode
            _ => Err(DummyError::UnsupportedOpcode(op)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinand_core::device::{SpiNand, State, StatusFlags};
    use spinand_core::ecc::{EccStatus, Variant};
    use spinand_core::{Error, ProtocolError};

    fn identified(config: DummyConfig) -> SpiNand<DummyNand> {
        let mut nand = SpiNand::new(DummyNand::new(config), Variant::Generic);
        nand.reset().unwrap();
        nand.identify().unwrap();
        nand.unlock_all().unwrap();
        nand
    }

    fn program(nand: &mut SpiNand<DummyNand>, page: u32, data: &[u8]) {
        nand.store_cache(0, data).unwrap();
        nand.write_enable().unwrap();
        nand.write_page(page).unwrap();
        assert!(!nand.is_busy().unwrap());
    }

    fn read(nand: &mut SpiNand<DummyNand>, page: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        nand.load_page(page).unwrap();
        nand.read_cache(0, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_identify() {
        let nand = identified(DummyConfig::default());
        assert_eq!(nand.state(), State::Ready(&BUILTIN_CHIPS[3]));

        for chip in BUILTIN_CHIPS {
            let bus = DummyNand::new(DummyConfig::from_chip(chip));
            let mut nand = SpiNand::new(bus, Variant::Generic);
            assert_eq!(nand.identify().unwrap(), chip);
        }
    }

    #[test]
    fn test_unknown_id() {
        let config = DummyConfig {
            manufacturer_id: 0xEF,
            device_id: 0xAA,
            ..DummyConfig::default()
        };
        let mut nand = SpiNand::new(DummyNand::new(config), Variant::Generic);
        assert!(matches!(
            nand.identify(),
            Err(Error::Protocol(ProtocolError::UnknownDevice {
                manufacturer: 0xEF,
                device: 0xAA
            }))
        ));
        assert!(matches!(
            nand.reset(),
            Err(Error::Protocol(ProtocolError::DeviceUnusable))
        ));
    }

    #[test]
    fn test_program_and_read() {
        for mode in [BusMode::empty(), BusMode::DUAL, BusMode::QUAD, BusMode::RX_QUAD] {
            let mut nand = identified(DummyConfig {
                bus_mode: mode,
                ..DummyConfig::default()
            });

            let data: Vec<u8> = (0..2048u32).map(|i| (i * 7) as u8).collect();
            program(&mut nand, 70, &data);
            assert_eq!(read(&mut nand, 70, data.len()), data);
            assert_eq!(nand.ecc_status().unwrap(), EccStatus::Corrected(0));
            // Neighbouring page untouched
            assert!(read(&mut nand, 71, 16).iter().all(|&b| b == 0xFF));
        }
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut nand = identified(DummyConfig::default());
        program(&mut nand, 5, &[0xF0, 0x0F]);
        program(&mut nand, 5, &[0x3C, 0xFF]);
        assert_eq!(read(&mut nand, 5, 2), [0x30, 0x0F]);
    }

    #[test]
    fn test_random_load_keeps_cache() {
        let mut nand = identified(DummyConfig::default());
        nand.store_cache(0, &[0x11, 0x22, 0x33]).unwrap();
        nand.store_cache_random(1, &[0x00]).unwrap();
        nand.write_enable().unwrap();
        nand.write_page(9).unwrap();

        // Spare area is reachable through the column address
        nand.store_cache(2048, &[0xA5]).unwrap();
        nand.write_enable().unwrap();
        nand.write_page(10).unwrap();

        let bus = nand.release();
        assert_eq!(bus.page(9)[..4], [0x11, 0x00, 0x33, 0xFF]);
        assert_eq!(bus.page(10)[2048], 0xA5);
    }

    #[test]
    fn test_erase() {
        let mut nand = identified(DummyConfig::default());
        program(&mut nand, 64, &[0x00; 32]);
        program(&mut nand, 127, &[0x00; 32]);
        program(&mut nand, 128, &[0x00; 32]);

        nand.write_enable().unwrap();
        nand.block_erase(100).unwrap();
        assert!(!nand.status_flags().unwrap().contains(StatusFlags::E_FAIL));

        assert!(read(&mut nand, 64, 32).iter().all(|&b| b == 0xFF));
        assert!(read(&mut nand, 127, 32).iter().all(|&b| b == 0xFF));
        assert_eq!(read(&mut nand, 128, 32), [0x00; 32]);
    }

    #[test]
    fn test_write_enable_required() {
        let mut nand = identified(DummyConfig::default());
        nand.store_cache(0, &[0x00]).unwrap();
        nand.write_page(3).unwrap();
        assert!(nand.status_flags().unwrap().contains(StatusFlags::P_FAIL));

        nand.block_erase(0).unwrap();
        assert!(nand.status_flags().unwrap().contains(StatusFlags::E_FAIL));

        nand.reset().unwrap();
        assert!(nand.status_flags().unwrap().is_empty());
        assert_eq!(read(&mut nand, 3, 1), [0xFF]);
    }

    #[test]
    fn test_locked_after_power_up() {
        let mut nand = SpiNand::new(DummyNand::new_default(), Variant::Generic);
        nand.identify().unwrap();
        nand.store_cache(0, &[0x00]).unwrap();
        nand.write_enable().unwrap();
        nand.write_page(0).unwrap();
        assert!(nand.status_flags().unwrap().contains(StatusFlags::P_FAIL));
    }

    #[test]
    fn test_ecc_injection() {
        let mut nand = identified(DummyConfig::from_chip(&BUILTIN_CHIPS[0]));
        nand.bus_mut().inject_ecc(4, 0b111);
        nand.bus_mut().inject_ecc(5, 0b011);

        read(&mut nand, 4, 8);
        assert_eq!(nand.ecc_status().unwrap(), EccStatus::Uncorrectable);
        read(&mut nand, 5, 8);
        assert_eq!(nand.ecc_status().unwrap(), EccStatus::Corrected(5));
        // Faults are one-shot
        read(&mut nand, 4, 8);
        assert_eq!(nand.ecc_status().unwrap(), EccStatus::Corrected(0));

        // No ECC reporting with on-die ECC off
        nand.set_ecc_enabled(false).unwrap();
        nand.bus_mut().inject_ecc(4, 0b111);
        read(&mut nand, 4, 8);
        assert_eq!(nand.ecc_status().unwrap(), EccStatus::Corrected(0));
    }

    #[test]
    fn test_rejects_wide_lanes() {
        // The bus claims single only; a quad read must be refused
        let mut dummy = DummyNand::new(DummyConfig {
            bus_mode: BusMode::empty(),
            ..DummyConfig::default()
        });
        let mut buf = [0u8; 4];
        let mut legs = [
            Leg::Write {
                data: &[opcodes::READ_CACHE_X4, 0, 0, 0, 0],
                width: LaneWidth::Single,
            },
            Leg::Read {
                buf: &mut buf,
                width: LaneWidth::Quad,
            },
        ];
        assert_eq!(
            dummy.transfer(&mut legs),
            Err(DummyError::LaneWidth {
                opcode: opcodes::READ_CACHE_X4,
                lines: 4
            })
        );
    }

    #[test]
    fn test_rejects_unknown_opcode() {
        let mut dummy = DummyNand::new_default();
        let mut legs = [Leg::Write {
            data: &[0xAB],
            width: LaneWidth::Single,
        }];
        assert_eq!(dummy.transfer(&mut legs), Err(DummyError::UnsupportedOpcode(0xAB)));

        // Known opcode with a missing data leg
        let mut legs = [Leg::Write {
            data: &[opcodes::GET_FEATURE, opcodes::REG_STATUS],
            width: LaneWidth::Single,
        }];
        assert_eq!(
            dummy.transfer(&mut legs),
            Err(DummyError::MalformedCommand(opcodes::GET_FEATURE))
        );
    }
}
