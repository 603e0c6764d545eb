//! SPI NAND command descriptor and builders

use super::address::{encode_column, encode_row};
use super::{opcodes, LaneWidth};
use crate::bus::BusMode;
use crate::ecc::Variant;
use crate::error::ProtocolError;

/// Longest command/address/dummy sequence any SPI NAND command needs
pub const MAX_COMMAND_LEN: usize = 5;

/// A single SPI NAND command
///
/// Built fresh for every operation and consumed by
/// [`send_command`](crate::protocol::send_command). The command bytes
/// (opcode, address, dummy bytes) always go out on a single lane; the
/// widths only apply to the data leg.
///
/// The lifetime parameter `'a` ties the command to the buffers it references.
#[derive(Debug, Default)]
pub struct SpiNandCommand<'a> {
    cmd: [u8; MAX_COMMAND_LEN],
    cmd_len: u8,

    /// Data to transmit after the command bytes
    pub tx: Option<&'a [u8]>,

    /// Buffer to receive into after the command bytes
    pub rx: Option<&'a mut [u8]>,

    /// Lane width of the transmit leg
    pub tx_width: LaneWidth,

    /// Lane width of the receive leg
    pub rx_width: LaneWidth,
}

impl<'a> SpiNandCommand<'a> {
    fn from_array<const N: usize>(bytes: [u8; N]) -> Self {
        const { assert!(N > 0 && N <= MAX_COMMAND_LEN) };
        let mut cmd = [0u8; MAX_COMMAND_LEN];
        cmd[..N].copy_from_slice(&bytes);
        Self {
            cmd,
            cmd_len: N as u8,
            ..Default::default()
        }
    }

    fn row_command(opcode: u8, page: u32) -> Result<Self, ProtocolError> {
        let [a2, a1, a0] = encode_row(page)?;
        Ok(Self::from_array([opcode, a2, a1, a0]))
    }

    /// Create a command from raw command/address bytes with no data phase
    pub fn new(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() || bytes.len() > MAX_COMMAND_LEN {
            return Err(ProtocolError::InvalidCommand);
        }
        let mut cmd = [0u8; MAX_COMMAND_LEN];
        cmd[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            cmd,
            cmd_len: bytes.len() as u8,
            ..Default::default()
        })
    }

    /// Create a single-opcode command (e.g. WRITE_ENABLE)
    pub fn simple(opcode: u8) -> Self {
        Self::from_array([opcode])
    }

    /// Reset the device
    pub fn reset() -> Self {
        Self::simple(opcodes::RESET)
    }

    /// Set the write enable latch
    pub fn write_enable() -> Self {
        Self::simple(opcodes::WRITE_ENABLE)
    }

    /// Clear the write enable latch
    pub fn write_disable() -> Self {
        Self::simple(opcodes::WRITE_DISABLE)
    }

    /// Read one feature register into `buf`
    pub fn read_register(reg: u8, buf: &'a mut [u8; 1]) -> Self {
        let mut cmd = Self::from_array([opcodes::GET_FEATURE, reg]);
        cmd.rx = Some(buf.as_mut_slice());
        cmd
    }

    /// Write `value` to one feature register
    pub fn write_register(reg: u8, value: &'a u8) -> Self {
        let mut cmd = Self::from_array([opcodes::SET_FEATURE, reg]);
        cmd.tx = Some(core::slice::from_ref(value));
        cmd
    }

    /// Program the cache register into `page`
    pub fn write_page(page: u32) -> Result<Self, ProtocolError> {
        Self::row_command(opcodes::PROGRAM_EXEC, page)
    }

    /// Read `page` from the array into the cache register
    pub fn load_page(page: u32) -> Result<Self, ProtocolError> {
        Self::row_command(opcodes::PAGE_READ, page)
    }

    /// Erase the block containing `page`
    pub fn block_erase(page: u32) -> Result<Self, ProtocolError> {
        Self::row_command(opcodes::BLOCK_ERASE, page)
    }

    /// Load `data` into the cache register at `offset`
    ///
    /// The rest of the cache is reset to 0xFF by the device. Uses the x4
    /// load when the bus can transmit on four lines.
    pub fn store_cache(mode: BusMode, offset: u16, data: &'a [u8]) -> Self {
        Self::program_load(
            mode,
            offset,
            data,
            opcodes::PROGRAM_LOAD,
            opcodes::PROGRAM_LOAD_X4,
        )
    }

    /// Load `data` into the cache register at `offset`, keeping the rest
    /// of the cache untouched
    pub fn store_cache_random(mode: BusMode, offset: u16, data: &'a [u8]) -> Self {
        Self::program_load(
            mode,
            offset,
            data,
            opcodes::PROGRAM_LOAD_RANDOM,
            opcodes::PROGRAM_LOAD_RANDOM_X4,
        )
    }

    fn program_load(mode: BusMode, offset: u16, data: &'a [u8], x1: u8, x4: u8) -> Self {
        let [hi, lo] = encode_column(offset);
        // Program load only has x1 and x4 forms; dual transmit falls back to x1
        let quad = mode.contains(BusMode::TX_QUAD);
        let opcode = if quad { x4 } else { x1 };
        let mut cmd = Self::from_array([opcode, hi, lo]);
        cmd.tx = Some(data);
        cmd.tx_width = if quad {
            LaneWidth::Quad
        } else {
            LaneWidth::Single
        };
        cmd
    }

    /// Read `buf.len()` bytes from the cache register starting at `offset`
    ///
    /// Opcode and dummy bytes follow the receive width of the bus:
    /// - quad: `[0x6B, dummy, off_hi, off_lo, dummy]`, 4 lines
    /// - dual: `[0x3B, dummy, off_hi, off_lo, dummy]`, 2 lines
    /// - single: `[0x03, dummy, off_hi, off_lo]`, 1 line
    pub fn read_cache(mode: BusMode, offset: u16, buf: &'a mut [u8]) -> Self {
        let [hi, lo] = encode_column(offset);
        let width = LaneWidth::for_rx(mode);
        let mut cmd = match width {
            LaneWidth::Quad => Self::from_array([opcodes::READ_CACHE_X4, 0, hi, lo, 0]),
            LaneWidth::Dual => Self::from_array([opcodes::READ_CACHE_X2, 0, hi, lo, 0]),
            LaneWidth::Single => Self::from_array([opcodes::READ_CACHE, 0, hi, lo]),
        };
        cmd.rx = Some(buf);
        cmd.rx_width = width;
        cmd
    }

    /// Read the manufacturer and device ID bytes
    ///
    /// `buf` must hold at least [`Variant::read_id_len`] bytes; only that
    /// many are clocked in.
    pub fn read_id(variant: Variant, buf: &'a mut [u8]) -> Result<Self, ProtocolError> {
        let needed = variant.read_id_len();
        if buf.len() < needed {
            return Err(ProtocolError::BufferTooSmall {
                needed,
                got: buf.len(),
            });
        }
        let mut cmd = Self::simple(opcodes::READ_ID);
        cmd.rx = Some(&mut buf[..needed]);
        Ok(cmd)
    }

    /// The command, address and dummy bytes
    pub fn bytes(&self) -> &[u8] {
        &self.cmd[..self.cmd_len as usize]
    }

    /// The opcode byte, if the command is not empty
    pub fn opcode(&self) -> Option<u8> {
        self.bytes().first().copied()
    }

    /// Returns true if this command has a transmit phase
    pub fn has_tx(&self) -> bool {
        self.tx.is_some()
    }

    /// Returns true if this command has a receive phase
    pub fn has_rx(&self) -> bool {
        self.rx.is_some()
    }

    /// Total number of bytes clocked for this command
    pub fn total_bytes(&self) -> usize {
        let tx = self.tx.map_or(0, |d| d.len());
        let rx = self.rx.as_ref().map_or(0, |b| b.len());
        self.bytes().len() + tx + rx
    }
}
