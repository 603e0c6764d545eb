//! Row (page) and column address packing

use crate::error::ProtocolError;

/// Number of bytes in a row address
pub const ROW_ADDRESS_BYTES: usize = 3;

/// Largest page address the 24-bit row field can carry
pub const MAX_ROW_ADDRESS: u32 = 0x00FF_FFFF;

/// Encode a page address as 3 big-endian bytes
///
/// Addresses wider than 24 bits are rejected rather than truncated.
pub fn encode_row(page: u32) -> Result<[u8; ROW_ADDRESS_BYTES], ProtocolError> {
    if page > MAX_ROW_ADDRESS {
        return Err(ProtocolError::AddressOutOfRange(page));
    }
    Ok([(page >> 16) as u8, (page >> 8) as u8, page as u8])
}

/// Decode 3 big-endian row address bytes
pub const fn decode_row(bytes: [u8; ROW_ADDRESS_BYTES]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
}

/// Encode a byte offset within the cache register as 2 big-endian bytes
pub const fn encode_column(offset: u16) -> [u8; 2] {
    offset.to_be_bytes()
}
