//! Error types for spinand-core
//!
//! Two levels: [`ProtocolError`] covers everything this layer detects on
//! its own (malformed descriptors, out of range addresses, identification
//! failures) and is `Copy` and `no_std`. [`Error`] adds the transport's own
//! error type, which is carried through untouched.

use core::fmt;

/// Errors raised by the protocol layer itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Command descriptor is empty or longer than the command buffer
    InvalidCommand,
    /// Descriptor asks to transmit and receive data in the same command
    ConflictingDirection,
    /// Page address does not fit in the 24-bit row address field, or lies
    /// beyond the identified chip
    AddressOutOfRange(u32),
    /// Provided buffer is too small for the operation
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes provided
        got: usize,
    },
    /// ID read did not match any known device
    UnknownDevice {
        /// Manufacturer byte
        manufacturer: u8,
        /// Device byte
        device: u8,
    },
    /// Operation requires an identified device
    NotIdentified,
    /// Identification failed earlier; the instance accepts no more commands
    DeviceUnusable,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand => write!(f, "invalid command descriptor"),
            Self::ConflictingDirection => {
                write!(f, "cannot send and receive data in the same command")
            }
            Self::AddressOutOfRange(addr) => write!(f, "page address 0x{:X} out of range", addr),
            Self::BufferTooSmall { needed, got } => {
                write!(f, "buffer too small: need {} bytes, got {}", needed, got)
            }
            Self::UnknownDevice {
                manufacturer,
                device,
            } => write!(
                f,
                "unknown device (manufacturer 0x{:02X}, device 0x{:02X})",
                manufacturer, device
            ),
            Self::NotIdentified => write!(f, "device has not been identified"),
            Self::DeviceUnusable => write!(f, "device failed identification and is unusable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

/// Error returned by operations that reach the bus
///
/// `E` is the bus implementation's error type, passed through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Rejected by the protocol layer before or after the transfer
    Protocol(ProtocolError),
    /// The bus transfer itself failed
    Transport(E),
}

impl<E> Error<E> {
    /// Returns the protocol error, if this is one
    pub fn protocol(&self) -> Option<ProtocolError> {
        match self {
            Self::Protocol(e) => Some(*e),
            Self::Transport(_) => None,
        }
    }
}

impl<E> From<ProtocolError> for Error<E> {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "{}", e),
            Self::Transport(e) => write!(f, "SPI transfer failed: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

/// Result type alias using the core Error type
pub type Result<T, E> = core::result::Result<T, Error<E>>;
