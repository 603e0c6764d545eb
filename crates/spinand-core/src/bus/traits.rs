//! Bus trait definitions
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - By default, traits are async (suitable for Embassy, tokio)
//! - With the `is_sync` feature, traits become synchronous

use crate::spi::LaneWidth;
use bitflags::bitflags;
use maybe_async::maybe_async;

bitflags! {
    /// Negotiated multi-line capabilities of the bus
    ///
    /// Transmit and receive are independent. Naming follows the Linux
    /// `SPI_TX_*` / `SPI_RX_*` mode bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BusMode: u32 {
        /// Can transmit on two lines
        const TX_DUAL = 1 << 0;
        /// Can transmit on four lines
        const TX_QUAD = 1 << 1;
        /// Can receive on two lines
        const RX_DUAL = 1 << 2;
        /// Can receive on four lines
        const RX_QUAD = 1 << 3;

        /// Shorthand for dual in both directions
        const DUAL = Self::TX_DUAL.bits() | Self::RX_DUAL.bits();
        /// Shorthand for quad in both directions
        const QUAD = Self::TX_QUAD.bits() | Self::RX_QUAD.bits();
    }
}

impl Default for BusMode {
    fn default() -> Self {
        BusMode::empty()
    }
}

impl BusMode {
    /// Build a bus mode from transmit and receive line counts
    pub fn from_widths(tx: LaneWidth, rx: LaneWidth) -> Self {
        let mut mode = BusMode::empty();
        match tx {
            LaneWidth::Single => {}
            LaneWidth::Dual => mode |= BusMode::TX_DUAL,
            LaneWidth::Quad => mode |= BusMode::TX_QUAD,
        }
        match rx {
            LaneWidth::Single => {}
            LaneWidth::Dual => mode |= BusMode::RX_DUAL,
            LaneWidth::Quad => mode |= BusMode::RX_QUAD,
        }
        mode
    }
}

/// One direction of a bus transaction
#[derive(Debug)]
pub enum Leg<'a> {
    /// Clock `data` out
    Write {
        /// Bytes to transmit
        data: &'a [u8],
        /// Lines to transmit on
        width: LaneWidth,
    },
    /// Clock `buf.len()` bytes in
    Read {
        /// Buffer to fill
        buf: &'a mut [u8],
        /// Lines to receive on
        width: LaneWidth,
    },
}

impl Leg<'_> {
    /// Lane width of this leg
    pub fn width(&self) -> LaneWidth {
        match self {
            Self::Write { width, .. } | Self::Read { width, .. } => *width,
        }
    }

    /// Number of bytes in this leg
    pub fn len(&self) -> usize {
        match self {
            Self::Write { data, .. } => data.len(),
            Self::Read { buf, .. } => buf.len(),
        }
    }

    /// Returns true if the leg carries no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SPI bus trait (sync or async depending on `is_sync` feature)
///
/// This is the only thing the protocol layer needs from the transport.
/// - With `is_sync` feature: blocking/synchronous
/// - Without `is_sync` feature: async (for Embassy, tokio)
///
/// ## Contract
///
/// `transfer` must clock every leg in order within one chip-select
/// assertion. No other traffic may be interleaved between the legs of one
/// call; locking against other users of the bus is the implementation's
/// job. Failures are reported as `Self::Error` and are handed back to the
/// caller unchanged.
///
/// ## Example
///
/// ```ignore
/// #[maybe_async(AFIT)]
/// impl SpiBus for MyController {
///     type Error = MyError;
///
///     fn mode(&self) -> BusMode {
///         BusMode::RX_QUAD | BusMode::TX_QUAD
///     }
///
///     async fn transfer(&mut self, legs: &mut [Leg<'_>]) -> Result<(), MyError> {
///         self.assert_cs();
///         for leg in legs.iter_mut() {
///             match leg {
///                 Leg::Write { data, width } => self.shift_out(data, width.lines()).await?,
///                 Leg::Read { buf, width } => self.shift_in(buf, width.lines()).await?,
///             }
///         }
///         self.release_cs();
///         Ok(())
///     }
/// }
/// ```
#[maybe_async(AFIT)]
pub trait SpiBus {
    /// Error reported by the transport
    type Error: core::fmt::Debug;

    /// Currently negotiated lane capabilities
    fn mode(&self) -> BusMode;

    /// Execute `legs` as one indivisible transaction
    async fn transfer(&mut self, legs: &mut [Leg<'_>]) -> Result<(), Self::Error>;
}
