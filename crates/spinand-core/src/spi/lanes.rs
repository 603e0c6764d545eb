//! SPI lane widths

use crate::bus::BusMode;

/// Number of data lines used for one leg of a transfer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LaneWidth {
    /// Standard SPI, one line per direction
    #[default]
    Single,
    /// Two data lines
    Dual,
    /// Four data lines
    Quad,
}

impl LaneWidth {
    /// Returns the number of data lines
    pub const fn lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
            Self::Quad => 4,
        }
    }

    /// Build a lane width from a line count, if it is one of 1, 2 or 4
    pub const fn from_lines(lines: u8) -> Option<Self> {
        match lines {
            1 => Some(Self::Single),
            2 => Some(Self::Dual),
            4 => Some(Self::Quad),
            _ => None,
        }
    }

    /// Width used for data the host transmits in the given bus mode
    ///
    /// Quad takes priority over dual.
    pub const fn for_tx(mode: BusMode) -> Self {
        if mode.contains(BusMode::TX_QUAD) {
            Self::Quad
        } else if mode.contains(BusMode::TX_DUAL) {
            Self::Dual
        } else {
            Self::Single
        }
    }

    /// Width used for data the host receives in the given bus mode
    ///
    /// Quad takes priority over dual.
    pub const fn for_rx(mode: BusMode) -> Self {
        if mode.contains(BusMode::RX_QUAD) {
            Self::Quad
        } else if mode.contains(BusMode::RX_DUAL) {
            Self::Dual
        } else {
            Self::Single
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_wins_over_dual() {
        let mode = BusMode::RX_DUAL | BusMode::RX_QUAD | BusMode::TX_DUAL;
        assert_eq!(LaneWidth::for_rx(mode), LaneWidth::Quad);
        assert_eq!(LaneWidth::for_tx(mode), LaneWidth::Dual);
        assert_eq!(LaneWidth::for_tx(BusMode::empty()), LaneWidth::Single);
    }

    #[test]
    fn test_lines() {
        for width in [LaneWidth::Single, LaneWidth::Dual, LaneWidth::Quad] {
            assert_eq!(LaneWidth::from_lines(width.lines()), Some(width));
        }
        assert_eq!(LaneWidth::from_lines(3), None);
    }
}
