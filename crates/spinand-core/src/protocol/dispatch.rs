//! Command dispatch
//!
//! Turns a [`SpiNandCommand`] into one bus transaction: the command leg
//! first, then at most one data leg.

use crate::bus::{Leg, SpiBus};
use crate::error::{Error, ProtocolError, Result};
use crate::spi::{LaneWidth, SpiNandCommand};
use maybe_async::maybe_async;

/// Execute one command as a single bus transaction
///
/// Empty commands and commands that both transmit and receive are
/// rejected before the bus is touched. A zero-length data phase is
/// dropped rather than sent as an empty leg. Transport errors are
/// returned unchanged; nothing is retried.
#[maybe_async]
pub async fn send_command<B: SpiBus + ?Sized>(
    bus: &mut B,
    mut cmd: SpiNandCommand<'_>,
) -> Result<(), B::Error> {
    if cmd.bytes().is_empty() {
        log::error!("spinand: cannot send an empty command");
        return Err(ProtocolError::InvalidCommand.into());
    }

    let data = match (cmd.tx, cmd.rx.take()) {
        (Some(_), Some(_)) => {
            log::error!("spinand: cannot send and receive data at the same time");
            return Err(ProtocolError::ConflictingDirection.into());
        }
        (Some(data), None) if !data.is_empty() => Some(Leg::Write {
            data,
            width: cmd.tx_width,
        }),
        (None, Some(buf)) if !buf.is_empty() => Some(Leg::Read {
            buf,
            width: cmd.rx_width,
        }),
        _ => None,
    };

    // Command and address stay in one leg; splitting them has been seen
    // to cause I/O errors on real controllers
    let header = Leg::Write {
        data: cmd.bytes(),
        width: LaneWidth::Single,
    };

    log::trace!(
        "spinand: cmd {:02X?} data {:?}",
        cmd.bytes(),
        data.as_ref().map(|leg| (leg.len(), leg.width().lines()))
    );

    let result = match data {
        Some(leg) => bus.transfer(&mut [header, leg]).await,
        None => bus.transfer(&mut [header]).await,
    };
    result.map_err(Error::Transport)
}
