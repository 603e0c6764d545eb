//! CLI command implementations
//!
//! Every command works on a [`Nand`]: a programmer bus wrapped in a device
//! instance. [`open_device`] resets and identifies the chip before the
//! command runs, except for `reset`, which only needs the ID.
//!
//! Busy polling lives here rather than in the protocol layer. After a page
//! read, program or erase the commands poll OIP with [`wait_ready`] and
//! give up after a fixed timeout.

mod erase;
mod list;
mod probe;
mod read;
mod reg;
mod write;

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use spinand_core::device::{SpiNand, StatusFlags};
use thiserror::Error;

use crate::cli::DeviceArgs;
use crate::programmers::{self, ProgrammerBus};

pub use erase::run_erase;
pub use list::{list_chips, list_programmers};
pub use probe::{run_probe, run_reset, run_status};
pub use read::run_read;
pub use reg::{run_reg_get, run_reg_set};
pub use write::run_write;

/// A device on whichever programmer was selected
pub type Nand = SpiNand<ProgrammerBus>;

/// Result type shared by the commands
pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Array to cache transfer, typ. 25-100 us
pub const PAGE_READ_TIMEOUT: Duration = Duration::from_millis(10);
/// Page program, typ. 200-600 us
pub const PROGRAM_TIMEOUT: Duration = Duration::from_millis(20);
/// Block erase, typ. 2-10 ms
pub const ERASE_TIMEOUT: Duration = Duration::from_millis(100);
/// Reset, up to 1.25 ms while a program or erase is aborted
pub const RESET_TIMEOUT: Duration = Duration::from_millis(5);

const POLL_INTERVAL: Duration = Duration::from_micros(50);

/// Largest cache transfer issued at once; spidev limits the buffer size
pub const CACHE_CHUNK_SIZE: usize = 2048;

/// Failures detected by the commands themselves
#[derive(Debug, Error)]
pub enum CommandError {
    /// OIP stayed set past the timeout
    #[error("Device still busy after {what} ({timeout:?})")]
    Timeout {
        what: &'static str,
        timeout: Duration,
    },

    /// Status reported P_FAIL
    #[error("Program failed at page 0x{0:X}")]
    ProgramFailed(u32),

    /// Status reported E_FAIL
    #[error("Erase failed at block {0}")]
    EraseFailed(u32),

    /// Requested range lies outside the chip
    #[error("Range {start}+{count} exceeds {limit} {unit}")]
    OutOfRange {
        start: u32,
        count: u32,
        limit: u32,
        unit: &'static str,
    },

    /// Read-back differs from what was written
    #[error("Verification failed at page 0x{page:X}, offset 0x{offset:X}")]
    VerifyFailed { page: u32, offset: usize },
}

/// Open the programmer, reset the chip and identify it
pub fn open_device(args: &DeviceArgs) -> CmdResult<Nand> {
    let bus = programmers::open_programmer(&args.programmer)?;
    let mut nand = SpiNand::new(bus, args.variant);

    nand.reset()?;
    // Status reads need an identified chip, so sleep through the reset
    std::thread::sleep(RESET_TIMEOUT);
    nand.identify()?;
    Ok(nand)
}

/// Poll the status register until OIP clears
///
/// Returns the last status read so the caller can check the fail bits.
pub fn wait_ready(
    nand: &mut Nand,
    what: &'static str,
    timeout: Duration,
) -> CmdResult<StatusFlags> {
    let start = Instant::now();
    loop {
        let flags = nand.status_flags()?;
        if !flags.contains(StatusFlags::OIP) {
            return Ok(flags);
        }
        if start.elapsed() > timeout {
            log::error!("{} did not complete within {:?}", what, timeout);
            return Err(CommandError::Timeout { what, timeout }.into());
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Clamp an optional count to what is left after `start`
pub fn resolve_range(
    start: u32,
    count: Option<u32>,
    limit: u32,
    unit: &'static str,
) -> CmdResult<u32> {
    let count = count.unwrap_or_else(|| limit.saturating_sub(start));
    if start >= limit || count == 0 || count > limit - start {
        return Err(CommandError::OutOfRange {
            start,
            count,
            limit,
            unit,
        }
        .into());
    }
    Ok(count)
}

/// Byte progress bar in the common style
pub fn byte_progress(total: u64, phase: &str) -> CmdResult<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Block progress bar
pub fn block_progress(total: u64, phase: &str) -> CmdResult<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} blocks ({{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
