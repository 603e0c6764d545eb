//! Erase command implementation

use spinand_core::device::StatusFlags;

use super::{
    block_progress, resolve_range, wait_ready, CmdResult, CommandError, Nand, ERASE_TIMEOUT,
};

/// Run the erase command
pub fn run_erase(nand: &mut Nand, start: u32, count: Option<u32>) -> CmdResult {
    let chip = nand.chip().ok_or("Chip not identified")?;
    let count = resolve_range(start, count, chip.geometry.block_count(), "blocks")?;

    nand.unlock_all()?;
    erase_blocks(nand, start, count)?;

    println!("Erased {} blocks starting at block {}", count, start);
    Ok(())
}

/// Erase `count` blocks starting at block `start`
///
/// Stops at the first block whose erase reports E_FAIL.
pub fn erase_blocks(nand: &mut Nand, start: u32, count: u32) -> CmdResult {
    let pages_per_block = nand
        .chip()
        .ok_or("Chip not identified")?
        .geometry
        .pages_per_block();
    let pb = block_progress(count as u64, "erase")?;

    for block in start..start + count {
        nand.write_enable()?;
        nand.block_erase(block * pages_per_block)?;
        let flags = wait_ready(nand, "block erase", ERASE_TIMEOUT)?;
        if flags.contains(StatusFlags::E_FAIL) {
            pb.abandon();
            log::error!("Erase of block {} failed (status {:?})", block, flags);
            return Err(CommandError::EraseFailed(block).into());
        }
        pb.inc(1);
    }

    pb.finish_with_message("Erase complete");
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::programmers::ProgrammerBus;
    use spinand_core::device::SpiNand;
    use spinand_core::ecc::Variant;
    use spinand_dummy::DummyNand;

    #[test]
    fn test_erase_fails_while_locked() {
        let bus = ProgrammerBus::Dummy(DummyNand::new_default());
        let mut nand = SpiNand::new(bus, Variant::Generic);
        nand.identify().unwrap();

        let err = erase_blocks(&mut nand, 3, 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::EraseFailed(3))
        ));

        nand.unlock_all().unwrap();
        erase_blocks(&mut nand, 3, 2).unwrap();
    }
}
