//! Write command implementation

use spinand_core::chip::NandChip;
use spinand_core::device::StatusFlags;
use std::path::Path;

use super::erase::erase_blocks;
use super::read::read_pages;
use super::{
    byte_progress, resolve_range, wait_ready, CmdResult, CommandError, Nand, CACHE_CHUNK_SIZE,
    PROGRAM_TIMEOUT,
};

/// Run the write command
pub fn run_write(
    nand: &mut Nand,
    input: &Path,
    start: u32,
    oob: bool,
    no_erase: bool,
    verify: bool,
) -> CmdResult {
    let chip = nand.chip().ok_or("Chip not identified")?;
    let geo = chip.geometry;
    let page_len = if oob { geo.raw_page_size() } else { geo.page_size };
    let page_len = page_len as usize;

    let mut data = std::fs::read(input)?;
    if data.is_empty() {
        return Err(format!("Input file {:?} is empty", input).into());
    }
    let count = data.len().div_ceil(page_len) as u32;
    if data.len() % page_len != 0 {
        log::warn!(
            "Input is not a multiple of {} bytes, padding the last page with 0xFF",
            page_len
        );
    }
    data.resize(count as usize * page_len, 0xFF);
    resolve_range(start, Some(count), geo.page_count(), "pages")?;

    nand.unlock_all()?;

    if !no_erase {
        let pages_per_block = geo.pages_per_block();
        if start % pages_per_block != 0 {
            return Err(format!(
                "Start page 0x{:X} is not the first page of a block ({} pages per block); use --no-erase to program without erasing",
                start, pages_per_block
            )
            .into());
        }
        erase_blocks(nand, start / pages_per_block, count.div_ceil(pages_per_block))?;
    }

    program_pages(nand, start, &data, page_len)?;
    println!("Wrote {} pages starting at page 0x{:X}", count, start);

    if verify {
        let mut readback = vec![0u8; data.len()];
        read_pages(nand, start, &mut readback, page_len)?;
        compare_pages(chip, start, &data, &readback, page_len)?;
        println!("Verification passed");
    }

    Ok(())
}

/// Program `data` page by page starting at `start`
///
/// Pages that are all 0xFF are skipped; erased NAND already reads that way.
pub fn program_pages(nand: &mut Nand, start: u32, data: &[u8], page_len: usize) -> CmdResult {
    let pb = byte_progress(data.len() as u64, "write")?;

    for (i, page_data) in data.chunks(page_len).enumerate() {
        let page = start + i as u32;
        if page_data.iter().all(|&b| b == 0xFF) {
            log::trace!("Page 0x{:X} is blank, skipping", page);
            pb.inc(page_len as u64);
            continue;
        }

        for (j, chunk) in page_data.chunks(CACHE_CHUNK_SIZE).enumerate() {
            let offset = (j * CACHE_CHUNK_SIZE) as u16;
            if j == 0 {
                nand.store_cache(offset, chunk)?;
            } else {
                nand.store_cache_random(offset, chunk)?;
            }
        }
        nand.write_enable()?;
        nand.write_page(page)?;

        let flags = wait_ready(nand, "page program", PROGRAM_TIMEOUT)?;
        if flags.contains(StatusFlags::P_FAIL) {
            pb.abandon();
            log::error!("Program of page 0x{:X} failed (status {:?})", page, flags);
            return Err(CommandError::ProgramFailed(page).into());
        }
        pb.inc(page_len as u64);
    }

    pb.finish_with_message("Write complete");
    Ok(())
}

/// Compare written and read-back pages
///
/// When the spare area is included, bytes the on-die ECC owns are skipped.
fn compare_pages(
    chip: &NandChip,
    start: u32,
    expected: &[u8],
    actual: &[u8],
    page_len: usize,
) -> CmdResult {
    let main = chip.geometry.page_size as usize;

    for (i, (want, got)) in expected
        .chunks(page_len)
        .zip(actual.chunks(page_len))
        .enumerate()
    {
        let mismatch = want.iter().zip(got).enumerate().find(|&(offset, (a, b))| {
            a != b
                && !(offset >= main
                    && chip
                        .ecc_layout
                        .ecc_positions()
                        .any(|pos| pos as usize == offset - main))
        });
        if let Some((offset, _)) = mismatch {
            return Err(CommandError::VerifyFailed {
                page: start + i as u32,
                offset,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinand_core::chip::find_chip;

    #[test]
    fn test_compare_skips_ecc_bytes() {
        let chip = find_chip(0x2C, 0x22).unwrap();
        let raw = chip.geometry.raw_page_size() as usize;
        let expected = vec![0xFFu8; raw];

        let mut actual = expected.clone();
        // First ECC byte of the MT29F layout
        actual[2048 + 8] = 0x12;
        assert!(compare_pages(chip, 0, &expected, &actual, raw).is_ok());

        actual[2048 + 1] = 0x00;
        let err = compare_pages(chip, 5, &expected, &actual, raw).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::VerifyFailed {
                page: 5,
                offset: 2049
            })
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_program_pages_round_trip() {
        use crate::programmers::ProgrammerBus;
        use spinand_core::device::SpiNand;
        use spinand_core::ecc::Variant;
        use spinand_dummy::{DummyConfig, DummyNand};

        let config = DummyConfig::from_chip(find_chip(0xC8, 0xB4).unwrap());
        let bus = ProgrammerBus::Dummy(DummyNand::new(config));
        let mut nand = SpiNand::new(bus, Variant::Gd5f);
        nand.identify().unwrap();
        nand.unlock_all().unwrap();

        // Pages larger than one cache chunk exercise the random load path
        let page_len = 4096;
        let mut data: Vec<u8> = (0..2 * page_len).map(|i| (i % 251) as u8).collect();
        data.extend(vec![0xFF; page_len]);
        program_pages(&mut nand, 64, &data, page_len).unwrap();

        let mut readback = vec![0u8; data.len()];
        read_pages(&mut nand, 64, &mut readback, page_len).unwrap();
        assert_eq!(readback, data);

        let ProgrammerBus::Dummy(dummy) = nand.release() else {
            panic!("expected dummy bus");
        };
        assert_eq!(dummy.page(65)[..page_len], data[page_len..2 * page_len]);
        // Blank pages are never programmed
        assert!(dummy.page(66).iter().all(|&b| b == 0xFF));
    }
}
