//! Read command implementation

use spinand_core::ecc::EccStatus;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{
    byte_progress, resolve_range, wait_ready, CmdResult, Nand, CACHE_CHUNK_SIZE, PAGE_READ_TIMEOUT,
};

/// ECC outcome over a range of pages
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EccSummary {
    /// Pages with at least one corrected bit flip
    pub corrected_pages: u32,
    /// Highest number of bits corrected in a single page
    pub max_corrected: u8,
    /// Pages the on-die ECC could not correct
    pub uncorrectable: Vec<u32>,
}

impl EccSummary {
    fn record(&mut self, page: u32, status: EccStatus) {
        match status {
            EccStatus::Corrected(0) => {}
            EccStatus::Corrected(n) => {
                log::debug!("Page 0x{:X}: {} bit flips corrected", page, n);
                self.corrected_pages += 1;
                self.max_corrected = self.max_corrected.max(n);
            }
            EccStatus::Uncorrectable => {
                log::warn!("Page 0x{:X}: uncorrectable ECC error", page);
                self.uncorrectable.push(page);
            }
        }
    }
}

/// Run the read command
pub fn run_read(
    nand: &mut Nand,
    output: &Path,
    start: u32,
    count: Option<u32>,
    oob: bool,
) -> CmdResult {
    let chip = nand.chip().ok_or("Chip not identified")?;
    let count = resolve_range(start, count, chip.geometry.page_count(), "pages")?;
    let geo = chip.geometry;
    let page_len = if oob { geo.raw_page_size() } else { geo.page_size };
    let page_len = page_len as usize;

    println!(
        "Reading {} pages from 0x{:X} ({} bytes each)",
        count, start, page_len
    );

    let mut data = vec![0u8; count as usize * page_len];
    let summary = read_pages(nand, start, &mut data, page_len)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);

    if summary.corrected_pages > 0 {
        println!(
            "{} pages needed correction (max {} bits)",
            summary.corrected_pages, summary.max_corrected
        );
    }
    if !summary.uncorrectable.is_empty() {
        println!(
            "{} pages had uncorrectable ECC errors, first at page 0x{:X}",
            summary.uncorrectable.len(),
            summary.uncorrectable[0]
        );
    }
    Ok(())
}

/// Read `data.len() / page_len` pages starting at `start`
///
/// Each page is loaded into the cache, the ECC outcome is recorded and the
/// cache is read out in chunks no larger than [`CACHE_CHUNK_SIZE`].
pub fn read_pages(
    nand: &mut Nand,
    start: u32,
    data: &mut [u8],
    page_len: usize,
) -> CmdResult<EccSummary> {
    let mut summary = EccSummary::default();
    let pb = byte_progress(data.len() as u64, "read")?;

    for (i, page_buf) in data.chunks_mut(page_len).enumerate() {
        let page = start + i as u32;
        nand.load_page(page)?;
        wait_ready(nand, "page read", PAGE_READ_TIMEOUT)?;
        summary.record(page, nand.ecc_status()?);

        for (j, chunk) in page_buf.chunks_mut(CACHE_CHUNK_SIZE).enumerate() {
            nand.read_cache((j * CACHE_CHUNK_SIZE) as u16, chunk)?;
        }
        pb.inc(page_len as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(summary)
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::programmers::ProgrammerBus;
    use spinand_core::device::SpiNand;
    use spinand_core::ecc::Variant;
    use spinand_dummy::{DummyConfig, DummyNand};

    #[test]
    fn test_read_pages_reports_ecc() {
        let mut dummy = DummyNand::new(DummyConfig::default());
        dummy.inject_ecc(1, 0b01);
        dummy.inject_ecc(2, 0b10);
        let mut nand = SpiNand::new(ProgrammerBus::Dummy(dummy), Variant::Generic);
        nand.identify().unwrap();

        let page_len = nand.chip().unwrap().geometry.raw_page_size() as usize;
        let mut data = vec![0u8; 3 * page_len];
        let summary = read_pages(&mut nand, 0, &mut data, page_len).unwrap();

        assert!(data.iter().all(|&b| b == 0xFF));
        assert_eq!(summary.corrected_pages, 1);
        assert_eq!(summary.max_corrected, 1);
        assert_eq!(summary.uncorrectable, vec![2]);
    }
}
