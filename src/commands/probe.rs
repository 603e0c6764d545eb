//! Probe, status and reset commands

use spinand_core::chip::{manufacturer, NandChip};
use spinand_core::device::{SpiNand, StatusFlags};
use spinand_core::spi::opcodes;

use super::{wait_ready, CmdResult, Nand, RESET_TIMEOUT};
use crate::cli::DeviceArgs;
use crate::programmers;

/// Print what identification found
pub fn run_probe(nand: &mut Nand) -> CmdResult {
    let chip = nand.chip().ok_or("Chip not identified")?;
    print_chip(chip);
    Ok(())
}

fn print_chip(chip: &NandChip) {
    let geo = &chip.geometry;
    println!("Found SPI NAND chip:");
    println!(
        "  Vendor:   {}",
        manufacturer::name(chip.manufacturer_id).unwrap_or("Unknown")
    );
    println!("  Name:     {}", chip.name);
    println!("  Family:   {}", chip.family);
    println!(
        "  ID:       {:02X} {:02X}",
        chip.manufacturer_id, chip.device_id
    );
    println!(
        "  Size:     {} MiB ({} blocks of {} pages)",
        geo.total_size >> 20,
        geo.block_count(),
        geo.pages_per_block()
    );
    println!(
        "  Page:     {} + {} bytes spare",
        geo.page_size, geo.oob_size
    );
    println!(
        "  ECC:      {} bits per {} bytes, {} spare bytes used",
        geo.ecc_strength,
        geo.ecc_step,
        chip.ecc_layout.ecc_bytes()
    );
    for region in chip.ecc_layout.ecc {
        println!("    ecc  0x{:03X}..0x{:03X}", region.offset, region.end());
    }
    for region in chip.ecc_layout.free {
        println!("    free 0x{:03X}..0x{:03X}", region.offset, region.end());
    }
}

/// Print and decode the feature registers
pub fn run_status(nand: &mut Nand) -> CmdResult {
    let status = nand.read_status()?;
    let protection = nand.read_register(opcodes::REG_PROTECTION)?;
    let config = nand.read_register(opcodes::REG_CONFIG)?;
    let flags = StatusFlags::from_bits_truncate(status);
    let family = nand.family().ok_or("Chip not identified")?;

    println!("Status (0x{:02X}): 0x{:02X}", opcodes::REG_STATUS, status);
    println!("  Busy:          {}", flags.contains(StatusFlags::OIP));
    println!("  Write enabled: {}", flags.contains(StatusFlags::WEL));
    println!("  Erase failed:  {}", flags.contains(StatusFlags::E_FAIL));
    println!("  Program failed:{}", flags.contains(StatusFlags::P_FAIL));
    println!("  Last read ECC: {}", family.decode_ecc(status));
    println!(
        "Protection (0x{:02X}): 0x{:02X}{}",
        opcodes::REG_PROTECTION,
        protection,
        if protection == 0 { "" } else { " (locked)" }
    );
    println!(
        "Configuration (0x{:02X}): 0x{:02X} (on-die ECC {})",
        opcodes::REG_CONFIG,
        config,
        if config & opcodes::CONFIG_ECC_EN != 0 {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}

/// Reset the chip and wait for it to come back
///
/// Unlike the other commands this does not refuse unknown chips; the ID is
/// only printed.
pub fn run_reset(args: &DeviceArgs) -> CmdResult {
    let bus = programmers::open_programmer(&args.programmer)?;
    let mut nand = SpiNand::new(bus, args.variant);

    let [mfr, dev] = nand.read_id()?;
    nand.reset()?;

    match nand.identify() {
        Ok(_) => {
            wait_ready(&mut nand, "reset", RESET_TIMEOUT)?;
        }
        Err(e) => {
            log::warn!("Cannot poll an unidentified chip: {}", e);
            std::thread::sleep(RESET_TIMEOUT);
        }
    }

    println!("Reset chip {:02X} {:02X}", mfr, dev);
    Ok(())
}
