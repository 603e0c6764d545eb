//! Feature register commands

use spinand_core::spi::opcodes;

use super::{CmdResult, Nand};

/// Read and print one feature register
pub fn run_reg_get(nand: &mut Nand, reg: u8) -> CmdResult {
    let value = nand.read_register(reg)?;
    println!("0x{:02X} = 0x{:02X} ({:08b})", reg, value, value);
    Ok(())
}

/// Write one feature register and read it back
pub fn run_reg_set(nand: &mut Nand, reg: u8, value: u8) -> CmdResult {
    if reg == opcodes::REG_STATUS {
        log::warn!("Status register is read-only on most parts");
    }
    nand.write_register(reg, value)?;
    let readback = nand.read_register(reg)?;
    if readback != value {
        log::warn!(
            "Register 0x{:02X} reads back 0x{:02X} after writing 0x{:02X}",
            reg,
            readback,
            value
        );
    }
    println!("0x{:02X} = 0x{:02X}", reg, readback);
    Ok(())
}
