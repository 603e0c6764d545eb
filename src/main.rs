//! spinand - A SPI NAND flash tool
//!
//! Identifies serial NAND chips and reads, programs and erases them page by
//! page through a programmer bus.
//!
//! # Architecture
//!
//! - `spinand-core` builds the SPI NAND command sequences, decodes vendor
//!   ECC status and holds the chip table
//! - a bus crate moves the bytes: `spinand-linux-spi` for real hardware,
//!   `spinand-dummy` for an in-memory chip
//! - this binary opens a bus, identifies the chip and runs one command,
//!   including the busy polling the core leaves to its caller

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands, RegCommands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Probe { device } => {
            let mut nand = commands::open_device(&device)?;
            commands::run_probe(&mut nand)
        }
        Commands::Status { device } => {
            let mut nand = commands::open_device(&device)?;
            commands::run_status(&mut nand)
        }
        Commands::Reset { device } => commands::run_reset(&device),
        Commands::Reg(subcmd) => match subcmd {
            RegCommands::Get { device, reg } => {
                let mut nand = commands::open_device(&device)?;
                commands::run_reg_get(&mut nand, reg)
            }
            RegCommands::Set { device, reg, value } => {
                let mut nand = commands::open_device(&device)?;
                commands::run_reg_set(&mut nand, reg, value)
            }
        },
        Commands::Read {
            device,
            output,
            start,
            count,
            oob,
        } => {
            let mut nand = commands::open_device(&device)?;
            commands::run_read(&mut nand, &output, start, count, oob)
        }
        Commands::Write {
            device,
            input,
            start,
            oob,
            no_erase,
            verify,
        } => {
            let mut nand = commands::open_device(&device)?;
            commands::run_write(&mut nand, &input, start, oob, no_erase, verify)
        }
        Commands::Erase {
            device,
            start,
            count,
        } => {
            let mut nand = commands::open_device(&device)?;
            commands::run_erase(&mut nand, start, count)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(vendor.as_deref());
            Ok(())
        }
    }
}
