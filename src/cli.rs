//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use spinand_core::ecc::Variant;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal byte
pub fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value out of range for a byte: {}", s))
}

/// Parse a compatible-style variant name
fn parse_variant(s: &str) -> Result<Variant, String> {
    Variant::from_name(&s.to_lowercase())
        .ok_or_else(|| format!("Unknown variant: {} (expected spi-nand, mt29f or gd5f)", s))
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spinand")]
#[command(author, version, about = "SPI NAND flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options selecting the programmer and chip binding
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Programmer to use
    #[arg(short, long, help = programmer_help())]
    pub programmer: String,

    /// Chip variant to bind (spi-nand accepts any known chip)
    #[arg(long, default_value = "spi-nand", value_parser = parse_variant)]
    pub variant: Variant,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the chip
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show status, protection and configuration registers
    Status {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Reset the chip
    Reset {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Feature register access
    #[command(subcommand)]
    Reg(RegCommands),

    /// Read pages to file
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First page to read (hex or decimal)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        start: u32,

        /// Number of pages (default: to the end of the chip)
        #[arg(long, value_parser = parse_hex_u32)]
        count: Option<u32>,

        /// Include the spare area of every page
        #[arg(long)]
        oob: bool,
    },

    /// Write file to pages
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// First page to write (hex or decimal, must start a block unless --no-erase)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        start: u32,

        /// Input holds raw pages including the spare area
        #[arg(long)]
        oob: bool,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,

        /// Verify after writing
        #[arg(long)]
        verify: bool,
    },

    /// Erase blocks
    Erase {
        #[command(flatten)]
        device: DeviceArgs,

        /// First block to erase (hex or decimal)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        start: u32,

        /// Number of blocks (default: to the end of the chip)
        #[arg(long, value_parser = parse_hex_u32)]
        count: Option<u32>,
    },

    /// List supported programmers
    ListProgrammers,

    /// List supported chips
    ListChips {
        /// Filter by vendor
        #[arg(long)]
        vendor: Option<String>,
    },
}

/// Register subcommands
#[derive(Subcommand)]
pub enum RegCommands {
    /// Read a feature register
    Get {
        #[command(flatten)]
        device: DeviceArgs,

        /// Register address (e.g. 0xC0)
        #[arg(value_parser = parse_hex_u8)]
        reg: u8,
    },

    /// Write a feature register
    Set {
        #[command(flatten)]
        device: DeviceArgs,

        /// Register address (e.g. 0xA0)
        #[arg(value_parser = parse_hex_u8)]
        reg: u8,

        /// Value to write
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_hex_u32("0x40"), Ok(0x40));
        assert_eq!(parse_hex_u32("64"), Ok(64));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert_eq!(parse_hex_u8("0xC0"), Ok(0xC0));
        assert!(parse_hex_u8("0x100").is_err());
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!(parse_variant("spi-nand"), Ok(Variant::Generic));
        assert_eq!(parse_variant("GD5F"), Ok(Variant::Gd5f));
        assert!(parse_variant("w25n").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "spinand",
            "-vv",
            "read",
            "-p",
            "dummy",
            "--variant",
            "mt29f",
            "-o",
            "out.bin",
            "--start",
            "0x40",
            "--count",
            "2",
            "--oob",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Read {
                device,
                start,
                count,
                oob,
                ..
            } => {
                assert_eq!(device.programmer, "dummy");
                assert_eq!(device.variant, Variant::Mt29f);
                assert_eq!(start, 0x40);
                assert_eq!(count, Some(2));
                assert!(oob);
            }
            _ => panic!("expected read"),
        }

        let cli =
            Cli::try_parse_from(["spinand", "reg", "set", "-p", "dummy", "0xA0", "0"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reg(RegCommands::Set {
                reg: 0xA0,
                value: 0,
                ..
            })
        ));
    }
}
