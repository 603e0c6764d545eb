//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use std::collections::HashMap;

use spinand_core::bus::{BusMode, Leg, SpiBus};
use thiserror::Error;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory SPI NAND emulator (mfr=<id>,dev=<id>,tx=<1|4>,rx=<1|2|4>)",
    });

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description:
            "Linux spidev interface (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>,tx=<1|4>,rx=<1|2|4>)",
    });

    programmers
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Parsed programmer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name
    pub name: String,
    /// Key/value options
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Options as borrowed pairs, as the bus crates take them
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string of the form `name[:key=value,...]`
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Transport error of whichever programmer is in use
#[derive(Debug, Error)]
pub enum BusError {
    #[cfg(feature = "dummy")]
    #[error(transparent)]
    Dummy(#[from] spinand_dummy::DummyError),

    #[cfg(feature = "linux-spi")]
    #[error(transparent)]
    LinuxSpi(#[from] spinand_linux_spi::LinuxSpiError),
}

/// An opened programmer
pub enum ProgrammerBus {
    #[cfg(feature = "dummy")]
    Dummy(spinand_dummy::DummyNand),

    #[cfg(feature = "linux-spi")]
    LinuxSpi(spinand_linux_spi::LinuxSpiNand),
}

impl SpiBus for ProgrammerBus {
    type Error = BusError;

    fn mode(&self) -> BusMode {
        match self {
            #[cfg(feature = "dummy")]
            ProgrammerBus::Dummy(bus) => bus.mode(),
            #[cfg(feature = "linux-spi")]
            ProgrammerBus::LinuxSpi(bus) => bus.mode(),
        }
    }

    fn transfer(&mut self, legs: &mut [Leg<'_>]) -> Result<(), BusError> {
        match self {
            #[cfg(feature = "dummy")]
            ProgrammerBus::Dummy(bus) => Ok(bus.transfer(legs)?),
            #[cfg(feature = "linux-spi")]
            ProgrammerBus::LinuxSpi(bus) => Ok(bus.transfer(legs)?),
        }
    }
}

/// Open the programmer named by a `name[:key=value,...]` string
pub fn open_programmer(programmer: &str) -> Result<ProgrammerBus, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params),

        #[cfg(feature = "linux-spi")]
        "linux_spi" | "linux-spi" | "spidev" => {
            log::info!("Opening Linux spidev programmer...");
            let bus = spinand_linux_spi::open_linux_spi(&params.options())?;
            Ok(ProgrammerBus::LinuxSpi(bus))
        }

        _ => Err(unknown_programmer_error(&params.name)),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &ProgrammerParams) -> Result<ProgrammerBus, Box<dyn std::error::Error>> {
    use crate::cli::parse_hex_u8;
    use spinand_core::spi::LaneWidth;
    use spinand_dummy::{DummyConfig, DummyNand};

    let mut config = DummyConfig::default();
    let mut tx = LaneWidth::Quad;
    let mut rx = LaneWidth::Quad;

    for (key, value) in params.options() {
        match key {
            "mfr" => config.manufacturer_id = parse_hex_u8(value)?,
            "dev" => config.device_id = parse_hex_u8(value)?,
            "tx" | "rx" => {
                let width = value
                    .parse::<u8>()
                    .ok()
                    .and_then(LaneWidth::from_lines)
                    .ok_or_else(|| format!("Invalid {} value: {}", key, value))?;
                if key == "tx" {
                    tx = width;
                } else {
                    rx = width;
                }
            }
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    // Geometry follows the emulated ID when it names a known chip
    if let Some(chip) = spinand_core::chip::find_chip(config.manufacturer_id, config.device_id) {
        config = DummyConfig {
            manufacturer_id: chip.manufacturer_id,
            device_id: chip.device_id,
            ..DummyConfig::from_chip(chip)
        };
    }
    config.bus_mode = BusMode::from_widths(tx, rx);

    log::info!(
        "dummy: emulating {:02X} {:02X} ({} pages)",
        config.manufacturer_id,
        config.device_id,
        config.page_count
    );
    Ok(ProgrammerBus::Dummy(DummyNand::new(config)))
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let available = programmer_names_short();
    if available.is_empty() {
        format!(
            "Unknown programmer: {} (no programmers enabled, rebuild with --features dummy or linux-spi)",
            name
        )
        .into()
    } else {
        format!("Unknown programmer: {} [available: {}]", name, available).into()
    }
}
