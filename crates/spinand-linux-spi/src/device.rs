//! Linux spidev bus
//!
//! This module provides `LinuxSpiNand`, which implements `SpiBus` on top of
//! the kernel's spidev interface. Each leg of a transaction becomes one
//! `spi_ioc_transfer`, and the whole transaction is issued as a single
//! `SPI_IOC_MESSAGE` so chip select stays asserted throughout.

use crate::error::{LinuxSpiError, Result};

use spinand_core::bus::{BusMode, Leg, SpiBus};
use spinand_core::spi::LaneWidth;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default SPI clock speed in Hz (2 MHz)
const DEFAULT_SPEED_HZ: u32 = 2_000_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;

    /// Transmit on two lines
    pub const SPI_TX_DUAL: u32 = 0x100;
    /// Transmit on four lines
    pub const SPI_TX_QUAD: u32 = 0x200;
    /// Receive on two lines
    pub const SPI_RX_DUAL: u32 = 0x400;
    /// Receive on four lines
    pub const SPI_RX_QUAD: u32 = 0x800;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    const SPI_IOC_MAGIC: u8 = b'k';

    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;
    const SPI_IOC_TYPE_MODE32: u8 = 5;

    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );
    ioctl_write_ptr!(spi_ioc_wr_mode32, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE32, u32);

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    ///
    /// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(spi_ioc_transfer)])
    pub fn spi_ioc_message(n: usize) -> libc::c_ulong {
        let size = n * core::mem::size_of::<super::SpiIocTransfer>();
        // _IOC(dir, type, nr, size) = ((dir)<<30)|((size)<<16)|((type)<<8)|(nr), _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

impl SpiIocTransfer {
    fn from_leg(leg: &mut Leg<'_>, speed_hz: u32) -> Self {
        let mut xfer = Self {
            len: leg.len() as u32,
            speed_hz,
            bits_per_word: 8,
            ..Default::default()
        };
        match leg {
            Leg::Write { data, width } => {
                xfer.tx_buf = data.as_ptr() as u64;
                xfer.tx_nbits = width.lines();
            }
            Leg::Read { buf, width } => {
                xfer.rx_buf = buf.as_mut_ptr() as u64;
                xfer.rx_nbits = width.lines();
            }
        }
        xfer
    }
}

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock speed in Hz (default: 2 MHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
    /// Lines wired for transmit and receive (default: single)
    pub bus_mode: BusMode,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
            bus_mode: BusMode::empty(),
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Set the transmit and receive widths
    pub fn with_bus_mode(mut self, bus_mode: BusMode) -> Self {
        self.bus_mode = bus_mode;
        self
    }

    /// The 32-bit spidev mode word, clock mode plus multi-line bits
    pub fn mode_bits(&self) -> u32 {
        let mut bits = self.mode as u32;
        if self.bus_mode.contains(BusMode::TX_QUAD) {
            bits |= mode::SPI_TX_QUAD;
        } else if self.bus_mode.contains(BusMode::TX_DUAL) {
            bits |= mode::SPI_TX_DUAL;
        }
        if self.bus_mode.contains(BusMode::RX_QUAD) {
            bits |= mode::SPI_RX_QUAD;
        } else if self.bus_mode.contains(BusMode::RX_DUAL) {
            bits |= mode::SPI_RX_DUAL;
        }
        bits
    }
}

/// SPI NAND bus on a Linux spidev device
pub struct LinuxSpiNand {
    /// File handle for spidev device
    file: File,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Current speed in Hz
    speed_hz: u32,
    bus_mode: BusMode,
}

impl LinuxSpiNand {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // Clock mode and dual/quad lines go in one 32-bit mode word
        let mode = config.mode_bits();
        unsafe {
            ioctl::spi_ioc_wr_mode32(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz, tx={} rx={})",
            config.device,
            config.mode,
            speed / 1000,
            LaneWidth::for_tx(config.bus_mode).lines(),
            LaneWidth::for_rx(config.bus_mode).lines()
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file,
            max_kernel_buf_size,
            speed_hz: speed,
            bus_mode: config.bus_mode,
        })
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxSpiConfig::new(device))
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }
}

impl SpiBus for LinuxSpiNand {
    type Error = LinuxSpiError;

    fn mode(&self) -> BusMode {
        self.bus_mode
    }

    fn transfer(&mut self, legs: &mut [Leg<'_>]) -> Result<()> {
        check_transfer_len(legs, self.max_kernel_buf_size)?;

        let transfers: Vec<SpiIocTransfer> = legs
            .iter_mut()
            .map(|leg| SpiIocTransfer::from_leg(leg, self.speed_hz))
            .collect();

        let fd = self.file.as_raw_fd();
        let ioctl_num = ioctl::spi_ioc_message(transfers.len());
        // The buffers behind the transfer structs are borrowed from `legs`,
        // which outlives the call
        let ret = unsafe { libc::ioctl(fd, ioctl_num, transfers.as_ptr()) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }
}

/// spidev bounds the bytes of one message, summed over all its transfers
fn check_transfer_len(legs: &[Leg<'_>], max: usize) -> Result<()> {
    let total: usize = legs.iter().map(Leg::len).sum();
    if total > max {
        return Err(LinuxSpiError::TransferTooLarge { len: total, max });
    }
    Ok(())
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

fn parse_lines(key: &str, value: &str, allowed: &[u8]) -> Result<LaneWidth> {
    value
        .parse::<u8>()
        .ok()
        .filter(|lines| allowed.contains(lines))
        .and_then(LaneWidth::from_lines)
        .ok_or_else(|| {
            LinuxSpiError::InvalidParameter(format!(
                "Invalid {} value: {} (must be one of {:?})",
                key, value, allowed
            ))
        })
}

/// Parse programmer options from a list of key-value pairs
///
/// - `dev=/dev/spidevX.Y` - Required: device path
/// - `spispeed=<kHz>` - Optional: clock speed (default: 2000)
/// - `mode=<0-3>` - Optional: SPI clock mode (default: 0)
/// - `tx=<1|4>` - Optional: transmit lines (default: 1)
/// - `rx=<1|2|4>` - Optional: receive lines (default: 1)
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxSpiConfig> {
    let mut config = LinuxSpiConfig::default();
    let mut tx = LaneWidth::Single;
    let mut rx = LaneWidth::Single;

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                let speed_khz: u32 = value.parse().map_err(|_| {
                    LinuxSpiError::InvalidParameter(format!("Invalid spispeed value: {}", value))
                })?;
                config.speed_hz = speed_khz * 1000;
            }
            "mode" => {
                let mode: u8 = value.parse().map_err(|_| {
                    LinuxSpiError::InvalidParameter(format!("Invalid mode value: {}", value))
                })?;
                if mode > mode::MODE_3 {
                    return Err(LinuxSpiError::InvalidParameter(format!(
                        "Invalid SPI mode: {} (must be 0-3)",
                        mode
                    )));
                }
                config.mode = mode;
            }
            // Program load has no dual form
            "tx" => tx = parse_lines(key, value, &[1, 4])?,
            "rx" => rx = parse_lines(key, value, &[1, 2, 4])?,
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err(LinuxSpiError::NoDevice);
    }

    config.bus_mode = BusMode::from_widths(tx, rx);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_struct_layout() {
        assert_eq!(core::mem::size_of::<SpiIocTransfer>(), 32);
        // SPI_IOC_MESSAGE(1) and (2) as computed by the kernel headers
        assert_eq!(ioctl::spi_ioc_message(1), 0x4020_6B00);
        assert_eq!(ioctl::spi_ioc_message(2), 0x4040_6B00);
    }

    #[test]
    fn test_leg_to_transfer() {
        let data = [0x9Fu8];
        let mut buf = [0u8; 2];
        let mut legs = [
            Leg::Write {
                data: &data,
                width: LaneWidth::Single,
            },
            Leg::Read {
                buf: &mut buf,
                width: LaneWidth::Quad,
            },
        ];
        let write = SpiIocTransfer::from_leg(&mut legs[0], 1_000_000);
        assert_eq!(write.len, 1);
        assert_eq!(write.tx_nbits, 1);
        assert_eq!(write.rx_buf, 0);
        assert_eq!(write.speed_hz, 1_000_000);

        let read = SpiIocTransfer::from_leg(&mut legs[1], 1_000_000);
        assert_eq!(read.len, 2);
        assert_eq!(read.rx_nbits, 4);
        assert_eq!(read.tx_buf, 0);
        assert_eq!(read.cs_change, 0);
    }

    #[test]
    fn test_transfer_len_counts_every_leg() {
        let header = [0x02u8, 0x00, 0x00];
        let data = [0xA5u8; 8];
        let legs = [
            Leg::Write {
                data: &header,
                width: LaneWidth::Single,
            },
            Leg::Write {
                data: &data,
                width: LaneWidth::Quad,
            },
        ];
        assert!(check_transfer_len(&legs, 11).is_ok());
        // Each leg alone fits, the message as a whole does not
        assert!(matches!(
            check_transfer_len(&legs, 10),
            Err(LinuxSpiError::TransferTooLarge { len: 11, max: 10 })
        ));
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("dev", "/dev/spidev1.0"),
            ("spispeed", "20000"),
            ("mode", "3"),
            ("tx", "4"),
            ("rx", "2"),
        ])
        .unwrap();
        assert_eq!(config.device, "/dev/spidev1.0");
        assert_eq!(config.speed_hz, 20_000_000);
        assert_eq!(config.mode, 3);
        assert_eq!(config.bus_mode, BusMode::TX_QUAD | BusMode::RX_DUAL);
        assert_eq!(
            config.mode_bits(),
            3 | mode::SPI_TX_QUAD | mode::SPI_RX_DUAL
        );
    }

    #[test]
    fn test_parse_options_defaults() {
        let config = parse_options(&[("dev", "/dev/spidev0.0")]).unwrap();
        assert_eq!(config.speed_hz, DEFAULT_SPEED_HZ);
        assert_eq!(config.mode, mode::MODE_0);
        assert!(config.bus_mode.is_empty());
        assert_eq!(config.mode_bits(), 0);
    }

    #[test]
    fn test_parse_options_errors() {
        assert!(matches!(parse_options(&[]), Err(LinuxSpiError::NoDevice)));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("mode", "4")]),
            Err(LinuxSpiError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("tx", "2")]),
            Err(LinuxSpiError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("rx", "8")]),
            Err(LinuxSpiError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("spispeed", "fast")]),
            Err(LinuxSpiError::InvalidParameter(_))
        ));
    }
}
