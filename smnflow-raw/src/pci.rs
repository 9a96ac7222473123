//! PCI configuration-space read/write primitives
//!
//! This module provides one-shot dword access through `/proc/bus/pci`.
//! For pooled access with cached file handles, use the higher-level
//! abstractions in smnflow-tool.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, PciError>;

/// Errors that can occur during PCI configuration-space operations
#[derive(Debug, thiserror::Error)]
pub enum PciError {
    #[error("Failed to open PCI device {address}: {source}")]
    OpenFailed {
        address: PciAddress,
        source: std::io::Error,
    },

    #[error("Failed to read offset 0x{offset:X} of PCI device {address}: {source}")]
    ReadFailed {
        address: PciAddress,
        offset: u32,
        source: std::io::Error,
    },

    #[error("Failed to write offset 0x{offset:X} of PCI device {address}: {source}")]
    WriteFailed {
        address: PciAddress,
        offset: u32,
        source: std::io::Error,
    },

    #[error("Failed to seek to offset 0x{offset:X} of PCI device {address}: {source}")]
    SeekFailed {
        address: PciAddress,
        offset: u32,
        source: std::io::Error,
    },
}

/// Segment/bus/device/function location of a PCI function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PciAddress {
    pub segment: u32,
    pub bus: u32,
    pub device: u32,
    pub function: u32,
}

impl PciAddress {
    /// Address in segment 0
    pub fn new(bus: u32, device: u32, function: u32) -> Self {
        Self {
            segment: 0,
            bus,
            device,
            function,
        }
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}:{:02X}:{:02X}.{}",
            self.segment, self.bus, self.device, self.function
        )
    }
}

/// Root of the procfs PCI tree
///
/// Inside the container image the host's procfs is mounted under `/pcm`.
pub fn proc_bus_pci_root() -> PathBuf {
    if std::env::var("DOCKER_RUNNING").is_ok() {
        PathBuf::from("/pcm/proc/bus/pci")
    } else {
        PathBuf::from("/proc/bus/pci")
    }
}

/// Path of the config-space file for `address` below `root`
///
/// Segment 0 uses the short `<bus>/<dev>.<fn>` form, other segments are
/// prefixed with the segment number.
pub fn config_space_path(root: &Path, address: PciAddress) -> PathBuf {
    if address.segment > 0 {
        root.join(format!("{:04x}:{:02x}", address.segment, address.bus))
            .join(format!("{:02x}.{}", address.device, address.function))
    } else {
        root.join(format!("{:02x}", address.bus))
            .join(format!("{:02x}.{}", address.device, address.function))
    }
}

/// Read a 32-bit value from PCI configuration space
///
/// # Arguments
///
/// * `address` - PCI function to access
/// * `offset` - byte offset into configuration space (e.g. 0x64)
///
/// # Errors
///
/// Returns an error if:
/// - The config-space file cannot be opened (requires root for offsets past 0x40)
/// - The offset lies beyond the end of the exposed configuration space
///
/// # Example
///
/// ```ignore
/// use smnflow_raw::{read_config_dword, PciAddress};
///
/// let id = read_config_dword(PciAddress::new(0, 0, 0), 0x0)?;
/// println!("vendor 0x{:04X}", id & 0xFFFF);
/// ```
pub fn read_config_dword(address: PciAddress, offset: u32) -> Result<u32> {
    let path = config_space_path(&proc_bus_pci_root(), address);
    let mut file = File::open(&path).map_err(|e| PciError::OpenFailed { address, source: e })?;

    file.seek(SeekFrom::Start(offset as u64))
        .map_err(|e| PciError::SeekFailed {
            address,
            offset,
            source: e,
        })?;

    let mut buffer = [0u8; 4];
    file.read_exact(&mut buffer)
        .map_err(|e| PciError::ReadFailed {
            address,
            offset,
            source: e,
        })?;

    Ok(u32::from_le_bytes(buffer))
}

/// Write a 32-bit value to PCI configuration space
///
/// # Arguments
///
/// * `address` - PCI function to access
/// * `offset` - byte offset into configuration space (e.g. 0x60)
/// * `value` - 32-bit value to write
///
/// # Errors
///
/// Returns an error if the config-space file cannot be opened for writing
/// or the write is short.
///
/// # Safety
///
/// Writing the SMN index/data pair reaches arbitrary SoC registers. A wrong
/// address or value can hang or reset the machine.
pub fn write_config_dword(address: PciAddress, offset: u32, value: u32) -> Result<()> {
    let path = config_space_path(&proc_bus_pci_root(), address);
    let mut file = OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_SYNC) // Ensure synchronous writes
        .open(&path)
        .map_err(|e| PciError::OpenFailed { address, source: e })?;

    file.seek(SeekFrom::Start(offset as u64))
        .map_err(|e| PciError::SeekFailed {
            address,
            offset,
            source: e,
        })?;

    file.write_all(&value.to_le_bytes())
        .map_err(|e| PciError::WriteFailed {
            address,
            offset,
            source: e,
        })?;

    Ok(())
}
