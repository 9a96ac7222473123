//! # smnflow-raw
//!
//! Register definitions and PCI configuration-space primitives for AMD
//! System Management Network (SMN) access.
//!
//! SMN registers are not memory-mapped. They are reached through an
//! address/data register pair in the configuration space of the root
//! complex (bus N, device 0, function 0): the SMN address is written to
//! [`SMN_PCI_ADDR_REG`], then the register value is read from or written to
//! [`SMN_PCI_DATA_REG`].
//!
//! ## Features
//!
//! - `zen` (default) - register definitions for Zen family processors
//!
//! ## Usage
//!
//! ```ignore
//! use smnflow_raw::{read_config_dword, write_config_dword, PciAddress};
//! use smnflow_raw::{SMN_PCI_ADDR_REG, SMN_PCI_DATA_REG};
//!
//! let root = PciAddress::new(0, 0, 0);
//! write_config_dword(root, SMN_PCI_ADDR_REG, 0x0005_9800)?;
//! let value = read_config_dword(root, SMN_PCI_DATA_REG)?;
//! ```

pub mod arch;
pub mod pci;
pub mod register;

// Re-export for convenience
pub use pci::{
    config_space_path, proc_bus_pci_root, read_config_dword, write_config_dword, PciAddress,
    PciError, Result,
};
pub use register::{Register, RegisterLayout};

#[cfg(feature = "zen")]
pub use arch::zen as current_arch;

/// Root complex config-space register that selects the SMN address
pub const SMN_PCI_ADDR_REG: u32 = 0x60;

/// Root complex config-space register that carries the SMN data
pub const SMN_PCI_DATA_REG: u32 = 0x64;

/// Device number of the root complex hosting the SMN index/data pair
pub const SMN_ROOT_DEVICE: u32 = 0;

/// Function number of the root complex hosting the SMN index/data pair
pub const SMN_ROOT_FUNCTION: u32 = 0;
