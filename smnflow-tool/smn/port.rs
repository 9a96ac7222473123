use smnflow_raw::{SMN_PCI_ADDR_REG, SMN_PCI_DATA_REG, SMN_ROOT_DEVICE, SMN_ROOT_FUNCTION};

use crate::common::pci::ConfigSpace;
use crate::error::Result;

/// Bus used when the caller does not name one
pub const DEFAULT_BUS: u32 = 0;

/// One SMN access through the index/data pair
///
/// Built per call and dropped afterwards. Device and function are always
/// those of the root complex; only the bus varies between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmnTransaction {
    pub bus: u32,
    pub base: u32,
    pub offset: u32,
    /// Value to write, `None` for a read
    pub value: Option<u32>,
}

impl SmnTransaction {
    pub fn read(base: u32, offset: u32, bus: Option<u32>) -> Self {
        Self {
            bus: bus.unwrap_or(DEFAULT_BUS),
            base,
            offset,
            value: None,
        }
    }

    pub fn write(base: u32, offset: u32, value: u32, bus: Option<u32>) -> Self {
        Self {
            value: Some(value),
            ..Self::read(base, offset, bus)
        }
    }

    /// SMN address written to the index register, wrapped to 32 bits
    pub fn address(&self) -> u32 {
        self.base.wrapping_add(self.offset)
    }

    fn select<P: ConfigSpace>(&self, pci: &P) -> Result<()> {
        pci.write_dword(
            self.bus,
            SMN_ROOT_DEVICE,
            SMN_ROOT_FUNCTION,
            SMN_PCI_ADDR_REG,
            self.address(),
        )
    }
}

/// Raw SMN access at `base + offset` on a root complex
pub struct IndirectRegisterPort<P: ConfigSpace> {
    pci: P,
}

impl<P: ConfigSpace> IndirectRegisterPort<P> {
    pub fn new(pci: P) -> Self {
        Self { pci }
    }

    /// Read the SMN register at `base + offset`
    ///
    /// `bus` selects the root complex and defaults to [`DEFAULT_BUS`].
    /// Errors from the config-space backend are returned as-is; the index
    /// write is never retried on its own.
    pub fn read(&self, base: u32, offset: u32, bus: Option<u32>) -> Result<u32> {
        let txn = SmnTransaction::read(base, offset, bus);
        txn.select(&self.pci)?;
        let value = self.pci.read_dword(
            txn.bus,
            SMN_ROOT_DEVICE,
            SMN_ROOT_FUNCTION,
            SMN_PCI_DATA_REG,
        )?;

        tracing::debug!(
            "[smn] bus {:02X}: 0x{:08X} + 0x{:08X} = 0x{:08X}",
            txn.bus,
            base,
            offset,
            value
        );
        Ok(value)
    }

    /// Write `value` to the SMN register at `base + offset`
    pub fn write(&self, base: u32, offset: u32, value: u32, bus: Option<u32>) -> Result<()> {
        let txn = SmnTransaction::write(base, offset, value, bus);

        tracing::debug!(
            "[smn] bus {:02X}: write 0x{:08X} + 0x{:08X} = 0x{:08X}",
            txn.bus,
            base,
            offset,
            value
        );

        txn.select(&self.pci)?;
        self.pci.write_dword(
            txn.bus,
            SMN_ROOT_DEVICE,
            SMN_ROOT_FUNCTION,
            SMN_PCI_DATA_REG,
            value,
        )
    }
}
