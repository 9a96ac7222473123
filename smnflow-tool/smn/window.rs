use std::fmt;

use crate::common::pci::ConfigSpace;
use crate::config::{parse_hex_u32, WindowStore};
use crate::error::{Result, SmnflowError};
use crate::smn::port::IndirectRegisterPort;

/// Result of resolving an SMN window name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseAddress {
    /// Window has a fixed base address
    Resolved(u32),
    /// Window is absent or has an empty record
    Unconfigured,
}

impl BaseAddress {
    /// Value reported for unconfigured windows
    pub const SENTINEL: i64 = -1;

    /// Base address, or the `-1` sentinel
    pub fn raw(&self) -> i64 {
        match self {
            BaseAddress::Resolved(address) => *address as i64,
            BaseAddress::Unconfigured => Self::SENTINEL,
        }
    }

    /// Base used for the SMN transaction
    ///
    /// The sentinel is passed through as its 32-bit pattern `0xFFFF_FFFF`.
    pub fn transaction_base(&self) -> u32 {
        match self {
            BaseAddress::Resolved(address) => *address,
            BaseAddress::Unconfigured => Self::SENTINEL as u32,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, BaseAddress::Resolved(_))
    }
}

impl fmt::Display for BaseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseAddress::Resolved(address) => write!(f, "0x{address:08X}"),
            BaseAddress::Unconfigured => write!(f, "{}", Self::SENTINEL),
        }
    }
}

/// SMN access by window name
pub struct NamedWindowResolver<'a, W: WindowStore + ?Sized, P: ConfigSpace> {
    windows: &'a W,
    port: IndirectRegisterPort<P>,
}

impl<'a, W: WindowStore + ?Sized, P: ConfigSpace> NamedWindowResolver<'a, W, P> {
    pub fn new(windows: &'a W, port: IndirectRegisterPort<P>) -> Self {
        Self { windows, port }
    }

    pub fn port(&self) -> &IndirectRegisterPort<P> {
        &self.port
    }

    /// Base address of window `name`
    ///
    /// An absent window or an empty record is `Unconfigured`, not an error.
    /// A record without `fixed_address` is a known window this platform
    /// does not support and fails with `ConfigError`.
    pub fn resolve_base(&self, name: &str) -> Result<BaseAddress> {
        let descriptor = match self.windows.window(name) {
            Some(descriptor) if !descriptor.is_empty() => descriptor,
            _ => return Ok(BaseAddress::Unconfigured),
        };

        let fixed_address = descriptor.fixed_address()?.ok_or_else(|| {
            SmnflowError::ConfigError(format!("SMN window {name} has no fixed_address"))
        })?;

        let base = parse_hex_u32(fixed_address)?;
        tracing::debug!("[smn] {}: 0x{:08X}", name, base);
        Ok(BaseAddress::Resolved(base))
    }

    /// Read register `offset` of window `name`
    ///
    /// An unconfigured window is not rejected: the access goes out with the
    /// sentinel base.
    pub fn read(&self, name: &str, offset: u32, bus: Option<u32>) -> Result<u32> {
        let base = self.resolve_base(name)?;
        if !base.is_resolved() {
            tracing::warn!("[smn] {} is unconfigured, using base {}", name, base);
        }
        self.port.read(base.transaction_base(), offset, bus)
    }

    /// Write register `offset` of window `name`
    pub fn write(&self, name: &str, offset: u32, value: u32, bus: Option<u32>) -> Result<()> {
        let base = self.resolve_base(name)?;
        if !base.is_resolved() {
            tracing::warn!("[smn] {} is unconfigured, using base {}", name, base);
        }
        self.port.write(base.transaction_base(), offset, value, bus)
    }
}
