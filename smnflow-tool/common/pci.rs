use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use nix::unistd::AccessFlags;
use smnflow_raw::{
    config_space_path, proc_bus_pci_root, PciAddress, SMN_ROOT_DEVICE, SMN_ROOT_FUNCTION,
};

use crate::error::{Result, SmnflowError};

/// PCI configuration-space dword access
///
/// The SMN core only talks to hardware through this trait, so tests can
/// substitute a recording fake for the procfs backend.
pub trait ConfigSpace {
    fn read_dword(&self, bus: u32, device: u32, function: u32, offset: u32) -> Result<u32>;

    fn write_dword(
        &self,
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
        value: u32,
    ) -> Result<()>;

    /// Whether a function is present at (bus, device, function)
    fn function_exists(&self, _bus: u32, _device: u32, _function: u32) -> bool {
        true
    }
}

impl<T: ConfigSpace + ?Sized> ConfigSpace for &T {
    fn read_dword(&self, bus: u32, device: u32, function: u32, offset: u32) -> Result<u32> {
        (**self).read_dword(bus, device, function, offset)
    }

    fn write_dword(
        &self,
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
        value: u32,
    ) -> Result<()> {
        (**self).write_dword(bus, device, function, offset, value)
    }

    fn function_exists(&self, bus: u32, device: u32, function: u32) -> bool {
        (**self).function_exists(bus, device, function)
    }
}

pub struct PciHandle {
    file: parking_lot::Mutex<File>,
    address: PciAddress,
}

impl PciHandle {
    pub fn new(address: PciAddress) -> Result<Self> {
        let path = config_space_path(&proc_bus_pci_root(), address);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                SmnflowError::PciError(format!("Failed to open PCI device {address}: {e}"))
            })?;

        tracing::debug!("Opened PCI handle for {}", address);

        Ok(Self {
            file: parking_lot::Mutex::new(file),
            address,
        })
    }

    pub fn read32(&self, offset: u32) -> Result<u32> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset as u64)).map_err(|e| {
            SmnflowError::PciError(format!(
                "Failed to seek to offset 0x{offset:X} of {}: {e}",
                self.address
            ))
        })?;

        let mut buffer = [0u8; 4];
        file.read_exact(&mut buffer).map_err(|e| {
            SmnflowError::PciError(format!(
                "Failed to read at offset 0x{offset:X} of {}: {e}",
                self.address
            ))
        })?;

        Ok(u32::from_le_bytes(buffer))
    }

    pub fn write32(&self, offset: u32, value: u32) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset as u64)).map_err(|e| {
            SmnflowError::PciError(format!(
                "Failed to seek to offset 0x{offset:X} of {}: {e}",
                self.address
            ))
        })?;

        file.write_all(&value.to_le_bytes()).map_err(|e| {
            SmnflowError::PciError(format!(
                "Failed to write at offset 0x{offset:X} of {}: {e}",
                self.address
            ))
        })?;

        Ok(())
    }
}

/// Process-wide pool of open config-space handles
///
/// Each handle serialises its own dword accesses. Nothing here spans the
/// two halves of an SMN index/data transaction.
pub struct Pci {
    handles: RwLock<HashMap<PciAddress, Arc<PciHandle>>>,
}

impl Pci {
    fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn instance() -> &'static Pci {
        static INSTANCE: Lazy<Pci> = Lazy::new(Pci::new);
        &INSTANCE
    }

    fn get_or_create_handle(&self, address: PciAddress) -> Result<Arc<PciHandle>> {
        {
            let handles = self.handles.read();
            if let Some(handle) = handles.get(&address) {
                return Ok(Arc::clone(handle));
            }
        }

        let mut handles = self.handles.write();
        if let Some(handle) = handles.get(&address) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(PciHandle::new(address)?);
        handles.insert(address, Arc::clone(&handle));
        Ok(handle)
    }
}

impl ConfigSpace for Pci {
    fn read_dword(&self, bus: u32, device: u32, function: u32, offset: u32) -> Result<u32> {
        let handle = self.get_or_create_handle(PciAddress::new(bus, device, function))?;
        handle.read32(offset)
    }

    fn write_dword(
        &self,
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
        value: u32,
    ) -> Result<()> {
        let handle = self.get_or_create_handle(PciAddress::new(bus, device, function))?;
        handle.write32(offset, value)
    }

    fn function_exists(&self, bus: u32, device: u32, function: u32) -> bool {
        device_exists(PciAddress::new(bus, device, function))
    }
}

/// Unpooled access that opens the config-space file per dword
///
/// Used for bus probing, where most functions are touched once and
/// pooling every candidate handle would only hold descriptors open.
pub struct ProbePci;

impl ConfigSpace for ProbePci {
    fn read_dword(&self, bus: u32, device: u32, function: u32, offset: u32) -> Result<u32> {
        Ok(smnflow_raw::read_config_dword(
            PciAddress::new(bus, device, function),
            offset,
        )?)
    }

    fn write_dword(
        &self,
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
        value: u32,
    ) -> Result<()> {
        Ok(smnflow_raw::write_config_dword(
            PciAddress::new(bus, device, function),
            offset,
            value,
        )?)
    }

    fn function_exists(&self, bus: u32, device: u32, function: u32) -> bool {
        device_exists(PciAddress::new(bus, device, function))
    }
}

/// Whether a config-space file exists for the function
pub fn device_exists(address: PciAddress) -> bool {
    config_space_path(&proc_bus_pci_root(), address).exists()
}

/// Check that the root complex on `bus` can be opened read/write
///
/// SMN data is beyond the first 64 bytes of config space, which procfs
/// only exposes to privileged processes.
pub fn check_access(bus: u32) -> Result<()> {
    if !nix::unistd::geteuid().is_root() {
        tracing::warn!("Not running as root, config-space writes will likely fail");
    }

    let address = PciAddress::new(bus, SMN_ROOT_DEVICE, SMN_ROOT_FUNCTION);
    let path = config_space_path(&proc_bus_pci_root(), address);
    nix::unistd::access(&path, AccessFlags::R_OK | AccessFlags::W_OK)?;
    Ok(())
}
