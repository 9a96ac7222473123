// Device topology: canonical device names to PCI bus numbers

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::common::pci::ConfigSpace;
use crate::config::PlatformConfig;
use crate::error::{Result, SmnflowError};

/// Highest bus number probed in segment 0
const MAX_BUS: u32 = 0xFF;

/// Config-space offset of the vendor/device id dword
const PCI_ID_OFFSET: u32 = 0x0;

/// Lookup of the bus hosting a named device (e.g. `"ROOT"`)
pub trait DeviceDirectory {
    fn device_bus(&self, name: &str) -> Result<u32>;
}

/// Directory backed by the platform config and a config-space probe
///
/// A device with a configured bus resolves to it directly. Otherwise the
/// buses are scanned for the first function whose vendor id matches, and
/// the hit is cached.
pub struct PciTopology<'a, P: ConfigSpace> {
    config: &'a PlatformConfig,
    pci: P,
    bus_map: RwLock<HashMap<String, u32>>,
}

impl<'a, P: ConfigSpace> PciTopology<'a, P> {
    pub fn new(config: &'a PlatformConfig, pci: P) -> Self {
        Self {
            config,
            pci,
            bus_map: RwLock::new(HashMap::new()),
        }
    }

    fn probe(&self, name: &str, device: u32, function: u32, vendor: u16) -> Result<u32> {
        for bus in 0..=MAX_BUS {
            if !self.pci.function_exists(bus, device, function) {
                continue;
            }
            // Unreadable functions are skipped like absent ones
            let Ok(id) = self.pci.read_dword(bus, device, function, PCI_ID_OFFSET) else {
                continue;
            };
            if (id & 0xFFFF) as u16 == vendor {
                tracing::info!(
                    "Located {} at {:02X}:{:02X}.{} (id 0x{:08X})",
                    name,
                    bus,
                    device,
                    function,
                    id
                );
                return Ok(bus);
            }
        }

        Err(SmnflowError::PciError(format!(
            "Cannot find device {name} ({device:02X}.{function}, vendor 0x{vendor:04X}) on any bus"
        )))
    }
}

impl<P: ConfigSpace> DeviceDirectory for PciTopology<'_, P> {
    fn device_bus(&self, name: &str) -> Result<u32> {
        {
            let map = self.bus_map.read();
            if let Some(&bus) = map.get(name) {
                return Ok(bus);
            }
        }

        let descriptor = self.config.device(name).ok_or_else(|| {
            SmnflowError::ConfigError(format!("Device {name} is not defined in the platform config"))
        })?;

        let bus = match descriptor.fixed_bus()? {
            Some(bus) => bus,
            None => {
                let vendor = descriptor.vendor_id()?.ok_or_else(|| {
                    SmnflowError::ConfigError(format!(
                        "Device {name} has neither a bus nor a vendor id to probe for"
                    ))
                })?;
                self.probe(name, descriptor.dev, descriptor.fun, vendor)?
            }
        };

        self.bus_map.write().insert(name.to_string(), bus);
        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smn::testing::{Access, FakeConfigSpace};

    #[test]
    fn test_configured_bus() {
        let config = PlatformConfig::from_json(
            r#"{ "devices": { "ROOT": { "bus": "0x40", "dev": 0, "fun": 0 } } }"#,
        )
        .unwrap();
        let pci = FakeConfigSpace::new();
        let topology = PciTopology::new(&config, &pci);

        assert_eq!(topology.device_bus("ROOT").unwrap(), 0x40);
        assert!(pci.transactions().is_empty());
    }

    #[test]
    fn test_scanned_bus_is_cached() {
        let config = PlatformConfig::builtin();
        let pci = FakeConfigSpace::new();
        pci.populate(0x80, 0, 0, PCI_ID_OFFSET, 0x1480_1022);
        let topology = PciTopology::new(&config, &pci);

        assert_eq!(topology.device_bus("ROOT").unwrap(), 0x80);
        assert_eq!(pci.transactions().len(), 1);

        assert_eq!(topology.device_bus("ROOT").unwrap(), 0x80);
        assert_eq!(pci.transactions().len(), 1);
    }

    #[test]
    fn test_scan_skips_other_vendors() {
        let config = PlatformConfig::builtin();
        let pci = FakeConfigSpace::new();
        pci.populate(0, 0, 0, PCI_ID_OFFSET, 0x1237_8086);
        pci.populate(3, 0, 0, PCI_ID_OFFSET, 0x1450_1022);
        let topology = PciTopology::new(&config, &pci);

        assert_eq!(topology.device_bus("ROOT").unwrap(), 3);
        // Only present functions are read
        assert_eq!(
            pci.transactions(),
            vec![Access::read(0, PCI_ID_OFFSET), Access::read(3, PCI_ID_OFFSET)]
        );
    }

    #[test]
    fn test_unknown_device() {
        let config = PlatformConfig::builtin();
        let pci = FakeConfigSpace::new();
        let topology = PciTopology::new(&config, &pci);

        assert!(matches!(
            topology.device_bus("IOMMU"),
            Err(SmnflowError::ConfigError(_))
        ));
    }

    #[test]
    fn test_scan_without_match() {
        let config = PlatformConfig::builtin();
        let pci = FakeConfigSpace::new();
        let topology = PciTopology::new(&config, &pci);

        assert!(matches!(
            topology.device_bus("ROOT"),
            Err(SmnflowError::PciError(_))
        ));
        assert!(pci.transactions().is_empty());
    }
}
