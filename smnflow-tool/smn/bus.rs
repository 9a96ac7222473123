use crate::common::topology::DeviceDirectory;
use crate::error::Result;

/// Canonical name of the default root complex
pub const ROOT_COMPLEX: &str = "ROOT";

/// Maps CPU threads to the bus of their SMN root complex
///
/// Multi-node topologies are not modelled: every thread reports the bus of
/// the default root complex. Deriving the node from the thread requires
/// walking the data fabric, see illumos `amdzen`.
pub struct BusResolver<'a, D: DeviceDirectory + ?Sized> {
    directory: &'a D,
}

impl<'a, D: DeviceDirectory + ?Sized> BusResolver<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Bus of the root complex serving `cpu_thread`
    ///
    /// Always the bus of [`ROOT_COMPLEX`], whatever the thread.
    pub fn bus_from_cpu_thread(&self, cpu_thread: u32) -> Result<u32> {
        let bus = self.directory.device_bus(ROOT_COMPLEX)?;
        tracing::trace!("[smn] thread {} -> bus {:02X}", cpu_thread, bus);
        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmnflowError;
    use parking_lot::Mutex;

    struct FixedDirectory {
        bus: u32,
        lookups: Mutex<Vec<String>>,
    }

    impl DeviceDirectory for FixedDirectory {
        fn device_bus(&self, name: &str) -> Result<u32> {
            self.lookups.lock().push(name.to_string());
            Ok(self.bus)
        }
    }

    struct BrokenDirectory;

    impl DeviceDirectory for BrokenDirectory {
        fn device_bus(&self, name: &str) -> Result<u32> {
            Err(SmnflowError::PciError(format!("{name} not found")))
        }
    }

    #[test]
    fn test_every_thread_maps_to_root_bus() {
        let directory = FixedDirectory {
            bus: 0x40,
            lookups: Mutex::new(Vec::new()),
        };
        let resolver = BusResolver::new(&directory);

        for thread in [0, 1, 63, 255, u32::MAX] {
            assert_eq!(resolver.bus_from_cpu_thread(thread).unwrap(), 0x40);
        }
        assert!(directory.lookups.lock().iter().all(|name| name == "ROOT"));
    }

    #[test]
    fn test_directory_error_propagates() {
        let resolver = BusResolver::new(&BrokenDirectory);
        let err = resolver.bus_from_cpu_thread(3).unwrap_err();
        assert_eq!(err.to_string(), "PCI operation failed: ROOT not found");
    }
}
