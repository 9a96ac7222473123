// Recording config-space fake with an echoing SMN index/data pair

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use smnflow_raw::{SMN_PCI_ADDR_REG, SMN_PCI_DATA_REG};

use crate::common::pci::ConfigSpace;
use crate::error::{Result, SmnflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read {
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
    },
    Write {
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
        value: u32,
    },
}

impl Access {
    /// Read of a root complex register (device 0, function 0)
    pub fn read(bus: u32, offset: u32) -> Self {
        Access::Read {
            bus,
            device: 0,
            function: 0,
            offset,
        }
    }

    /// Write of a root complex register (device 0, function 0)
    pub fn write(bus: u32, offset: u32, value: u32) -> Self {
        Access::Write {
            bus,
            device: 0,
            function: 0,
            offset,
            value,
        }
    }
}

#[derive(Default)]
struct State {
    log: Vec<Access>,
    index: HashMap<u32, u32>,
    smn: HashMap<(u32, u32), u32>,
    config: HashMap<(u32, u32, u32, u32), u32>,
    failing: HashSet<u32>,
}

/// Idealised single-caller hardware
///
/// Data accesses on (bus, 0, 0) hit the SMN address last written to the
/// index register of that bus. Unwritten SMN addresses read as zero. Other
/// config-space offsets must be populated or the access fails like an
/// absent function; only functions with populated offsets exist.
#[derive(Default)]
pub struct FakeConfigSpace {
    state: Mutex<State>,
}

impl FakeConfigSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(&self, bus: u32, device: u32, function: u32, offset: u32, value: u32) {
        self.state
            .lock()
            .config
            .insert((bus, device, function, offset), value);
    }

    /// Make every access to `offset` fail after it is recorded
    pub fn fail_offset(&self, offset: u32) {
        self.state.lock().failing.insert(offset);
    }

    pub fn smn_value(&self, bus: u32, address: u32) -> u32 {
        self.state
            .lock()
            .smn
            .get(&(bus, address))
            .copied()
            .unwrap_or(0)
    }

    pub fn transactions(&self) -> Vec<Access> {
        self.state.lock().log.clone()
    }
}

fn is_smn_port(device: u32, function: u32, offset: u32) -> bool {
    device == 0 && function == 0 && (offset == SMN_PCI_ADDR_REG || offset == SMN_PCI_DATA_REG)
}

impl ConfigSpace for FakeConfigSpace {
    fn read_dword(&self, bus: u32, device: u32, function: u32, offset: u32) -> Result<u32> {
        let mut state = self.state.lock();
        state.log.push(Access::Read {
            bus,
            device,
            function,
            offset,
        });

        if state.failing.contains(&offset) {
            return Err(SmnflowError::PciError(format!(
                "injected read failure at 0x{offset:X}"
            )));
        }

        if is_smn_port(device, function, offset) {
            let index = state.index.get(&bus).copied().unwrap_or(0);
            if offset == SMN_PCI_ADDR_REG {
                return Ok(index);
            }
            return Ok(state.smn.get(&(bus, index)).copied().unwrap_or(0));
        }

        state
            .config
            .get(&(bus, device, function, offset))
            .copied()
            .ok_or_else(|| {
                SmnflowError::PciError(format!(
                    "no function at {bus:02X}:{device:02X}.{function}"
                ))
            })
    }

    fn write_dword(
        &self,
        bus: u32,
        device: u32,
        function: u32,
        offset: u32,
        value: u32,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push(Access::Write {
            bus,
            device,
            function,
            offset,
            value,
        });

        if state.failing.contains(&offset) {
            return Err(SmnflowError::PciError(format!(
                "injected write failure at 0x{offset:X}"
            )));
        }

        if is_smn_port(device, function, offset) {
            if offset == SMN_PCI_ADDR_REG {
                state.index.insert(bus, value);
            } else {
                let index = state.index.get(&bus).copied().unwrap_or(0);
                state.smn.insert((bus, index), value);
            }
            return Ok(());
        }

        state.config.insert((bus, device, function, offset), value);
        Ok(())
    }

    fn function_exists(&self, bus: u32, device: u32, function: u32) -> bool {
        self.state
            .lock()
            .config
            .keys()
            .any(|&(b, d, f, _)| (b, d, f) == (bus, device, function))
    }
}
