pub mod cpu;
pub mod pci;
pub mod topology;

pub use pci::{ConfigSpace, Pci, PciHandle, ProbePci};
pub use topology::{DeviceDirectory, PciTopology};
