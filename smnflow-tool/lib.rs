pub mod common;
pub mod config;
pub mod error;
pub mod smn;

pub use config::{DeviceDescriptor, PlatformConfig, WindowDescriptor, WindowStore, WindowTable};
pub use error::{Result, SmnflowError};
pub use smn::{BaseAddress, BusResolver, IndirectRegisterPort, NamedWindowResolver, SmnTransaction};
