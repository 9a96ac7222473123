//! SMN (System Management Network) register access
//!
//! SMN registers are reached through the index/data pair in the root
//! complex's PCI configuration space: the address goes to 0x60 of
//! (bus, 0, 0), then the value is read from or written to 0x64.
//!
//! - [`IndirectRegisterPort`] performs the raw two-step transaction.
//! - [`NamedWindowResolver`] maps a window name from the platform config
//!   to its base address and forwards to the port.
//! - [`BusResolver`] reports the bus of the root complex for a CPU thread.
//!
//! The index/data sequence is not atomic. Callers sharing a root complex
//! must serialise their accesses themselves.

pub mod bus;
pub mod port;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{BusResolver, ROOT_COMPLEX};
pub use port::{IndirectRegisterPort, SmnTransaction, DEFAULT_BUS};
pub use window::{BaseAddress, NamedWindowResolver};
