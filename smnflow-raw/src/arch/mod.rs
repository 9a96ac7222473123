//! Architecture-specific SMN register definitions
//!
//! SMN window bases and register layouts move between AMD processor
//! generations. Definitions are grouped by family.
//!
//! ## Supported Architectures
//!
//! - **Zen** (`zen` feature) - Family 17h/19h

#[cfg(feature = "zen")]
pub mod zen;
