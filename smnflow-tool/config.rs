use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use smnflow_raw::current_arch::thm::{SMUTHM_BASE, SMUTHM_WINDOW};
use smnflow_raw::{SMN_ROOT_DEVICE, SMN_ROOT_FUNCTION};

use crate::error::{Result, SmnflowError};
use crate::smn::ROOT_COMPLEX;

/// AMD PCI vendor id, matched when probing for the root complex
const AMD_VENDOR_ID: &str = "0x1022";

/// Lookup of SMN window descriptors by name
///
/// Implemented by the platform configuration. The SMN core only reads
/// through this trait and never mutates the table.
pub trait WindowStore {
    /// Descriptor of `name`, or `None` when absent or declared `null`
    fn window(&self, name: &str) -> Option<&WindowDescriptor>;
}

/// Record describing one SMN window
///
/// Kept as a plain field map: an empty record and a record without
/// `fixed_address` mean different things to the resolver. Fields other
/// than `fixed_address` and `desc` may hold any JSON value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct WindowDescriptor {
    fields: Map<String, Value>,
}

impl WindowDescriptor {
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw `fixed_address` string, unparsed
    ///
    /// A `fixed_address` that is not a JSON string is a `ConfigError`.
    pub fn fixed_address(&self) -> Result<Option<&str>> {
        match self.fields.get("fixed_address") {
            None => Ok(None),
            Some(Value::String(address)) => Ok(Some(address.as_str())),
            Some(other) => Err(SmnflowError::ConfigError(format!(
                "fixed_address must be a hex string, got {other}"
            ))),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.fields.get("desc").and_then(Value::as_str)
    }
}

/// Window name to descriptor mapping
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct WindowTable {
    entries: HashMap<String, Option<WindowDescriptor>>,
}

impl WindowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a window; `None` declares the name without a record
    pub fn insert(&mut self, name: impl Into<String>, descriptor: Option<WindowDescriptor>) {
        self.entries.insert(name.into(), descriptor);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Window names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl WindowStore for WindowTable {
    fn window(&self, name: &str) -> Option<&WindowDescriptor> {
        self.entries.get(name).and_then(Option::as_ref)
    }
}

/// Location of a named PCI device
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceDescriptor {
    /// Fixed bus number (hex string); probed when absent
    #[serde(default)]
    pub bus: Option<String>,

    #[serde(default)]
    pub dev: u32,

    #[serde(default)]
    pub fun: u32,

    /// Vendor id (hex string) matched while probing
    #[serde(default)]
    pub vid: Option<String>,

    #[serde(default)]
    pub desc: Option<String>,
}

impl DeviceDescriptor {
    /// Configured bus number, if any
    pub fn fixed_bus(&self) -> Result<Option<u32>> {
        self.bus.as_deref().map(parse_hex_u32).transpose()
    }

    pub fn vendor_id(&self) -> Result<Option<u16>> {
        match self.vid.as_deref() {
            Some(vid) => {
                let value = parse_hex_u32(vid)?;
                u16::try_from(value).map(Some).map_err(|_| {
                    SmnflowError::ConfigError(format!("Vendor id {vid} does not fit in 16 bits"))
                })
            }
            None => Ok(None),
        }
    }
}

/// Platform configuration: SMN windows and PCI devices
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub windows: WindowTable,

    #[serde(default)]
    pub devices: HashMap<String, DeviceDescriptor>,
}

impl PlatformConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;

        tracing::info!(
            "Loaded {} SMN windows and {} devices from {}",
            config.windows.len(),
            config.devices.len(),
            path.display()
        );

        Ok(config)
    }

    /// Embedded default table for Zen parts
    pub fn builtin() -> Self {
        let mut windows = WindowTable::new();
        windows.insert(
            SMUTHM_WINDOW,
            Some(WindowDescriptor::new([
                ("fixed_address", format!("0x{SMUTHM_BASE:08X}")),
                ("desc", "SMU thermal".to_string()),
            ])),
        );

        let mut devices = HashMap::new();
        devices.insert(
            ROOT_COMPLEX.to_string(),
            DeviceDescriptor {
                bus: None,
                dev: SMN_ROOT_DEVICE,
                fun: SMN_ROOT_FUNCTION,
                vid: Some(AMD_VENDOR_ID.to_string()),
                desc: Some("Root complex".to_string()),
            },
        );

        Self { windows, devices }
    }

    pub fn device(&self, name: &str) -> Option<&DeviceDescriptor> {
        self.devices.get(name)
    }

    pub fn window_names(&self) -> Vec<&str> {
        self.windows.names()
    }
}

impl WindowStore for PlatformConfig {
    fn window(&self, name: &str) -> Option<&WindowDescriptor> {
        self.windows.window(name)
    }
}

/// Parse a base-16 string with optional `0x` prefix into 32 bits
pub fn parse_hex_u32(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u32::from_str_radix(digits, 16).map_err(|e| {
        SmnflowError::ConfigError(format!("Invalid 32-bit hex value {text:?}: {e}"))
    })
}
