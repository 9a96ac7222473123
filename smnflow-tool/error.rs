use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmnflowError {
    #[error("PCI operation failed: {0}")]
    PciError(String),

    #[error("PCI config-space access failed: {0}")]
    PciAccess(#[from] smnflow_raw::PciError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Nix error: {0}")]
    NixError(#[from] nix::Error),

    #[error("Config file error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SmnflowError>;
