//! Trait-based storage abstractions with an in-memory backend.

pub mod inmemory;
pub mod traits;

// Re-export commonly used types and traits
pub use inmemory::MemoryOAuthStorage;
pub use traits::*;

use crate::errors::ConfigError;

/// Storage backend configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
}

/// Parse storage backend from configuration string
pub fn parse_storage_backend(
    backend_name: &str,
) -> std::result::Result<StorageBackend, ConfigError> {
    match backend_name {
        "memory" => Ok(StorageBackend::Memory),
        _ => Err(ConfigError::UnsupportedStorageBackend(
            backend_name.to_string(),
        )),
    }
}
