// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Key-value driver types and errors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Key-value engine backing a quad store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Sled embedded database; survives restarts
    #[default]
    Sled,

    /// Ordered in-process trees, gone when the store is dropped
    Memory,
}

impl StorageType {
    pub fn is_persistent(&self) -> bool {
        matches!(self, StorageType::Sled)
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageType::Sled),
            "memory" => Ok(StorageType::Memory),
            other => Err(format!("unknown storage type '{}' (expected sled or memory)", other)),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageType::Sled => "sled",
            StorageType::Memory => "memory",
        })
    }
}

/// Failures of the raw key-value layer
///
/// Higher layers wrap these in [`crate::storage::StorageError`].
#[derive(Error, Debug)]
pub enum StorageDriverError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by the engine itself
    #[error("Storage driver error: {0}")]
    BackendSpecific(String),
}

pub type StorageResult<T> = Result<T, StorageDriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_names() {
        assert_eq!("SLED".parse::<StorageType>(), Ok(StorageType::Sled));
        assert_eq!(StorageType::Memory.to_string(), "memory");
        assert!("rocks".parse::<StorageType>().is_err());
        assert_eq!(StorageType::default(), StorageType::Sled);
        assert!(!StorageType::Memory.is_persistent());
    }
}
