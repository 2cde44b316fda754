// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Driver selection from configuration

use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use log::debug;
use std::path::Path;

/// Boxed driver handle owned by a quad store
pub type DynStorageDriver = Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>;

/// Open the driver for `storage_type`. The memory driver ignores `path`.
pub fn create_storage_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
) -> StorageResult<DynStorageDriver> {
    debug!(
        "Opening {} storage driver at {}",
        storage_type,
        path.as_ref().display()
    );
    let driver: DynStorageDriver = match storage_type {
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => Box::new(super::sled::SledDriver::open(path)?),
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => {
            return Err(super::types::StorageDriverError::BackendSpecific(
                "sled support is not compiled in; enable the sled-backend feature".to_string(),
            ))
        }
        StorageType::Memory => Box::new(super::memory::MemoryStorageDriver::open(path)?),
    };
    Ok(driver)
}
