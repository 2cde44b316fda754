// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Key-value drivers
//!
//! ```text
//! ValueStore (term <-> id)    TripleStore (one tree per quad index)
//!              \                /
//!               StorageDriver / StorageTree
//!              /                \
//!        SledDriver          MemoryStorageDriver
//! ```

pub mod factory;
pub mod traits;
pub mod types;

pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;

pub use factory::{create_storage_driver, DynStorageDriver};
pub use traits::{KvIter, StorageDriver, StorageTree};
pub use types::{StorageDriverError, StorageResult, StorageType};
