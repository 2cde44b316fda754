// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Ordered key-value abstraction underneath the quad store
//!
//! Every tree keeps its keys sorted bytewise. Quad indexes store big-endian
//! ids, so a prefix scan over an index comes back in id order.

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Cursor over `(key, value)` pairs, detached from the tree that produced it
pub type KvIter = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + Send>;

/// A named, sorted key space inside a driver
pub trait StorageTree: Send + Sync {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool>;

    fn is_empty(&self) -> StorageResult<bool>;

    fn len(&self) -> StorageResult<usize>;

    /// All entries whose key starts with `prefix`, ascending.
    /// An empty prefix walks the whole tree.
    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter>;

    fn flush(&self) -> StorageResult<()>;
}

/// A key-value engine that hands out named trees
pub trait StorageDriver: Send + Sync {
    type Tree: StorageTree;

    /// Open the engine rooted at `path`, creating it if missing
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open `name`, creating an empty tree on first use
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    fn flush(&self) -> StorageResult<()>;

    fn storage_type(&self) -> StorageType;

    /// Release file locks. Called once when the owning store is dropped.
    fn shutdown(&mut self) -> StorageResult<()> {
        self.flush()
    }
}

impl StorageTree for Box<dyn StorageTree> {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.as_ref().insert(key, value)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.as_ref().get(key)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.as_ref().remove(key)
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        self.as_ref().contains_key(key)
    }

    fn is_empty(&self) -> StorageResult<bool> {
        self.as_ref().is_empty()
    }

    fn len(&self) -> StorageResult<usize> {
        self.as_ref().len()
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter> {
        self.as_ref().scan_prefix(prefix)
    }

    fn flush(&self) -> StorageResult<()> {
        self.as_ref().flush()
    }
}
