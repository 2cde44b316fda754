// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled-backed driver

use super::traits::{KvIter, StorageDriver, StorageTree};
use super::types::{StorageDriverError, StorageResult, StorageType};
use std::path::Path;

pub struct SledDriver {
    db: sled::Db,
}

pub struct SledTree {
    tree: sled::Tree,
}

fn sled_err(e: sled::Error) -> StorageDriverError {
    StorageDriverError::BackendSpecific(e.to_string())
}

impl StorageTree for SledTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree.insert(key, value).map(drop).map_err(sled_err)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let found = self.tree.get(key).map_err(sled_err)?;
        Ok(found.map(|ivec| ivec.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.tree.remove(key).map(drop).map_err(sled_err)
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        self.tree.contains_key(key).map_err(sled_err)
    }

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.tree.is_empty())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.tree.len())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter> {
        // sled::Iter holds its own tree handle, so the cursor is 'static.
        let cursor = self.tree.scan_prefix(prefix).map(|entry| {
            let (key, value) = entry.map_err(sled_err)?;
            Ok((key.to_vec(), value.to_vec()))
        });
        Ok(Box::new(cursor))
    }

    fn flush(&self) -> StorageResult<()> {
        self.tree.flush().map(drop).map_err(sled_err)
    }
}

impl StorageDriver for SledDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path).map_err(sled_err)?;
        Ok(SledDriver { db })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let tree = self.db.open_tree(name).map_err(sled_err)?;
        Ok(Box::new(SledTree { tree }))
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map(drop).map_err(sled_err)
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut driver = SledDriver::open(dir.path()).unwrap();
            let tree = driver.open_tree("spoc").unwrap();
            tree.insert(&[0, 2], &[]).unwrap();
            tree.insert(&[0, 1], &[]).unwrap();
            tree.insert(&[1, 0], &[]).unwrap();
            driver.shutdown().unwrap();
        }

        let driver = SledDriver::open(dir.path()).unwrap();
        let tree = driver.open_tree("spoc").unwrap();
        assert_eq!(tree.len().unwrap(), 3);
        let keys: Vec<Vec<u8>> = tree
            .scan_prefix(&[0])
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(keys, vec![vec![0, 1], vec![0, 2]]);
    }
}
