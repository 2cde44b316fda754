// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Volatile driver over `BTreeMap`s, used for in-memory stores and tests

use super::traits::{KvIter, StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

type SharedMap = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Entries copied per read lock taken by a cursor
const SCAN_BATCH: usize = 256;

/// Trees opened under the same name share one map.
#[derive(Default)]
pub struct MemoryStorageDriver {
    trees: RwLock<HashMap<String, SharedMap>>,
}

pub struct MemoryTree {
    map: SharedMap,
}

impl MemoryStorageDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageTree for MemoryTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.map.read().contains_key(key))
    }

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.map.read().is_empty())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.map.read().len())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter> {
        Ok(Box::new(MemoryCursor {
            map: self.map.clone(),
            prefix: prefix.to_vec(),
            resume: Bound::Included(prefix.to_vec()),
            buffer: VecDeque::new(),
            done: false,
        }))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Prefix cursor that copies a batch at a time
///
/// No lock is held between batches, so writers are never blocked by an open
/// cursor. Each refill resumes strictly after the last key handed out.
struct MemoryCursor {
    map: SharedMap,
    prefix: Vec<u8>,
    resume: Bound<Vec<u8>>,
    buffer: VecDeque<(Vec<u8>, Vec<u8>)>,
    done: bool,
}

impl MemoryCursor {
    fn refill(&mut self) {
        let map = self.map.read();
        let start = match &self.resume {
            Bound::Included(key) => Bound::Included(key.as_slice()),
            Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let range = (start, Bound::Unbounded);
        for (key, value) in map.range::<[u8], _>(range).take(SCAN_BATCH) {
            if !key.starts_with(&self.prefix) {
                self.done = true;
                break;
            }
            self.buffer.push_back((key.clone(), value.clone()));
        }
        match self.buffer.back() {
            Some((last, _)) if self.buffer.len() == SCAN_BATCH => {
                self.resume = Bound::Excluded(last.clone());
            }
            _ => self.done = true,
        }
    }
}

impl Iterator for MemoryCursor {
    type Item = StorageResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            self.refill();
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl StorageDriver for MemoryStorageDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let map = self
            .trees
            .write()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(Box::new(MemoryTree { map }))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}
