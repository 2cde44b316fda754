// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Surrogate id dictionary
//!
//! Maps every term seen by the store to a positive 64-bit id and back.
//! Three trees back it:
//! - `values`: big-endian id -> bincode term
//! - `ids`: bincode term -> big-endian id
//! - `value_meta`: the next id to hand out

use super::persistent::{DynStorageDriver, StorageTree};
use super::types::{StorageError, SurrogateId, FIRST_VALUE_ID};
use crate::model::Value;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

const VALUES_TREE: &str = "values";
const IDS_TREE: &str = "ids";
const META_TREE: &str = "value_meta";
const NEXT_ID_KEY: &[u8] = b"next_id";

pub(crate) fn encode_id(id: SurrogateId) -> [u8; 8] {
    (id as u64).to_be_bytes()
}

pub(crate) fn decode_id(bytes: &[u8], tree: &str) -> Result<SurrogateId, StorageError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| StorageError::CorruptKey {
        tree: tree.to_string(),
        expected: 8,
        actual: bytes.len(),
    })?;
    Ok(u64::from_be_bytes(raw) as SurrogateId)
}

/// Two-way term dictionary with in-memory caches
pub struct ValueStore {
    values: Box<dyn StorageTree>,
    ids: Box<dyn StorageTree>,
    meta: Box<dyn StorageTree>,
    next_id: Mutex<SurrogateId>,
    id_cache: RwLock<HashMap<Value, SurrogateId>>,
    value_cache: RwLock<HashMap<SurrogateId, Value>>,
    read_only: bool,
}

impl ValueStore {
    pub fn open(driver: &DynStorageDriver, read_only: bool) -> Result<Self, StorageError> {
        let values = driver.open_tree(VALUES_TREE)?;
        let ids = driver.open_tree(IDS_TREE)?;
        let meta = driver.open_tree(META_TREE)?;
        let next_id = match meta.get(NEXT_ID_KEY)? {
            Some(bytes) => decode_id(&bytes, META_TREE)?,
            None => FIRST_VALUE_ID,
        };
        debug!("Value store opened, next id {}", next_id);

        Ok(Self {
            values,
            ids,
            meta,
            next_id: Mutex::new(next_id),
            id_cache: RwLock::new(HashMap::new()),
            value_cache: RwLock::new(HashMap::new()),
            read_only,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Id of `value`, if it has one
    pub fn get_id(&self, value: &Value) -> Result<Option<SurrogateId>, StorageError> {
        if let Some(id) = self.id_cache.read().get(value) {
            return Ok(Some(*id));
        }
        let key = bincode::serialize(value)?;
        match self.ids.get(&key)? {
            Some(bytes) => {
                let id = decode_id(&bytes, IDS_TREE)?;
                self.remember(value, id);
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Id of `value`, assigning a fresh one if needed
    ///
    /// Returns `Ok(None)` when the value is unseen and the store is read-only.
    pub fn get_or_create_id(&self, value: &Value) -> Result<Option<SurrogateId>, StorageError> {
        if let Some(id) = self.get_id(value)? {
            return Ok(Some(id));
        }
        if self.read_only {
            return Ok(None);
        }

        let key = bincode::serialize(value)?;
        let mut next_id = self.next_id.lock();
        // Another writer may have assigned it while we waited for the lock.
        if let Some(bytes) = self.ids.get(&key)? {
            let id = decode_id(&bytes, IDS_TREE)?;
            self.remember(value, id);
            return Ok(Some(id));
        }

        let id = *next_id;
        let encoded = encode_id(id);
        self.values.insert(&encoded, &key)?;
        self.ids.insert(&key, &encoded)?;
        self.meta.insert(NEXT_ID_KEY, &encode_id(id + 1))?;
        *next_id = id + 1;
        self.remember(value, id);
        Ok(Some(id))
    }

    /// Term for `id`
    pub fn get_value(&self, id: SurrogateId) -> Result<Value, StorageError> {
        if let Some(value) = self.value_cache.read().get(&id) {
            return Ok(value.clone());
        }
        let bytes = self
            .values
            .get(&encode_id(id))?
            .ok_or(StorageError::ValueNotFound(id))?;
        let value: Value = bincode::deserialize(&bytes)?;
        self.remember(&value, id);
        Ok(value)
    }

    /// Number of terms with an id
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.values.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.values.is_empty()?)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.values.flush()?;
        self.ids.flush()?;
        self.meta.flush()?;
        Ok(())
    }

    fn remember(&self, value: &Value, id: SurrogateId) {
        self.id_cache.write().insert(value.clone(), id);
        self.value_cache.write().insert(id, value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::persistent::{create_storage_driver, StorageType};

    fn memory_driver() -> DynStorageDriver {
        create_storage_driver(StorageType::Memory, "").unwrap()
    }

    #[test]
    fn test_ids_start_at_one_and_are_stable() {
        let driver = memory_driver();
        let store = ValueStore::open(&driver, false).unwrap();
        let a = Value::iri("ex:a");
        let b = Value::literal("b");

        assert_eq!(store.get_id(&a).unwrap(), None);
        assert_eq!(store.get_or_create_id(&a).unwrap(), Some(1));
        assert_eq!(store.get_or_create_id(&b).unwrap(), Some(2));
        assert_eq!(store.get_or_create_id(&a).unwrap(), Some(1));
        assert_eq!(store.get_value(2).unwrap(), b);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_counter_survives_reopen() {
        let driver = memory_driver();
        {
            let store = ValueStore::open(&driver, false).unwrap();
            store.get_or_create_id(&Value::iri("ex:a")).unwrap();
        }
        let store = ValueStore::open(&driver, false).unwrap();
        assert_eq!(store.get_id(&Value::iri("ex:a")).unwrap(), Some(1));
        assert_eq!(store.get_or_create_id(&Value::iri("ex:b")).unwrap(), Some(2));
    }

    #[test]
    fn test_read_only_refuses_creation() {
        let driver = memory_driver();
        let store = ValueStore::open(&driver, true).unwrap();
        assert_eq!(store.get_or_create_id(&Value::iri("ex:new")).unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_unknown_id_is_error() {
        let driver = memory_driver();
        let store = ValueStore::open(&driver, false).unwrap();
        assert!(matches!(
            store.get_value(99),
            Err(StorageError::ValueNotFound(99))
        ));
    }
}
