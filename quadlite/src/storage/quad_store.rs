// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Quad store: driver, value dictionary and statement indexes behind one handle

use super::persistent::{create_storage_driver, DynStorageDriver};
use super::triple_store::TripleStore;
use super::types::{QuadIds, StorageError, DEFAULT_CONTEXT_ID};
use super::value_store::ValueStore;
use super::visibility::Generation;
use crate::config::StoreConfig;
use crate::exec::{EvaluationDataset, SnapshotDataset};
use crate::model::{Quad, StoreId, Value};
use crate::txn::Transaction;
use log::{info, warn};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

pub(crate) struct StoreInner {
    id: StoreId,
    config: StoreConfig,
    driver: Mutex<DynStorageDriver>,
    values: ValueStore,
    triples: TripleStore,
    // Serializes auto-commit writes and transaction commits.
    write_lock: Mutex<()>,
}

/// Cheaply cloneable handle to an open quad store
#[derive(Clone)]
pub struct QuadStore {
    inner: Arc<StoreInner>,
}

impl QuadStore {
    /// Open (or create) a store at `path`
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self, StorageError> {
        let driver = create_storage_driver(config.storage_type, path.as_ref())?;
        let values = ValueStore::open(&driver, config.read_only)?;
        let triples = TripleStore::open(&driver, &config.indexes)?;
        let id = StoreId::new();
        info!(
            "Opened {} quad store {} at {:?} with indexes [{}]{}",
            config.storage_type,
            id,
            path.as_ref(),
            triples.index_names().join(","),
            if config.read_only { " (read-only)" } else { "" }
        );
        Ok(Self {
            inner: Arc::new(StoreInner {
                id,
                config,
                driver: Mutex::new(driver),
                values,
                triples,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Fresh in-memory store with the default indexes
    pub fn memory() -> Result<Self, StorageError> {
        Self::open("", StoreConfig::memory())
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.config.read_only
    }

    pub(crate) fn values(&self) -> &ValueStore {
        &self.inner.values
    }

    pub(crate) fn triples(&self) -> &TripleStore {
        &self.inner.triples
    }

    pub(crate) fn write_lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.inner.write_lock.lock()
    }

    /// Ids of `quad`, creating missing ones
    pub(crate) fn encode_quad(&self, quad: &Quad) -> Result<QuadIds, StorageError> {
        if !quad.is_well_typed() {
            return Err(StorageError::InvalidQuad(quad.to_string()));
        }
        let id_of = |value: &Value| {
            self.values()
                .get_or_create_id(value)?
                .ok_or_else(|| StorageError::ReadOnly(format!("cannot assign an id to {}", value)))
        };
        let context = match &quad.context {
            Some(value) => id_of(value)?,
            None => DEFAULT_CONTEXT_ID,
        };
        Ok([
            id_of(&quad.subject)?,
            id_of(&quad.predicate)?,
            id_of(&quad.object)?,
            context,
        ])
    }

    /// Ids of `quad` without creating any; `None` if a term is unknown
    pub(crate) fn lookup_quad(&self, quad: &Quad) -> Result<Option<QuadIds>, StorageError> {
        let values = self.values();
        let mut ids = [DEFAULT_CONTEXT_ID; 4];
        let terms = [
            Some(&quad.subject),
            Some(&quad.predicate),
            Some(&quad.object),
            quad.context.as_ref(),
        ];
        for (slot, term) in terms.into_iter().enumerate() {
            if let Some(value) = term {
                match values.get_id(value)? {
                    Some(id) => ids[slot] = id,
                    None => return Ok(None),
                }
            }
        }
        Ok(Some(ids))
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly(format!("store {}", self.id())));
        }
        Ok(())
    }

    /// Add statements outside any transaction as one commit; returns how
    /// many were new
    pub fn add_all(&self, quads: &[Quad]) -> Result<usize, StorageError> {
        self.check_writable()?;
        let ids = quads
            .iter()
            .map(|quad| self.encode_quad(quad))
            .collect::<Result<Vec<_>, _>>()?;
        let _guard = self.write_lock();
        let triples = self.triples();
        let generation = triples.next_generation();
        let mut added = 0;
        for quad in &ids {
            if triples.add(quad, generation)? {
                added += 1;
            }
        }
        if added > 0 {
            triples.publish(generation)?;
        }
        Ok(added)
    }

    /// Remove statements outside any transaction as one commit; returns how
    /// many existed
    pub fn remove_all(&self, quads: &[Quad]) -> Result<usize, StorageError> {
        self.check_writable()?;
        let _guard = self.write_lock();
        let triples = self.triples();
        let generation = triples.next_generation();
        let mut removed = Vec::new();
        for quad in quads {
            if let Some(ids) = self.lookup_quad(quad)? {
                if triples.remove(&ids, generation)? {
                    removed.push(ids);
                }
            }
        }
        if !removed.is_empty() {
            triples.publish(generation)?;
            triples.reclaim(&removed)?;
        }
        Ok(removed.len())
    }

    /// Latest committed generation
    pub fn generation(&self) -> Generation {
        self.triples().generation()
    }

    /// Number of statements in the latest committed state
    pub fn len(&self) -> Result<usize, StorageError> {
        self.triples().len(self.generation())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.triples().is_empty(self.generation())
    }

    /// Dataset over the statements committed when it is taken
    ///
    /// Later commits stay invisible to it for as long as it lives.
    pub fn snapshot(&self) -> Arc<dyn EvaluationDataset> {
        Arc::new(SnapshotDataset::new(self.clone(), self.triples().pin()))
    }

    /// Drop removed statements that no open snapshot or transaction can see
    pub fn compact(&self) -> Result<usize, StorageError> {
        self.check_writable()?;
        let _guard = self.write_lock();
        self.triples().compact()
    }

    /// Start a transaction
    pub fn begin(&self) -> Result<Transaction, StorageError> {
        self.check_writable()?;
        Ok(Transaction::begin(self.clone()))
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.values().flush()?;
        self.triples().flush()?;
        self.inner.driver.lock().flush()?;
        Ok(())
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Err(e) = self.driver.get_mut().shutdown() {
            warn!("Failed to shut down store {}: {}", self.id, e);
        }
    }
}
