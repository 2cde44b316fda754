// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transactions over a quad store
//!
//! Writes go to a change log and reach the indexes on commit. Terms get
//! their surrogate ids as soon as a statement is added, so pending
//! statements are id-quads like committed ones.
//!
//! A transaction reads the store as of the generation it began at. Its
//! commit publishes a new generation, and the transaction moves on to it.

use super::log::ChangeLog;
use super::state::{TransactionId, TransactionStatus};
use crate::exec::{EvaluationDataset, ExecResult, RecordIterator, ScanRecordIterator};
use crate::model::{Quad, StoreId, Value};
use crate::storage::{
    Generation, QuadIds, QuadStore, ReadPin, ScanPattern, StatementOrder, StorageError,
    SurrogateId, TripleScan,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug)]
struct TxnState {
    status: TransactionStatus,
    changes: ChangeLog,
    pin: ReadPin,
}

/// A unit of work against one store
pub struct Transaction {
    id: TransactionId,
    store: QuadStore,
    state: Arc<Mutex<TxnState>>,
}

impl Transaction {
    pub(crate) fn begin(store: QuadStore) -> Self {
        let id = TransactionId::new();
        let pin = store.triples().pin();
        debug!(
            "Began transaction {} on {} at generation {}",
            id,
            store.id(),
            pin.generation()
        );
        Self {
            id,
            store,
            state: Arc::new(Mutex::new(TxnState {
                status: TransactionStatus::Active,
                changes: ChangeLog::new(),
                pin,
            })),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.state.lock().status
    }

    fn ensure_active(&self, state: &TxnState, action: &str) -> Result<(), StorageError> {
        if state.status.is_finished() {
            return Err(StorageError::TransactionError(format!(
                "cannot {} in {}: transaction is {:?}",
                action, self.id, state.status
            )));
        }
        Ok(())
    }

    /// Stage an add; true if it changes what this transaction sees
    pub fn add(&self, quad: &Quad) -> Result<bool, StorageError> {
        let mut state = self.state.lock();
        self.ensure_active(&state, "add")?;
        let ids = self.store.encode_quad(quad)?;
        let committed = self.store.triples().contains(&ids, state.pin.generation())?;
        Ok(state.changes.record_add(ids, committed))
    }

    pub fn add_all(&self, quads: &[Quad]) -> Result<usize, StorageError> {
        let mut changed = 0;
        for quad in quads {
            if self.add(quad)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Stage a removal; true if it changes what this transaction sees
    pub fn remove(&self, quad: &Quad) -> Result<bool, StorageError> {
        let mut state = self.state.lock();
        self.ensure_active(&state, "remove")?;
        let ids = match self.store.lookup_quad(quad)? {
            Some(ids) => ids,
            None => return Ok(false),
        };
        let committed = self.store.triples().contains(&ids, state.pin.generation())?;
        Ok(state.changes.record_remove(ids, committed))
    }

    /// Generation this transaction reads committed statements at
    pub fn read_generation(&self) -> Generation {
        self.state.lock().pin.generation()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.state.lock().changes.is_empty()
    }

    /// Dataset seeing committed statements plus this transaction's changes
    pub fn dataset(&self) -> Arc<dyn EvaluationDataset> {
        Arc::new(TransactionDataset {
            store: self.store.clone(),
            state: self.state.clone(),
        })
    }

    /// Apply pending changes to the indexes; returns how many were applied
    pub fn commit(&self) -> Result<usize, StorageError> {
        let mut state = self.state.lock();
        self.ensure_active(&state, "commit")?;
        let _guard = self.store.write_lock();
        let triples = self.store.triples();
        let generation = triples.next_generation();
        let mut removed = Vec::new();
        for quad in state.changes.removed() {
            if triples.remove(quad, generation)? {
                removed.push(*quad);
            }
        }
        let mut applied = removed.len();
        for quad in state.changes.added() {
            if triples.add(quad, generation)? {
                applied += 1;
            }
        }
        if applied > 0 {
            triples.publish(generation)?;
        }
        state.pin = triples.pin();
        triples.reclaim(&removed)?;
        state.changes.clear();
        state.status = TransactionStatus::Committed;
        info!(
            "Committed transaction {} ({} change(s)) at generation {}",
            self.id,
            applied,
            state.pin.generation()
        );
        Ok(applied)
    }

    /// Discard pending changes
    pub fn rollback(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        self.ensure_active(&state, "roll back")?;
        let discarded = state.changes.len();
        state.changes.clear();
        state.status = TransactionStatus::RolledBack;
        info!(
            "Rolled back transaction {} ({} change(s) discarded)",
            self.id, discarded
        );
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.status == TransactionStatus::Active {
            if !state.changes.is_empty() {
                warn!(
                    "Transaction {} dropped with {} uncommitted change(s); rolling back",
                    self.id,
                    state.changes.len()
                );
            }
            state.changes.clear();
            state.status = TransactionStatus::RolledBack;
        }
    }
}

/// Committed statements minus pending removals, then pending additions
struct OverlayScan {
    committed: TripleScan,
    removed: BTreeSet<QuadIds>,
    added: std::vec::IntoIter<QuadIds>,
}

impl Iterator for OverlayScan {
    type Item = Result<QuadIds, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.committed.by_ref() {
            match item {
                Ok(quad) if self.removed.contains(&quad) => continue,
                other => return Some(other),
            }
        }
        self.added.next().map(Ok)
    }
}

struct TransactionDataset {
    store: QuadStore,
    state: Arc<Mutex<TxnState>>,
}

impl EvaluationDataset for TransactionDataset {
    fn store_id(&self) -> StoreId {
        self.store.id()
    }

    fn open_scan(&self, pattern: &ScanPattern) -> ExecResult<Box<dyn RecordIterator>> {
        let state = self.state.lock();
        let committed = self
            .store
            .triples()
            .scan(pattern, state.pin.generation())?;
        if state.changes.is_empty() {
            return Ok(Box::new(ScanRecordIterator::new(committed)));
        }
        let overlay = OverlayScan {
            committed,
            removed: state.changes.removed_matching(pattern),
            added: state.changes.added_matching(pattern).into_iter(),
        };
        Ok(Box::new(ScanRecordIterator::new(overlay)))
    }

    fn open_ordered_scan(
        &self,
        pattern: &ScanPattern,
        order: StatementOrder,
    ) -> ExecResult<Option<Box<dyn RecordIterator>>> {
        let state = self.state.lock();
        if !state.changes.is_empty() {
            debug!("Ordered scan refused: transaction has pending changes");
            return Ok(None);
        }
        Ok(self
            .store
            .triples()
            .scan_ordered(pattern, order, state.pin.generation())?
            .map(|scan| Box::new(ScanRecordIterator::new(scan)) as Box<dyn RecordIterator>))
    }

    fn resolve_id(&self, value: &Value) -> ExecResult<Option<SurrogateId>> {
        Ok(self.store.values().get_id(value)?)
    }

    fn resolve_id_or_create(&self, value: &Value) -> ExecResult<Option<SurrogateId>> {
        Ok(self.store.values().get_or_create_id(value)?)
    }

    fn resolve_value(&self, id: SurrogateId) -> ExecResult<Value> {
        Ok(self.store.values().get_value(id)?)
    }

    fn has_uncommitted_local_changes(&self) -> bool {
        let state = self.state.lock();
        state.status == TransactionStatus::Active && !state.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::new(Value::iri(s), Value::iri(p), Value::iri(o))
    }

    fn subjects(dataset: &Arc<dyn EvaluationDataset>) -> Vec<Value> {
        let mut quads = dataset.statements(None, None, None, None).unwrap();
        quads.sort();
        quads.into_iter().map(|q| q.subject).collect()
    }

    #[test]
    fn test_changes_visible_only_inside_until_commit() {
        let store = QuadStore::memory().unwrap();
        store.add_all(&[quad("ex:a", "ex:p", "ex:b")]).unwrap();

        let txn = store.begin().unwrap();
        assert!(txn.add(&quad("ex:c", "ex:p", "ex:d")).unwrap());
        assert!(txn.remove(&quad("ex:a", "ex:p", "ex:b")).unwrap());
        let inside = txn.dataset();
        assert!(inside.has_uncommitted_local_changes());
        assert_eq!(subjects(&inside), vec![Value::iri("ex:c")]);
        assert_eq!(subjects(&store.snapshot()), vec![Value::iri("ex:a")]);

        assert_eq!(txn.commit().unwrap(), 2);
        assert_eq!(txn.status(), TransactionStatus::Committed);
        assert!(!inside.has_uncommitted_local_changes());
        assert_eq!(subjects(&store.snapshot()), vec![Value::iri("ex:c")]);
    }

    #[test]
    fn test_reads_stay_at_begin_generation_until_commit() {
        let store = QuadStore::memory().unwrap();
        store.add_all(&[quad("ex:a", "ex:p", "ex:b")]).unwrap();
        let txn = store.begin().unwrap();
        let begun_at = txn.read_generation();
        let inside = txn.dataset();

        store.add_all(&[quad("ex:x", "ex:p", "ex:y")]).unwrap();
        assert_eq!(subjects(&inside), vec![Value::iri("ex:a")]);
        // Seen as absent, so the add is a change for this transaction.
        assert!(txn.add(&quad("ex:x", "ex:p", "ex:y")).unwrap());
        assert!(txn.add(&quad("ex:c", "ex:p", "ex:d")).unwrap());

        // The statement committed meanwhile is not applied twice.
        assert_eq!(txn.commit().unwrap(), 1);
        assert!(txn.read_generation() > begun_at);
        assert_eq!(
            subjects(&inside),
            vec![Value::iri("ex:a"), Value::iri("ex:c"), Value::iri("ex:x")]
        );
    }

    #[test]
    fn test_ordered_scans_refused_while_pending() {
        let store = QuadStore::memory().unwrap();
        let txn = store.begin().unwrap();
        let dataset = txn.dataset();
        assert!(dataset
            .open_ordered_scan(&ScanPattern::any(), StatementOrder::Subject)
            .unwrap()
            .is_some());
        txn.add(&quad("ex:a", "ex:p", "ex:b")).unwrap();
        assert!(dataset
            .open_ordered_scan(&ScanPattern::any(), StatementOrder::Subject)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_finish_twice_is_error() {
        let store = QuadStore::memory().unwrap();
        let txn = store.begin().unwrap();
        txn.add(&quad("ex:a", "ex:p", "ex:b")).unwrap();
        txn.rollback().unwrap();
        assert!(matches!(txn.rollback(), Err(StorageError::TransactionError(_))));
        assert!(matches!(txn.commit(), Err(StorageError::TransactionError(_))));
        assert!(txn.add(&quad("ex:a", "ex:p", "ex:c")).is_err());
        assert!(store.is_empty().unwrap());

        let txn = store.begin().unwrap();
        txn.commit().unwrap();
        assert!(txn.commit().is_err());
    }

    #[test]
    fn test_drop_discards_changes() {
        let store = QuadStore::memory().unwrap();
        let dataset = {
            let txn = store.begin().unwrap();
            txn.add(&quad("ex:a", "ex:p", "ex:b")).unwrap();
            txn.dataset()
        };
        assert!(!dataset.has_uncommitted_local_changes());
        assert!(subjects(&dataset).is_empty());
        assert!(store.is_empty().unwrap());
    }
}
