// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The storage view a compiled step evaluates against

use crate::exec::error::ExecResult;
use crate::exec::record_iterator::{collect_records, RecordIterator, ScanRecordIterator};
use crate::model::{Quad, StoreId, Value};
use crate::storage::{
    Generation, QuadStore, ReadPin, ScanPattern, StatementOrder, SurrogateId, CONTEXT_IDX, DEFAULT_CONTEXT_ID,
    OBJ_IDX, PRED_IDX, SUBJ_IDX, UNKNOWN_ID,
};

/// Point-in-time or transaction-scoped view of a quad store
///
/// Scans yield 4-wide `[s, p, o, c]` records.
pub trait EvaluationDataset: Send + Sync {
    /// Store whose ids this dataset speaks
    fn store_id(&self) -> StoreId;

    /// Statements matching `pattern`, in no particular order
    fn open_scan(&self, pattern: &ScanPattern) -> ExecResult<Box<dyn RecordIterator>>;

    /// Statements matching `pattern` in ascending id order of `order`, or
    /// `None` when that order cannot be produced
    fn open_ordered_scan(
        &self,
        pattern: &ScanPattern,
        order: StatementOrder,
    ) -> ExecResult<Option<Box<dyn RecordIterator>>>;

    fn resolve_id(&self, value: &Value) -> ExecResult<Option<SurrogateId>>;

    /// Like `resolve_id`, assigning an id if the store allows it
    fn resolve_id_or_create(&self, value: &Value) -> ExecResult<Option<SurrogateId>>;

    fn resolve_value(&self, id: SurrogateId) -> ExecResult<Value>;

    /// Writes visible here that the committed indexes do not have yet
    fn has_uncommitted_local_changes(&self) -> bool;

    /// Id scan for a value-level lookup; `None` matches anything
    ///
    /// Returns `Ok(None)` when a given value has no id, since nothing can
    /// match it. A `None` context matches every graph.
    fn open_statements(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Value>,
        object: Option<&Value>,
        context: Option<&Value>,
    ) -> ExecResult<Option<Box<dyn RecordIterator>>> {
        let mut ids = [UNKNOWN_ID; 4];
        let terms = [subject, predicate, object, context];
        for (slot, term) in terms.into_iter().enumerate() {
            if let Some(value) = term {
                match self.resolve_id(value)? {
                    Some(id) => ids[slot] = id,
                    None => return Ok(None),
                }
            }
        }
        self.open_scan(&ScanPattern::new(ids)).map(Some)
    }

    /// Every statement matching the lookup, collected into quads
    ///
    /// Statements in the default graph come back with `context == None`.
    fn statements(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Value>,
        object: Option<&Value>,
        context: Option<&Value>,
    ) -> ExecResult<Vec<Quad>> {
        let mut scan = match self.open_statements(subject, predicate, object, context)? {
            Some(scan) => scan,
            None => return Ok(Vec::new()),
        };
        collect_records(&mut scan)?
            .iter()
            .map(|record| self.quad_from_ids(record))
            .collect()
    }

    /// Resolve a `[s, p, o, c]` record back to a quad
    fn quad_from_ids(&self, record: &[SurrogateId]) -> ExecResult<Quad> {
        let context = match record[CONTEXT_IDX] {
            DEFAULT_CONTEXT_ID => None,
            id => Some(self.resolve_value(id)?),
        };
        Ok(Quad {
            subject: self.resolve_value(record[SUBJ_IDX])?,
            predicate: self.resolve_value(record[PRED_IDX])?,
            object: self.resolve_value(record[OBJ_IDX])?,
            context,
        })
    }
}

/// Committed contents of a store as of one generation
///
/// Holds its [`ReadPin`] so the statements it sees are not reclaimed.
pub struct SnapshotDataset {
    store: QuadStore,
    pin: ReadPin,
}

impl SnapshotDataset {
    pub fn new(store: QuadStore, pin: ReadPin) -> Self {
        Self { store, pin }
    }

    pub fn generation(&self) -> Generation {
        self.pin.generation()
    }
}

impl EvaluationDataset for SnapshotDataset {
    fn store_id(&self) -> StoreId {
        self.store.id()
    }

    fn open_scan(&self, pattern: &ScanPattern) -> ExecResult<Box<dyn RecordIterator>> {
        let scan = self.store.triples().scan(pattern, self.generation())?;
        Ok(Box::new(ScanRecordIterator::new(scan)))
    }

    fn open_ordered_scan(
        &self,
        pattern: &ScanPattern,
        order: StatementOrder,
    ) -> ExecResult<Option<Box<dyn RecordIterator>>> {
        Ok(self
            .store
            .triples()
            .scan_ordered(pattern, order, self.generation())?
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
        false
    }
}
