// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! From id records to binding sets
//!
//! Join stages only move ids. Values are looked up here, once per output
//! row and variable, after the last stage.

use crate::exec::dataset::EvaluationDataset;
use crate::exec::error::{ExecResult, ExecutionError};
use crate::exec::record_iterator::RecordIterator;
use crate::model::{BindingSet, BoundValue, StoreId, Value};
use crate::storage::{is_resolved, SurrogateId};
use log::warn;
use std::sync::Arc;

/// Pull-based producer of binding sets
pub trait BindingSource {
    fn next_binding(&mut self) -> ExecResult<Option<BindingSet>>;

    /// Idempotent, like [`RecordIterator::close`]
    fn close(&mut self) -> ExecResult<()>;
}

/// Turns final-layout id records into binding sets
pub struct FinalBindingIterator {
    source: Box<dyn RecordIterator>,
    dataset: Arc<dyn EvaluationDataset>,
    store: StoreId,
    /// Variable name of each record slot
    names: Vec<String>,
    initial: BindingSet,
    /// Last id resolved per slot, so runs of equal ids resolve once
    memo: Vec<Option<(SurrogateId, Value)>>,
}

impl FinalBindingIterator {
    pub fn new(
        source: Box<dyn RecordIterator>,
        dataset: Arc<dyn EvaluationDataset>,
        names: Vec<String>,
        initial: BindingSet,
    ) -> Self {
        let store = dataset.store_id();
        let memo = vec![None; names.len()];
        Self {
            source,
            dataset,
            store,
            names,
            initial,
            memo,
        }
    }
}

fn resolve_slot(
    dataset: &dyn EvaluationDataset,
    memo: &mut Option<(SurrogateId, Value)>,
    id: SurrogateId,
) -> ExecResult<Value> {
    if let Some((cached, value)) = memo {
        if *cached == id {
            return Ok(value.clone());
        }
    }
    let value = dataset.resolve_value(id)?;
    *memo = Some((id, value.clone()));
    Ok(value)
}

/// Binding for one record, or `None` if it contradicts the caller's binding
fn materialize(
    record: &[SurrogateId],
    names: &[String],
    memo: &mut [Option<(SurrogateId, Value)>],
    dataset: &dyn EvaluationDataset,
    store: StoreId,
    initial: &BindingSet,
) -> ExecResult<Option<BindingSet>> {
    let mut binding = initial.clone();
    for (slot, name) in names.iter().enumerate() {
        let id = record[slot];
        if !is_resolved(id) {
            continue;
        }
        match initial.get_bound(name) {
            Some(existing) => {
                // Same store: ids are comparable without touching values.
                let agrees = match existing.id_in(store) {
                    Some(known) => known == id,
                    None => resolve_slot(dataset, &mut memo[slot], id)? == existing.value,
                };
                if !agrees {
                    return Ok(None);
                }
            }
            None => {
                let value = resolve_slot(dataset, &mut memo[slot], id)?;
                binding.insert_bound(name.as_str(), BoundValue::from_store(value, store, id));
            }
        }
    }
    Ok(Some(binding))
}

impl BindingSource for FinalBindingIterator {
    fn next_binding(&mut self) -> ExecResult<Option<BindingSet>> {
        loop {
            let record = match self.source.next_record()? {
                Some(record) => record,
                None => return Ok(None),
            };
            if let Some(binding) = materialize(
                record,
                &self.names,
                &mut self.memo,
                self.dataset.as_ref(),
                self.store,
                &self.initial,
            )? {
                return Ok(Some(binding));
            }
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        self.source.close()
    }
}

/// Result stream of one evaluation
///
/// Closes its source once drained, on [`RowStream::close`], or on drop. A
/// close failure after a consumption error is yielded on the next call.
pub struct RowStream {
    source: Option<Box<dyn BindingSource>>,
    pending_error: Option<ExecutionError>,
    done: bool,
}

impl RowStream {
    pub fn new(source: Box<dyn BindingSource>) -> Self {
        Self {
            source: Some(source),
            pending_error: None,
            done: false,
        }
    }

    /// Stream with no rows
    pub fn empty() -> Self {
        Self {
            source: None,
            pending_error: None,
            done: true,
        }
    }

    /// Release the underlying cursors; safe to call repeatedly
    pub fn close(&mut self) -> ExecResult<()> {
        self.done = true;
        match self.source.take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}

impl Iterator for RowStream {
    type Item = ExecResult<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        if self.done {
            return None;
        }
        let source = self.source.as_mut()?;
        match source.next_binding() {
            Ok(Some(binding)) => Some(Ok(binding)),
            Ok(None) => match self.close() {
                Ok(()) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => {
                if let Err(close_error) = self.close() {
                    self.pending_error = Some(close_error);
                }
                Some(Err(e))
            }
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close row stream: {}", e);
        }
    }
}
