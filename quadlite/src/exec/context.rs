// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Evaluation context
//!
//! Compiled steps receive their dataset explicitly through
//! [`QueryEvaluationContext`]. [`with_current_dataset`] installs a
//! thread-local dataset for callers that cannot thread a context through;
//! it is only consulted when the context carries none.

use crate::exec::dataset::EvaluationDataset;
use crate::exec::error::{ExecResult, ExecutionError};
use log::debug;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static CURRENT_DATASET: RefCell<Option<Arc<dyn EvaluationDataset>>> = RefCell::new(None);
}

/// Run `f` with `dataset` installed as the thread's current dataset
///
/// The previous dataset is restored afterwards, also when `f` panics.
pub fn with_current_dataset<R>(dataset: Arc<dyn EvaluationDataset>, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Arc<dyn EvaluationDataset>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CURRENT_DATASET.with(|slot| *slot.borrow_mut() = previous);
        }
    }

    let previous = CURRENT_DATASET.with(|slot| slot.borrow_mut().replace(dataset));
    let _restore = Restore(previous);
    f()
}

/// Dataset installed by [`with_current_dataset`] on this thread
pub fn current_dataset() -> Option<Arc<dyn EvaluationDataset>> {
    CURRENT_DATASET.with(|slot| slot.borrow().clone())
}

/// Per-evaluation inputs of a compiled step
#[derive(Clone, Default)]
pub struct QueryEvaluationContext {
    dataset: Option<Arc<dyn EvaluationDataset>>,
}

impl QueryEvaluationContext {
    pub fn new(dataset: Arc<dyn EvaluationDataset>) -> Self {
        Self {
            dataset: Some(dataset),
        }
    }

    /// Context without a dataset; evaluation falls back to the thread's current one
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn dataset(&self) -> Option<&Arc<dyn EvaluationDataset>> {
        self.dataset.as_ref()
    }

    /// The dataset to evaluate against for this call
    pub fn resolve_dataset(&self) -> ExecResult<Arc<dyn EvaluationDataset>> {
        if let Some(dataset) = &self.dataset {
            return Ok(dataset.clone());
        }
        match current_dataset() {
            Some(dataset) => {
                debug!("Using thread-local dataset for evaluation");
                Ok(dataset)
            }
            None => Err(ExecutionError::NoDataset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::QuadStore;

    #[test]
    fn test_explicit_dataset_wins_over_thread_local() {
        let explicit = QuadStore::memory().unwrap();
        let ambient = QuadStore::memory().unwrap();
        let context = QueryEvaluationContext::new(explicit.snapshot());
        let resolved = with_current_dataset(ambient.snapshot(), || context.resolve_dataset());
        assert_eq!(resolved.unwrap().store_id(), explicit.id());
    }

    #[test]
    fn test_thread_local_is_scoped() {
        let store = QuadStore::memory().unwrap();
        assert!(matches!(
            QueryEvaluationContext::empty().resolve_dataset(),
            Err(ExecutionError::NoDataset)
        ));
        let inner = with_current_dataset(store.snapshot(), || {
            QueryEvaluationContext::empty()
                .resolve_dataset()
                .map(|d| d.store_id())
        });
        assert_eq!(inner.unwrap(), store.id());
        assert!(current_dataset().is_none());
    }
}
