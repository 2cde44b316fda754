// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value-level evaluation of a step's patterns

use crate::exec::{EvaluationDataset, FallbackRows, RowStream};
use crate::model::{BindingSet, StatementPattern};
use std::sync::Arc;

/// Generic evaluator every compiled step carries for the cases the id path
/// cannot serve
#[derive(Debug, Clone)]
pub struct FallbackStep {
    patterns: Arc<[StatementPattern]>,
}

impl FallbackStep {
    pub fn new(patterns: Arc<[StatementPattern]>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[StatementPattern] {
        &self.patterns
    }

    pub fn evaluate(&self, dataset: Arc<dyn EvaluationDataset>, initial: &BindingSet) -> RowStream {
        RowStream::new(Box::new(FallbackRows::new(
            dataset,
            self.patterns.clone(),
            initial.clone(),
        )))
    }
}
