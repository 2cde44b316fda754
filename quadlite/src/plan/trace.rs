// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan annotation
//!
//! Records which join algorithm a compiled step actually ran, for
//! explain output and tests. Nothing reads it to make decisions.

use crate::plan::gate::JoinStrategy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a step's annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTrace {
    pub step: String,
    pub last_algorithm: Option<JoinStrategy>,
    pub evaluations: u64,
}

#[derive(Debug, Default)]
pub struct PlanAnnotation {
    last: RwLock<Option<JoinStrategy>>,
    evaluations: AtomicU64,
}

impl PlanAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, strategy: JoinStrategy) {
        *self.last.write() = Some(strategy);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Algorithm of the most recent evaluation
    pub fn last(&self) -> Option<JoinStrategy> {
        *self.last.read()
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, step: &str) -> StepTrace {
        StepTrace {
            step: step.to_string(),
            last_algorithm: self.last(),
            evaluations: self.evaluations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_most_recent_strategy() {
        let annotation = PlanAnnotation::new();
        assert_eq!(annotation.last(), None);
        annotation.record(JoinStrategy::Merge);
        annotation.record(JoinStrategy::Fallback);
        assert_eq!(annotation.last(), Some(JoinStrategy::Fallback));
        assert_eq!(annotation.evaluations(), 2);

        let trace = annotation.snapshot("bgp");
        assert_eq!(
            serde_json::to_string(&trace).unwrap(),
            r#"{"step":"bgp","last_algorithm":"Fallback","evaluations":2}"#
        );
    }
}
