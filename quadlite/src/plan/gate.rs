// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-call choice between the id path and the generic evaluator
//!
//! Checked on every evaluation, in order:
//! 1. id joins disabled by configuration -> fallback
//! 2. dataset has uncommitted local changes -> fallback
//! 3. a constant can never occupy its position -> no rows
//! 4. each constant resolves to an id, else by [`ConstantIdPolicy`]:
//!    `Never` -> no rows; `OnDemand` -> create it, or fall back if refused

use crate::config::{ConstantIdPolicy, JoinConfig};
use crate::exec::{EvaluationDataset, ExecResult};
use crate::model::{StatementPattern, TermPattern};
use crate::storage::{QuadIds, UNKNOWN_ID};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Join algorithm used by one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinStrategy {
    NestedLoop,
    Merge,
    Fallback,
}

impl JoinStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinStrategy::NestedLoop => "id-join",
            JoinStrategy::Merge => "merge-join",
            JoinStrategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an evaluation used the generic evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Disabled,
    UncommittedChanges,
    ConstantCreationRefused,
    OrderingUnavailable,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FallbackReason::Disabled => "id joins disabled",
            FallbackReason::UncommittedChanges => "uncommitted local changes",
            FallbackReason::ConstantCreationRefused => "store refused to create a constant id",
            FallbackReason::OrderingUnavailable => "no index yields the merge order",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Constant ids per pattern, `UNKNOWN_ID` at variable and absent slots
    FastPath(Vec<QuadIds>),
    /// Provably no rows
    Empty,
    Fallback(FallbackReason),
}

#[derive(Debug, Clone)]
pub struct ConsistencyGate {
    enabled: bool,
    policy: ConstantIdPolicy,
}

impl ConsistencyGate {
    pub fn new(config: &JoinConfig) -> Self {
        Self {
            enabled: config.enable_id_join,
            policy: config.constant_ids,
        }
    }

    pub fn decide(
        &self,
        dataset: &dyn EvaluationDataset,
        patterns: &[StatementPattern],
    ) -> ExecResult<GateDecision> {
        if !self.enabled {
            return Ok(GateDecision::Fallback(FallbackReason::Disabled));
        }
        if dataset.has_uncommitted_local_changes() {
            return Ok(GateDecision::Fallback(FallbackReason::UncommittedChanges));
        }
        if patterns.iter().any(|p| p.has_ill_typed_constant()) {
            return Ok(GateDecision::Empty);
        }

        let mut resolved = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let mut ids = [UNKNOWN_ID; 4];
            for (slot, term) in pattern.terms().into_iter().enumerate() {
                let value = match term {
                    Some(TermPattern::Constant(value)) => value,
                    _ => continue,
                };
                if let Some(id) = dataset.resolve_id(value)? {
                    ids[slot] = id;
                    continue;
                }
                match self.policy {
                    ConstantIdPolicy::Never => return Ok(GateDecision::Empty),
                    ConstantIdPolicy::OnDemand => match dataset.resolve_id_or_create(value)? {
                        Some(id) => ids[slot] = id,
                        None => {
                            return Ok(GateDecision::Fallback(
                                FallbackReason::ConstantCreationRefused,
                            ))
                        }
                    },
                }
            }
            resolved.push(ids);
        }
        Ok(GateDecision::FastPath(resolved))
    }
}
