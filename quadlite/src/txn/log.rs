// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pending statement changes of a transaction
//!
//! Changes are kept as id-quads. Adding a statement that is pending removal
//! cancels the removal and vice versa, so the log always holds the net
//! difference against the committed indexes.

use crate::storage::{QuadIds, ScanPattern};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    added: BTreeSet<QuadIds>,
    removed: BTreeSet<QuadIds>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an add; `committed` says whether the store already has it
    pub fn record_add(&mut self, quad: QuadIds, committed: bool) -> bool {
        if self.removed.remove(&quad) {
            return true;
        }
        !committed && self.added.insert(quad)
    }

    /// Record a removal; `committed` says whether the store has it
    pub fn record_remove(&mut self, quad: QuadIds, committed: bool) -> bool {
        if self.added.remove(&quad) {
            return true;
        }
        committed && self.removed.insert(quad)
    }

    pub fn added(&self) -> &BTreeSet<QuadIds> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<QuadIds> {
        &self.removed
    }

    /// Pending additions matching `pattern`
    pub fn added_matching(&self, pattern: &ScanPattern) -> Vec<QuadIds> {
        self.added
            .iter()
            .filter(|quad| pattern.matches(quad))
            .copied()
            .collect()
    }

    /// Pending removals matching `pattern`
    pub fn removed_matching(&self, pattern: &ScanPattern) -> BTreeSet<QuadIds> {
        self.removed
            .iter()
            .filter(|quad| pattern.matches(quad))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}
