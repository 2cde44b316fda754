// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Surrogate identifiers, scan patterns and error types for the quad store

use super::persistent::StorageDriverError;
use std::fmt;
use thiserror::Error;

/// 64-bit surrogate identifier of one RDF term in a value store
pub type SurrogateId = i64;

/// Sentinel for a record slot that is not bound
pub const UNKNOWN_ID: SurrogateId = -1;

/// Context id of the default graph
///
/// Never assigned to a term. A variable that meets it stays unbound.
pub const DEFAULT_CONTEXT_ID: SurrogateId = 0;

/// First id handed out by a value store
pub const FIRST_VALUE_ID: SurrogateId = 1;

pub const SUBJ_IDX: usize = 0;
pub const PRED_IDX: usize = 1;
pub const OBJ_IDX: usize = 2;
pub const CONTEXT_IDX: usize = 3;

/// Ids of one stored statement, in `[s, p, o, c]` order
pub type QuadIds = [SurrogateId; 4];

/// True when the id constrains a join: neither the sentinel nor the default context
#[inline]
pub fn is_resolved(id: SurrogateId) -> bool {
    id != UNKNOWN_ID && id != DEFAULT_CONTEXT_ID
}

/// Error types for quad store operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Driver error: {0}")]
    Driver(#[from] StorageDriverError),

    #[error("Value not found for id {0}")]
    ValueNotFound(SurrogateId),

    #[error("Store is read-only: {0}")]
    ReadOnly(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid quad: {0}")]
    InvalidQuad(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Corrupt key in {tree}: expected {expected} bytes, got {actual}")]
    CorruptKey {
        tree: String,
        expected: usize,
        actual: usize,
    },

    #[error("Corrupt statement lifetimes in {tree}: {len} bytes")]
    CorruptValue { tree: String, len: usize },
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

/// Statement position a scan can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementOrder {
    Subject,
    Predicate,
    Object,
    Context,
}

impl StatementOrder {
    /// Record slot of this position
    pub fn position(self) -> usize {
        match self {
            StatementOrder::Subject => SUBJ_IDX,
            StatementOrder::Predicate => PRED_IDX,
            StatementOrder::Object => OBJ_IDX,
            StatementOrder::Context => CONTEXT_IDX,
        }
    }

    pub fn from_position(position: usize) -> Option<Self> {
        match position {
            SUBJ_IDX => Some(StatementOrder::Subject),
            PRED_IDX => Some(StatementOrder::Predicate),
            OBJ_IDX => Some(StatementOrder::Object),
            CONTEXT_IDX => Some(StatementOrder::Context),
            _ => None,
        }
    }
}

impl fmt::Display for StatementOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementOrder::Subject => "S",
            StatementOrder::Predicate => "P",
            StatementOrder::Object => "O",
            StatementOrder::Context => "C",
        };
        write!(f, "{}", name)
    }
}

/// Id-level statement pattern handed to the indexes
///
/// A slot holding [`UNKNOWN_ID`] is a wildcard. `equalities` lists pairs of
/// positions that must carry the same id (a variable repeated in one pattern).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPattern {
    pub ids: QuadIds,
    pub equalities: Vec<(usize, usize)>,
}

impl ScanPattern {
    pub fn new(ids: QuadIds) -> Self {
        Self {
            ids,
            equalities: Vec::new(),
        }
    }

    /// Pattern matching every statement
    pub fn any() -> Self {
        Self::new([UNKNOWN_ID; 4])
    }

    pub fn with_equalities(mut self, equalities: Vec<(usize, usize)>) -> Self {
        self.equalities = equalities;
        self
    }

    pub fn is_bound(&self, position: usize) -> bool {
        self.ids[position] != UNKNOWN_ID
    }

    /// Bit `i` set when position `i` is bound
    pub fn bound_mask(&self) -> u8 {
        (0..4)
            .filter(|&i| self.is_bound(i))
            .fold(0u8, |mask, i| mask | (1 << i))
    }

    /// Whether a stored statement satisfies every bound slot and equality
    ///
    /// An equality involving the context holds when the statement is in the
    /// default graph, which binds nothing.
    pub fn matches(&self, quad: &QuadIds) -> bool {
        let in_default_graph =
            |position: usize| position == CONTEXT_IDX && quad[position] == DEFAULT_CONTEXT_ID;
        self.ids
            .iter()
            .zip(quad.iter())
            .all(|(want, have)| *want == UNKNOWN_ID || want == have)
            && self.equalities.iter().all(|&(a, b)| {
                quad[a] == quad[b] || in_default_graph(a) || in_default_graph(b)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_pattern_matches_bound_slots_and_equalities() {
        let pattern = ScanPattern::new([UNKNOWN_ID, 7, UNKNOWN_ID, UNKNOWN_ID])
            .with_equalities(vec![(SUBJ_IDX, OBJ_IDX)]);
        assert!(pattern.matches(&[3, 7, 3, 0]));
        assert!(!pattern.matches(&[3, 7, 4, 0]));
        assert!(!pattern.matches(&[3, 8, 3, 0]));
        assert_eq!(pattern.bound_mask(), 0b0010);
    }

    #[test]
    fn test_context_equality_ignores_default_graph() {
        let pattern = ScanPattern::any().with_equalities(vec![(SUBJ_IDX, CONTEXT_IDX)]);
        assert!(pattern.matches(&[5, 1, 2, DEFAULT_CONTEXT_ID]));
        assert!(pattern.matches(&[5, 1, 2, 5]));
        assert!(!pattern.matches(&[5, 1, 2, 6]));
    }

    #[test]
    fn test_default_context_is_not_resolved() {
        assert!(!is_resolved(UNKNOWN_ID));
        assert!(!is_resolved(DEFAULT_CONTEXT_ID));
        assert!(is_resolved(FIRST_VALUE_ID));
    }
}
