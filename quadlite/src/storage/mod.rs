// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Quad storage over an ordered key-value engine
//!
//! This module provides:
//! - Pluggable key-value drivers (Sled, in-memory)
//! - The surrogate id dictionary (value <-> 64-bit id)
//! - Statement indexes with prefix and ordered scans
//! - Commit generations, so readers see a fixed point in time
//! - The `QuadStore` handle tying them together

pub mod persistent;
pub mod quad_store;
pub mod triple_store;
pub mod types;
pub mod value_store;
pub mod visibility;

pub use persistent::StorageType;
pub use quad_store::QuadStore;
pub use triple_store::{QuadIndex, TripleScan, TripleStore};
pub use types::{
    is_resolved, QuadIds, ScanPattern, StatementOrder, StorageError, SurrogateId, CONTEXT_IDX,
    DEFAULT_CONTEXT_ID, FIRST_VALUE_ID, OBJ_IDX, PRED_IDX, SUBJ_IDX, UNKNOWN_ID,
};
pub use value_store::ValueStore;
pub use visibility::{Generation, ReadPin};
