// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! QuadLite - surrogate-id join execution over an ordered quad store
//!
//! QuadLite stores RDF-style quads under 64-bit surrogate ids and evaluates
//! joins of statement patterns on those ids, resolving values only for the
//! rows it returns.
//!
//! # Features
//!
//! - **Id Joins**: Index nested-loop joins that never touch values mid-pipeline
//! - **Merge Joins**: Sort-merge joins over index-ordered scans with run replay
//! - **Consistency Gate**: Falls back to a value-level evaluator whenever ids
//!   cannot be trusted, e.g. over uncommitted transaction writes
//! - **Embedded Storage**: Sled or in-memory key-value backends
//!
//! # Usage
//!
//! ```ignore
//! use quadlite::{compile, JoinTree, QuadStore, QueryEvaluationContext, SchemaContext};
//!
//! let store = QuadStore::memory()?;
//! let step = compile(&tree, &SchemaContext::default())?;
//! for row in step.evaluate(&QueryEvaluationContext::new(store.snapshot()), &BindingSet::new())? {
//!     println!("{}", row?);
//! }
//! ```

pub mod config;
pub mod exec;
pub mod model;
pub mod plan;
pub mod storage;
pub mod txn;

pub use config::{ConfigError, ConstantIdPolicy, JoinConfig, QuadliteConfig, StoreConfig};
pub use exec::{
    current_dataset, with_current_dataset, EvaluationDataset, ExecResult, ExecutionError,
    QueryEvaluationContext, RowStream,
};
pub use model::{BindingSet, BoundValue, Quad, StatementPattern, StoreId, TermPattern, Value};
pub use plan::{compile, CompiledStep, JoinStrategy, JoinTree, SchemaContext};
pub use storage::{QuadStore, StorageError, StorageType};
pub use txn::{Transaction, TransactionStatus};

/// QuadLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QuadLite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
