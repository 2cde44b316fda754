// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Join execution over surrogate ids
//!
//! Record iterators, the nested-loop and merge join stages, the final
//! id-to-value pass and the generic fallback evaluator.

pub mod binding_info;
pub mod context;
pub mod dataset;
pub mod error;
pub mod fallback;
pub mod id_join;
pub mod materialize;
pub mod merge_join;
pub mod peek_mark;
pub mod record_iterator;

#[cfg(test)]
pub(crate) mod testing;

pub use binding_info::{BindingInfo, CopyPlan, PatternInfo, SharedVariable};
pub use context::{current_dataset, with_current_dataset, QueryEvaluationContext};
pub use dataset::{EvaluationDataset, SnapshotDataset};
pub use error::{ExecResult, ExecutionError};
pub use fallback::FallbackRows;
pub use id_join::{IdJoinRecordIterator, RightFactory};
pub use materialize::{BindingSource, FinalBindingIterator, RowStream};
pub use merge_join::{IdMergeJoinIterator, MergeOutput};
pub use peek_mark::PeekMarkRecordIterator;
pub use record_iterator::{
    collect_records, EmptyRecordIterator, RecordIterator, ScanRecordIterator, VecRecordIterator,
};
