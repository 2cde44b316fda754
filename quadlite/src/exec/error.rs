// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::storage::StorageError;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Planning error: {0}")]
    PlanningError(String),

    /// An iterator was driven in a way its contract forbids
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Data contradicted a guarantee made at planning time
    #[error("Consistency error: {0}")]
    ConsistencyError(String),

    #[error("No dataset available for evaluation")]
    NoDataset,
}

impl From<StorageError> for ExecutionError {
    fn from(error: StorageError) -> Self {
        ExecutionError::StorageError(error.to_string())
    }
}

/// Result type for query execution
pub type ExecResult<T> = Result<T, ExecutionError>;
