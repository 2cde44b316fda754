// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store and join configuration

use crate::storage::StorageType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Index field sequences created when none are configured
pub const DEFAULT_INDEXES: &[&str] = &["spoc", "posc", "ospc", "cspo"];

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Quad store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key-value engine backing the store
    pub storage_type: StorageType,

    /// Index field sequences, each a permutation of `spoc`
    pub indexes: Vec<String>,

    /// Refuse writes, including id creation for unseen values
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::default(),
            indexes: DEFAULT_INDEXES.iter().map(|s| s.to_string()).collect(),
            read_only: false,
        }
    }
}

impl StoreConfig {
    /// In-memory store with the default indexes
    pub fn memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            ..Self::default()
        }
    }

    pub fn with_indexes(mut self, indexes: &[&str]) -> Self {
        self.indexes = indexes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// What to do with a constant whose value has no surrogate id yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantIdPolicy {
    /// The pattern cannot match anything; evaluate to no rows
    Never,
    /// Assign an id; if the store refuses, use the fallback evaluator
    OnDemand,
}

impl Default for ConstantIdPolicy {
    fn default() -> Self {
        ConstantIdPolicy::Never
    }
}

/// Join execution switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Allow the surrogate-id fast path at all
    pub enable_id_join: bool,

    /// Honour merge-variable hints
    pub enable_merge_join: bool,

    pub constant_ids: ConstantIdPolicy,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            enable_id_join: true,
            enable_merge_join: true,
            constant_ids: ConstantIdPolicy::default(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadliteConfig {
    pub store: StoreConfig,
    pub join: JoinConfig,
}

impl QuadliteConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
