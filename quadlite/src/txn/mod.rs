// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management
//!
//! - Transaction identity and lifecycle
//! - Change log of pending id-quads
//! - Overlay datasets exposing uncommitted changes to query evaluation

pub mod log;
pub mod state;
pub mod transaction;

pub use state::{TransactionId, TransactionStatus};
pub use transaction::Transaction;
