// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Join planning
//!
//! Compiles join trees into steps and decides, per evaluation, between the
//! surrogate-id join path and the generic evaluator.

pub mod bgp_step;
pub mod fallback_step;
pub mod gate;
pub mod join_tree;
pub mod merge_step;
pub mod step;
pub mod trace;

pub use bgp_step::{BgpStep, PairwiseJoinStep};
pub use fallback_step::FallbackStep;
pub use gate::{ConsistencyGate, FallbackReason, GateDecision, JoinStrategy};
pub use join_tree::{flatten_bgp, FlatBgp, JoinTree};
pub use merge_step::MergeJoinStep;
pub use step::{compile, CompiledStep, SchemaContext};
pub use trace::{PlanAnnotation, StepTrace};
