// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Join tree compilation
//!
//! A tree compiles once into a [`CompiledStep`], which can then be evaluated
//! any number of times against different datasets and caller bindings. The
//! algorithm is chosen per evaluation; see [`crate::plan::gate`].

use crate::config::JoinConfig;
use crate::exec::{ExecResult, ExecutionError, QueryEvaluationContext, RowStream};
use crate::model::{BindingSet, StatementPattern};
use crate::plan::bgp_step::{BgpStep, OrderingMiss, PairwiseJoinStep};
use crate::plan::fallback_step::FallbackStep;
use crate::plan::gate::JoinStrategy;
use crate::plan::join_tree::{flatten_bgp, JoinTree};
use crate::plan::merge_step::MergeJoinStep;
use crate::plan::trace::StepTrace;
use log::debug;

/// Compile-time inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaContext {
    pub config: JoinConfig,
}

impl SchemaContext {
    pub fn new(config: JoinConfig) -> Self {
        Self { config }
    }
}

pub enum CompiledStep {
    Bgp(BgpStep),
    Pairwise(PairwiseJoinStep),
    MergeJoin(MergeJoinStep),
}

/// Compile `tree` into an evaluable step
pub fn compile(tree: &JoinTree, schema: &SchemaContext) -> ExecResult<CompiledStep> {
    let config = &schema.config;

    if let Some((left, right, merge)) = tree.as_pattern_pair() {
        return match merge {
            Some(variable) if config.enable_merge_join => Ok(CompiledStep::MergeJoin(
                MergeJoinStep::compile(left.clone(), right.clone(), variable, config)?,
            )),
            Some(variable) => {
                check_merge_variable(variable, left, right)?;
                debug!("Merge joins disabled; joining on ?{} with the nested loop", variable);
                Ok(CompiledStep::Pairwise(PairwiseJoinStep::compile(
                    left.clone(),
                    right.clone(),
                    config,
                )?))
            }
            None => Ok(CompiledStep::Pairwise(PairwiseJoinStep::compile(
                left.clone(),
                right.clone(),
                config,
            )?)),
        };
    }

    let flat = flatten_bgp(tree);
    for variable in &flat.other_merges {
        debug!("Ignoring merge hint on ?{} outside the first join", variable);
    }
    let seed = match flat.seed_merge.as_deref() {
        Some(variable) if !config.enable_merge_join => {
            check_merge_variable(variable, &flat.patterns[0], &flat.patterns[1])?;
            None
        }
        seed => seed,
    };
    Ok(CompiledStep::Bgp(BgpStep::compile_with(
        flat.patterns.clone(),
        seed,
        OrderingMiss::NestedLoop,
        config,
    )?))
}

fn check_merge_variable(
    variable: &str,
    left: &StatementPattern,
    right: &StatementPattern,
) -> ExecResult<()> {
    if left.has_variable(variable) && right.has_variable(variable) {
        Ok(())
    } else {
        Err(ExecutionError::PlanningError(format!(
            "merge variable ?{} must occur in both join inputs",
            variable
        )))
    }
}

impl CompiledStep {
    pub fn compile(tree: &JoinTree, schema: &SchemaContext) -> ExecResult<Self> {
        compile(tree, schema)
    }

    /// Rows of the step under `initial`, against the context's dataset
    ///
    /// Fails with [`ExecutionError::NoDataset`] when neither the context nor
    /// the current thread provides one.
    pub fn evaluate(
        &self,
        context: &QueryEvaluationContext,
        initial: &BindingSet,
    ) -> ExecResult<RowStream> {
        match self {
            CompiledStep::Bgp(step) => step.evaluate(context, initial),
            CompiledStep::Pairwise(step) => step.evaluate(context, initial),
            CompiledStep::MergeJoin(step) => step.evaluate(context, initial),
        }
    }

    fn as_bgp(&self) -> &BgpStep {
        match self {
            CompiledStep::Bgp(step) => step,
            CompiledStep::Pairwise(step) => step.as_bgp(),
            CompiledStep::MergeJoin(step) => step.as_bgp(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CompiledStep::Bgp(_) => "BgpJoin",
            CompiledStep::Pairwise(_) => "PairwiseJoin",
            CompiledStep::MergeJoin(_) => "MergeJoin",
        }
    }

    /// Algorithm used by the most recent evaluation
    pub fn last_algorithm(&self) -> Option<JoinStrategy> {
        self.as_bgp().last_algorithm()
    }

    pub fn fallback(&self) -> &FallbackStep {
        self.as_bgp().fallback()
    }

    pub fn variables(&self) -> &[String] {
        self.as_bgp().variables()
    }

    pub fn trace(&self) -> StepTrace {
        self.as_bgp().annotation().snapshot(self.kind())
    }

    /// One-line description, annotated with the last algorithm used
    pub fn explain(&self) -> String {
        let bgp = self.as_bgp();
        let patterns: Vec<String> = bgp.patterns().iter().map(|p| format!("({})", p)).collect();
        let mut text = format!("{}[{}]", self.kind(), patterns.join(" . "));
        if let Some(variable) = bgp.merge_variable() {
            text.push_str(&format!(" merge ?{}", variable));
        }
        if let Some(strategy) = bgp.last_algorithm() {
            text.push_str(&format!(" ({})", strategy));
        }
        text
    }
}
