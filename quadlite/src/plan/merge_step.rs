// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Two-pattern merge join
//!
//! Both patterns are scanned in ascending id order of the merge variable.
//! When the store cannot produce either order, or the variable sits in a
//! context position, the whole join runs on the generic evaluator.

use crate::config::JoinConfig;
use crate::exec::{ExecResult, QueryEvaluationContext, RowStream};
use crate::model::{BindingSet, StatementPattern};
use crate::plan::bgp_step::{BgpStep, OrderingMiss};

pub struct MergeJoinStep {
    variable: String,
    inner: BgpStep,
}

impl MergeJoinStep {
    /// Fails with a planning error unless `variable` occurs in both patterns
    pub fn compile(
        left: StatementPattern,
        right: StatementPattern,
        variable: &str,
        config: &JoinConfig,
    ) -> ExecResult<Self> {
        let inner = BgpStep::compile_with(
            vec![left, right],
            Some(variable),
            OrderingMiss::Fallback,
            config,
        )?;
        Ok(Self {
            variable: variable.to_string(),
            inner,
        })
    }

    pub fn merge_variable(&self) -> &str {
        &self.variable
    }

    pub fn as_bgp(&self) -> &BgpStep {
        &self.inner
    }

    pub fn evaluate(
        &self,
        context: &QueryEvaluationContext,
        initial: &BindingSet,
    ) -> ExecResult<RowStream> {
        self.inner.evaluate(context, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::exec::testing::pattern;
    use crate::exec::ExecutionError;
    use crate::model::{Quad, TermPattern, Value};
    use crate::plan::gate::JoinStrategy;
    use crate::storage::QuadStore;

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::new(Value::iri(s), Value::iri(p), Value::iri(o))
    }

    fn fixture(indexes: &[&str]) -> QuadStore {
        let store = QuadStore::open("", StoreConfig::memory().with_indexes(indexes)).unwrap();
        store
            .add_all(&[
                quad("ex:a1", "ex:p", "ex:k1"),
                quad("ex:a2", "ex:p", "ex:k1"),
                quad("ex:a3", "ex:p", "ex:k2"),
                quad("ex:k1", "ex:q", "ex:z1"),
                quad("ex:k1", "ex:q", "ex:z2"),
                quad("ex:k3", "ex:q", "ex:z3"),
            ])
            .unwrap();
        store
    }

    fn step() -> MergeJoinStep {
        MergeJoinStep::compile(
            pattern("?x", "ex:p", "?k"),
            pattern("?k", "ex:q", "?z"),
            "k",
            &JoinConfig::default(),
        )
        .unwrap()
    }

    fn count(step: &MergeJoinStep, store: &QuadStore) -> usize {
        let context = QueryEvaluationContext::new(store.snapshot());
        step.evaluate(&context, &BindingSet::new())
            .unwrap()
            .collect::<ExecResult<Vec<_>>>()
            .unwrap()
            .len()
    }

    #[test]
    fn test_cross_product_of_matching_runs() {
        let store = fixture(&["spoc", "posc", "psoc"]);
        let step = step();
        assert_eq!(count(&step, &store), 4);
        assert_eq!(step.as_bgp().last_algorithm(), Some(JoinStrategy::Merge));
    }

    #[test]
    fn test_missing_order_falls_back() {
        let store = fixture(&["spoc"]);
        let step = step();
        assert_eq!(count(&step, &store), 4);
        assert_eq!(step.as_bgp().last_algorithm(), Some(JoinStrategy::Fallback));
    }

    #[test]
    fn test_context_variable_falls_back() {
        let store = fixture(&["spoc", "posc", "psoc", "cspo"]);
        let step = MergeJoinStep::compile(
            pattern("?x", "ex:p", "?k").with_context(TermPattern::var("g")),
            pattern("?k", "ex:q", "?z").with_context(TermPattern::var("g")),
            "g",
            &JoinConfig::default(),
        )
        .unwrap();
        // Every fixture statement sits in the default graph, so only ?k
        // constrains the pairs.
        assert_eq!(count(&step, &store), 4);
        assert_eq!(step.as_bgp().last_algorithm(), Some(JoinStrategy::Fallback));
    }

    #[test]
    fn test_variable_missing_from_one_side() {
        let result = MergeJoinStep::compile(
            pattern("?x", "ex:p", "?k"),
            pattern("?y", "ex:q", "?z"),
            "k",
            &JoinConfig::default(),
        );
        assert!(matches!(result, Err(ExecutionError::PlanningError(_))));
    }
}
