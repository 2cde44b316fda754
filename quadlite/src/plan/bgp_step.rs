// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compiled basic graph patterns
//!
//! Patterns are joined left to right. Every stage's record layout is a prefix
//! of the final layout: stage `i` keeps the slots of stages `0..i` and appends
//! the variables pattern `i` introduces. A variable's slot is therefore the
//! same in every stage, and a right scan reads a left id at `slot < left.len()`.

use crate::config::JoinConfig;
use crate::exec::{
    BindingInfo, CopyPlan, EvaluationDataset, ExecResult, ExecutionError, FinalBindingIterator,
    IdJoinRecordIterator, IdMergeJoinIterator, MergeOutput, PatternInfo, QueryEvaluationContext,
    RecordIterator, RightFactory, RowStream, SharedVariable, VecRecordIterator,
};
use crate::model::{BindingSet, StatementPattern};
use crate::plan::fallback_step::FallbackStep;
use crate::plan::gate::{ConsistencyGate, FallbackReason, GateDecision, JoinStrategy};
use crate::plan::trace::PlanAnnotation;
use crate::storage::{
    is_resolved, QuadIds, ScanPattern, StatementOrder, SurrogateId, CONTEXT_IDX, UNKNOWN_ID,
};
use log::debug;
use std::sync::Arc;

/// What to do when a requested merge order cannot be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrderingMiss {
    /// Join the seed patterns with the nested loop instead
    NestedLoop,
    /// Evaluate the whole step with the generic evaluator
    Fallback,
}

/// Scan ids for one pattern, filled per left record
#[derive(Debug, Clone)]
struct ScanTemplate {
    constants: QuadIds,
    /// Final-layout slot of the variable at each position
    slots: [Option<usize>; 4],
    equalities: Vec<(usize, usize)>,
}

impl ScanTemplate {
    /// Ids come from the left record, then from the caller's binding
    ///
    /// A variable in the context position is never pushed into the scan:
    /// statements in the default graph match any graph a join carries, and
    /// `matches_join` rejects the named graphs that differ.
    fn bind(&self, left: &[SurrogateId], initial: &[SurrogateId]) -> ScanPattern {
        let mut ids = self.constants;
        for (position, slot) in self.slots.iter().enumerate() {
            let slot = match slot {
                Some(slot) if position != CONTEXT_IDX => *slot,
                _ => continue,
            };
            let id = if slot < left.len() && is_resolved(left[slot]) {
                left[slot]
            } else {
                initial[slot]
            };
            ids[position] = if is_resolved(id) { id } else { UNKNOWN_ID };
        }
        ScanPattern::new(ids).with_equalities(self.equalities.clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pattern: StatementPattern,
    info: PatternInfo,
    slots: [Option<usize>; 4],
}

impl CompiledPattern {
    fn template(&self, constants: QuadIds) -> ScanTemplate {
        ScanTemplate {
            constants,
            slots: self.slots,
            equalities: self.info.equalities(),
        }
    }
}

/// One nested-loop stage
#[derive(Debug, Clone)]
struct StagePlan {
    width: usize,
    left_plan: CopyPlan,
    right_plan: CopyPlan,
    shared: Vec<SharedVariable>,
}

/// Merge join of the first two patterns
#[derive(Debug, Clone)]
struct SeedMerge {
    variable: String,
    left_key: usize,
    right_key: usize,
    width: usize,
    left_plan: CopyPlan,
    right_plan: CopyPlan,
    shared: Vec<SharedVariable>,
    /// False when the variable sits in a context position. The default graph
    /// id never constrains a match, so context ids cannot be merged on.
    usable: bool,
}

impl SeedMerge {
    fn plan(variable: &str, first: &PatternInfo, second: &PatternInfo) -> ExecResult<Self> {
        let (left_positions, right_positions) =
            match (first.positions(variable), second.positions(variable)) {
                (Some(left), Some(right)) => (left, right),
                _ => {
                    return Err(ExecutionError::PlanningError(format!(
                        "merge variable ?{} must occur in both join inputs",
                        variable
                    )))
                }
            };
        let usable =
            !left_positions.contains(&CONTEXT_IDX) && !right_positions.contains(&CONTEXT_IDX);

        let layout = BindingInfo::combine(
            &BindingInfo::from_pattern(first),
            &BindingInfo::from_pattern(second),
        );
        let mut shared = Vec::new();
        for (name, positions) in second.variables() {
            if let (Some(left), Some(out_index)) = (first.positions(name), layout.get_index(name)) {
                shared.push(SharedVariable {
                    name: name.to_string(),
                    left_index: left[0],
                    right_positions: positions.to_vec(),
                    out_index,
                });
            }
        }
        let shared_names: Vec<&str> = shared.iter().map(|v| v.name.as_str()).collect();
        let right_plan = CopyPlan::from_pattern(second, &layout, &shared_names);

        Ok(Self {
            variable: variable.to_string(),
            left_key: left_positions[0],
            right_key: right_positions[0],
            width: layout.len(),
            left_plan: CopyPlan::from_pattern(first, &layout, &[]),
            right_plan,
            shared,
            usable,
        })
    }

    fn order(position: usize) -> ExecResult<StatementOrder> {
        StatementOrder::from_position(position).ok_or_else(|| {
            ExecutionError::PlanningError(format!("no statement order for position {}", position))
        })
    }
}

/// Compiled join of one or more statement patterns
pub struct BgpStep {
    patterns: Vec<CompiledPattern>,
    stages: Vec<StagePlan>,
    layout: BindingInfo,
    seed_merge: Option<SeedMerge>,
    on_missing_order: OrderingMiss,
    gate: ConsistencyGate,
    fallback: FallbackStep,
    annotation: PlanAnnotation,
}

impl BgpStep {
    pub fn compile(patterns: Vec<StatementPattern>, config: &JoinConfig) -> ExecResult<Self> {
        Self::compile_with(patterns, None, OrderingMiss::NestedLoop, config)
    }

    pub(crate) fn compile_with(
        patterns: Vec<StatementPattern>,
        merge: Option<&str>,
        on_missing_order: OrderingMiss,
        config: &JoinConfig,
    ) -> ExecResult<Self> {
        if patterns.is_empty() {
            return Err(ExecutionError::PlanningError(
                "a join needs at least one pattern".to_string(),
            ));
        }

        let infos: Vec<PatternInfo> = patterns.iter().map(PatternInfo::create).collect();
        let seed_merge = match merge {
            Some(variable) if patterns.len() >= 2 => {
                Some(SeedMerge::plan(variable, &infos[0], &infos[1])?)
            }
            Some(variable) => {
                return Err(ExecutionError::PlanningError(format!(
                    "merge on ?{} needs two join inputs",
                    variable
                )))
            }
            None => None,
        };

        let mut layout = BindingInfo::empty();
        let mut stages = Vec::with_capacity(infos.len());
        for info in &infos {
            let left = layout;
            layout = BindingInfo::combine(&left, &BindingInfo::from_pattern(info));
            let shared = SharedVariable::between(&left, info, &layout);
            let shared_names: Vec<&str> = shared.iter().map(|v| v.name.as_str()).collect();
            let right_plan = CopyPlan::from_pattern(info, &layout, &shared_names);
            stages.push(StagePlan {
                width: layout.len(),
                left_plan: CopyPlan::between(&left, &layout),
                right_plan,
                shared,
            });
        }

        let compiled = patterns
            .iter()
            .zip(infos)
            .map(|(pattern, info)| {
                let mut slots = [None; 4];
                for (name, positions) in info.variables() {
                    for &position in positions {
                        slots[position] = layout.get_index(name);
                    }
                }
                CompiledPattern {
                    pattern: pattern.clone(),
                    info,
                    slots,
                }
            })
            .collect();

        Ok(Self {
            patterns: compiled,
            stages,
            layout,
            seed_merge,
            on_missing_order,
            gate: ConsistencyGate::new(config),
            fallback: FallbackStep::new(patterns.into()),
            annotation: PlanAnnotation::new(),
        })
    }

    pub fn patterns(&self) -> &[StatementPattern] {
        self.fallback.patterns()
    }

    /// Output variables in slot order
    pub fn variables(&self) -> &[String] {
        self.layout.names()
    }

    pub fn merge_variable(&self) -> Option<&str> {
        self.seed_merge.as_ref().map(|m| m.variable.as_str())
    }

    pub fn fallback(&self) -> &FallbackStep {
        &self.fallback
    }

    pub fn annotation(&self) -> &PlanAnnotation {
        &self.annotation
    }

    pub fn last_algorithm(&self) -> Option<JoinStrategy> {
        self.annotation.last()
    }

    fn planned_strategy(&self) -> JoinStrategy {
        if self.seed_merge.is_some() {
            JoinStrategy::Merge
        } else {
            JoinStrategy::NestedLoop
        }
    }

    pub fn evaluate(
        &self,
        context: &QueryEvaluationContext,
        initial: &BindingSet,
    ) -> ExecResult<RowStream> {
        let dataset = context.resolve_dataset()?;
        let constants = match self.gate.decide(dataset.as_ref(), self.fallback.patterns())? {
            GateDecision::FastPath(constants) => constants,
            GateDecision::Empty => {
                debug!("Join over {} patterns cannot match", self.patterns.len());
                self.annotation.record(self.planned_strategy());
                return Ok(RowStream::empty());
            }
            GateDecision::Fallback(reason) => return Ok(self.fall_back(dataset, initial, reason)),
        };

        let initial_ids = match initial_ids(dataset.as_ref(), &self.layout, initial)? {
            Some(ids) => ids,
            None => {
                debug!("Caller binding holds a value unknown to the store");
                self.annotation.record(self.planned_strategy());
                return Ok(RowStream::empty());
            }
        };

        let merged = match &self.seed_merge {
            Some(seed) => self.open_merge(seed, &dataset, &constants, &initial_ids)?,
            None => None,
        };
        let records = match merged {
            Some(source) => {
                self.annotation.record(JoinStrategy::Merge);
                self.chain(&dataset, &constants, &initial_ids, source, 2)
            }
            None => {
                if self.seed_merge.is_some() && self.on_missing_order == OrderingMiss::Fallback {
                    return Ok(self.fall_back(dataset, initial, FallbackReason::OrderingUnavailable));
                }
                self.annotation.record(JoinStrategy::NestedLoop);
                let unit: Box<dyn RecordIterator> = Box::new(VecRecordIterator::unit());
                self.chain(&dataset, &constants, &initial_ids, unit, 0)
            }
        };

        Ok(RowStream::new(Box::new(FinalBindingIterator::new(
            records,
            dataset,
            self.layout.names().to_vec(),
            initial.clone(),
        ))))
    }

    fn fall_back(
        &self,
        dataset: Arc<dyn EvaluationDataset>,
        initial: &BindingSet,
        reason: FallbackReason,
    ) -> RowStream {
        debug!(
            "Evaluating {} patterns with the generic evaluator: {}",
            self.patterns.len(),
            reason
        );
        self.annotation.record(JoinStrategy::Fallback);
        self.fallback.evaluate(dataset, initial)
    }

    /// Nested-loop stages `first_stage..` on top of `source`
    fn chain(
        &self,
        dataset: &Arc<dyn EvaluationDataset>,
        constants: &[QuadIds],
        initial_ids: &Arc<[SurrogateId]>,
        mut source: Box<dyn RecordIterator>,
        first_stage: usize,
    ) -> Box<dyn RecordIterator> {
        for (index, stage) in self.stages.iter().enumerate().skip(first_stage) {
            let template = self.patterns[index].template(constants[index]);
            let dataset = dataset.clone();
            let initial = initial_ids.clone();
            let factory: RightFactory =
                Box::new(move |left: &[SurrogateId]| {
                    dataset.open_scan(&template.bind(left, &initial))
                });
            source = Box::new(IdJoinRecordIterator::new(
                source,
                factory,
                stage.left_plan.clone(),
                stage.right_plan.clone(),
                stage.shared.clone(),
                stage.width,
            ));
        }
        source
    }

    /// Ordered scans of the first two patterns joined by merge, or `None`
    /// when the store cannot produce both orders
    fn open_merge(
        &self,
        seed: &SeedMerge,
        dataset: &Arc<dyn EvaluationDataset>,
        constants: &[QuadIds],
        initial_ids: &Arc<[SurrogateId]>,
    ) -> ExecResult<Option<Box<dyn RecordIterator>>> {
        if !seed.usable {
            debug!("Merge on ?{} skipped: variable occupies a context position", seed.variable);
            return Ok(None);
        }
        let left_pattern = self.patterns[0].template(constants[0]).bind(&[], initial_ids);
        let right_pattern = self.patterns[1].template(constants[1]).bind(&[], initial_ids);

        let mut left =
            match dataset.open_ordered_scan(&left_pattern, SeedMerge::order(seed.left_key)?)? {
                Some(scan) => scan,
                None => {
                    debug!("No index orders ({}) by ?{}", self.patterns[0].pattern, seed.variable);
                    return Ok(None);
                }
            };
        let right =
            match dataset.open_ordered_scan(&right_pattern, SeedMerge::order(seed.right_key)?)? {
                Some(scan) => scan,
                None => {
                    debug!("No index orders ({}) by ?{}", self.patterns[1].pattern, seed.variable);
                    left.close()?;
                    return Ok(None);
                }
            };

        Ok(Some(Box::new(IdMergeJoinIterator::new(
            left,
            right,
            seed.left_key,
            seed.right_key,
            MergeOutput {
                template: vec![UNKNOWN_ID; seed.width],
                left_plan: seed.left_plan.clone(),
                right_plan: seed.right_plan.clone(),
                shared: seed.shared.clone(),
            },
        ))))
    }
}

/// Caller-bound ids in final-layout slots; `None` if a bound value is
/// unknown to the store, in which case nothing can match
fn initial_ids(
    dataset: &dyn EvaluationDataset,
    layout: &BindingInfo,
    initial: &BindingSet,
) -> ExecResult<Option<Arc<[SurrogateId]>>> {
    let store = dataset.store_id();
    let mut ids = vec![UNKNOWN_ID; layout.len()];
    for (slot, name) in layout.names().iter().enumerate() {
        let bound = match initial.get_bound(name) {
            Some(bound) => bound,
            None => continue,
        };
        let id = match bound.id_in(store) {
            Some(id) => Some(id),
            None => dataset.resolve_id(&bound.value)?,
        };
        match id {
            Some(id) => ids[slot] = id,
            None => return Ok(None),
        }
    }
    Ok(Some(ids.into()))
}

/// Two-pattern join without a merge hint
pub struct PairwiseJoinStep {
    inner: BgpStep,
}

impl PairwiseJoinStep {
    pub fn compile(
        left: StatementPattern,
        right: StatementPattern,
        config: &JoinConfig,
    ) -> ExecResult<Self> {
        Ok(Self {
            inner: BgpStep::compile(vec![left, right], config)?,
        })
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
    use crate::config::{ConstantIdPolicy, StoreConfig};
    use crate::exec::testing::pattern;
    use crate::model::{Quad, TermPattern, Value};
    use crate::storage::QuadStore;

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::new(Value::iri(s), Value::iri(p), Value::iri(o))
    }

    fn store(quads: &[Quad]) -> QuadStore {
        let store = QuadStore::memory().unwrap();
        store.add_all(quads).unwrap();
        store
    }

    fn rows(step: &BgpStep, store: &QuadStore, initial: &BindingSet) -> Vec<BindingSet> {
        let context = QueryEvaluationContext::new(store.snapshot());
        let mut rows: Vec<BindingSet> = step
            .evaluate(&context, initial)
            .unwrap()
            .collect::<ExecResult<_>>()
            .unwrap();
        rows.sort_by_key(|b| b.to_string());
        rows
    }

    #[test]
    fn test_layout_is_prefix_of_final_layout() {
        let step = BgpStep::compile(
            vec![
                pattern("?a", "ex:p", "?b"),
                pattern("?b", "ex:q", "?c"),
                pattern("?a", "ex:r", "?d"),
            ],
            &JoinConfig::default(),
        )
        .unwrap();
        assert_eq!(step.variables(), &["a", "b", "c", "d"]);
        let widths: Vec<usize> = step.stages.iter().map(|s| s.width).collect();
        assert_eq!(widths, vec![2, 3, 4]);
        assert_eq!(step.patterns[2].slots, [Some(0), None, Some(3), None]);
    }

    #[test]
    fn test_chain_joins_three_patterns() {
        let store = store(&[
            quad("ex:a", "ex:p", "ex:b"),
            quad("ex:b", "ex:q", "ex:c"),
            quad("ex:b", "ex:q", "ex:d"),
            quad("ex:c", "ex:r", "ex:e"),
        ]);
        let step = BgpStep::compile(
            vec![
                pattern("?x", "ex:p", "?y"),
                pattern("?y", "ex:q", "?z"),
                pattern("?z", "ex:r", "?w"),
            ],
            &JoinConfig::default(),
        )
        .unwrap();
        let rows = rows(&step, &store, &BindingSet::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("w"), Some(&Value::iri("ex:e")));
        assert_eq!(step.last_algorithm(), Some(JoinStrategy::NestedLoop));
    }

    #[test]
    fn test_initial_binding_constrains_scans() {
        let store = store(&[
            quad("ex:a", "ex:p", "ex:b"),
            quad("ex:c", "ex:p", "ex:d"),
        ]);
        let step = BgpStep::compile(vec![pattern("?x", "ex:p", "?y")], &JoinConfig::default())
            .unwrap();
        let initial = BindingSet::new()
            .with("x", Value::iri("ex:c"))
            .with("extra", Value::literal("kept"));
        let found = rows(&step, &store, &initial);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("y"), Some(&Value::iri("ex:d")));
        assert_eq!(found[0].get("extra"), Some(&Value::literal("kept")));

        let unknown = BindingSet::new().with("x", Value::iri("ex:nowhere"));
        assert!(rows(&step, &store, &unknown).is_empty());
    }

    #[test]
    fn test_repeated_variable_and_default_graph_context() {
        let store = store(&[
            quad("ex:a", "ex:p", "ex:a"),
            quad("ex:a", "ex:p", "ex:b"),
            quad("ex:c", "ex:p", "ex:c").in_graph(Value::iri("ex:g")),
        ]);
        let with_graph = pattern("?x", "ex:p", "?x").with_context(TermPattern::var("g"));
        let step = BgpStep::compile(vec![with_graph], &JoinConfig::default()).unwrap();
        let rows = rows(&step, &store, &BindingSet::new());
        assert_eq!(rows.len(), 2);
        // The default graph leaves ?g unbound.
        let unbound = rows.iter().filter(|r| !r.contains("g")).count();
        assert_eq!(unbound, 1);
        assert!(rows
            .iter()
            .any(|r| r.get("g") == Some(&Value::iri("ex:g")) && r.get("x") == Some(&Value::iri("ex:c"))));
    }

    #[test]
    fn test_graph_join_is_symmetric_around_default_graph() {
        let store = store(&[
            quad("ex:a", "ex:p", "ex:b").in_graph(Value::iri("ex:g1")),
            quad("ex:b", "ex:q", "ex:c"),
            quad("ex:b", "ex:q", "ex:d").in_graph(Value::iri("ex:g2")),
        ]);
        let first = pattern("?a", "ex:p", "?b").with_context(TermPattern::var("g"));
        let second = pattern("?b", "ex:q", "?c").with_context(TermPattern::var("g"));

        let forward = BgpStep::compile(vec![first.clone(), second.clone()], &JoinConfig::default())
            .unwrap();
        let reversed = BgpStep::compile(vec![second, first], &JoinConfig::default()).unwrap();
        let forward_rows = rows(&forward, &store, &BindingSet::new());
        assert_eq!(forward_rows, rows(&reversed, &store, &BindingSet::new()));
        assert_eq!(forward_rows.len(), 1);
        assert_eq!(forward_rows[0].get("c"), Some(&Value::iri("ex:c")));
        assert_eq!(forward_rows[0].get("g"), Some(&Value::iri("ex:g1")));
    }

    #[test]
    fn test_caller_bound_graph_admits_default_graph() {
        let store = store(&[
            quad("ex:a", "ex:p", "ex:b"),
            quad("ex:c", "ex:p", "ex:d").in_graph(Value::iri("ex:g1")),
            quad("ex:e", "ex:p", "ex:f").in_graph(Value::iri("ex:g2")),
        ]);
        let step = BgpStep::compile(
            vec![pattern("?x", "ex:p", "?y").with_context(TermPattern::var("g"))],
            &JoinConfig::default(),
        )
        .unwrap();
        let initial = BindingSet::new().with("g", Value::iri("ex:g1"));
        let found = rows(&step, &store, &initial);
        let subjects: Vec<&Value> = found.iter().filter_map(|r| r.get("x")).collect();
        assert_eq!(subjects, vec![&Value::iri("ex:a"), &Value::iri("ex:c")]);
        assert!(found.iter().all(|r| r.get("g") == Some(&Value::iri("ex:g1"))));
    }

    #[test]
    fn test_seed_merge_requires_variable_on_both_sides() {
        let result = BgpStep::compile_with(
            vec![pattern("?x", "ex:p", "?y"), pattern("?z", "ex:q", "?w")],
            Some("y"),
            OrderingMiss::NestedLoop,
            &JoinConfig::default(),
        );
        assert!(matches!(result, Err(ExecutionError::PlanningError(_))));
    }

    #[test]
    fn test_seed_merge_degrades_to_nested_loop() {
        // With only spoc neither seed pattern can be read in ?y order.
        let store = QuadStore::open("", StoreConfig::memory().with_indexes(&["spoc"])).unwrap();
        store
            .add_all(&[quad("ex:a", "ex:p", "ex:b"), quad("ex:b", "ex:q", "ex:c")])
            .unwrap();
        let step = BgpStep::compile_with(
            vec![pattern("?x", "ex:p", "?y"), pattern("?y", "ex:q", "?z")],
            Some("y"),
            OrderingMiss::NestedLoop,
            &JoinConfig::default(),
        )
        .unwrap();
        assert_eq!(rows(&step, &store, &BindingSet::new()).len(), 1);
        assert_eq!(step.last_algorithm(), Some(JoinStrategy::NestedLoop));
    }

    #[test]
    fn test_context_merge_variable_is_not_merged() {
        let first = pattern("?x", "ex:p", "?y").with_context(TermPattern::var("g"));
        let second = pattern("?z", "ex:q", "?w").with_context(TermPattern::var("g"));
        let step = BgpStep::compile_with(
            vec![first, second],
            Some("g"),
            OrderingMiss::NestedLoop,
            &JoinConfig::default(),
        )
        .unwrap();
        assert!(!step.seed_merge.as_ref().unwrap().usable);

        let store = store(&[
            quad("ex:a", "ex:p", "ex:b").in_graph(Value::iri("ex:g")),
            quad("ex:c", "ex:q", "ex:d").in_graph(Value::iri("ex:g")),
        ]);
        assert_eq!(rows(&step, &store, &BindingSet::new()).len(), 1);
        assert_eq!(step.last_algorithm(), Some(JoinStrategy::NestedLoop));
    }

    #[test]
    fn test_unknown_constant_short_circuits() {
        let store = store(&[quad("ex:a", "ex:p", "ex:b")]);
        let config = JoinConfig {
            constant_ids: ConstantIdPolicy::Never,
            ..JoinConfig::default()
        };
        let step = BgpStep::compile(vec![pattern("?x", "ex:missing", "?y")], &config).unwrap();
        assert!(rows(&step, &store, &BindingSet::new()).is_empty());
        assert_eq!(step.last_algorithm(), Some(JoinStrategy::NestedLoop));
    }

    #[test]
    fn test_pairwise_step() {
        let store = store(&[
            quad("ex:a", "ex:p", "ex:b"),
            quad("ex:b", "ex:q", "ex:c"),
        ]);
        let step = PairwiseJoinStep::compile(
            pattern("?x", "ex:p", "?y"),
            pattern("?y", "ex:q", "?z"),
            &JoinConfig::default(),
        )
        .unwrap();
        let context = QueryEvaluationContext::new(store.snapshot());
        let rows: Vec<BindingSet> = step
            .evaluate(&context, &BindingSet::new())
            .unwrap()
            .collect::<ExecResult<_>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("z"), Some(&Value::iri("ex:c")));
        assert_eq!(step.as_bgp().variables(), &["x", "y", "z"]);
    }
}
