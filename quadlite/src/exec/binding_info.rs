// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Record schemas for id joins
//!
//! - [`PatternInfo`]: where each variable of one statement pattern sits in a
//!   4-wide `[s, p, o, c]` record
//! - [`BindingInfo`]: variable -> slot layout of a join's output records
//! - [`CopyPlan`]: precomputed slot moves between two layouts
//!
//! All of these are built once while compiling a step; the per-row code only
//! indexes arrays.

use crate::model::StatementPattern;
use crate::storage::{is_resolved, SurrogateId, UNKNOWN_ID};
use std::collections::HashMap;

/// Variable positions of one statement pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInfo {
    /// Variables in order of first position, each with every position it occupies
    variables: Vec<(String, Vec<usize>)>,
}

impl PatternInfo {
    pub fn create(pattern: &StatementPattern) -> Self {
        let mut variables: Vec<(String, Vec<usize>)> = Vec::new();
        for (position, term) in pattern.terms().into_iter().enumerate() {
            let name = match term.and_then(|t| t.as_variable()) {
                Some(name) => name,
                None => continue,
            };
            match variables.iter_mut().find(|(n, _)| n.as_str() == name) {
                Some((_, positions)) => positions.push(position),
                None => variables.push((name.to_string(), vec![position])),
            }
        }
        Self { variables }
    }

    /// Every position of `name`, or `None` if the pattern lacks it
    pub fn positions(&self, name: &str) -> Option<&[usize]> {
        self.variables
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, positions)| positions.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions(name).is_some()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.variables
            .iter()
            .map(|(name, positions)| (name.as_str(), positions.as_slice()))
    }

    /// Bit `i` set when position `i` holds a variable
    pub fn variable_mask(&self) -> u8 {
        self.variables
            .iter()
            .flat_map(|(_, positions)| positions.iter())
            .fold(0u8, |mask, &p| mask | (1 << p))
    }

    /// Position pairs that must hold equal ids (repeated variables)
    pub fn equalities(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (_, positions) in &self.variables {
            for &other in &positions[1..] {
                pairs.push((positions[0], other));
            }
        }
        pairs
    }
}

/// Variable -> slot layout of a join-tree fragment's records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingInfo {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl BindingInfo {
    pub fn empty() -> Self {
        Self::default()
    }

    /// One slot per distinct variable, in order of first position
    pub fn from_pattern(info: &PatternInfo) -> Self {
        let mut binding = Self::empty();
        for (name, _) in info.variables() {
            binding.push(name);
        }
        binding
    }

    /// Slots in the given order; repeated names keep their first slot
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut binding = Self::empty();
        for name in names {
            if binding.get_index(name.as_ref()).is_none() {
                binding.push(name.as_ref());
            }
        }
        binding
    }

    /// Left slots keep their indices; variables new on the right are appended
    pub fn combine(left: &BindingInfo, right: &BindingInfo) -> Self {
        let mut combined = left.clone();
        for name in &right.names {
            if !combined.index.contains_key(name) {
                combined.push(name);
            }
        }
        combined
    }

    fn push(&mut self, name: &str) {
        self.index.insert(name.to_string(), self.names.len());
        self.names.push(name.to_string());
    }

    pub fn get_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Record of this width with every slot unbound
    pub fn blank_record(&self) -> Vec<SurrogateId> {
        vec![UNKNOWN_ID; self.names.len()]
    }
}

/// Parallel source/destination slot lists
///
/// Each destination slot appears at most once, so applying a plan is
/// idempotent and independent of order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyPlan {
    source: Vec<usize>,
    destination: Vec<usize>,
}

impl CopyPlan {
    /// Every variable of `from` into its slot in `to`
    pub fn between(from: &BindingInfo, to: &BindingInfo) -> Self {
        let mut plan = Self::default();
        for (src, name) in from.names().iter().enumerate() {
            if let Some(dst) = to.get_index(name) {
                plan.push(src, dst);
            }
        }
        plan
    }

    /// Pattern positions into `to`, skipping variables listed in `exclude`
    ///
    /// Variables with no slot in `to` are dropped. A repeated variable is copied
    /// from its first position.
    pub fn from_pattern(info: &PatternInfo, to: &BindingInfo, exclude: &[&str]) -> Self {
        let mut plan = Self::default();
        for (name, positions) in info.variables() {
            if exclude.contains(&name) {
                continue;
            }
            if let Some(dst) = to.get_index(name) {
                plan.push(positions[0], dst);
            }
        }
        plan
    }

    /// Plan from explicit `(source, destination)` pairs
    pub fn from_pairs(pairs: &[(usize, usize)]) -> Self {
        let mut plan = Self::default();
        for &(src, dst) in pairs {
            plan.push(src, dst);
        }
        plan
    }

    fn push(&mut self, src: usize, dst: usize) {
        debug_assert!(!self.destination.contains(&dst));
        self.source.push(src);
        self.destination.push(dst);
    }

    #[inline]
    pub fn apply(&self, from: &[SurrogateId], to: &mut [SurrogateId]) {
        for (&src, &dst) in self.source.iter().zip(self.destination.iter()) {
            to[dst] = from[src];
        }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// A variable present on both sides of a join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedVariable {
    pub name: String,
    pub left_index: usize,
    pub right_positions: Vec<usize>,
    pub out_index: usize,
}

impl SharedVariable {
    /// Variables of `right` already bound in `left`
    pub fn between(left: &BindingInfo, right: &PatternInfo, out: &BindingInfo) -> Vec<Self> {
        right
            .variables()
            .filter_map(|(name, positions)| {
                let left_index = left.get_index(name)?;
                let out_index = out.get_index(name)?;
                Some(SharedVariable {
                    name: name.to_string(),
                    left_index,
                    right_positions: positions.to_vec(),
                    out_index,
                })
            })
            .collect()
    }
}

/// Row-level join predicate
///
/// A shared variable rejects the pair only when both sides hold resolved ids
/// that differ. Unbound slots and the default context never decide a match.
pub fn matches_join(left: &[SurrogateId], right: &[SurrogateId], shared: &[SharedVariable]) -> bool {
    shared.iter().all(|var| {
        let mut expected = left[var.left_index];
        for &position in &var.right_positions {
            let actual = right[position];
            if !is_resolved(actual) {
                continue;
            }
            if is_resolved(expected) {
                if actual != expected {
                    return false;
                }
            } else {
                expected = actual;
            }
        }
        true
    })
}

/// Build one output record from a matched pair
///
/// `out` is reset to `template` (or to unbound slots when the template is
/// empty), then the left and right plans are applied. A shared variable whose
/// output slot is still unresolved takes the right side's id.
#[allow(clippy::too_many_arguments)]
pub fn combine_records(
    out: &mut Vec<SurrogateId>,
    width: usize,
    template: &[SurrogateId],
    left: &[SurrogateId],
    left_plan: &CopyPlan,
    right: &[SurrogateId],
    right_plan: &CopyPlan,
    shared: &[SharedVariable],
) {
    out.clear();
    if template.is_empty() {
        out.resize(width, UNKNOWN_ID);
    } else {
        out.extend_from_slice(template);
    }
    left_plan.apply(left, out);
    right_plan.apply(right, out);
    for var in shared {
        if is_resolved(out[var.out_index]) {
            continue;
        }
        if let Some(&id) = var
            .right_positions
            .iter()
            .map(|p| &right[*p])
            .find(|id| is_resolved(**id))
        {
            out[var.out_index] = id;
        }
    }
}
