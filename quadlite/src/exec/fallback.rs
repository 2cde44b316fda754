// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Generic value-level join evaluation
//!
//! A depth-first nested loop over statement patterns that reads through
//! [`EvaluationDataset::open_statements`]. It makes no assumption about ids
//! or scan order, so it stays correct over transaction overlays and any
//! other dataset the id path cannot handle. Each open frame holds one scan,
//! and statements are resolved to values one at a time.

use crate::exec::dataset::EvaluationDataset;
use crate::exec::error::{ExecResult, ExecutionError};
use crate::exec::materialize::BindingSource;
use crate::exec::record_iterator::RecordIterator;
use crate::model::{BindingSet, Quad, StatementPattern, TermPattern, Value};
use crate::storage::QuadIds;
use std::sync::Arc;

struct Frame {
    binding: BindingSet,
    /// `None` when a looked-up value has no id
    scan: Option<Box<dyn RecordIterator>>,
}

impl Frame {
    fn close(&mut self) -> ExecResult<()> {
        match self.scan.take() {
            Some(mut scan) => scan.close(),
            None => Ok(()),
        }
    }
}

/// Lazy nested-loop evaluation of a basic graph pattern
pub struct FallbackRows {
    dataset: Arc<dyn EvaluationDataset>,
    patterns: Arc<[StatementPattern]>,
    /// Caller binding, taken when the first row is requested
    initial: Option<BindingSet>,
    frames: Vec<Frame>,
    closed: bool,
}

impl FallbackRows {
    pub fn new(
        dataset: Arc<dyn EvaluationDataset>,
        patterns: Arc<[StatementPattern]>,
        initial: BindingSet,
    ) -> Self {
        Self {
            dataset,
            patterns,
            initial: Some(initial),
            frames: Vec::new(),
            closed: false,
        }
    }

    /// Scan for pattern `depth` under `binding`
    ///
    /// Bound variables narrow the subject, predicate and object. The context
    /// is narrowed by constants only: a graph bound earlier still admits
    /// statements in the default graph, and [`extend_binding`] rejects the
    /// named graphs that differ.
    fn open_frame(&self, depth: usize, binding: BindingSet) -> ExecResult<Frame> {
        let pattern = &self.patterns[depth];
        let lookup = |term: &TermPattern| -> Option<Value> {
            match term {
                TermPattern::Constant(value) => Some(value.clone()),
                TermPattern::Variable(name) => binding.get(name).cloned(),
            }
        };
        let subject = lookup(&pattern.subject);
        let predicate = lookup(&pattern.predicate);
        let object = lookup(&pattern.object);
        let context = match &pattern.context {
            Some(TermPattern::Constant(value)) => Some(value.clone()),
            _ => None,
        };
        let scan = self.dataset.open_statements(
            subject.as_ref(),
            predicate.as_ref(),
            object.as_ref(),
            context.as_ref(),
        )?;
        Ok(Frame { binding, scan })
    }
}

/// `binding` extended with `quad` matched against `pattern`
///
/// `None` when a constant or an already bound variable disagrees. A graph
/// variable meeting the default graph stays unbound.
pub fn extend_binding(
    binding: &BindingSet,
    pattern: &StatementPattern,
    quad: &Quad,
) -> Option<BindingSet> {
    let mut extended = binding.clone();
    let slots = [
        (Some(&pattern.subject), Some(&quad.subject)),
        (Some(&pattern.predicate), Some(&quad.predicate)),
        (Some(&pattern.object), Some(&quad.object)),
        (pattern.context.as_ref(), quad.context.as_ref()),
    ];
    for (term, value) in slots {
        match (term, value) {
            (None, _) => {}
            (Some(TermPattern::Constant(expected)), actual) => {
                if actual != Some(expected) {
                    return None;
                }
            }
            (Some(TermPattern::Variable(_)), None) => {}
            (Some(TermPattern::Variable(name)), Some(actual)) => match extended.get(name) {
                Some(existing) if existing != actual => return None,
                Some(_) => {}
                None => extended.insert(name.as_str(), actual.clone()),
            },
        }
    }
    Some(extended)
}

impl BindingSource for FallbackRows {
    fn next_binding(&mut self) -> ExecResult<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if let Some(initial) = self.initial.take() {
            if self.patterns.is_empty() {
                return Ok(Some(initial));
            }
            let frame = self.open_frame(0, initial)?;
            self.frames.push(frame);
        }

        loop {
            let depth = match self.frames.len() {
                0 => return Ok(None),
                n => n - 1,
            };
            let frame = &mut self.frames[depth];
            let ids = match frame.scan.as_mut() {
                Some(scan) => match scan.next_record()? {
                    Some(record) => Some(QuadIds::try_from(record).map_err(|_| {
                        ExecutionError::ContractViolation(format!(
                            "statement scan produced a {}-wide record",
                            record.len()
                        ))
                    })?),
                    None => None,
                },
                None => None,
            };
            let ids = match ids {
                Some(ids) => ids,
                None => {
                    frame.close()?;
                    self.frames.pop();
                    continue;
                }
            };
            let quad = self.dataset.quad_from_ids(&ids)?;
            let extended = match extend_binding(&frame.binding, &self.patterns[depth], &quad) {
                Some(binding) => binding,
                None => continue,
            };
            if depth + 1 == self.patterns.len() {
                return Ok(Some(extended));
            }
            let next = self.open_frame(depth + 1, extended)?;
            self.frames.push(next);
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.initial = None;
        let mut first_error = None;
        for mut frame in self.frames.drain(..).rev() {
            if let Err(e) = frame.close() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
