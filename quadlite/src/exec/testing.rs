// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared helpers for the executor's unit tests

use crate::exec::error::{ExecResult, ExecutionError};
use crate::exec::record_iterator::RecordIterator;
use crate::model::{StatementPattern, TermPattern, Value};
use crate::storage::SurrogateId;
use std::cell::RefCell;
use std::rc::Rc;

/// `?name` is a variable, anything else an IRI
pub fn pattern(s: &str, p: &str, o: &str) -> StatementPattern {
    let term = |t: &str| match t.strip_prefix('?') {
        Some(name) => TermPattern::var(name),
        None => TermPattern::constant(Value::iri(t)),
    };
    StatementPattern::new(term(s), term(p), term(o))
}

/// Counts how often each wrapped iterator is closed
#[derive(Clone, Default)]
pub struct CloseCounter {
    // One entry per wrapped iterator: number of close() calls it received.
    closes: Rc<RefCell<Vec<usize>>>,
}

impl CloseCounter {
    pub fn wrap<R: RecordIterator + 'static>(&self, inner: R) -> Box<dyn RecordIterator> {
        self.wrap_inner(inner, false)
    }

    /// Like `wrap`, but close() reports an error after counting
    pub fn wrap_failing<R: RecordIterator + 'static>(&self, inner: R) -> Box<dyn RecordIterator> {
        self.wrap_inner(inner, true)
    }

    fn wrap_inner<R: RecordIterator + 'static>(
        &self,
        inner: R,
        fail_on_close: bool,
    ) -> Box<dyn RecordIterator> {
        let mut closes = self.closes.borrow_mut();
        closes.push(0);
        Box::new(CountingIterator {
            inner,
            slot: closes.len() - 1,
            closes: self.closes.clone(),
            fail_on_close,
        })
    }

    pub fn opened(&self) -> usize {
        self.closes.borrow().len()
    }

    /// Iterators closed at least once
    pub fn closed(&self) -> usize {
        self.closes.borrow().iter().filter(|&&c| c > 0).count()
    }

    pub fn max_closes_per_iterator(&self) -> usize {
        self.closes.borrow().iter().copied().max().unwrap_or(0)
    }
}

struct CountingIterator<R> {
    inner: R,
    slot: usize,
    closes: Rc<RefCell<Vec<usize>>>,
    fail_on_close: bool,
}

impl<R: RecordIterator> RecordIterator for CountingIterator<R> {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        self.inner.next_record()
    }

    fn close(&mut self) -> ExecResult<()> {
        self.closes.borrow_mut()[self.slot] += 1;
        self.inner.close()?;
        if self.fail_on_close {
            return Err(ExecutionError::StorageError("cursor close failed".to_string()));
        }
        Ok(())
    }
}
