// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lookahead, checkpoint and replay over any record iterator
//!
//! The merge join uses this on its inner input to walk a run of equal keys
//! once per matching outer record. While marked, every record handed out is
//! copied into a replay buffer; `reset` rewinds to the mark and replays the
//! buffer before pulling live records again. The buffer holds at most one
//! run as long as callers `unmark` once a run is done.

use crate::exec::error::{ExecResult, ExecutionError};
use crate::exec::record_iterator::RecordIterator;
use crate::storage::SurrogateId;

pub struct PeekMarkRecordIterator {
    source: Box<dyn RecordIterator>,
    /// Records seen since the mark; `buffer[pos..]` are still to be replayed
    buffer: Vec<Vec<SurrogateId>>,
    pos: usize,
    lookahead: Vec<SurrogateId>,
    has_lookahead: bool,
    current: Vec<SurrogateId>,
    marked: bool,
    exhausted: bool,
    closed: bool,
}

impl PeekMarkRecordIterator {
    pub fn new(source: Box<dyn RecordIterator>) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            pos: 0,
            lookahead: Vec::new(),
            has_lookahead: false,
            current: Vec::new(),
            marked: false,
            exhausted: false,
            closed: false,
        }
    }

    fn fill_lookahead(&mut self) -> ExecResult<bool> {
        if self.has_lookahead {
            return Ok(true);
        }
        if self.exhausted || self.closed {
            return Ok(false);
        }
        match self.source.next_record()? {
            Some(record) => {
                self.lookahead.clear();
                self.lookahead.extend_from_slice(record);
                self.has_lookahead = true;
                Ok(true)
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// The record the next `next_record` call will return, without consuming it
    pub fn peek(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        if self.pos < self.buffer.len() {
            return Ok(Some(&self.buffer[self.pos]));
        }
        if self.fill_lookahead()? {
            Ok(Some(&self.lookahead))
        } else {
            Ok(None)
        }
    }

    /// Start buffering at the current position
    ///
    /// Marking again moves the mark forward to the current position.
    pub fn mark(&mut self) {
        self.buffer.drain(..self.pos);
        self.pos = 0;
        self.marked = true;
    }

    /// Rewind to the mark
    ///
    /// The mark stays in place, so a run can be replayed any number of times.
    pub fn reset(&mut self) -> ExecResult<()> {
        if self.closed {
            return Err(ExecutionError::ContractViolation(
                "reset() called on a closed iterator".to_string(),
            ));
        }
        if !self.marked {
            return Err(ExecutionError::ContractViolation(
                "reset() called without a prior mark()".to_string(),
            ));
        }
        self.pos = 0;
        Ok(())
    }

    /// Drop the mark and everything already replayed
    ///
    /// Records buffered but not yet replayed are still returned, in order.
    pub fn unmark(&mut self) {
        self.marked = false;
        self.buffer.drain(..self.pos);
        self.pos = 0;
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn is_resettable(&self) -> bool {
        self.marked && !self.closed
    }

    /// Records currently held for replay
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl RecordIterator for PeekMarkRecordIterator {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        if self.pos < self.buffer.len() {
            self.pos += 1;
            return Ok(Some(&self.buffer[self.pos - 1]));
        }
        if !self.fill_lookahead()? {
            return Ok(None);
        }
        self.has_lookahead = false;

        if self.marked {
            self.buffer.push(self.lookahead.clone());
            self.pos = self.buffer.len();
            return Ok(Some(&self.buffer[self.pos - 1]));
        }
        if !self.buffer.is_empty() {
            self.buffer.clear();
            self.pos = 0;
        }
        std::mem::swap(&mut self.current, &mut self.lookahead);
        Ok(Some(&self.current))
    }

    fn close(&mut self) -> ExecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.clear();
        self.pos = 0;
        self.has_lookahead = false;
        self.source.close()
    }
}
