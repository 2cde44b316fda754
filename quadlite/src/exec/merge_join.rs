// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sort-merge join over inputs ordered by one merge variable
//!
//! Both inputs must arrive in ascending id order of the merge variable. Runs
//! of equal keys on the right are marked and replayed once per left record
//! carrying the same key, which yields the full cross product of each run.

use crate::exec::binding_info::{combine_records, matches_join, CopyPlan, SharedVariable};
use crate::exec::error::{ExecResult, ExecutionError};
use crate::exec::peek_mark::PeekMarkRecordIterator;
use crate::exec::record_iterator::RecordIterator;
use crate::storage::{SurrogateId, UNKNOWN_ID};

/// Output layout for a merge join
pub struct MergeOutput {
    /// Initial output record; slots not written by the plans keep these ids
    pub template: Vec<SurrogateId>,
    pub left_plan: CopyPlan,
    pub right_plan: CopyPlan,
    /// Every variable bound on both sides, the merge variable included;
    /// its check always holds within a run of equal keys
    pub shared: Vec<SharedVariable>,
}

pub struct IdMergeJoinIterator {
    left: Box<dyn RecordIterator>,
    right: PeekMarkRecordIterator,
    left_key_index: usize,
    right_key_index: usize,
    output: MergeOutput,
    left_record: Vec<SurrogateId>,
    has_left: bool,
    in_run: bool,
    out: Vec<SurrogateId>,
    done: bool,
    closed: bool,
}

fn merge_key(record: &[SurrogateId], index: usize, side: &str) -> ExecResult<SurrogateId> {
    let key = record[index];
    if key == UNKNOWN_ID {
        return Err(ExecutionError::ConsistencyError(format!(
            "{} merge key at slot {} is unbound",
            side, index
        )));
    }
    Ok(key)
}

impl IdMergeJoinIterator {
    /// `left_key_index` and `right_key_index` are the merge variable's slots
    /// in the left and right records.
    pub fn new(
        left: Box<dyn RecordIterator>,
        right: Box<dyn RecordIterator>,
        left_key_index: usize,
        right_key_index: usize,
        output: MergeOutput,
    ) -> Self {
        let width = output.template.len();
        Self {
            left,
            right: PeekMarkRecordIterator::new(right),
            left_key_index,
            right_key_index,
            output,
            left_record: Vec::new(),
            has_left: false,
            in_run: false,
            out: Vec::with_capacity(width),
            done: false,
            closed: false,
        }
    }

    fn advance_left(&mut self) -> ExecResult<bool> {
        match self.left.next_record()? {
            Some(record) => {
                self.left_record.clear();
                self.left_record.extend_from_slice(record);
                self.has_left = true;
            }
            None => {
                self.has_left = false;
                self.done = true;
            }
        }
        Ok(self.has_left)
    }

    fn peek_right_key(&mut self) -> ExecResult<Option<SurrogateId>> {
        let index = self.right_key_index;
        match self.right.peek()? {
            Some(record) => merge_key(record, index, "right").map(Some),
            None => Ok(None),
        }
    }
}

impl RecordIterator for IdMergeJoinIterator {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        loop {
            if self.done || self.closed {
                return Ok(None);
            }
            if !self.has_left && !self.advance_left()? {
                return Ok(None);
            }
            let left_key = merge_key(&self.left_record, self.left_key_index, "left")?;

            if !self.in_run {
                let right_key = match self.peek_right_key()? {
                    Some(key) => key,
                    None => {
                        self.done = true;
                        return Ok(None);
                    }
                };
                if left_key < right_key {
                    self.has_left = false;
                    continue;
                }
                if left_key > right_key {
                    self.right.next_record()?;
                    continue;
                }
                self.right.mark();
                self.in_run = true;
            }

            if self.peek_right_key()? == Some(left_key) {
                if let Some(right_record) = self.right.next_record()? {
                    if matches_join(&self.left_record, right_record, &self.output.shared) {
                        combine_records(
                            &mut self.out,
                            self.output.template.len(),
                            &self.output.template,
                            &self.left_record,
                            &self.output.left_plan,
                            right_record,
                            &self.output.right_plan,
                            &self.output.shared,
                        );
                        return Ok(Some(&self.out));
                    }
                }
                continue;
            }

            // End of the run for this left record.
            if !self.advance_left()? {
                return Ok(None);
            }
            let next_key = merge_key(&self.left_record, self.left_key_index, "left")?;
            if next_key == left_key {
                self.right.reset()?;
            } else {
                self.right.unmark();
                self.in_run = false;
            }
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let right = self.right.close();
        let left = self.left.close();
        right.and(left)
    }
}
