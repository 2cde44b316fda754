// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index nested-loop join over id records

use crate::exec::binding_info::{combine_records, matches_join, CopyPlan, SharedVariable};
use crate::exec::error::ExecResult;
use crate::exec::record_iterator::RecordIterator;
use crate::storage::SurrogateId;
use log::trace;

/// Opens the inner input for one outer record
pub type RightFactory = Box<dyn FnMut(&[SurrogateId]) -> ExecResult<Box<dyn RecordIterator>>>;

/// Nested-loop join stage
///
/// For every left record the factory opens a right cursor, usually an index
/// scan already narrowed by the left record's ids. The right cursor is
/// drained before the left side advances.
pub struct IdJoinRecordIterator {
    left: Box<dyn RecordIterator>,
    right_factory: RightFactory,
    right: Option<Box<dyn RecordIterator>>,
    left_record: Vec<SurrogateId>,
    left_plan: CopyPlan,
    right_plan: CopyPlan,
    shared: Vec<SharedVariable>,
    width: usize,
    out: Vec<SurrogateId>,
    exhausted: bool,
    closed: bool,
}

impl IdJoinRecordIterator {
    /// `left_plan` maps the left layout into the output layout, `right_plan`
    /// maps pattern positions of the non-shared right variables.
    pub fn new(
        left: Box<dyn RecordIterator>,
        right_factory: RightFactory,
        left_plan: CopyPlan,
        right_plan: CopyPlan,
        shared: Vec<SharedVariable>,
        width: usize,
    ) -> Self {
        Self {
            left,
            right_factory,
            right: None,
            left_record: Vec::new(),
            left_plan,
            right_plan,
            shared,
            width,
            out: Vec::with_capacity(width),
            exhausted: false,
            closed: false,
        }
    }

    fn close_right(&mut self) -> ExecResult<()> {
        match self.right.take() {
            Some(mut right) => right.close(),
            None => Ok(()),
        }
    }
}

impl RecordIterator for IdJoinRecordIterator {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        loop {
            if self.exhausted || self.closed {
                return Ok(None);
            }

            if let Some(right) = self.right.as_mut() {
                match right.next_record()? {
                    Some(right_record) => {
                        if !matches_join(&self.left_record, right_record, &self.shared) {
                            trace!("Rejected pair on shared variable mismatch");
                            continue;
                        }
                        combine_records(
                            &mut self.out,
                            self.width,
                            &[],
                            &self.left_record,
                            &self.left_plan,
                            right_record,
                            &self.right_plan,
                            &self.shared,
                        );
                        return Ok(Some(&self.out));
                    }
                    None => self.close_right()?,
                }
            }

            match self.left.next_record()? {
                Some(record) => {
                    self.left_record.clear();
                    self.left_record.extend_from_slice(record);
                }
                None => {
                    self.exhausted = true;
                    return Ok(None);
                }
            }
            self.right = Some((self.right_factory)(&self.left_record)?);
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let right = self.close_right();
        let left = self.left.close();
        right.and(left)
    }
}
