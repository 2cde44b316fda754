// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Record iterators - pull-based cursors over surrogate-id records
//!
//! A record is a fixed-width slice of [`SurrogateId`]s whose layout is set
//! when the producing stage is compiled.
//!
//! # Record validity
//!
//! The slice returned by [`RecordIterator::next_record`] borrows the
//! iterator and is only valid until the next call on that iterator. Producers
//! are free to reuse one backing buffer for every record. A stage that needs
//! a record across calls (the current outer row of a join, a replay buffer)
//! copies it.

use crate::exec::error::{ExecResult, ExecutionError};
use crate::storage::{QuadIds, StorageError, SurrogateId};

/// Cursor over id records
pub trait RecordIterator {
    /// Next record, or `None` once exhausted
    ///
    /// Calling again after `None` keeps returning `None`.
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>>;

    /// Release the cursor and every child it owns
    ///
    /// Safe to call any number of times; only the first call does work.
    fn close(&mut self) -> ExecResult<()>;
}

impl<R: RecordIterator + ?Sized> RecordIterator for Box<R> {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        (**self).next_record()
    }

    fn close(&mut self) -> ExecResult<()> {
        (**self).close()
    }
}

/// Iterator with no records
#[derive(Debug, Default)]
pub struct EmptyRecordIterator;

impl RecordIterator for EmptyRecordIterator {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        Ok(None)
    }

    fn close(&mut self) -> ExecResult<()> {
        Ok(())
    }
}

/// Iterator over materialized records
#[derive(Debug)]
pub struct VecRecordIterator {
    records: Vec<Vec<SurrogateId>>,
    pos: usize,
    closed: bool,
}

impl VecRecordIterator {
    pub fn new(records: Vec<Vec<SurrogateId>>) -> Self {
        Self {
            records,
            pos: 0,
            closed: false,
        }
    }

    /// A single zero-width record: the identity input of a join chain
    pub fn unit() -> Self {
        Self::new(vec![Vec::new()])
    }
}

impl RecordIterator for VecRecordIterator {
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        if self.closed || self.pos >= self.records.len() {
            return Ok(None);
        }
        self.pos += 1;
        Ok(Some(&self.records[self.pos - 1]))
    }

    fn close(&mut self) -> ExecResult<()> {
        self.closed = true;
        self.records.clear();
        Ok(())
    }
}

/// Adapts a statement cursor into 4-wide `[s, p, o, c]` records
///
/// Every record is written into the same buffer.
pub struct ScanRecordIterator<I> {
    source: Option<I>,
    current: QuadIds,
}

impl<I> ScanRecordIterator<I>
where
    I: Iterator<Item = Result<QuadIds, StorageError>>,
{
    pub fn new(source: I) -> Self {
        Self {
            source: Some(source),
            current: [0; 4],
        }
    }
}

impl<I> RecordIterator for ScanRecordIterator<I>
where
    I: Iterator<Item = Result<QuadIds, StorageError>>,
{
    fn next_record(&mut self) -> ExecResult<Option<&[SurrogateId]>> {
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return Ok(None),
        };
        match source.next() {
            Some(Ok(quad)) => {
                self.current = quad;
                Ok(Some(&self.current))
            }
            Some(Err(e)) => Err(ExecutionError::from(e)),
            None => {
                // Drop the cursor as soon as it is drained.
                self.source = None;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        self.source = None;
        Ok(())
    }
}

/// Drain `iter` into owned records, closing it afterwards
///
/// The close error is reported even when consumption succeeded; a
/// consumption error takes precedence.
pub fn collect_records<R: RecordIterator + ?Sized>(
    iter: &mut R,
) -> ExecResult<Vec<Vec<SurrogateId>>> {
    let mut records = Vec::new();
    let drained = loop {
        match iter.next_record() {
            Ok(Some(record)) => records.push(record.to_vec()),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = iter.close();
    drained?;
    closed?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_iterator_end_is_idempotent() {
        let mut iter = VecRecordIterator::new(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(iter.next_record().unwrap(), Some(&[1, 2][..]));
        assert_eq!(iter.next_record().unwrap(), Some(&[3, 4][..]));
        assert_eq!(iter.next_record().unwrap(), None);
        assert_eq!(iter.next_record().unwrap(), None);
        iter.close().unwrap();
        iter.close().unwrap();
    }

    #[test]
    fn test_scan_iterator_reuses_buffer() {
        let quads = vec![Ok([1, 2, 3, 0]), Ok([4, 5, 6, 7])];
        let mut iter = ScanRecordIterator::new(quads.into_iter());
        let first = iter.next_record().unwrap().unwrap().to_vec();
        let second = iter.next_record().unwrap().unwrap().to_vec();
        assert_eq!(first, vec![1, 2, 3, 0]);
        assert_eq!(second, vec![4, 5, 6, 7]);
        assert_eq!(iter.next_record().unwrap(), None);
    }

    #[test]
    fn test_scan_iterator_propagates_storage_error() {
        let quads: Vec<Result<QuadIds, StorageError>> =
            vec![Err(StorageError::ValueNotFound(3))];
        let mut iter = ScanRecordIterator::new(quads.into_iter());
        assert!(matches!(
            iter.next_record(),
            Err(ExecutionError::StorageError(_))
        ));
    }

    #[test]
    fn test_closed_scan_yields_nothing() {
        let quads = vec![Ok([1, 2, 3, 0])];
        let mut iter = ScanRecordIterator::new(quads.into_iter());
        iter.close().unwrap();
        assert_eq!(iter.next_record().unwrap(), None);
    }

    #[test]
    fn test_collect_records_closes() {
        let mut iter = VecRecordIterator::unit();
        assert_eq!(collect_records(&mut iter).unwrap(), vec![Vec::<i64>::new()]);
        assert_eq!(iter.next_record().unwrap(), None);
    }
}
