// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Commit generations and statement lifetimes
//!
//! Every commit publishes a new generation. An index entry does not disappear
//! when its statement is removed; its value records the generations during
//! which the statement was stored, so a reader pinned at generation `g` sees
//! exactly the statements committed at or before `g`.
//!
//! Closed lifetimes are reclaimed once no pinned reader can still see them.

use super::types::StorageError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Commit sequence number; generation `g` is the state after the `g`-th commit
pub type Generation = u64;

/// End of a lifetime that has not been closed
const OPEN: Generation = Generation::MAX;

const LIFETIME_LEN: usize = 16;

fn be_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

/// Half-open generation ranges `[added, removed)` of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifetimes(Vec<(Generation, Generation)>);

impl Lifetimes {
    pub fn decode(bytes: &[u8], tree: &str) -> Result<Self, StorageError> {
        if bytes.len() % LIFETIME_LEN != 0 {
            return Err(StorageError::CorruptValue {
                tree: tree.to_string(),
                len: bytes.len(),
            });
        }
        Ok(Self(
            bytes
                .chunks_exact(LIFETIME_LEN)
                .map(|chunk| (be_u64(&chunk[..8]), be_u64(&chunk[8..])))
                .collect(),
        ))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * LIFETIME_LEN);
        for &(added, removed) in &self.0 {
            bytes.extend_from_slice(&added.to_be_bytes());
            bytes.extend_from_slice(&removed.to_be_bytes());
        }
        bytes
    }

    pub fn is_visible_to(&self, generation: Generation) -> bool {
        self.0
            .iter()
            .any(|&(added, removed)| added <= generation && generation < removed)
    }

    /// Stored in the latest state
    pub fn is_live(&self) -> bool {
        matches!(self.0.last(), Some(&(_, OPEN)))
    }

    pub fn open(&mut self, generation: Generation) {
        self.0.push((generation, OPEN));
    }

    pub fn close(&mut self, generation: Generation) {
        if let Some(last) = self.0.last_mut() {
            last.1 = generation;
        }
    }

    /// Drop closed lifetimes that no reader at `oldest_reader` or later can
    /// see; true if anything was dropped
    pub fn prune(&mut self, oldest_reader: Option<Generation>) -> bool {
        let before = self.0.len();
        self.0.retain(|&(_, removed)| {
            removed == OPEN || oldest_reader.map_or(false, |oldest| oldest < removed)
        });
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Generations currently pinned by open readers
#[derive(Debug, Clone, Default)]
pub struct ReaderRegistry {
    pinned: Arc<Mutex<BTreeMap<Generation, usize>>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the generation returned by `current`
    ///
    /// `current` runs under the registry lock, so a pin can never slip in
    /// between a commit's publish and the reclaim that follows it.
    pub fn pin(&self, current: impl FnOnce() -> Generation) -> ReadPin {
        let mut pinned = self.pinned.lock();
        let generation = current();
        *pinned.entry(generation).or_insert(0) += 1;
        ReadPin {
            generation,
            registry: self.clone(),
        }
    }

    pub fn oldest(&self) -> Option<Generation> {
        self.pinned.lock().keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.pinned.lock().values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pinned.lock().is_empty()
    }

    fn release(&self, generation: Generation) {
        let mut pinned = self.pinned.lock();
        if let Some(count) = pinned.get_mut(&generation) {
            *count -= 1;
            if *count == 0 {
                pinned.remove(&generation);
            }
        }
    }
}

/// A reader's claim on one generation; released on drop
#[derive(Debug)]
pub struct ReadPin {
    generation: Generation,
    registry: ReaderRegistry,
}

impl ReadPin {
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Drop for ReadPin {
    fn drop(&mut self) {
        self.registry.release(self.generation);
    }
}
