// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Quad indexes over surrogate ids
//!
//! Each index is one ordered tree whose keys are the four ids of a statement
//! laid out in the index's field order, 8 big-endian bytes each. Byte order
//! of keys therefore equals ascending id order field by field, which is what
//! lets a prefix scan double as an ordered scan.
//!
//! The value of every entry holds the statement's [`Lifetimes`]. Scans read
//! at one generation and skip entries not visible to it, so a reader keeps
//! seeing the store as it was when it pinned its generation.

use super::persistent::{DynStorageDriver, KvIter, StorageTree};
use super::types::{
    QuadIds, ScanPattern, StatementOrder, StorageError, CONTEXT_IDX, OBJ_IDX, PRED_IDX, SUBJ_IDX,
};
use super::value_store::{decode_id, encode_id};
use super::visibility::{Generation, Lifetimes, ReadPin, ReaderRegistry};
use log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};

const KEY_LEN: usize = 32;
const META_TREE: &str = "quads_meta";
const GENERATION_KEY: &[u8] = b"generation";

/// One index: a permutation of the statement positions
pub struct QuadIndex {
    name: String,
    tree_name: String,
    fields: [usize; 4],
    tree: Box<dyn StorageTree>,
}

impl QuadIndex {
    /// Parse an index name such as `posc` into its field order
    pub fn parse_fields(name: &str) -> Result<[usize; 4], StorageError> {
        let chars: Vec<char> = name.to_ascii_lowercase().chars().collect();
        if chars.len() != 4 {
            return Err(StorageError::InvalidIndex(format!(
                "{}: expected 4 fields",
                name
            )));
        }
        let mut fields = [0usize; 4];
        let mut seen = [false; 4];
        for (i, c) in chars.iter().enumerate() {
            let position = match c {
                's' => SUBJ_IDX,
                'p' => PRED_IDX,
                'o' => OBJ_IDX,
                'c' => CONTEXT_IDX,
                other => {
                    return Err(StorageError::InvalidIndex(format!(
                        "{}: unknown field '{}'",
                        name, other
                    )))
                }
            };
            if seen[position] {
                return Err(StorageError::InvalidIndex(format!(
                    "{}: field '{}' repeated",
                    name, c
                )));
            }
            seen[position] = true;
            fields[i] = position;
        }
        Ok(fields)
    }

    fn open(driver: &DynStorageDriver, name: &str) -> Result<Self, StorageError> {
        let fields = Self::parse_fields(name)?;
        let name = name.to_ascii_lowercase();
        let tree_name = format!("quads_{}", name);
        let tree = driver.open_tree(&tree_name)?;
        Ok(Self {
            name,
            tree_name,
            fields,
            tree,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> [usize; 4] {
        self.fields
    }

    fn key(&self, quad: &QuadIds) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        for (i, &position) in self.fields.iter().enumerate() {
            key[i * 8..(i + 1) * 8].copy_from_slice(&encode_id(quad[position]));
        }
        key
    }

    fn decode_key(&self, key: &[u8]) -> Result<QuadIds, StorageError> {
        decode_key(key, &self.fields, &self.tree_name)
    }

    /// Number of leading fields bound in `pattern`
    pub fn bound_prefix_len(&self, pattern: &ScanPattern) -> usize {
        self.fields
            .iter()
            .take_while(|&&position| pattern.is_bound(position))
            .count()
    }

    fn prefix(&self, pattern: &ScanPattern, len: usize) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(len * 8);
        for &position in &self.fields[..len] {
            prefix.extend_from_slice(&encode_id(pattern.ids[position]));
        }
        prefix
    }

    fn open_scan(
        &self,
        pattern: &ScanPattern,
        generation: Generation,
    ) -> Result<TripleScan, StorageError> {
        let prefix_len = self.bound_prefix_len(pattern);
        let prefix = self.prefix(pattern, prefix_len);
        trace!(
            "Scanning index {} with {} bound prefix field(s) at generation {}",
            self.name,
            prefix_len,
            generation
        );
        Ok(TripleScan {
            cursor: self.tree.scan_prefix(&prefix)?,
            fields: self.fields,
            tree_name: self.tree_name.clone(),
            pattern: pattern.clone(),
            generation,
        })
    }
}

fn decode_key(key: &[u8], fields: &[usize; 4], tree: &str) -> Result<QuadIds, StorageError> {
    if key.len() != KEY_LEN {
        return Err(StorageError::CorruptKey {
            tree: tree.to_string(),
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    let mut quad = [0; 4];
    for (i, &position) in fields.iter().enumerate() {
        quad[position] = decode_id(&key[i * 8..(i + 1) * 8], tree)?;
    }
    Ok(quad)
}

/// Cursor over the statements matching a [`ScanPattern`] at one generation
///
/// Yields ids in `[s, p, o, c]` order. Owns its cursor, so it can outlive
/// the borrow of the store that opened it.
pub struct TripleScan {
    cursor: KvIter,
    fields: [usize; 4],
    tree_name: String,
    pattern: ScanPattern,
    generation: Generation,
}

impl TripleScan {
    fn visible(&self, key: &[u8], value: &[u8]) -> Result<Option<QuadIds>, StorageError> {
        let quad = decode_key(key, &self.fields, &self.tree_name)?;
        if !self.pattern.matches(&quad) {
            return Ok(None);
        }
        let lifetimes = Lifetimes::decode(value, &self.tree_name)?;
        Ok(lifetimes.is_visible_to(self.generation).then_some(quad))
    }
}

impl Iterator for TripleScan {
    type Item = Result<QuadIds, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, value) = match self.cursor.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            match self.visible(&key, &value) {
                Ok(Some(quad)) => return Some(Ok(quad)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Statement indexes of one store
///
/// Writers must be serialized by the caller: stage changes at
/// [`TripleStore::next_generation`], then [`TripleStore::publish`] it.
pub struct TripleStore {
    indexes: Vec<QuadIndex>,
    meta: Box<dyn StorageTree>,
    generation: AtomicU64,
    readers: ReaderRegistry,
}

impl TripleStore {
    pub fn open(driver: &DynStorageDriver, index_names: &[String]) -> Result<Self, StorageError> {
        if index_names.is_empty() {
            return Err(StorageError::InvalidIndex(
                "at least one index is required".to_string(),
            ));
        }
        let mut indexes: Vec<QuadIndex> = Vec::with_capacity(index_names.len());
        for name in index_names {
            let index = QuadIndex::open(driver, name)?;
            if indexes.iter().any(|existing| existing.fields == index.fields) {
                debug!("Skipping duplicate index {}", index.name);
                continue;
            }
            indexes.push(index);
        }

        // An index added to an existing store starts empty; copy the first
        // one's entries, lifetimes included.
        let reference = &indexes[0];
        if !reference.tree.is_empty()? {
            for index in indexes.iter().skip(1) {
                if index.tree.is_empty()? {
                    debug!("Populating new index {} from {}", index.name, reference.name);
                    for entry in reference.tree.scan_prefix(&[])? {
                        let (key, value) = entry?;
                        let quad = reference.decode_key(&key)?;
                        index.tree.insert(&index.key(&quad), &value)?;
                    }
                }
            }
        }

        let meta = driver.open_tree(META_TREE)?;
        let generation = match meta.get(GENERATION_KEY)? {
            Some(bytes) => decode_id(&bytes, META_TREE)? as Generation,
            None => 0,
        };
        debug!("Statement indexes at generation {}", generation);

        Ok(Self {
            indexes,
            meta,
            generation: AtomicU64::new(generation),
            readers: ReaderRegistry::new(),
        })
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|i| i.name()).collect()
    }

    /// Latest published generation
    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::Acquire)
    }

    /// Generation the next commit writes at
    pub fn next_generation(&self) -> Generation {
        self.generation() + 1
    }

    /// Pin the latest generation for a reader
    pub fn pin(&self) -> ReadPin {
        self.readers.pin(|| self.generation())
    }

    pub fn readers(&self) -> &ReaderRegistry {
        &self.readers
    }

    /// Make everything staged at `generation` visible to new readers
    pub fn publish(&self, generation: Generation) -> Result<(), StorageError> {
        self.meta
            .insert(GENERATION_KEY, &encode_id(generation as i64))?;
        self.generation.store(generation, Ordering::Release);
        trace!("Published generation {}", generation);
        Ok(())
    }

    fn lifetimes(&self, quad: &QuadIds) -> Result<Lifetimes, StorageError> {
        let index = &self.indexes[0];
        match index.tree.get(&index.key(quad))? {
            Some(bytes) => Lifetimes::decode(&bytes, &index.tree_name),
            None => Ok(Lifetimes::default()),
        }
    }

    fn write_lifetimes(&self, quad: &QuadIds, lifetimes: &Lifetimes) -> Result<(), StorageError> {
        if lifetimes.is_empty() {
            for index in &self.indexes {
                index.tree.remove(&index.key(quad))?;
            }
            return Ok(());
        }
        let value = lifetimes.encode();
        for index in &self.indexes {
            index.tree.insert(&index.key(quad), &value)?;
        }
        Ok(())
    }

    /// Stage an insert at `generation`; false if the statement is stored
    pub fn add(&self, quad: &QuadIds, generation: Generation) -> Result<bool, StorageError> {
        let mut lifetimes = self.lifetimes(quad)?;
        if lifetimes.is_live() {
            return Ok(false);
        }
        lifetimes.open(generation);
        self.write_lifetimes(quad, &lifetimes)?;
        Ok(true)
    }

    /// Stage a removal at `generation`; false if the statement is not stored
    ///
    /// The entry stays until [`TripleStore::reclaim`] finds no reader that
    /// can still see it.
    pub fn remove(&self, quad: &QuadIds, generation: Generation) -> Result<bool, StorageError> {
        let mut lifetimes = self.lifetimes(quad)?;
        if !lifetimes.is_live() {
            return Ok(false);
        }
        lifetimes.close(generation);
        self.write_lifetimes(quad, &lifetimes)?;
        Ok(true)
    }

    /// Drop lifetimes of `quads` that no pinned reader can see; returns how
    /// many entries changed. Call after publishing.
    pub fn reclaim<'a>(
        &self,
        quads: impl IntoIterator<Item = &'a QuadIds>,
    ) -> Result<usize, StorageError> {
        let oldest = self.readers.oldest();
        let mut reclaimed = 0;
        for quad in quads {
            let mut lifetimes = self.lifetimes(quad)?;
            if lifetimes.prune(oldest) {
                self.write_lifetimes(quad, &lifetimes)?;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    /// Reclaim every entry; returns how many changed
    pub fn compact(&self) -> Result<usize, StorageError> {
        let index = &self.indexes[0];
        let mut removed = Vec::new();
        for entry in index.tree.scan_prefix(&[])? {
            let (key, value) = entry?;
            if !Lifetimes::decode(&value, &index.tree_name)?.is_live() {
                removed.push(index.decode_key(&key)?);
            }
        }
        let reclaimed = self.reclaim(&removed)?;
        debug!("Compaction reclaimed {} statement entries", reclaimed);
        Ok(reclaimed)
    }

    /// Whether `quad` is stored as of `generation`
    pub fn contains(&self, quad: &QuadIds, generation: Generation) -> Result<bool, StorageError> {
        Ok(self.lifetimes(quad)?.is_visible_to(generation))
    }

    pub fn len(&self, generation: Generation) -> Result<usize, StorageError> {
        let mut count = 0;
        for quad in self.scan(&ScanPattern::any(), generation)? {
            quad?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self, generation: Generation) -> Result<bool, StorageError> {
        match self.scan(&ScanPattern::any(), generation)?.next() {
            Some(quad) => quad.map(|_| false),
            None => Ok(true),
        }
    }

    /// Index with the longest bound prefix for `pattern`; first wins ties
    pub fn select_best_index(&self, pattern: &ScanPattern) -> &QuadIndex {
        let mut best = &self.indexes[0];
        let mut best_len = best.bound_prefix_len(pattern);
        for index in self.indexes.iter().skip(1) {
            let len = index.bound_prefix_len(pattern);
            if len > best_len {
                best = index;
                best_len = len;
            }
        }
        best
    }

    /// Statements matching `pattern` as of `generation`, in no particular order
    pub fn scan(
        &self,
        pattern: &ScanPattern,
        generation: Generation,
    ) -> Result<TripleScan, StorageError> {
        self.select_best_index(pattern).open_scan(pattern, generation)
    }

    /// Statements matching `pattern` as of `generation`, in ascending id
    /// order of `order`
    ///
    /// `None` when no index lists exactly the bound positions followed by the
    /// order position. A bound order position is trivially ordered.
    pub fn scan_ordered(
        &self,
        pattern: &ScanPattern,
        order: StatementOrder,
        generation: Generation,
    ) -> Result<Option<TripleScan>, StorageError> {
        let order_position = order.position();
        if pattern.is_bound(order_position) {
            return self.scan(pattern, generation).map(Some);
        }
        let bound = pattern.bound_mask();
        let bound_count = bound.count_ones() as usize;
        let candidate = self.indexes.iter().find(|index| {
            let prefix_mask = index.fields[..bound_count]
                .iter()
                .fold(0u8, |mask, &p| mask | (1 << p));
            prefix_mask == bound && index.fields[bound_count] == order_position
        });
        match candidate {
            Some(index) => index.open_scan(pattern, generation).map(Some),
            None => {
                debug!(
                    "No index yields order {} for bound mask {:04b}",
                    order, bound
                );
                Ok(None)
            }
        }
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        for index in &self.indexes {
            index.tree.flush()?;
        }
        self.meta.flush()?;
        Ok(())
    }
}
