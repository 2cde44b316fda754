// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RDF terms, quads, statement patterns and binding sets

use crate::storage::{SurrogateId, CONTEXT_IDX, OBJ_IDX, PRED_IDX, SUBJ_IDX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// An RDF term
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Iri(String),
    BlankNode(String),
    Literal {
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Value {
    pub fn iri(iri: impl Into<String>) -> Self {
        Value::Iri(iri.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Value::BlankNode(id.into())
    }

    /// Plain literal without datatype or language tag
    pub fn literal(lexical: impl Into<String>) -> Self {
        Value::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Value::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Value::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Value::Iri(_))
    }

    /// IRI or blank node
    pub fn is_resource(&self) -> bool {
        matches!(self, Value::Iri(_) | Value::BlankNode(_))
    }

    /// Whether this term may appear at the given statement position
    pub fn fits_position(&self, position: usize) -> bool {
        match position {
            SUBJ_IDX | CONTEXT_IDX => self.is_resource(),
            PRED_IDX => self.is_iri(),
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(iri) => write!(f, "<{}>", iri),
            Value::BlankNode(id) => write!(f, "_:{}", id),
            Value::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", lexical)?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)?;
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)?;
                }
                Ok(())
            }
        }
    }
}

/// A statement, optionally in a named graph
///
/// `context == None` places the statement in the default graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Value,
    pub predicate: Value,
    pub object: Value,
    pub context: Option<Value>,
}

impl Quad {
    pub fn new(subject: Value, predicate: Value, object: Value) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: None,
        }
    }

    pub fn in_graph(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Subject and context are resources, predicate is an IRI
    pub fn is_well_typed(&self) -> bool {
        self.subject.fits_position(SUBJ_IDX)
            && self.predicate.fits_position(PRED_IDX)
            && self.object.fits_position(OBJ_IDX)
            && self
                .context
                .as_ref()
                .map_or(true, |c| c.fits_position(CONTEXT_IDX))
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(context) = &self.context {
            write!(f, " {}", context)?;
        }
        Ok(())
    }
}

/// One slot of a statement pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermPattern {
    Variable(String),
    Constant(Value),
}

impl TermPattern {
    pub fn var(name: impl Into<String>) -> Self {
        TermPattern::Variable(name.into())
    }

    pub fn constant(value: Value) -> Self {
        TermPattern::Constant(value)
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            TermPattern::Variable(name) => Some(name),
            TermPattern::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            TermPattern::Variable(_) => None,
            TermPattern::Constant(value) => Some(value),
        }
    }
}

impl From<Value> for TermPattern {
    fn from(value: Value) -> Self {
        TermPattern::Constant(value)
    }
}

/// A triple pattern with an optional graph term
///
/// Without a context term the pattern matches statements in every graph and
/// binds no graph variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementPattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
    pub context: Option<TermPattern>,
}

impl StatementPattern {
    pub fn new(subject: TermPattern, predicate: TermPattern, object: TermPattern) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: None,
        }
    }

    pub fn with_context(mut self, context: TermPattern) -> Self {
        self.context = Some(context);
        self
    }

    /// Terms in record order; the context slot is `None` when absent
    pub fn terms(&self) -> [Option<&TermPattern>; 4] {
        [
            Some(&self.subject),
            Some(&self.predicate),
            Some(&self.object),
            self.context.as_ref(),
        ]
    }

    /// Distinct variable names in order of first occurrence
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for term in self.terms().into_iter().flatten() {
            if let Some(name) = term.as_variable() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.terms()
            .into_iter()
            .flatten()
            .any(|t| t.as_variable() == Some(name))
    }

    /// A constant sits at a position it can never occupy in stored data
    pub fn has_ill_typed_constant(&self) -> bool {
        self.terms().into_iter().enumerate().any(|(pos, term)| {
            term.and_then(|t| t.as_constant())
                .map_or(false, |v| !v.fits_position(pos))
        })
    }
}

impl fmt::Display for StatementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = |t: &TermPattern| match t {
            TermPattern::Variable(name) => format!("?{}", name),
            TermPattern::Constant(value) => value.to_string(),
        };
        write!(
            f,
            "{} {} {}",
            term(&self.subject),
            term(&self.predicate),
            term(&self.object)
        )?;
        if let Some(context) = &self.context {
            write!(f, " {}", term(context))?;
        }
        Ok(())
    }
}

/// Identity of one value store
///
/// Surrogate ids are only comparable between bindings carrying the same store id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(Uuid);

impl StoreId {
    pub fn new() -> Self {
        StoreId(Uuid::new_v4())
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store_{}", self.0)
    }
}

/// A bound value, remembering which store and id produced it
#[derive(Debug, Clone)]
pub struct BoundValue {
    pub value: Value,
    pub origin: Option<(StoreId, SurrogateId)>,
}

impl BoundValue {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            origin: None,
        }
    }

    pub fn from_store(value: Value, store: StoreId, id: SurrogateId) -> Self {
        Self {
            value,
            origin: Some((store, id)),
        }
    }

    /// Surrogate id of this value when it came from `store`
    pub fn id_in(&self, store: StoreId) -> Option<SurrogateId> {
        match self.origin {
            Some((origin, id)) if origin == store => Some(id),
            _ => None,
        }
    }
}

// Equality is value-level; the origin is a lookup shortcut only.
impl PartialEq for BoundValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for BoundValue {}

impl Hash for BoundValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

/// Variable name to value mapping produced by query evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingSet {
    bindings: BTreeMap<String, BoundValue>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), BoundValue::new(value));
    }

    pub fn insert_bound(&mut self, name: impl Into<String>, value: BoundValue) {
        self.bindings.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).map(|b| &b.value)
    }

    pub fn get_bound(&self, name: &str) -> Option<&BoundValue> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), &v.value))
    }
}

impl fmt::Display for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}
