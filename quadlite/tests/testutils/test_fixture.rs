//! Test fixture for QuadLite integration tests
//!
//! Uses only the public crate API.

#![allow(dead_code)]

use quadlite::{
    compile, BindingSet, ExecResult, JoinConfig, JoinStrategy, JoinTree, Quad, QuadStore,
    QueryEvaluationContext, SchemaContext, StatementPattern, StoreConfig, StorageType,
    TermPattern, Value,
};
use std::path::Path;
use tempfile::TempDir;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn iri(name: &str) -> Value {
    Value::iri(name)
}

/// `?name` is a variable, anything else an IRI
pub fn term(text: &str) -> TermPattern {
    match text.strip_prefix('?') {
        Some(name) => TermPattern::var(name),
        None => TermPattern::constant(iri(text)),
    }
}

pub fn pattern(s: &str, p: &str, o: &str) -> StatementPattern {
    StatementPattern::new(term(s), term(p), term(o))
}

pub fn graph_pattern(s: &str, p: &str, o: &str, c: &str) -> StatementPattern {
    pattern(s, p, o).with_context(term(c))
}

pub fn quad(s: &str, p: &str, o: &str) -> Quad {
    Quad::new(iri(s), iri(p), iri(o))
}

/// Rows rendered and sorted, for order-insensitive comparison
pub fn render(rows: &[BindingSet]) -> Vec<String> {
    let mut rendered: Vec<String> = rows.iter().map(|row| row.to_string()).collect();
    rendered.sort();
    rendered
}

/// Outcome of one evaluation
pub struct Evaluation {
    pub rows: Vec<BindingSet>,
    pub algorithm: Option<JoinStrategy>,
}

/// Test fixture with an isolated store
pub struct TestFixture {
    store: QuadStore,
    _temp_dir: Option<TempDir>,
}

impl TestFixture {
    /// In-memory store with the default indexes
    pub fn memory() -> Result<Self, Box<dyn std::error::Error>> {
        Self::memory_with_indexes(&["spoc", "posc", "ospc", "cspo"])
    }

    pub fn memory_with_indexes(indexes: &[&str]) -> Result<Self, Box<dyn std::error::Error>> {
        init_logging();
        let store = QuadStore::open("", StoreConfig::memory().with_indexes(indexes))?;
        Ok(Self {
            store,
            _temp_dir: None,
        })
    }

    /// Sled store in a fresh temp dir
    pub fn sled() -> Result<Self, Box<dyn std::error::Error>> {
        init_logging();
        let temp_dir = tempfile::tempdir()?;
        let store = QuadStore::open(temp_dir.path().join("quadlite_test"), StoreConfig::default())?;
        Ok(Self {
            store,
            _temp_dir: Some(temp_dir),
        })
    }

    /// Sled store at `path`, which outlives the fixture
    pub fn sled_at(path: &Path, config: StoreConfig) -> Result<Self, Box<dyn std::error::Error>> {
        init_logging();
        let config = StoreConfig {
            storage_type: StorageType::Sled,
            ..config
        };
        Ok(Self {
            store: QuadStore::open(path, config)?,
            _temp_dir: None,
        })
    }

    pub fn store(&self) -> &QuadStore {
        &self.store
    }

    pub fn load(&self, quads: &[Quad]) -> &Self {
        self.store.add_all(quads).expect("Failed to load quads");
        self
    }

    /// Compile `tree` under `config` and evaluate it against a snapshot
    pub fn evaluate(&self, tree: &JoinTree, config: JoinConfig, initial: &BindingSet) -> Evaluation {
        let context = QueryEvaluationContext::new(self.store.snapshot());
        evaluate_in(&context, tree, config, initial)
    }

    pub fn rows(&self, tree: &JoinTree) -> Vec<BindingSet> {
        self.evaluate(tree, JoinConfig::default(), &BindingSet::new()).rows
    }
}

/// Compile and evaluate `tree` in an explicit context
pub fn evaluate_in(
    context: &QueryEvaluationContext,
    tree: &JoinTree,
    config: JoinConfig,
    initial: &BindingSet,
) -> Evaluation {
    let step = compile(tree, &SchemaContext::new(config)).expect("Failed to compile join tree");
    let rows = step
        .evaluate(context, initial)
        .expect("Failed to evaluate join")
        .collect::<ExecResult<Vec<_>>>()
        .expect("Failed to read rows");
    Evaluation {
        rows,
        algorithm: step.last_algorithm(),
    }
}
