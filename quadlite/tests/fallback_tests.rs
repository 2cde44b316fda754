//! Fallback evaluation tests
//!
//! Cases where the id path must not run: uncommitted transaction writes,
//! stores refusing to create ids, and datasets supplied through the
//! thread-local shim.

#[path = "testutils/mod.rs"]
mod testutils;

use quadlite::{
    compile, with_current_dataset, BindingSet, ConstantIdPolicy, ExecutionError, JoinConfig,
    JoinStrategy, JoinTree, QueryEvaluationContext, SchemaContext, StoreConfig,
    TransactionStatus,
};
use testutils::test_fixture::{evaluate_in, iri, pattern, quad, render, TestFixture};

fn knows_name() -> JoinTree {
    JoinTree::join(
        JoinTree::pattern(pattern("?x", "ex:knows", "?y")),
        JoinTree::pattern(pattern("?y", "ex:name", "?n")),
    )
}

fn fixture() -> TestFixture {
    let fixture = TestFixture::memory().expect("Failed to create test fixture");
    fixture.load(&[
        quad("ex:alice", "ex:knows", "ex:bob"),
        quad("ex:bob", "ex:name", "ex:BobName"),
    ]);
    fixture
}

#[test]
fn test_uncommitted_writes_use_fallback() {
    let fixture = fixture();
    let txn = fixture.store().begin().expect("Failed to begin transaction");
    txn.add(&quad("ex:alice", "ex:knows", "ex:carol")).unwrap();
    txn.add(&quad("ex:carol", "ex:name", "ex:CarolName")).unwrap();
    txn.remove(&quad("ex:bob", "ex:name", "ex:BobName")).unwrap();

    let context = QueryEvaluationContext::new(txn.dataset());
    let result = evaluate_in(&context, &knows_name(), JoinConfig::default(), &BindingSet::new());
    assert_eq!(result.algorithm, Some(JoinStrategy::Fallback));
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get("n"), Some(&iri("ex:CarolName")));

    // The committed snapshot does not see the transaction.
    let committed = fixture.evaluate(&knows_name(), JoinConfig::default(), &BindingSet::new());
    assert_eq!(committed.algorithm, Some(JoinStrategy::NestedLoop));
    assert_eq!(committed.rows.len(), 1);
    assert_eq!(committed.rows[0].get("n"), Some(&iri("ex:BobName")));

    assert_eq!(txn.commit().unwrap(), 3);
    assert_eq!(txn.status(), TransactionStatus::Committed);

    let after = evaluate_in(&context, &knows_name(), JoinConfig::default(), &BindingSet::new());
    assert_eq!(after.algorithm, Some(JoinStrategy::NestedLoop));
    assert_eq!(render(&after.rows), render(&result.rows));
}

#[test]
fn test_uncommitted_insert_is_joined() {
    let fixture = TestFixture::memory().expect("Failed to create test fixture");
    fixture.load(&[quad("ex:a", "ex:p", "ex:b")]);
    let txn = fixture.store().begin().expect("Failed to begin transaction");
    txn.add(&quad("ex:b", "ex:q", "ex:c")).unwrap();

    let tree = JoinTree::join(
        JoinTree::pattern(pattern("?x", "ex:p", "?y")),
        JoinTree::pattern(pattern("?y", "ex:q", "?z")),
    );
    let context = QueryEvaluationContext::new(txn.dataset());
    let result = evaluate_in(&context, &tree, JoinConfig::default(), &BindingSet::new());
    assert_eq!(result.algorithm, Some(JoinStrategy::Fallback));
    assert_eq!(result.rows.len(), 1);
    let row = &result.rows[0];
    assert_eq!(row.get("x"), Some(&iri("ex:a")));
    assert_eq!(row.get("y"), Some(&iri("ex:b")));
    assert_eq!(row.get("z"), Some(&iri("ex:c")));
}

#[test]
fn test_rolled_back_writes_disappear() {
    let fixture = fixture();
    let txn = fixture.store().begin().expect("Failed to begin transaction");
    txn.add(&quad("ex:alice", "ex:knows", "ex:carol")).unwrap();
    txn.rollback().unwrap();
    assert_eq!(txn.status(), TransactionStatus::RolledBack);
    assert_eq!(fixture.rows(&knows_name()).len(), 1);
}

#[test]
fn test_read_only_store_falls_back_when_creation_is_refused() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("readonly_db");
    {
        let writer = TestFixture::sled_at(&path, StoreConfig::default())
            .expect("Failed to create writable store");
        writer.load(&[
            quad("ex:alice", "ex:knows", "ex:bob"),
            quad("ex:bob", "ex:name", "ex:BobName"),
        ]);
        writer.store().flush().expect("Failed to flush store");
    }

    let reader = TestFixture::sled_at(&path, StoreConfig::default().with_read_only(true))
        .expect("Failed to reopen store read-only");
    let config = JoinConfig {
        constant_ids: ConstantIdPolicy::OnDemand,
        ..JoinConfig::default()
    };

    let known = reader.evaluate(&knows_name(), config.clone(), &BindingSet::new());
    assert_eq!(known.algorithm, Some(JoinStrategy::NestedLoop));
    assert_eq!(known.rows.len(), 1);

    let unknown = JoinTree::join(
        JoinTree::pattern(pattern("?x", "ex:likes", "?y")),
        JoinTree::pattern(pattern("?y", "ex:name", "?n")),
    );
    let refused = reader.evaluate(&unknown, config, &BindingSet::new());
    assert_eq!(refused.algorithm, Some(JoinStrategy::Fallback));
    assert!(refused.rows.is_empty());
    assert!(reader.store().begin().is_err());
}

#[test]
#[serial_test::serial]
fn test_thread_local_dataset() {
    let fixture = fixture();
    let step = compile(&knows_name(), &SchemaContext::default()).unwrap();

    let missing = step.evaluate(&QueryEvaluationContext::empty(), &BindingSet::new());
    assert!(matches!(missing, Err(ExecutionError::NoDataset)));

    let rows = with_current_dataset(fixture.store().snapshot(), || {
        evaluate_in(
            &QueryEvaluationContext::empty(),
            &knows_name(),
            JoinConfig::default(),
            &BindingSet::new(),
        )
        .rows
    });
    assert_eq!(rows.len(), 1);

    // Restored afterwards.
    let missing = step.evaluate(&QueryEvaluationContext::empty(), &BindingSet::new());
    assert!(matches!(missing, Err(ExecutionError::NoDataset)));
}

#[test]
#[serial_test::serial]
fn test_explicit_context_wins_over_thread_local() {
    let fixture = fixture();
    let other = TestFixture::memory().expect("Failed to create test fixture");
    let rows = with_current_dataset(other.store().snapshot(), || {
        evaluate_in(
            &QueryEvaluationContext::new(fixture.store().snapshot()),
            &knows_name(),
            JoinConfig::default(),
            &BindingSet::new(),
        )
        .rows
    });
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_stream_closes_early() {
    let fixture = fixture();
    fixture.load(&[quad("ex:alice", "ex:knows", "ex:bob2"), quad("ex:bob2", "ex:name", "ex:B2")]);
    let step = compile(&knows_name(), &SchemaContext::default()).unwrap();
    let context = QueryEvaluationContext::new(fixture.store().snapshot());
    let mut stream = step.evaluate(&context, &BindingSet::new()).unwrap();
    assert!(stream.next().unwrap().is_ok());
    stream.close().unwrap();
    assert!(stream.is_closed());
    assert!(stream.next().is_none());
    stream.close().unwrap();
}
