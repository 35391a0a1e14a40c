//! Behavior shared by every SessionStore backend.

use std::sync::Arc;

use dfg_core::printer::to_expression;
use dfg_core::{DialogContext, TypeRegistry};
use dfg_engine::{process_turn, ConstructOptions};
use dfg_storage::{InMemoryStore, SessionStore, SqliteStore, StorageError};

fn dialog(turns: &[&str]) -> DialogContext {
    let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
    for text in turns {
        process_turn(&mut ctx, text, &ConstructOptions::default()).unwrap();
    }
    ctx
}

fn backends() -> Vec<(&'static str, Box<dyn SessionStore>)> {
    vec![
        ("memory", Box::new(InMemoryStore::new())),
        ("sqlite", Box::new(SqliteStore::in_memory().unwrap())),
    ]
}

#[test]
fn saved_context_resumes_dialog() {
    for (backend, mut store) in backends() {
        let ctx = dialog(&["{x}AND(yes, no)", "NOT($x)"]);
        let id = store.create_session("demo").unwrap();
        store.save_context(id, &ctx).unwrap();

        let mut resumed = store.load_context(id, ctx.registry().clone()).unwrap();
        assert_eq!(resumed.state().nodes, ctx.state().nodes, "{backend}");
        assert_eq!(resumed.goals(), ctx.goals(), "{backend}");
        assert_eq!(resumed.lookup("x"), ctx.lookup("x"), "{backend}");

        let outcome = process_turn(&mut resumed, "OR($x, yes)", &ConstructOptions::default()).unwrap();
        assert!(outcome.ok, "{backend}");
        assert_eq!(resumed.turn_num(), 3, "{backend}");
        let x = resumed.lookup("x").unwrap();
        assert_eq!(resumed.node(outcome.goal).unwrap().input("pos1"), Some(x), "{backend}");
        assert!(to_expression(&resumed, outcome.goal).starts_with("OR({x}AND("), "{backend}");
    }
}

#[test]
fn saving_again_replaces_the_snapshot() {
    for (backend, mut store) in backends() {
        let id = store.create_session("s").unwrap();
        store.save_context(id, &dialog(&["NOT(yes)"])).unwrap();
        store.save_context(id, &dialog(&["NOT(yes)", "NOT(no)", "AND(yes)"])).unwrap();

        let listed = store.list_sessions().unwrap();
        assert_eq!(listed.len(), 1, "{backend}");
        assert_eq!(listed[0].name, "s", "{backend}");
        assert_eq!(listed[0].turn_num, 3, "{backend}");
        assert!(listed[0].digest.is_some(), "{backend}");
        assert_eq!(store.load_snapshot(id).unwrap().goals.len(), 3, "{backend}");
    }
}

#[test]
fn missing_sessions_and_snapshots_are_errors() {
    for (backend, mut store) in backends() {
        let id = store.create_session("empty").unwrap();
        assert!(
            matches!(store.load_snapshot(id), Err(StorageError::EmptySession(_))),
            "{backend}"
        );
        store.delete_session(id).unwrap();
        assert!(
            matches!(store.load_snapshot(id), Err(StorageError::SessionNotFound(_))),
            "{backend}"
        );
        assert!(
            matches!(
                store.save_context(id, &dialog(&[])),
                Err(StorageError::SessionNotFound(_))
            ),
            "{backend}"
        );
    }
}

#[test]
fn digests_match_across_backends() {
    let ctx = dialog(&["AND(yes, NOT(no))"]);
    let digests: Vec<String> = backends()
        .into_iter()
        .map(|(_, mut store)| {
            let id = store.create_session("d").unwrap();
            store.save_context(id, &ctx).unwrap();
            store.list_sessions().unwrap()[0].digest.clone().unwrap()
        })
        .collect();
    assert_eq!(digests[0], digests[1]);
    let expected = dfg_storage::snapshot_digest(&dfg_storage::dump_context(&ctx)).unwrap();
    assert_eq!(digests[0], expected.to_hex().to_string());
}
