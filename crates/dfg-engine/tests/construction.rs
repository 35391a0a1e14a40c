mod common;

use common::{build, catalog};
use dfg_core::printer::to_expression;
use dfg_core::{InputRef, Value};
use dfg_engine::{construct_graph, ConstructError, ConstructOptions};

#[test]
fn named_positional_and_alias_arguments() {
    let cat = catalog();
    let mut ctx = cat.context();
    let root = build(&mut ctx, "Event(sync, DateTime(3), attendees=4)");
    let event = ctx.node(root).unwrap();
    assert_eq!(event.inputs.keys().collect::<Vec<_>>(), ["subject", "start", "size"]);
    assert_eq!(ctx.input_data(root, "subject"), Some(&Value::Str("sync".into())));
    assert_eq!(ctx.input_data(root, "size"), Some(&Value::Int(4)));
    let start = event.input("start").unwrap();
    assert_eq!(ctx.input_data(start, "day"), Some(&Value::Int(3)));
    ctx.assert_consistency();
}

#[test]
fn unknown_parameter_is_semantic_error() {
    let cat = catalog();
    let mut ctx = cat.context();
    let err = construct_graph(&mut ctx, "Event(color=red)", &ConstructOptions::default()).unwrap_err();
    assert!(err.is_semantic());
    assert!(err.to_string().contains("color"), "{err}");
    assert_eq!(ctx.node_count(), 0);
}

#[test]
fn type_mismatch_fails_input_check() {
    let cat = catalog();
    let mut ctx = cat.context();
    let err = construct_graph(&mut ctx, "Event(start=Person(bob))", &ConstructOptions::default()).unwrap_err();
    match err {
        ConstructError::Semantic { message, .. } => {
            assert_eq!(message, "wrong type for Event.start: expected DateTime, got Person");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(ctx.node_count(), 0);
}

#[test]
fn missing_required_parameter_only_on_objects() {
    let cat = catalog();
    let mut ctx = cat.context();
    let err = construct_graph(&mut ctx, "Person()", &ConstructOptions::default()).unwrap_err();
    assert!(err.is_semantic());

    let constraint = build(&mut ctx, "Person?()");
    assert_eq!(ctx.node(constraint).unwrap().constraint_level, 1);
}

#[test]
fn computed_types_fit_their_output_type() {
    let cat = catalog();
    let mut ctx = cat.context();
    build(&mut ctx, "Event(start=Tomorrow())");
    build(&mut ctx, "Event(size=:day(Tomorrow()))");
}

#[test]
fn bindings_share_nodes() {
    let cat = catalog();
    let mut ctx = cat.context();
    let root = build(&mut ctx, "AND({d}DateTime(5), Event(start=$d))");
    let d = ctx.lookup("d").unwrap();
    let event = ctx.node(root).unwrap().input("pos2").unwrap();
    assert_eq!(ctx.node(event).unwrap().input("start"), Some(d));
    assert_eq!(ctx.node(d).unwrap().outputs.len(), 2);
}

#[test]
fn views_follow_parameter_defaults_and_markers() {
    let cat = catalog();
    let mut ctx = cat.context();
    let root = build(&mut ctx, "AND(refer(Event?()), !Tomorrow())");
    let and = ctx.node(root).unwrap();
    assert!(matches!(and.inputs["pos1"], InputRef::ViaResult(_)));
    assert!(matches!(and.inputs["pos2"], InputRef::Direct(_)));
    let refer = and.input("pos1").unwrap();
    assert!(matches!(ctx.node(refer).unwrap().inputs["constraint"], InputRef::Direct(_)));
}

#[test]
fn let_sugar_builds_sequence() {
    let cat = catalog();
    let mut ctx = cat.context();
    let root = build(&mut ctx, "let((x, DateTime(1)), Event(start=$x))");
    insta::assert_snapshot!(
        to_expression(&ctx, root),
        @"do(Let(x, {x}DateTime(1)), Event(start=$x))"
    );
}

#[test]
fn malformed_let_is_rejected() {
    let cat = catalog();
    let mut ctx = cat.context();
    for text in ["let((x), $x)", "let(x, 1)", "let((x, 1))"] {
        let err = construct_graph(&mut ctx, text, &ConstructOptions::default()).unwrap_err();
        assert!(err.is_semantic(), "{text}: {err}");
    }
}

#[test]
fn list_shorthand() {
    let cat = catalog();
    let mut ctx = cat.context();
    let root = build(&mut ctx, "List_Event(_)");
    insta::assert_snapshot!(to_expression(&ctx, root), @"List(Event?())");
}

#[test]
fn rejected_expression_leaves_context_unchanged() {
    let cat = catalog();
    let mut ctx = cat.context();
    build(&mut ctx, "{e}Event(sync)");
    let before = ctx.state().clone();
    for text in ["Event(sync", "Meeting()", "{z}Event(start=Person(x))", "$nothing"] {
        assert!(construct_graph(&mut ctx, text, &ConstructOptions::default()).is_err());
    }
    assert_eq!(ctx.node_count(), before.nodes.len());
    assert_eq!(ctx.bindings(), &before.assign);
    assert_eq!(ctx.state().next_id, before.next_id);
    ctx.assert_consistency();
}

#[test]
fn named_positional_arguments_keep_their_order() {
    let cat = catalog();
    let mut ctx = cat.context();
    build(&mut ctx, "Event(subject=sync, start=DateTime(2))");
    let before = ctx.node_count();
    let err = construct_graph(&mut ctx, "Event(start=DateTime(2), subject=sync)", &ConstructOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("positional parameters out of order"), "{err}");
    assert_eq!(ctx.node_count(), before);
}

#[test]
fn failed_construction_undoes_tags_on_existing_nodes() {
    let cat = catalog();
    let mut ctx = cat.context();
    build(&mut ctx, "{e}Event(sync)");
    let e = ctx.lookup("e").unwrap();
    let tags = ctx.node(e).unwrap().tags.clone();

    let err = construct_graph(&mut ctx, "AND(^hot $e, Meeting())", &ConstructOptions::default());
    assert!(err.is_err());
    assert_eq!(ctx.node(e).unwrap().tags, tags);

    build(&mut ctx, "AND(^hot $e)");
    assert_eq!(ctx.node(e).unwrap().tags.get("hot").map(String::as_str), Some(""));
}
