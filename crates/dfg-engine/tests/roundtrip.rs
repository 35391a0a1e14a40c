mod common;

use common::{build, catalog, Catalog};
use dfg_core::matching::structurally_equal;
use dfg_core::printer::to_expression;
use proptest::prelude::*;

fn assert_roundtrip(cat: &Catalog, text: &str) {
    let mut first = cat.context();
    let root = build(&mut first, text);
    let printed = to_expression(&first, root);

    let mut second = cat.context();
    let reparsed = build(&mut second, &printed);
    assert!(
        structurally_equal(&first, root, &second, reparsed),
        "{text:?} printed as {printed:?} does not rebuild the same graph"
    );
    assert_eq!(to_expression(&second, reparsed), printed);
}

#[test]
fn printed_forms_rebuild_equal_graphs() {
    let cat = catalog();
    for text in [
        "Event(sync, DateTime(3), attendees=4)",
        "Event(\"team sync\", start=Tomorrow())",
        "AND({x}Event?(), $x, NOT(!refer($x)))",
        "revise(old=DateTime?(), new=DateTime(5))",
        ":size(refer(Event?(size=>= 3)))",
        "let((a, DateTime(2), b, Tomorrow()), Event(start=$a))",
        "OR(Event?(subject=~= lunch), Event?(start=DateTime?(<4)))",
        "Person(\"42\")",
        "List_Event(_)",
    ] {
        assert_roundtrip(&cat, text);
    }
}

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("yes".to_string()),
        Just("no".to_string()),
        Just("Event(sync)".to_string()),
        Just("Event(\"team sync\", size=3)".to_string()),
        Just("DateTime(4)".to_string()),
        Just("Event?(start=DateTime?())".to_string()),
        (-50i64..50).prop_map(|d| format!("DateTime({d})")),
        "[a-z]{1,6}".prop_map(|s| format!("Person({s})")),
    ]
}

fn expression() -> impl Strategy<Value = String> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|v| format!("AND({})", v.join(", "))),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|v| format!("OR({})", v.join(" | "))),
            inner.prop_map(|e| format!("NOT({e})")),
        ]
    })
}

proptest! {
    #[test]
    fn generated_expressions_roundtrip(body in expression()) {
        let cat = catalog();
        assert_roundtrip(&cat, &format!("AND({body})"));
    }
}
