use pyblocks::block::kind::{InputSpec, KindSpec, Shape};
use pyblocks::render::{Fill, select_fill};
use pyblocks::types::{Column, TypeTag, TypeVecs};
use pyblocks::unify::{Verdict, accepts, compare, narrow};
use pyblocks::block::hooks::NumberLiteral;
use pyblocks::{BlockId, Catalog, EditorError, EditorSession};

fn tag(s: &str) -> TypeTag {
    s.parse().unwrap()
}

fn vecs(table: &[&[&str]]) -> TypeVecs {
    TypeVecs::parse(table).unwrap()
}

/// A statement with one value hole admitting exactly `hole`.
fn sink(name: &str, hole: &str) -> KindSpec {
    KindSpec {
        name: name.to_string(),
        shape: Shape::Statement,
        colour: 0,
        inputs: vec![InputSpec::value("X", "")],
        types: vec![vec![hole.to_string(), "none".to_string()]],
        python: "use({X})".to_string(),
        precedence: 99,
        imports: Vec::new(),
    }
}

fn session() -> EditorSession {
    let mut catalog = Catalog::python();
    catalog.register(sink("int_sink", "int")).unwrap();
    catalog.register(sink("int_list_sink", "*int")).unwrap();
    EditorSession::new(catalog)
}

fn number(session: &mut EditorSession, text: &str) -> BlockId {
    let id = session.create_block("math_number").unwrap();
    session.set_field(id, "NUM", text).unwrap();
    id
}

fn types(session: &EditorSession, id: BlockId) -> TypeVecs {
    session.block(id).unwrap().type_vecs.clone()
}

#[test]
fn compare_rules_in_order() {
    assert_eq!(compare(&tag("int"), &tag("int")), Verdict::Keep);
    assert_eq!(compare(&tag("*int"), &tag("*int")), Verdict::Keep);
    assert_eq!(compare(&tag("int"), &tag("any")), Verdict::Keep);
    assert_eq!(compare(&tag("*int"), &tag("*any")), Verdict::Keep);
    assert_eq!(compare(&tag("matching"), &tag("int")), Verdict::Bind("int".to_string()));
    assert_eq!(compare(&tag("*matching"), &tag("*str")), Verdict::Bind("str".to_string()));
    assert_eq!(compare(&tag("any"), &tag("float")), Verdict::Keep);
    assert_eq!(compare(&tag("*any"), &tag("*float")), Verdict::Keep);
    assert_eq!(compare(&tag("int"), &tag("float")), Verdict::Reject);
}

#[test]
fn compare_never_crosses_list_ness() {
    for (this, other) in [
        ("*matching", "int"),
        ("matching", "*int"),
        ("*any", "int"),
        ("any", "*int"),
        ("int", "*any"),
        ("*int", "any"),
        ("*matching", "matching"),
    ] {
        assert_eq!(compare(&tag(this), &tag(other)), Verdict::Reject, "{} vs {}", this, other);
    }
}

#[test]
fn none_only_matches_none() {
    assert_eq!(compare(&tag("none"), &tag("none")), Verdict::Keep);
    assert_eq!(compare(&tag("none"), &tag("any")), Verdict::Reject);
    assert_eq!(compare(&tag("any"), &tag("none")), Verdict::Reject);
    assert_eq!(compare(&tag("matching"), &tag("none")), Verdict::Reject);
}

#[test]
fn unbound_matching_on_the_other_side_constrains_nothing() {
    assert_eq!(compare(&tag("int"), &tag("matching")), Verdict::Keep);
    assert_eq!(compare(&tag("*str"), &tag("*matching")), Verdict::Keep);
}

#[test]
fn narrow_binds_and_deduplicates() {
    let compare_block = vecs(&[&["matching", "matching", "bool"]]);
    let int_literal = vecs(&[&["int"]]);
    let narrowed = narrow(&compare_block, Column::Slot(0), &int_literal, Column::Output);
    assert_eq!(narrowed, vecs(&[&["int", "int", "bool"]]));

    let numeric = vecs(&[&["int", "int", "int"], &["float", "float", "float"]]);
    let anything = vecs(&[&["any", "none"], &["any", "none"]]);
    assert_eq!(narrow(&numeric, Column::Output, &anything, Column::Slot(0)), numeric);
}

#[test]
fn narrowing_against_an_empty_neighbour_empties() {
    let numeric = vecs(&[&["int", "int", "int"]]);
    let narrowed = narrow(&numeric, Column::Output, &TypeVecs::empty(1), Column::Slot(0));
    assert!(narrowed.is_empty());
    assert_eq!(narrowed.slot_count(), 2);
}

#[test]
fn accepts_checks_one_direction() {
    assert!(accepts(&[tag("int"), tag("float")], &[tag("float")]));
    assert!(accepts(&[tag("any")], &[tag("str")]));
    assert!(!accepts(&[tag("int")], &[tag("str"), tag("*int")]));
    assert!(!accepts(&[], &[tag("int")]));
}

#[test]
fn sum_under_an_int_hole_narrows_to_int() {
    let mut s = session();
    let hole = s.create_block("int_sink").unwrap();
    let add = s.create_block("math_add").unwrap();
    s.attach_value(add, hole, "X").unwrap();

    assert_eq!(types(&s, add), vecs(&[&["int", "int", "int"]]));
}

#[test]
fn conflicting_matching_arguments_leave_nothing() {
    let mut s = session();
    let eq = s.create_block("logic_compare").unwrap();
    let left = number(&mut s, "1");
    let right = number(&mut s, "1.5");

    s.attach_value(left, eq, "A").unwrap();
    assert_eq!(types(&s, eq), vecs(&[&["int", "int", "bool"]]));
    assert!(!s.legal_drop_into(right, eq, "B"));

    s.attach_value(right, eq, "B").unwrap();
    assert!(types(&s, eq).is_empty());
    assert!(s.output_types(eq).is_empty());
}

#[test]
fn empty_list_literal_takes_the_hole_type() {
    let mut s = session();
    let hole = s.create_block("int_list_sink").unwrap();
    let list = s.create_block("lists_create_empty").unwrap();
    assert!(s.legal_drop_into(list, hole, "X"));
    s.attach_value(list, hole, "X").unwrap();

    assert_eq!(types(&s, list), vecs(&[&["*int"]]));
}

#[test]
fn list_literal_is_not_accepted_by_a_scalar_hole() {
    let mut s = session();
    let hole = s.create_block("int_sink").unwrap();
    let list = s.create_block("lists_create_empty").unwrap();
    assert!(!s.legal_drop_into(list, hole, "X"));
}

#[test]
fn detaching_restores_the_state_without_the_child() {
    let mut s = session();
    let eq = s.create_block("logic_compare").unwrap();
    let left = number(&mut s, "1");
    let right = s.create_block("text").unwrap();
    s.attach_value(left, eq, "A").unwrap();
    s.attach_value(right, eq, "B").unwrap();
    assert!(types(&s, eq).is_empty());
    assert!(types(&s, left).is_empty());

    s.detach(right).unwrap();

    let mut fresh = session();
    let fresh_eq = fresh.create_block("logic_compare").unwrap();
    let fresh_left = number(&mut fresh, "1");
    fresh.attach_value(fresh_left, fresh_eq, "A").unwrap();

    assert_eq!(types(&s, eq), types(&fresh, fresh_eq));
    assert_eq!(types(&s, left), types(&fresh, fresh_left));
    assert_eq!(types(&s, right), vecs(&[&["str"]]));
}

#[test]
fn siblings_constrain_each_other_through_their_parent() {
    let mut s = session();
    let print = s.create_block("text_print").unwrap();
    let eq = s.create_block("logic_compare").unwrap();
    let var = s.create_block("variables_get").unwrap();
    let text = s.create_block("text").unwrap();
    s.attach_value(eq, print, "TEXT").unwrap();
    s.attach_value(var, eq, "A").unwrap();
    s.attach_value(text, eq, "B").unwrap();

    assert_eq!(types(&s, eq), vecs(&[&["str", "str", "bool"]]));
    assert_eq!(s.input_types(eq, 0), vec![tag("str")]);
    assert_eq!(types(&s, var), vecs(&[&["any"]]));
}

#[test]
fn unsatisfiable_blocks_render_as_such() {
    let mut s = session();
    let join = s.create_block("text_join").unwrap();
    let n = number(&mut s, "3");
    s.attach_value(n, join, "B").unwrap();

    assert!(s.output_types(join).is_empty());
    let block = s.block(join).unwrap();
    assert_eq!(select_fill(block).fill, Fill::Unsatisfiable);
}

#[test]
fn editing_a_number_literal_redeclares_it() {
    let mut s = session();
    let add = s.create_block("math_add").unwrap();
    let n = number(&mut s, "2");
    s.attach_value(n, add, "A").unwrap();
    assert_eq!(types(&s, add), vecs(&[&["int", "int", "int"], &["int", "float", "float"]]));

    s.set_field(n, "NUM", "2.0").unwrap();
    assert_eq!(types(&s, n), vecs(&[&["float"]]));
    assert_eq!(
        types(&s, add),
        vecs(&[&["float", "int", "float"], &["float", "float", "float"]])
    );
}

#[test]
fn number_literals_only_take_finite_decimal_text() {
    assert_eq!(NumberLiteral::classify("42"), Some("int"));
    assert_eq!(NumberLiteral::classify("-7"), Some("int"));
    assert_eq!(NumberLiteral::classify("99999999999999999999"), Some("int"));
    assert_eq!(NumberLiteral::classify("2.5"), Some("float"));
    assert_eq!(NumberLiteral::classify("1e3"), Some("float"));
    assert_eq!(NumberLiteral::classify(".5"), Some("float"));
    for text in ["", "  ", "abc", "inf", "NaN", "1e999", "0x10", "__import__('os').system('x')"] {
        assert_eq!(NumberLiteral::classify(text), None, "{:?}", text);
    }
}

#[test]
fn refused_number_text_leaves_the_block_unchanged() {
    let mut s = session();
    let add = s.create_block("math_add").unwrap();
    let n = number(&mut s, "2");
    s.attach_value(n, add, "A").unwrap();
    let before = (types(&s, n), types(&s, add));

    for text in ["abc", "", "__import__('os').system('x')"] {
        assert_eq!(
            s.set_field(n, "NUM", text),
            Err(EditorError::InvalidFieldValue {
                block: n,
                field: "NUM".to_string(),
                value: text.to_string(),
            })
        );
        assert_eq!(s.block(n).unwrap().field("NUM"), Some("2"));
        assert_eq!((types(&s, n), types(&s, add)), before);
    }
}

#[test]
fn passes_can_be_run_by_hand_and_settle() {
    let mut s = session();
    s.defer_resync();
    let sink = s.create_block("int_sink").unwrap();
    let add = s.create_block("math_add").unwrap();
    let n = number(&mut s, "2");
    s.attach_value(add, sink, "X").unwrap();
    s.attach_value(n, add, "A").unwrap();
    assert_eq!(types(&s, add).len(), 4);

    assert!(s.unify_up(n));
    assert_eq!(types(&s, add), vecs(&[&["int", "int", "int"], &["int", "float", "float"]]));
    assert!(!s.unify_up(n));

    assert!(s.unify_down(sink));
    assert_eq!(types(&s, add), vecs(&[&["int", "int", "int"]]));
    assert!(!s.unify_down(sink));

    s.resume_resync();
    assert_eq!(types(&s, add), vecs(&[&["int", "int", "int"]]));
    assert_eq!(types(&s, n), vecs(&[&["int"]]));
}

#[test]
fn passes_after_a_resync_change_nothing() {
    let mut s = session();
    let join = s.create_block("text_join").unwrap();
    let text = s.create_block("text").unwrap();
    let n = number(&mut s, "3");
    s.attach_value(text, join, "A").unwrap();
    s.attach_value(n, join, "B").unwrap();
    let settled: Vec<TypeVecs> = [join, text, n].iter().map(|b| types(&s, *b)).collect();

    for _ in 0..2 {
        assert!(!s.unify_down(join));
        assert!(!s.unify_up(n));
        assert!(!s.unify_up(text));
    }
    assert!(!s.narrow_child(n));
    assert!(!s.narrow_parent(n));
    let after: Vec<TypeVecs> = [join, text, n].iter().map(|b| types(&s, *b)).collect();
    assert_eq!(after, settled);
}

fn converges(parent: &[&[&str]], child: &[&[&str]]) {
    let (parent, child) = (vecs(parent), vecs(child));

    let p1 = narrow(&parent, Column::Slot(0), &child, Column::Output);
    let c1 = narrow(&child, Column::Output, &p1, Column::Slot(0));

    let c2 = narrow(&child, Column::Output, &parent, Column::Slot(0));
    let p2 = narrow(&parent, Column::Slot(0), &c2, Column::Output);

    assert_eq!(p1, p2, "parent of {}", child);
    assert_eq!(c1, c2, "child under {}", parent);
}

#[test]
fn a_lone_pair_converges_in_either_order() {
    converges(
        &[
            &["int", "int", "int"],
            &["int", "float", "float"],
            &["float", "int", "float"],
            &["float", "float", "float"],
        ],
        &[&["int"], &["float"]],
    );
    converges(&[&["matching", "matching", "bool"]], &[&["int"]]);
    converges(
        &[&["*matching", "int", "matching"], &["str", "int", "str"]],
        &[&["*str"]],
    );
    converges(&[&["any", "none"], &["*any", "none"]], &[&["*matching"]]);
}
