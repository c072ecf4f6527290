//! Property tests for narrowing.
//!
//! 1. Narrowing twice against the same neighbour changes nothing the second time.
//! 2. Narrowing only keeps or binds existing vectors; it never invents one.
//! 3. Scalars and lists never meet.
//! 4. Binding removes every `matching`.
//! 5. Detaching a child restores the parent's declared set.

use std::collections::BTreeSet;

use proptest::prelude::*;
use pyblocks::types::{Column, TypeTag, TypeVecs, TypeVector};
use pyblocks::unify::{Verdict, compare, narrow};
use pyblocks::{Catalog, EditorSession};

const TAGS: &[&str] = &[
    "int", "float", "str", "bool", "any", "matching", "none", "*int", "*str", "*any", "*matching",
];

const NAMES: &[&str] = &["int", "float", "str", "bool"];

fn arb_tag() -> impl Strategy<Value = TypeTag> {
    prop::sample::select(TAGS).prop_map(|t| t.parse::<TypeTag>().unwrap())
}

fn arb_vector(slots: usize) -> impl Strategy<Value = TypeVector> {
    prop::collection::vec(arb_tag(), slots + 1).prop_map(|tags| TypeVector::new(tags).unwrap())
}

fn arb_vecs(slots: usize) -> impl Strategy<Value = TypeVecs> {
    prop::collection::vec(arb_vector(slots), 0..5).prop_map(move |vectors| {
        let mut set = TypeVecs::empty(slots);
        for v in vectors {
            set.insert(v);
        }
        set
    })
}

fn as_set(vecs: &TypeVecs) -> BTreeSet<TypeVector> {
    vecs.iter().cloned().collect()
}

proptest! {
    #[test]
    fn compare_is_reflexive(tag in arb_tag()) {
        prop_assert_eq!(compare(&tag, &tag), Verdict::Keep);
    }

    #[test]
    fn lists_and_scalars_never_meet(a in arb_tag(), b in arb_tag()) {
        if a.is_list() != b.is_list() {
            prop_assert_eq!(compare(&a, &b), Verdict::Reject);
        }
    }

    #[test]
    fn concrete_tags_only_keep_themselves(
        a in prop::sample::select(NAMES),
        b in prop::sample::select(NAMES),
    ) {
        let (ta, tb) = (TypeTag::named(a), TypeTag::named(b));
        prop_assert_eq!(compare(&ta, &tb) == Verdict::Keep, a == b);
    }

    #[test]
    fn narrowing_is_idempotent(parent in arb_vecs(2), child in arb_vecs(0), slot in 0usize..2) {
        let once = narrow(&parent, Column::Slot(slot), &child, Column::Output);
        let twice = narrow(&once, Column::Slot(slot), &child, Column::Output);
        prop_assert_eq!(as_set(&once), as_set(&twice));
        prop_assert_eq!(once.slot_count(), parent.slot_count());
    }

    #[test]
    fn narrowing_never_invents_vectors(parent in arb_vecs(1), child in arb_vecs(0)) {
        let narrowed = narrow(&parent, Column::Slot(0), &child, Column::Output);
        for u in &narrowed {
            let known = parent.iter().any(|v| {
                v == u || NAMES.iter().any(|name| v.bind_matching(name) == *u)
            });
            prop_assert!(known, "{} is not derived from {}", u, parent);
        }
    }

    #[test]
    fn empty_neighbours_empty_the_result(parent in arb_vecs(1)) {
        let narrowed = narrow(&parent, Column::Output, &TypeVecs::empty(1), Column::Slot(0));
        prop_assert!(narrowed.is_empty());
    }

    #[test]
    fn binding_removes_matching(vector in arb_vector(2), name in prop::sample::select(NAMES)) {
        let bound = vector.bind_matching(name);
        prop_assert!(!bound.has_matching());
        for (before, after) in vector.tags().iter().zip(bound.tags()) {
            prop_assert_eq!(before.is_list(), after.is_list());
        }
    }

    #[test]
    fn detaching_restores_the_declared_set(
        kind in prop::sample::select(&["math_add", "math_multiply", "math_divide", "logic_compare"][..]),
        text in "[0-9]{1,3}(\\.[0-9])?",
        input in prop::sample::select(&["A", "B"][..]),
    ) {
        let mut session = EditorSession::new(Catalog::python());
        let parent = session.create_block(kind).unwrap();
        let n = session.create_block("math_number").unwrap();
        session.set_field(n, "NUM", &text).unwrap();
        let declared = session.block(parent).unwrap().full_type_vecs.clone();

        session.attach_value(n, parent, input).unwrap();
        prop_assert!(session.block(parent).unwrap().type_vecs.len() <= declared.len());
        session.detach(n).unwrap();
        prop_assert_eq!(&session.block(parent).unwrap().type_vecs, &declared);
    }
}
