use pyblocks::types::{BaseType, Column, TypeError, TypeTag, TypeVecs, TypeVector};

fn tag(s: &str) -> TypeTag {
    s.parse().unwrap()
}

#[test]
fn tags_parse_and_print_the_dsl() {
    for text in ["int", "*int", "any", "*any", "matching", "*matching", "none", "turtle"] {
        assert_eq!(tag(text).to_string(), text);
    }
    assert_eq!(tag("*str"), TypeTag::list_of("str"));
    assert_eq!(tag(" matching "), TypeTag::matching());
    assert_eq!(tag("*matching").base(), &BaseType::Matching);
    assert!(tag("*matching").is_list());
}

#[test]
fn malformed_tags_are_rejected() {
    assert_eq!("".parse::<TypeTag>(), Err(TypeError::EmptyTag));
    assert_eq!("*".parse::<TypeTag>(), Err(TypeError::EmptyTag));
    assert_eq!(
        "**int".parse::<TypeTag>(),
        Err(TypeError::NestedList("**int".to_string()))
    );
    assert_eq!("*none".parse::<TypeTag>(), Err(TypeError::ListOfNone));
    assert_eq!(
        "list[int]".parse::<TypeTag>(),
        Err(TypeError::InvalidTag("list[int]".to_string()))
    );
}

#[test]
fn none_has_no_list_form() {
    assert_eq!(TypeTag::none().as_list(), None);
    assert_eq!(TypeTag::named("int").as_list(), Some(TypeTag::list_of("int")));
    assert_eq!(TypeTag::list_of("int").as_list(), None);
    assert_eq!(TypeTag::list_of("int").element(), TypeTag::named("int"));
}

#[test]
fn vectors_split_slots_from_the_output() {
    let v = TypeVector::parse(&["*matching", "int", "matching"]).unwrap();
    assert_eq!(v.slot_count(), 2);
    assert_eq!(v.column(Column::Slot(0)), Some(&tag("*matching")));
    assert_eq!(v.column(Column::Slot(1)), Some(&tag("int")));
    assert_eq!(v.column(Column::Slot(2)), None);
    assert_eq!(v.column(Column::Output), Some(&tag("matching")));
    assert_eq!(v.to_string(), "(*matching, int) -> matching");
}

#[test]
fn binding_matching_is_vector_wide() {
    let v = TypeVector::parse(&["*matching", "int", "matching"]).unwrap();
    let bound = v.bind_matching("str");
    assert_eq!(bound, TypeVector::parse(&["*str", "int", "str"]).unwrap());
    assert!(!bound.has_matching());
}

#[test]
fn empty_vectors_and_tables_are_rejected() {
    let empty: [&str; 0] = [];
    assert_eq!(TypeVector::parse(&empty), Err(TypeError::EmptyVector));
    let table: [[&str; 1]; 0] = [];
    assert_eq!(TypeVecs::parse(&table), Err(TypeError::EmptyTable));
}

#[test]
fn tables_must_share_one_arity() {
    let err = TypeVecs::parse(&[vec!["int", "int"], vec!["int", "int", "int"]]).unwrap_err();
    assert_eq!(
        err,
        TypeError::ArityMismatch {
            expected: 1,
            got: 2,
            vector: 1
        }
    );
}

#[test]
fn sets_deduplicate_structurally() {
    let set = TypeVecs::parse(&[["int", "int"], ["int", "int"], ["float", "float"]]).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.slot_count(), 1);
    assert_eq!(set.to_string(), "{(int) -> int; (float) -> float}");
}

#[test]
fn column_queries() {
    let set = TypeVecs::parse(&[
        ["*matching", "int", "matching"],
        ["str", "int", "str"],
        ["*int", "int", "int"],
    ])
    .unwrap();
    assert_eq!(
        set.input_types(0),
        vec![tag("*matching"), tag("str"), tag("*int")]
    );
    assert_eq!(set.input_types(1), vec![tag("int")]);

    let split = set.input_types_split(0);
    assert_eq!(split.basic, vec![tag("str")]);
    assert_eq!(split.list, vec![tag("*matching"), tag("*int")]);

    assert_eq!(set.output_types(), vec![tag("matching"), tag("str"), tag("int")]);
    let names: Vec<String> = set.concrete_output_tags().into_iter().collect();
    assert_eq!(names, vec!["int".to_string(), "str".to_string()]);
    let mixed = TypeVecs::parse(&[["int"], ["*int"], ["*matching"]]).unwrap();
    let tags: Vec<String> = mixed.concrete_output_tags().into_iter().collect();
    assert_eq!(tags, vec!["*int".to_string(), "int".to_string()]);
}

#[test]
fn an_emptied_set_keeps_its_slot_count() {
    let set = TypeVecs::empty(2);
    assert!(set.is_empty());
    assert_eq!(set.slot_count(), 2);
    assert!(set.input_types(1).is_empty());
    assert_eq!(set.to_string(), "{}");
}
