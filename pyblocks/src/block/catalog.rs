use std::collections::BTreeMap;
use std::rc::Rc;

use crate::block::hooks::{GrowingList, NumberLiteral};
use crate::block::kind::{BlockKind, CatalogError, InputSpec, KindHooks, KindSpec, NoHooks, Shape};

/// Operator precedence of generated Python, lower binds tighter.
pub mod order {
    pub const ATOMIC: u8 = 0;
    pub const MEMBER: u8 = 2;
    pub const EXPONENTIATION: u8 = 3;
    pub const UNARY_SIGN: u8 = 4;
    pub const MULTIPLICATIVE: u8 = 5;
    pub const ADDITIVE: u8 = 6;
    pub const RELATIONAL: u8 = 11;
    pub const LOGICAL_NOT: u8 = 12;
    pub const LOGICAL_AND: u8 = 13;
    pub const LOGICAL_OR: u8 = 14;
    pub const NONE: u8 = 99;
}

const LOGIC: u16 = 210;
const LOOPS: u16 = 120;
const MATH: u16 = 230;
const TEXT: u16 = 160;
const LISTS: u16 = 260;
const VARIABLES: u16 = 330;
const TURTLE: u16 = 30;

const NUMERIC: &[&[&str]] = &[
    &["int", "int", "int"],
    &["int", "float", "float"],
    &["float", "int", "float"],
    &["float", "float", "float"],
];

const DIVISION: &[&[&str]] = &[
    &["int", "int", "float"],
    &["int", "float", "float"],
    &["float", "int", "float"],
    &["float", "float", "float"],
];

/// Registry of block kinds, indexed by name.
#[derive(Debug, Default)]
pub struct Catalog {
    kinds: BTreeMap<String, Rc<BlockKind>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn get(&self, name: &str) -> Option<Rc<BlockKind>> {
        self.kinds.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Register a custom kind without hooks.
    pub fn register(&mut self, spec: KindSpec) -> Result<Rc<BlockKind>, CatalogError> {
        self.register_with_hooks(spec, Rc::new(NoHooks))
    }

    pub fn register_with_hooks(
        &mut self,
        spec: KindSpec,
        hooks: Rc<dyn KindHooks>,
    ) -> Result<Rc<BlockKind>, CatalogError> {
        if self.kinds.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateKind(spec.name));
        }
        let kind = Rc::new(BlockKind::from_spec(spec, hooks)?);
        self.kinds.insert(kind.name.clone(), kind.clone());
        Ok(kind)
    }

    /// The built-in Python block set.
    pub fn python() -> Self {
        let mut catalog = Catalog::new();
        for (spec, hooks) in python_kinds() {
            let name = spec.name.clone();
            if let Err(e) = catalog.register_with_hooks(spec, hooks) {
                panic!("built-in block kind '{}' is malformed: {}", name, e);
            }
        }
        catalog
    }
}

fn spec(
    name: &str,
    shape: Shape,
    colour: u16,
    inputs: Vec<InputSpec>,
    types: &[&[&str]],
    python: &str,
    precedence: u8,
) -> KindSpec {
    KindSpec {
        name: name.to_string(),
        shape,
        colour,
        inputs,
        types: types
            .iter()
            .map(|row| row.iter().map(|t| t.to_string()).collect())
            .collect(),
        python: python.to_string(),
        precedence,
        imports: Vec::new(),
    }
}

fn binary(name: &str, colour: u16, op: &str, types: &[&[&str]], precedence: u8) -> KindSpec {
    spec(
        name,
        Shape::Expression,
        colour,
        vec![InputSpec::value("A", ""), InputSpec::value("B", op)],
        types,
        &format!("{{A}} {} {{B}}", op),
        precedence,
    )
}

fn python_kinds() -> Vec<(KindSpec, Rc<dyn KindHooks>)> {
    use Shape::{Expression, Statement};

    let plain: Rc<dyn KindHooks> = Rc::new(NoHooks);
    let mut kinds: Vec<(KindSpec, Rc<dyn KindHooks>)> = Vec::new();
    let mut add = |spec: KindSpec| kinds.push((spec, plain.clone()));

    // Literals
    add(spec(
        "text",
        Expression,
        TEXT,
        vec![InputSpec::dummy("", "").with_field("TEXT", "")],
        &[&["str"]],
        "{TEXT:repr}",
        order::ATOMIC,
    ));
    add(spec(
        "logic_boolean",
        Expression,
        LOGIC,
        vec![InputSpec::dummy("", "").with_field("BOOL", "True")],
        &[&["bool"]],
        "{BOOL}",
        order::ATOMIC,
    ));

    // Arithmetic
    add(binary("math_add", MATH, "+", NUMERIC, order::ADDITIVE));
    add(binary("math_subtract", MATH, "-", NUMERIC, order::ADDITIVE));
    add(binary("math_multiply", MATH, "*", NUMERIC, order::MULTIPLICATIVE));
    add(binary("math_divide", MATH, "/", DIVISION, order::MULTIPLICATIVE));
    add(binary("math_modulo", MATH, "%", NUMERIC, order::MULTIPLICATIVE));
    add(binary("math_power", MATH, "**", NUMERIC, order::EXPONENTIATION));
    add(spec(
        "math_negate",
        Expression,
        MATH,
        vec![InputSpec::value("NUM", "-")],
        &[&["int", "int"], &["float", "float"]],
        "-{NUM}",
        order::UNARY_SIGN,
    ));

    // Logic
    add(spec(
        "logic_compare",
        Expression,
        LOGIC,
        vec![
            InputSpec::value("A", ""),
            InputSpec::value("B", "").with_field("OP", "=="),
        ],
        &[&["matching", "matching", "bool"]],
        "{A} {OP} {B}",
        order::RELATIONAL,
    ));
    add(spec(
        "logic_operation",
        Expression,
        LOGIC,
        vec![
            InputSpec::value("A", ""),
            InputSpec::value("B", "").with_field("OP", "and"),
        ],
        &[&["bool", "bool", "bool"]],
        "{A} {OP} {B}",
        order::LOGICAL_OR,
    ));
    add(spec(
        "logic_negate",
        Expression,
        LOGIC,
        vec![InputSpec::value("BOOL", "not")],
        &[&["bool", "bool"]],
        "not {BOOL}",
        order::LOGICAL_NOT,
    ));

    // Text and conversions
    add(binary("text_join", TEXT, "+", &[&["str", "str", "str"]], order::ADDITIVE));
    add(spec(
        "text_length",
        Expression,
        TEXT,
        vec![InputSpec::value("VALUE", "len")],
        &[&["str", "int"], &["*any", "int"]],
        "len({VALUE})",
        order::MEMBER,
    ));
    add(spec(
        "text_input",
        Expression,
        TEXT,
        vec![InputSpec::value("PROMPT", "input")],
        &[&["str", "str"]],
        "input({PROMPT})",
        order::MEMBER,
    ));
    add(spec(
        "to_str",
        Expression,
        TEXT,
        vec![InputSpec::value("VALUE", "str")],
        &[&["any", "str"], &["*any", "str"]],
        "str({VALUE})",
        order::MEMBER,
    ));
    add(spec(
        "to_int",
        Expression,
        MATH,
        vec![InputSpec::value("VALUE", "int")],
        &[
            &["str", "int"],
            &["float", "int"],
            &["int", "int"],
            &["bool", "int"],
        ],
        "int({VALUE})",
        order::MEMBER,
    ));
    add(spec(
        "to_float",
        Expression,
        MATH,
        vec![InputSpec::value("VALUE", "float")],
        &[&["str", "float"], &["int", "float"], &["float", "float"]],
        "float({VALUE})",
        order::MEMBER,
    ));
    add(spec(
        "range",
        Expression,
        LOOPS,
        vec![InputSpec::value("STOP", "range")],
        &[&["int", "range"]],
        "range({STOP})",
        order::MEMBER,
    ));
    add(spec(
        "range_between",
        Expression,
        LOOPS,
        vec![InputSpec::value("START", "range"), InputSpec::value("STOP", ",")],
        &[&["int", "int", "range"]],
        "range({START}, {STOP})",
        order::MEMBER,
    ));

    // Lists
    add(spec(
        "lists_create_empty",
        Expression,
        LISTS,
        vec![InputSpec::dummy("", "[ ]")],
        &[&["*matching"]],
        "[]",
        order::ATOMIC,
    ));
    add(spec(
        "lists_get_index",
        Expression,
        LISTS,
        vec![InputSpec::value("LIST", ""), InputSpec::value("AT", "at")],
        &[&["*matching", "int", "matching"], &["str", "int", "str"]],
        "{LIST}[{AT}]",
        order::MEMBER,
    ));
    add(spec(
        "lists_append",
        Statement,
        LISTS,
        vec![InputSpec::value("LIST", "append to"), InputSpec::value("ITEM", "item")],
        &[&["*matching", "matching", "none"]],
        "{LIST}.append({ITEM})",
        order::NONE,
    ));

    // Variables and output
    add(spec(
        "variables_get",
        Expression,
        VARIABLES,
        vec![InputSpec::dummy("", "").with_variable("VAR", "x")],
        &[&["any"], &["*any"]],
        "{VAR}",
        order::ATOMIC,
    ));
    add(spec(
        "variables_set",
        Statement,
        VARIABLES,
        vec![InputSpec::value("VALUE", "set").with_variable("VAR", "x")],
        &[&["any", "none"], &["*any", "none"]],
        "{VAR} = {VALUE}",
        order::NONE,
    ));
    add(spec(
        "text_print",
        Statement,
        TEXT,
        vec![InputSpec::value("TEXT", "print")],
        &[&["any", "none"], &["*any", "none"]],
        "print({TEXT})",
        order::NONE,
    ));

    // Control flow
    add(spec(
        "controls_if",
        Statement,
        LOGIC,
        vec![
            InputSpec::value("COND", "if"),
            InputSpec::statement("DO", "do"),
        ],
        &[&["bool", "none"]],
        "if {COND}:\n{DO}",
        order::NONE,
    ));
    add(spec(
        "controls_ifelse",
        Statement,
        LOGIC,
        vec![
            InputSpec::value("COND", "if"),
            InputSpec::statement("DO", "do"),
            InputSpec::statement("ELSE", "else"),
        ],
        &[&["bool", "none"]],
        "if {COND}:\n{DO}\nelse:\n{ELSE}",
        order::NONE,
    ));
    add(spec(
        "controls_while",
        Statement,
        LOOPS,
        vec![
            InputSpec::value("COND", "while"),
            InputSpec::statement("DO", "do"),
        ],
        &[&["bool", "none"]],
        "while {COND}:\n{DO}",
        order::NONE,
    ));
    add(spec(
        "controls_for",
        Statement,
        LOOPS,
        vec![
            InputSpec::value("VAR", "for").requiring_variable(),
            InputSpec::value("ITER", "in"),
            InputSpec::statement("DO", "do"),
        ],
        &[
            &["int", "range", "none"],
            &["matching", "*matching", "none"],
            &["str", "str", "none"],
        ],
        "for {VAR} in {ITER}:\n{DO}",
        order::NONE,
    ));

    // Turtle graphics
    add(KindSpec {
        imports: vec!["turtle".to_string()],
        ..spec(
            "turtle_create",
            Expression,
            TURTLE,
            vec![InputSpec::dummy("", "new turtle")],
            &[&["turtle"]],
            "turtle.Turtle()",
            order::MEMBER,
        )
    });
    add(spec(
        "turtle_forward",
        Statement,
        TURTLE,
        vec![
            InputSpec::value("TURTLE", ""),
            InputSpec::value("DISTANCE", "forward"),
        ],
        &[&["turtle", "int", "none"], &["turtle", "float", "none"]],
        "{TURTLE}.forward({DISTANCE})",
        order::NONE,
    ));
    add(spec(
        "turtle_turn",
        Statement,
        TURTLE,
        vec![
            InputSpec::value("TURTLE", ""),
            InputSpec::value("ANGLE", "").with_field("DIR", "left"),
        ],
        &[&["turtle", "int", "none"], &["turtle", "float", "none"]],
        "{TURTLE}.{DIR}({ANGLE})",
        order::NONE,
    ));

    // Kinds with hooks
    kinds.push((
        spec(
            "math_number",
            Expression,
            MATH,
            vec![InputSpec::dummy("", "").with_field("NUM", "0")],
            &[&["int"], &["float"]],
            "{NUM}",
            order::ATOMIC,
        ),
        Rc::new(NumberLiteral),
    ));
    kinds.push((
        spec(
            "lists_create_with",
            Expression,
            LISTS,
            GrowingList::item_inputs(GrowingList::DEFAULT_ITEMS),
            &GrowingList::table(GrowingList::DEFAULT_ITEMS)
                .iter()
                .map(|row| row.as_slice())
                .collect::<Vec<_>>(),
            "[{...}]",
            order::ATOMIC,
        ),
        Rc::new(GrowingList),
    ));

    kinds
}
