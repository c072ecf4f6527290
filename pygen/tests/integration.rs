use pyblocks::block::catalog::order;
use pyblocks::block::kind::{InputSpec, KindSpec, Shape};
use pyblocks::{BlockId, Catalog, EditorSession};
use pygen::environment::{Environment, indent, repr, sanitize};
use pygen::template::{self, Segment};
use pygen::{GenError, generate, needs_parens};

fn session() -> EditorSession {
    EditorSession::new(Catalog::python())
}

fn number(s: &mut EditorSession, text: &str) -> BlockId {
    let n = s.create_block("math_number").unwrap();
    s.set_field(n, "NUM", text).unwrap();
    n
}

fn binary(s: &mut EditorSession, kind: &str, a: BlockId, b: BlockId) -> BlockId {
    let op = s.create_block(kind).unwrap();
    s.attach_value(a, op, "A").unwrap();
    s.attach_value(b, op, "B").unwrap();
    op
}

fn print(s: &mut EditorSession, value: BlockId) -> BlockId {
    let p = s.create_block("text_print").unwrap();
    s.attach_value(value, p, "TEXT").unwrap();
    p
}

fn code(s: &EditorSession) -> String {
    generate(s).unwrap().code
}

#[test]
fn empty_workspace_generates_nothing() {
    let output = generate(&session()).unwrap();
    assert_eq!(output.code, "");
    assert!(output.warnings.is_empty());
}

#[test]
fn parenthesises_by_precedence() {
    let mut s = session();
    let one = number(&mut s, "1");
    let two = number(&mut s, "2");
    let sum = binary(&mut s, "math_add", one, two);
    let three = number(&mut s, "3");
    let product = binary(&mut s, "math_multiply", sum, three);
    print(&mut s, product);
    assert_eq!(code(&s), "print((1 + 2) * 3)\n");
}

#[test]
fn right_operands_of_equal_precedence() {
    let mut s = session();
    let (a, b, c) = (number(&mut s, "5"), number(&mut s, "2"), number(&mut s, "1"));
    let inner = binary(&mut s, "math_subtract", b, c);
    binary(&mut s, "math_subtract", a, inner);
    assert_eq!(code(&s), "5 - (2 - 1)\n");

    let mut s = session();
    let (a, b, c) = (number(&mut s, "5"), number(&mut s, "2"), number(&mut s, "1"));
    let inner = binary(&mut s, "math_subtract", a, b);
    binary(&mut s, "math_subtract", inner, c);
    assert_eq!(code(&s), "5 - 2 - 1\n");
}

#[test]
fn power_is_right_associative() {
    let mut s = session();
    let (a, b, c) = (number(&mut s, "2"), number(&mut s, "3"), number(&mut s, "2"));
    let inner = binary(&mut s, "math_power", b, c);
    binary(&mut s, "math_power", a, inner);
    assert_eq!(code(&s), "2 ** 3 ** 2\n");

    let mut s = session();
    let (a, b, c) = (number(&mut s, "2"), number(&mut s, "3"), number(&mut s, "2"));
    let inner = binary(&mut s, "math_power", a, b);
    binary(&mut s, "math_power", inner, c);
    assert_eq!(code(&s), "(2 ** 3) ** 2\n");
}

#[test]
fn call_arguments_and_negation() {
    let mut s = session();
    let (a, b) = (number(&mut s, "1"), number(&mut s, "2"));
    let sum = binary(&mut s, "math_add", a, b);
    let neg = s.create_block("math_negate").unwrap();
    s.attach_value(sum, neg, "NUM").unwrap();
    let to_str = s.create_block("to_str").unwrap();
    s.attach_value(neg, to_str, "VALUE").unwrap();
    print(&mut s, to_str);
    assert_eq!(code(&s), "print(str(-(1 + 2)))\n");
}

#[test]
fn needs_parens_table() {
    assert!(needs_parens(order::MULTIPLICATIVE, order::ADDITIVE, false));
    assert!(!needs_parens(order::ADDITIVE, order::MULTIPLICATIVE, true));
    assert!(!needs_parens(order::ADDITIVE, order::ADDITIVE, false));
    assert!(needs_parens(order::ADDITIVE, order::ADDITIVE, true));
    assert!(needs_parens(order::EXPONENTIATION, order::EXPONENTIATION, false));
    assert!(!needs_parens(order::EXPONENTIATION, order::EXPONENTIATION, true));
    assert!(needs_parens(order::RELATIONAL, order::RELATIONAL, false));
    assert!(!needs_parens(order::MEMBER, order::MEMBER, true));
    assert!(!needs_parens(order::UNARY_SIGN, order::ATOMIC, true));
}

#[test]
fn empty_branches_become_pass() {
    let mut s = session();
    let branch = s.create_block("controls_ifelse").unwrap();
    let cond = s.create_block("logic_boolean").unwrap();
    s.attach_value(cond, branch, "COND").unwrap();
    let output = generate(&s).unwrap();
    assert_eq!(output.code, "if True:\n    pass\nelse:\n    pass\n");
    assert!(output.warnings.is_empty());
}

#[test]
fn empty_holes_become_none_with_warnings() {
    let mut s = session();
    let add = s.create_block("math_add").unwrap();
    let output = generate(&s).unwrap();
    assert_eq!(output.code, "None + None\n");
    assert_eq!(
        output.warnings.iter().map(|w| w.error.clone()).collect::<Vec<_>>(),
        vec![
            GenError::EmptyHole {
                block: add,
                input: "A".to_string()
            },
            GenError::EmptyHole {
                block: add,
                input: "B".to_string()
            },
        ]
    );
    assert!(output.warnings.iter().all(|w| w.is_warning && w.block == Some(add)));
}

#[test]
fn list_items_skip_empty_holes() {
    let mut s = session();
    let list = s.create_block("lists_create_with").unwrap();
    let one = number(&mut s, "1");
    let two = number(&mut s, "2");
    s.attach_value(one, list, "ITEM0").unwrap();
    s.attach_value(two, list, "ITEM2").unwrap();
    let output = generate(&s).unwrap();
    assert_eq!(output.code, "[1, 2]\n");
    assert!(output.warnings.is_empty());
}

#[test]
fn unsatisfiable_blocks_still_generate() {
    let mut s = session();
    let n = number(&mut s, "3");
    let text = s.create_block("text").unwrap();
    s.set_field(text, "TEXT", "a").unwrap();
    let join = binary(&mut s, "text_join", n, text);
    let output = generate(&s).unwrap();
    assert_eq!(output.code, "3 + 'a'\n");
    // The conflict empties the whole tree, children included.
    let blocks: Vec<_> = output.warnings.iter().map(|w| w.block).collect();
    assert_eq!(blocks, vec![Some(join), Some(n), Some(text)]);
    assert_eq!(
        output.warnings[0].error,
        GenError::Unsatisfiable {
            block: join,
            kind: "text_join".to_string()
        }
    );
}

#[test]
fn variables_are_hoisted_and_kept_clear_of_imports() {
    let mut s = session();
    let set = s.create_block("variables_set").unwrap();
    s.set_field(set, "VAR", "turtle").unwrap();
    let create = s.create_block("turtle_create").unwrap();
    s.attach_value(create, set, "VALUE").unwrap();

    let shout = s.create_block("variables_set").unwrap();
    s.set_field(shout, "VAR", "print").unwrap();
    let get = s.create_block("variables_get").unwrap();
    s.set_field(get, "VAR", "turtle").unwrap();
    s.attach_value(get, shout, "VALUE").unwrap();
    s.attach_next(shout, set).unwrap();

    assert_eq!(
        code(&s),
        "import turtle\n\nturtle2 = None\nprint_ = None\n\nturtle2 = turtle.Turtle()\nprint_ = turtle2\n"
    );
}

#[test]
fn top_level_trees_follow_position() {
    let mut s = session();
    let low = number(&mut s, "2");
    let high = number(&mut s, "1");
    s.set_position(low, 0.0, 100.0).unwrap();
    s.set_position(high, 0.0, 10.0).unwrap();
    assert_eq!(code(&s), "1\n2\n");
}

fn custom(python: &str) -> KindSpec {
    KindSpec {
        name: "custom".to_string(),
        shape: Shape::Expression,
        colour: 0,
        inputs: vec![InputSpec::value("X", "f")],
        types: vec![vec!["int".to_string(), "int".to_string()]],
        python: python.to_string(),
        precedence: order::MEMBER,
        imports: Vec::new(),
    }
}

#[test]
fn template_errors_abort_generation() {
    let mut catalog = Catalog::python();
    catalog.register(custom("f({Y})")).unwrap();
    let mut s = EditorSession::new(catalog);
    s.create_block("custom").unwrap();
    let error = generate(&s).unwrap_err();
    assert_eq!(
        error.to_string(),
        "template of block kind 'custom' refers to unknown input or field 'Y'"
    );

    let mut catalog = Catalog::python();
    catalog.register(custom("f({X)")).unwrap();
    let mut s = EditorSession::new(catalog);
    s.create_block("custom").unwrap();
    assert_eq!(
        generate(&s),
        Err(GenError::UnterminatedPlaceholder {
            kind: "custom".to_string()
        })
    );
}

#[test]
fn template_segments() {
    let slot = |name: &str, repr: bool, depth: usize, right: bool| Segment::Slot {
        name: name.to_string(),
        repr,
        depth,
        right,
    };
    assert_eq!(
        template::parse("{A} + {B}").unwrap(),
        vec![slot("A", false, 0, false), Segment::Text(" + ".to_string()), slot("B", false, 0, true)]
    );
    assert_eq!(
        template::parse("f({A}, {B})").unwrap(),
        vec![
            Segment::Text("f(".to_string()),
            slot("A", false, 1, false),
            Segment::Text(", ".to_string()),
            slot("B", false, 1, false),
            Segment::Text(")".to_string()),
        ]
    );
    assert_eq!(
        template::parse("if {COND}:\n{DO}").unwrap(),
        vec![
            Segment::Text("if ".to_string()),
            slot("COND", false, 0, false),
            Segment::Text(":\n".to_string()),
            slot("DO", false, 0, false),
        ]
    );
    assert_eq!(
        template::parse("{TEXT:repr}").unwrap(),
        vec![slot("TEXT", true, 0, false)]
    );
    assert_eq!(
        template::parse("[{...}]").unwrap(),
        vec![
            Segment::Text("[".to_string()),
            Segment::Spread,
            Segment::Text("]".to_string()),
        ]
    );
    assert_eq!(
        template::parse("{{x}}").unwrap(),
        vec![Segment::Text("{x}".to_string())]
    );
    assert_eq!(template::parse("{A"), None);
}

#[test]
fn identifiers_and_literals() {
    assert_eq!(sanitize("my var"), "my_var");
    assert_eq!(sanitize("2x"), "_2x");
    assert_eq!(sanitize("print"), "print_");
    assert_eq!(sanitize("while"), "while_");
    assert_eq!(sanitize(""), "_");

    assert_eq!(repr("it's\n"), "'it\\'s\\n'");
    assert_eq!(repr("a\\b\t\u{1}"), "'a\\\\b\\t\\x01'");

    assert_eq!(indent("a\n\nb"), "    a\n\n    b");
}

#[test]
fn environment_resolves_collisions() {
    let mut env = Environment::new(["turtle".to_string()]);
    assert!(env.is_empty());
    assert_eq!(env.declare("turtle"), "turtle2");
    assert_eq!(env.declare("a b"), "a_b");
    assert_eq!(env.declare("a_b"), "a_b2");
    assert_eq!(env.declare("a b"), "a_b");
    assert_eq!(env.lookup("a_b"), Some("a_b2"));
    assert_eq!(env.lookup("missing"), None);
    assert_eq!(
        env.declarations(),
        vec!["turtle2 = None", "a_b = None", "a_b2 = None"]
    );
}
