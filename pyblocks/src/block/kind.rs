use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::block::BlockId;
use crate::session::EditorSession;
use crate::types::{TypeError, TypeVecs};

/// Whether a block produces a value or sits in a statement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Expression,
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Value,
    Statement,
    Dummy,
}

/// An editable text field shown on an input's row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub default: String,
    /// The field holds a variable name.
    #[serde(default)]
    pub variable: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputSpec {
    pub name: String,
    pub kind: InputKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Only variable blocks may be dropped here.
    #[serde(default)]
    pub requires_variable: bool,
}

impl InputSpec {
    pub fn value(name: &str, label: &str) -> Self {
        InputSpec {
            name: name.to_string(),
            kind: InputKind::Value,
            label: label.to_string(),
            fields: Vec::new(),
            requires_variable: false,
        }
    }

    pub fn statement(name: &str, label: &str) -> Self {
        InputSpec {
            name: name.to_string(),
            kind: InputKind::Statement,
            label: label.to_string(),
            fields: Vec::new(),
            requires_variable: false,
        }
    }

    pub fn dummy(name: &str, label: &str) -> Self {
        InputSpec {
            name: name.to_string(),
            kind: InputKind::Dummy,
            label: label.to_string(),
            fields: Vec::new(),
            requires_variable: false,
        }
    }

    pub fn with_field(mut self, name: &str, default: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            default: default.to_string(),
            variable: false,
        });
        self
    }

    pub fn with_variable(mut self, name: &str, default: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            default: default.to_string(),
            variable: true,
        });
        self
    }

    pub fn requiring_variable(mut self) -> Self {
        self.requires_variable = true;
        self
    }
}

/// Per-kind reactions to edits. Hooks may redeclare type vectors or reshape inputs, but a
/// re-synchronisation of the tree is always left to the session operation that called them.
pub trait KindHooks: fmt::Debug {
    fn on_create(&self, _session: &mut EditorSession, _block: BlockId) {}

    fn on_attach(&self, _session: &mut EditorSession, _block: BlockId, _input: usize) {}

    fn on_detach(&self, _session: &mut EditorSession, _block: BlockId, _input: usize) {}

    fn on_field_change(&self, _session: &mut EditorSession, _block: BlockId, _field: &str) {}

    /// Whether `value` may be stored in `field`. Refused edits leave the block untouched.
    fn accepts_field(&self, _field: &str, _value: &str) -> bool {
        true
    }

    /// Inputs of a block reshaped to hold `items` repeated holes, for kinds that support it.
    fn inputs_for_items(&self, _items: usize) -> Option<Vec<InputSpec>> {
        None
    }

    /// Declared vectors matching `inputs_for_items`.
    fn vectors_for_items(&self, _items: usize) -> Option<TypeVecs> {
        None
    }
}

#[derive(Debug)]
pub struct NoHooks;

impl KindHooks for NoHooks {}

/// Descriptor shared by every block of one kind.
#[derive(Debug)]
pub struct BlockKind {
    pub name: String,
    pub shape: Shape,
    /// Hue in degrees, used for statement blocks and as the category tint.
    pub colour: u16,
    pub inputs: Vec<InputSpec>,
    pub declared: TypeVecs,
    /// Python template; see the `pygen` crate for placeholder syntax.
    pub python: String,
    pub precedence: u8,
    /// Modules the generated code needs imported.
    pub imports: Vec<String>,
    pub hooks: Rc<dyn KindHooks>,
}

impl BlockKind {
    /// Number of value inputs, which must equal the declared slot count.
    pub fn value_input_count(&self) -> usize {
        self.inputs
            .iter()
            .filter(|i| i.kind == InputKind::Value)
            .count()
    }

    pub fn field_specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.inputs.iter().flat_map(|i| i.fields.iter())
    }

    pub fn is_variable_field(&self, name: &str) -> bool {
        self.field_specs().any(|f| f.name == name && f.variable)
    }

    /// Variable getters are the only blocks accepted by holes that require a variable.
    pub fn is_variable_getter(&self) -> bool {
        self.shape == Shape::Expression
            && self.value_input_count() == 0
            && self.field_specs().any(|f| f.variable)
    }
}

/// Serialisable description of a custom kind.
#[derive(Debug, Clone, Deserialize)]
pub struct KindSpec {
    pub name: String,
    pub shape: Shape,
    #[serde(default = "default_colour")]
    pub colour: u16,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    pub types: Vec<Vec<String>>,
    pub python: String,
    #[serde(default)]
    pub precedence: u8,
    #[serde(default)]
    pub imports: Vec<String>,
}

fn default_colour() -> u16 {
    200
}

/// A block kind whose declaration is inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    Types { kind: String, error: TypeError },
    SlotMismatch {
        kind: String,
        declared: usize,
        inputs: usize,
    },
    ResultShape { kind: String, shape: Shape },
    DuplicateInput { kind: String, input: String },
    DuplicateKind(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Types { kind, error } => {
                write!(f, "block kind '{}': {}", kind, error)
            }
            CatalogError::SlotMismatch {
                kind,
                declared,
                inputs,
            } => write!(
                f,
                "block kind '{}': type vectors declare {} slot(s) but the kind has {} value input(s)",
                kind, declared, inputs
            ),
            CatalogError::ResultShape { kind, shape } => match shape {
                Shape::Statement => write!(
                    f,
                    "block kind '{}': statement blocks must have result type 'none'",
                    kind
                ),
                Shape::Expression => write!(
                    f,
                    "block kind '{}': expression blocks cannot have result type 'none'",
                    kind
                ),
            },
            CatalogError::DuplicateInput { kind, input } => {
                write!(f, "block kind '{}': duplicate input '{}'", kind, input)
            }
            CatalogError::DuplicateKind(kind) => {
                write!(f, "block kind '{}' is already registered", kind)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl BlockKind {
    /// Validate a descriptor and attach its hooks.
    pub fn from_spec(spec: KindSpec, hooks: Rc<dyn KindHooks>) -> Result<BlockKind, CatalogError> {
        let declared = TypeVecs::parse(&spec.types).map_err(|error| CatalogError::Types {
            kind: spec.name.clone(),
            error,
        })?;

        let mut seen: Vec<&str> = Vec::new();
        for input in &spec.inputs {
            if seen.contains(&input.name.as_str()) {
                return Err(CatalogError::DuplicateInput {
                    kind: spec.name.clone(),
                    input: input.name.clone(),
                });
            }
            seen.push(&input.name);
        }

        let value_inputs = spec
            .inputs
            .iter()
            .filter(|i| i.kind == InputKind::Value)
            .count();
        if declared.slot_count() != value_inputs {
            return Err(CatalogError::SlotMismatch {
                kind: spec.name.clone(),
                declared: declared.slot_count(),
                inputs: value_inputs,
            });
        }

        let statement = spec.shape == Shape::Statement;
        if declared.iter().any(|v| v.output().is_none() != statement) {
            return Err(CatalogError::ResultShape {
                kind: spec.name.clone(),
                shape: spec.shape,
            });
        }

        Ok(BlockKind {
            name: spec.name,
            shape: spec.shape,
            colour: spec.colour % 360,
            inputs: spec.inputs,
            declared,
            python: spec.python,
            precedence: spec.precedence,
            imports: spec.imports,
            hooks,
        })
    }
}
