pub mod catalog;
pub mod hooks;
pub mod kind;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::block::kind::{BlockKind, InputKind, Shape};
use crate::connection::ConnectionId;
use crate::types::TypeVecs;

/// Stable handle of a block in the session arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// One row entry of a block: a value hole, a statement slot, or a bare label.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    pub label: String,
    pub connection: Option<ConnectionId>,
    /// Column of this hole in the block's type vectors (value inputs only).
    pub slot: Option<usize>,
    pub requires_variable: bool,
}

/// A node of the block tree.
///
/// Links to other blocks are ids into the owning session; the session keeps
/// `parent`/`children` and the connection targets consistent with each other.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub kind: Rc<BlockKind>,
    pub inputs: Vec<Input>,
    pub fields: BTreeMap<String, String>,
    pub output: Option<ConnectionId>,
    pub previous: Option<ConnectionId>,
    pub next: Option<ConnectionId>,
    /// Declared vectors, copied from the kind and only replaced by `set_type_vecs`.
    pub full_type_vecs: TypeVecs,
    /// Working copy, narrowed by unification.
    pub type_vecs: TypeVecs,
    pub parent: Option<BlockId>,
    pub children: Vec<BlockId>,
    /// Workspace position; meaningful for top-level blocks, derived for attached ones.
    pub x: f64,
    pub y: f64,
}

impl Block {
    pub fn kind_name(&self) -> &str {
        &self.kind.name
    }

    pub fn shape(&self) -> Shape {
        self.kind.shape
    }

    pub fn is_expression(&self) -> bool {
        self.kind.shape == Shape::Expression
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    /// Number of value holes, i.e. type-vector slots.
    pub fn value_slot_count(&self) -> usize {
        self.inputs.iter().filter(|i| i.slot.is_some()).count()
    }

    /// Every connection owned by this block, inputs last.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut out = Vec::new();
        out.extend(self.output);
        out.extend(self.previous);
        out.extend(self.next);
        out.extend(self.inputs.iter().filter_map(|i| i.connection));
        out
    }
}
