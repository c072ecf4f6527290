pub mod tag;
pub mod vector;

use std::collections::BTreeSet;
use std::fmt;

pub use tag::{BaseType, TypeTag};
pub use vector::{Column, TypeVector};

/// Malformed type tags or declared type-vector tables.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
    EmptyTag,
    InvalidTag(String),
    NestedList(String),
    ListOfNone,
    EmptyVector,
    EmptyTable,
    ArityMismatch {
        expected: usize,
        got: usize,
        vector: usize,
    },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::EmptyTag => write!(f, "empty type tag"),
            TypeError::InvalidTag(tag) => write!(f, "invalid type tag '{}'", tag),
            TypeError::NestedList(tag) => {
                write!(f, "nested list type '{}' is not supported", tag)
            }
            TypeError::ListOfNone => write!(f, "'none' has no list form"),
            TypeError::EmptyVector => write!(f, "type vector has no result column"),
            TypeError::EmptyTable => write!(f, "type table declares no vectors"),
            TypeError::ArityMismatch {
                expected,
                got,
                vector,
            } => write!(
                f,
                "type vector {} has {} slot(s), expected {}",
                vector, got, expected
            ),
        }
    }
}

impl std::error::Error for TypeError {}

/// Distinct tags of one column, split by list-ness.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnKinds {
    pub basic: Vec<TypeTag>,
    pub list: Vec<TypeTag>,
}

/// An admissible set: ordered, structurally deduplicated type vectors sharing one slot count.
///
/// The slot count is kept even when narrowing empties the set, so column queries on an
/// unsatisfiable block still know how many holes it has.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeVecs {
    slots: usize,
    vectors: Vec<TypeVector>,
}

impl TypeVecs {
    /// Validate a declared table: at least one vector, all with the same slot count.
    pub fn new(vectors: Vec<TypeVector>) -> Result<Self, TypeError> {
        let first = vectors.first().ok_or(TypeError::EmptyTable)?;
        let slots = first.slot_count();
        for (i, vector) in vectors.iter().enumerate() {
            if vector.slot_count() != slots {
                return Err(TypeError::ArityMismatch {
                    expected: slots,
                    got: vector.slot_count(),
                    vector: i,
                });
            }
        }
        let mut set = TypeVecs::empty(slots);
        for vector in vectors {
            set.insert(vector);
        }
        Ok(set)
    }

    /// Parse a declared table written in the tag DSL.
    pub fn parse<R, S>(table: &[R]) -> Result<Self, TypeError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let vectors = table
            .iter()
            .map(|row| TypeVector::parse(row.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        TypeVecs::new(vectors)
    }

    pub fn empty(slots: usize) -> Self {
        TypeVecs {
            slots,
            vectors: Vec::new(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeVector> {
        self.vectors.iter()
    }

    pub fn vectors(&self) -> &[TypeVector] {
        &self.vectors
    }

    /// Add a vector unless an equal one is already present. Returns whether it was added.
    pub fn insert(&mut self, vector: TypeVector) -> bool {
        debug_assert_eq!(vector.slot_count(), self.slots);
        if self.vectors.contains(&vector) {
            false
        } else {
            self.vectors.push(vector);
            true
        }
    }

    /// Distinct tags at `column` across every admissible vector, in first-seen order.
    pub fn column_types(&self, column: Column) -> Vec<TypeTag> {
        let mut out: Vec<TypeTag> = Vec::new();
        for vector in &self.vectors {
            if let Some(tag) = vector.column(column) {
                if !out.contains(tag) {
                    out.push(tag.clone());
                }
            }
        }
        out
    }

    pub fn input_types(&self, slot: usize) -> Vec<TypeTag> {
        self.column_types(Column::Slot(slot))
    }

    pub fn input_types_split(&self, slot: usize) -> ColumnKinds {
        let mut kinds = ColumnKinds::default();
        for tag in self.input_types(slot) {
            if tag.is_list() {
                kinds.list.push(tag);
            } else {
                kinds.basic.push(tag);
            }
        }
        kinds
    }

    pub fn output_types(&self) -> Vec<TypeTag> {
        self.column_types(Column::Output)
    }

    /// Concrete tags left in the result column, list marker kept, sorted.
    pub fn concrete_output_tags(&self) -> BTreeSet<String> {
        self.output_types()
            .iter()
            .filter(|t| t.concrete_name().is_some())
            .map(TypeTag::to_string)
            .collect()
    }
}

impl<'a> IntoIterator for &'a TypeVecs {
    type Item = &'a TypeVector;
    type IntoIter = std::slice::Iter<'a, TypeVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.vectors.iter()
    }
}

impl fmt::Display for TypeVecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vectors.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for (i, vector) in self.vectors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", vector)?;
        }
        write!(f, "}}")
    }
}
