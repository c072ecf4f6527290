use std::fmt;
use std::ops::Index;

use crate::types::TypeError;
use crate::types::tag::TypeTag;

/// A column of a type vector: one of the value slots, or the block's own result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Slot(usize),
    Output,
}

/// One admissible signature: the type of every value slot followed by the result type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVector {
    tags: Vec<TypeTag>,
}

impl TypeVector {
    /// Build a vector from its tags. The last tag is the result type, so at least one is required.
    pub fn new(tags: Vec<TypeTag>) -> Result<Self, TypeError> {
        if tags.is_empty() {
            return Err(TypeError::EmptyVector);
        }
        Ok(TypeVector { tags })
    }

    /// Parse a vector from DSL strings such as `["*matching", "int", "matching"]`.
    pub fn parse<S: AsRef<str>>(tags: &[S]) -> Result<Self, TypeError> {
        let tags = tags
            .iter()
            .map(|t| t.as_ref().parse::<TypeTag>())
            .collect::<Result<Vec<_>, _>>()?;
        TypeVector::new(tags)
    }

    /// Number of value slots (the vector length minus the result column).
    pub fn slot_count(&self) -> usize {
        self.tags.len() - 1
    }

    pub fn output(&self) -> &TypeTag {
        &self.tags[self.tags.len() - 1]
    }

    pub fn slot(&self, index: usize) -> Option<&TypeTag> {
        if index < self.slot_count() {
            self.tags.get(index)
        } else {
            None
        }
    }

    pub fn column(&self, column: Column) -> Option<&TypeTag> {
        match column {
            Column::Slot(index) => self.slot(index),
            Column::Output => Some(self.output()),
        }
    }

    pub fn tags(&self) -> &[TypeTag] {
        &self.tags
    }

    pub fn has_matching(&self) -> bool {
        self.tags.iter().any(TypeTag::is_matching)
    }

    /// Substitute every `matching` with `name` and every `*matching` with `*name`.
    pub fn bind_matching(&self, name: &str) -> TypeVector {
        TypeVector {
            tags: self.tags.iter().map(|t| t.bind_matching(name)).collect(),
        }
    }
}

impl Index<usize> for TypeVector {
    type Output = TypeTag;

    fn index(&self, index: usize) -> &TypeTag {
        &self.tags[index]
    }
}

impl fmt::Display for TypeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slots, output) = self.tags.split_at(self.tags.len() - 1);
        write!(f, "(")?;
        for (i, tag) in slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, ") -> {}", output[0])
    }
}
