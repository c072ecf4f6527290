use std::fmt;
use std::str::FromStr;

use crate::types::TypeError;

/// The element part of a type tag, with the list marker stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseType {
    /// A concrete scalar type such as `int`, `str` or `turtle`.
    Named(String),
    /// Binds to any single type, independently at each occurrence.
    Any,
    /// Binds to one concrete type shared by every `matching` in the same vector.
    Matching,
    /// Result sentinel for statement blocks.
    None,
}

/// One entry of a type vector: a base type, optionally wrapped as a list (`*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag {
    base: BaseType,
    list: bool,
}

impl TypeTag {
    pub fn named(name: impl Into<String>) -> Self {
        TypeTag {
            base: BaseType::Named(name.into()),
            list: false,
        }
    }

    pub fn list_of(name: impl Into<String>) -> Self {
        TypeTag {
            base: BaseType::Named(name.into()),
            list: true,
        }
    }

    pub fn any() -> Self {
        TypeTag {
            base: BaseType::Any,
            list: false,
        }
    }

    pub fn matching() -> Self {
        TypeTag {
            base: BaseType::Matching,
            list: false,
        }
    }

    pub fn none() -> Self {
        TypeTag {
            base: BaseType::None,
            list: false,
        }
    }

    pub fn base(&self) -> &BaseType {
        &self.base
    }

    pub fn is_list(&self) -> bool {
        self.list
    }

    pub fn is_any(&self) -> bool {
        self.base == BaseType::Any
    }

    pub fn is_matching(&self) -> bool {
        self.base == BaseType::Matching
    }

    pub fn is_none(&self) -> bool {
        self.base == BaseType::None
    }

    /// `any` or `matching`, in either list form.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.base, BaseType::Any | BaseType::Matching)
    }

    /// The concrete element name, if this tag names one.
    pub fn concrete_name(&self) -> Option<&str> {
        match &self.base {
            BaseType::Named(name) => Some(name),
            _ => None,
        }
    }

    /// The same tag with the list marker removed.
    pub fn element(&self) -> TypeTag {
        TypeTag {
            base: self.base.clone(),
            list: false,
        }
    }

    /// Wrap this tag in a list. `none` and tags that are already lists have no list form.
    pub fn as_list(&self) -> Option<TypeTag> {
        if self.list || self.is_none() {
            return None;
        }
        Some(TypeTag {
            base: self.base.clone(),
            list: true,
        })
    }

    /// Replace a `matching` base with the concrete `name`, keeping list-ness.
    pub(crate) fn bind_matching(&self, name: &str) -> TypeTag {
        if self.is_matching() {
            TypeTag {
                base: BaseType::Named(name.to_string()),
                list: self.list,
            }
        } else {
            self.clone()
        }
    }
}

impl FromStr for TypeTag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (list, body) = match raw.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if body.is_empty() {
            return Err(TypeError::EmptyTag);
        }
        if body.starts_with('*') {
            return Err(TypeError::NestedList(raw.to_string()));
        }
        if !body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(TypeError::InvalidTag(raw.to_string()));
        }
        let base = match body {
            "any" => BaseType::Any,
            "matching" => BaseType::Matching,
            "none" if list => return Err(TypeError::ListOfNone),
            "none" => BaseType::None,
            other => BaseType::Named(other.to_string()),
        };
        Ok(TypeTag { base, list })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "*")?;
        }
        match &self.base {
            BaseType::Named(name) => write!(f, "{}", name),
            BaseType::Any => write!(f, "any"),
            BaseType::Matching => write!(f, "matching"),
            BaseType::None => write!(f, "none"),
        }
    }
}
