use std::fmt;

use pyblocks::BlockId;

#[derive(Debug, Clone, PartialEq)]
pub enum GenError {
    /// A template names something that is neither an input nor a field of the block.
    UnknownPlaceholder { kind: String, placeholder: String },
    UnterminatedPlaceholder { kind: String },
    UnknownBlock(BlockId),
    /// A value hole with nothing plugged in; generated as `None`.
    EmptyHole { block: BlockId, input: String },
    /// Unification left the block without an admissible type vector.
    Unsatisfiable { block: BlockId, kind: String },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::UnknownPlaceholder { kind, placeholder } => write!(
                f,
                "template of block kind '{}' refers to unknown input or field '{}'",
                kind, placeholder
            ),
            GenError::UnterminatedPlaceholder { kind } => {
                write!(f, "template of block kind '{}' has an unterminated '{{'", kind)
            }
            GenError::UnknownBlock(id) => write!(f, "no block {}", id),
            GenError::EmptyHole { block, input } => {
                write!(f, "input '{}' of block {} is empty, using None", input, block)
            }
            GenError::Unsatisfiable { block, kind } => write!(
                f,
                "block {} ({}) has no admissible type; the generated code will not run as intended",
                block, kind
            ),
        }
    }
}

impl std::error::Error for GenError {}

/// A generation problem tied to the block it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GenDiagnostic {
    pub error: GenError,
    pub block: Option<BlockId>,
    pub is_warning: bool,
}

impl GenDiagnostic {
    pub fn warning(error: GenError, block: BlockId) -> Self {
        GenDiagnostic {
            error,
            block: Some(block),
            is_warning: true,
        }
    }
}

impl From<GenError> for GenDiagnostic {
    fn from(error: GenError) -> Self {
        GenDiagnostic {
            error,
            block: None,
            is_warning: false,
        }
    }
}

impl fmt::Display for GenDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for GenDiagnostic {}
