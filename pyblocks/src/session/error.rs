use std::fmt;

use crate::block::BlockId;
use crate::block::kind::InputKind;
use crate::connection::ConnectionId;

/// Structural editing errors. Type conflicts are never errors; they show up as narrowed sets.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorError {
    UnknownBlock(BlockId),
    UnknownConnection(ConnectionId),
    UnknownKind(String),
    UnknownInput { block: BlockId, input: String },
    UnknownField { block: BlockId, field: String },
    InvalidFieldValue {
        block: BlockId,
        field: String,
        value: String,
    },
    WrongInputKind {
        block: BlockId,
        input: String,
        expected: InputKind,
    },
    NotAnExpression(BlockId),
    NotAStatement(BlockId),
    InputOccupied { block: BlockId, input: String },
    WouldCreateCycle { child: BlockId, parent: BlockId },
    RequiresVariable { block: BlockId, input: String },
    IncompatibleConnections(ConnectionId, ConnectionId),
    NotMutable(String),
    SlotMismatch {
        block: BlockId,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::UnknownBlock(id) => write!(f, "no block {} in this session", id),
            EditorError::UnknownConnection(id) => {
                write!(f, "no connection {} in this session", id)
            }
            EditorError::UnknownKind(name) => write!(f, "unknown block kind '{}'", name),
            EditorError::UnknownInput { block, input } => {
                write!(f, "block {} has no input '{}'", block, input)
            }
            EditorError::UnknownField { block, field } => {
                write!(f, "block {} has no field '{}'", block, field)
            }
            EditorError::InvalidFieldValue {
                block,
                field,
                value,
            } => write!(
                f,
                "'{}' is not a valid value for field '{}' of block {}",
                value, field, block
            ),
            EditorError::WrongInputKind {
                block,
                input,
                expected,
            } => write!(
                f,
                "input '{}' of block {} is not a {:?} input",
                input, block, expected
            ),
            EditorError::NotAnExpression(id) => {
                write!(f, "block {} has no output connection", id)
            }
            EditorError::NotAStatement(id) => {
                write!(f, "block {} has no previous connection", id)
            }
            EditorError::InputOccupied { block, input } => {
                write!(f, "input '{}' of block {} is already connected", input, block)
            }
            EditorError::WouldCreateCycle { child, parent } => {
                write!(f, "attaching {} under {} would create a cycle", child, parent)
            }
            EditorError::RequiresVariable { block, input } => write!(
                f,
                "input '{}' of block {} only accepts a variable",
                input, block
            ),
            EditorError::IncompatibleConnections(a, b) => {
                write!(f, "connections {} and {} cannot be linked", a, b)
            }
            EditorError::NotMutable(kind) => {
                write!(f, "block kind '{}' has no item count", kind)
            }
            EditorError::SlotMismatch {
                block,
                expected,
                got,
            } => write!(
                f,
                "block {} has {} value slot(s), type vectors have {}",
                block, expected, got
            ),
        }
    }
}

impl std::error::Error for EditorError {}
