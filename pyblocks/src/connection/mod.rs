use std::fmt;

use crate::block::BlockId;

/// Stable handle of a connection in the session arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u32);

impl ConnectionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// The plug of an expression block.
    Output,
    /// A value or statement socket owned by one of a block's inputs.
    Input,
    /// The top notch of a statement block.
    Previous,
    /// The bottom notch of a statement block.
    Next,
}

/// An anchor point on a block.
///
/// `x`/`y` are workspace coordinates written by the renderer on every layout pass.
/// `target` is the partner connection; links are always stored on both sides.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub kind: ConnectionKind,
    pub block: BlockId,
    /// Index into the owning block's inputs, for `Input` connections.
    pub input: Option<usize>,
    /// Statement sockets are `Input` connections that pair with `Previous` rather than `Output`.
    pub statement: bool,
    pub x: f64,
    pub y: f64,
    pub target: Option<ConnectionId>,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    /// Whether `other` has the complementary shape for a link with this connection.
    pub fn can_pair_with(&self, other: &Connection) -> bool {
        if self.block == other.block {
            return false;
        }
        match (self.kind, other.kind) {
            (ConnectionKind::Output, ConnectionKind::Input) => !other.statement,
            (ConnectionKind::Input, ConnectionKind::Output) => !self.statement,
            (ConnectionKind::Previous, ConnectionKind::Next) => true,
            (ConnectionKind::Next, ConnectionKind::Previous) => true,
            (ConnectionKind::Previous, ConnectionKind::Input) => other.statement,
            (ConnectionKind::Input, ConnectionKind::Previous) => self.statement,
            _ => false,
        }
    }
}
