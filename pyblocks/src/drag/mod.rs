//! Interactive dragging: candidate discovery while the pointer moves, and the commit on drop.
//!
//! Nothing in the session changes until `drop`; a cancelled drag leaves the tree as it was.

pub mod db;

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::block::BlockId;
use crate::block::kind::InputKind;
use crate::connection::{ConnectionId, ConnectionKind};
use crate::session::{EditorError, EditorSession};

pub use db::{ConnectionDb, SNAP_RADIUS};

/// A pending connection between one of the dragged block's connections and a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub own: ConnectionId,
    pub target: ConnectionId,
    pub distance: f64,
}

#[derive(Debug)]
pub struct DragSession {
    block: BlockId,
    origin: (f64, f64),
    offset: (f64, f64),
    /// The dragged block's connections with their positions at drag start.
    own: Vec<(ConnectionId, f64, f64)>,
    db: ConnectionDb,
    candidate: Option<Candidate>,
}

impl DragSession {
    /// Start dragging `block` together with everything below it.
    pub fn begin(session: &mut EditorSession, block: BlockId) -> Result<DragSession, EditorError> {
        let b = session.block(block).ok_or(EditorError::UnknownBlock(block))?;
        let origin = (b.x, b.y);
        let own = b
            .connections()
            .into_iter()
            .filter_map(|c| session.connection(c))
            .map(|c| (c.id, c.x, c.y))
            .collect();
        let exclude: BTreeSet<BlockId> = session.descendants(block).into_iter().collect();
        let db = ConnectionDb::build(session, &exclude);
        debug!(%block, candidates = db.len(), "drag started");

        session.dragging = Some(block);
        Ok(DragSession {
            block,
            origin,
            offset: (0.0, 0.0),
            own,
            db,
            candidate: None,
        })
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn candidate(&self) -> Option<Candidate> {
        self.candidate
    }

    /// Where the block would land as a top-level block.
    pub fn position(&self) -> (f64, f64) {
        (self.origin.0 + self.offset.0, self.origin.1 + self.offset.1)
    }

    /// Move by `(dx, dy)` from the drag origin and pick the closest legal candidate.
    pub fn move_to(&mut self, session: &EditorSession, dx: f64, dy: f64) -> Option<Candidate> {
        self.offset = (dx, dy);
        let mut best: Option<Candidate> = None;
        for &(own, x, y) in &self.own {
            let Some(conn) = session.connection(own) else {
                continue;
            };
            // Filled inputs and notches of the dragged stack stay as they are.
            if conn.is_connected() && conn.kind != ConnectionKind::Output && conn.kind != ConnectionKind::Previous {
                continue;
            }
            let kinds: &[ConnectionKind] = match conn.kind {
                ConnectionKind::Output => &[ConnectionKind::Input],
                ConnectionKind::Input if conn.statement => &[ConnectionKind::Previous],
                ConnectionKind::Input => &[ConnectionKind::Output],
                ConnectionKind::Previous => &[ConnectionKind::Next, ConnectionKind::Input],
                ConnectionKind::Next => &[ConnectionKind::Previous],
            };
            let radius = best.map_or(SNAP_RADIUS, |c| c.distance);
            for kind in kinds {
                let found = self.db.closest(*kind, x + dx, y + dy, radius, |target| {
                    DragSession::legal(session, own, target)
                });
                if let Some((target, distance)) = found {
                    if best.is_none_or(|c| distance < c.distance) {
                        best = Some(Candidate {
                            own,
                            target,
                            distance,
                        });
                    }
                }
            }
        }
        if best != self.candidate {
            trace!(block = %self.block, candidate = ?best.map(|c| c.target), "drag candidate changed");
        }
        self.candidate = best;
        best
    }

    /// Whether linking `own` to `target` would be accepted on drop.
    fn legal(session: &EditorSession, own: ConnectionId, target: ConnectionId) -> bool {
        let (Some(a), Some(b)) = (session.connection(own), session.connection(target)) else {
            return false;
        };
        if !a.can_pair_with(b) {
            return false;
        }
        let value_drop = |child: BlockId, socket: &crate::connection::Connection| {
            let Some(input) = socket
                .input
                .and_then(|i| session.block(socket.block)?.inputs.get(i))
            else {
                return false;
            };
            input.kind == InputKind::Value
                && !socket.is_connected()
                && session.legal_drop_into(child, socket.block, &input.name)
        };
        match (a.kind, b.kind) {
            (ConnectionKind::Output, ConnectionKind::Input) => value_drop(a.block, b),
            (ConnectionKind::Input, ConnectionKind::Output) if !a.statement => {
                !b.is_connected() && value_drop(b.block, a)
            }
            // Only a free-standing stack can be hung below the dragged one.
            (ConnectionKind::Next, ConnectionKind::Previous) => !b.is_connected(),
            (ConnectionKind::Input, ConnectionKind::Previous) => !b.is_connected(),
            _ => true,
        }
    }

    /// Abandon the drag. Returns the position the block snaps back to.
    pub fn cancel(self, session: &mut EditorSession) -> (f64, f64) {
        session.dragging = None;
        debug!(block = %self.block, "drag cancelled");
        self.origin
    }

    /// Commit: connect to the current candidate, or leave the block top-level where it was
    /// dropped.
    pub fn drop(self, session: &mut EditorSession) -> Result<(), EditorError> {
        session.dragging = None;
        match self.candidate {
            Some(candidate) => {
                debug!(block = %self.block, own = %candidate.own, target = %candidate.target, "dropped onto connection");
                session.connect(candidate.own, candidate.target)
            }
            None => {
                session.detach(self.block)?;
                let (x, y) = self.position();
                debug!(block = %self.block, x, y, "dropped on workspace");
                session.set_position(self.block, x, y)
            }
        }
    }
}
