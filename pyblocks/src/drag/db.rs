use std::collections::BTreeSet;

use crate::block::BlockId;
use crate::connection::{Connection, ConnectionId, ConnectionKind};
use crate::session::EditorSession;

/// Maximum distance at which a dragged connection snaps to a candidate.
pub const SNAP_RADIUS: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    y: f64,
    x: f64,
    id: ConnectionId,
}

/// Connections bucketed by kind, each bucket sorted by `y`.
#[derive(Debug, Default)]
pub struct ConnectionDb {
    buckets: [Vec<Entry>; 4],
}

fn bucket(kind: ConnectionKind) -> usize {
    match kind {
        ConnectionKind::Output => 0,
        ConnectionKind::Input => 1,
        ConnectionKind::Previous => 2,
        ConnectionKind::Next => 3,
    }
}

impl ConnectionDb {
    pub fn new() -> Self {
        ConnectionDb::default()
    }

    /// Every connection that could accept a drop, skipping blocks in `exclude`.
    ///
    /// Occupied outputs, previous notches and value inputs cannot take another link;
    /// occupied next notches and statement inputs can, by splicing.
    pub fn build(session: &EditorSession, exclude: &BTreeSet<BlockId>) -> Self {
        let mut db = ConnectionDb::new();
        for c in session.connections() {
            if exclude.contains(&c.block) {
                continue;
            }
            let splices = matches!(c.kind, ConnectionKind::Next)
                || (c.kind == ConnectionKind::Input && c.statement);
            if c.is_connected() && !splices {
                continue;
            }
            db.insert(c);
        }
        db
    }

    pub fn insert(&mut self, connection: &Connection) {
        let entries = &mut self.buckets[bucket(connection.kind)];
        let at = entries.partition_point(|e| e.y < connection.y);
        entries.insert(
            at,
            Entry {
                y: connection.y,
                x: connection.x,
                id: connection.id,
            },
        );
    }

    pub fn remove(&mut self, id: ConnectionId) -> bool {
        for entries in &mut self.buckets {
            if let Some(at) = entries.iter().position(|e| e.id == id) {
                entries.remove(at);
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest connection of `kind` within `radius` of `(x, y)` accepted by `filter`.
    pub fn closest(
        &self,
        kind: ConnectionKind,
        x: f64,
        y: f64,
        radius: f64,
        mut filter: impl FnMut(ConnectionId) -> bool,
    ) -> Option<(ConnectionId, f64)> {
        let entries = &self.buckets[bucket(kind)];
        let start = entries.partition_point(|e| e.y < y - radius);
        let mut best: Option<(ConnectionId, f64)> = None;
        for entry in entries[start..].iter().take_while(|e| e.y <= y + radius) {
            let distance = (entry.x - x).hypot(entry.y - y);
            if distance > radius || best.is_some_and(|(_, d)| d <= distance) {
                continue;
            }
            if filter(entry.id) {
                best = Some((entry.id, distance));
            }
        }
        best
    }
}
