pub mod fill;
pub mod layout;
pub mod measure;
pub mod path;
pub mod svg;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::block::BlockId;
use crate::session::EditorSession;

pub use fill::{Appearance, BodyStyle, Colour, Fill, StripePattern, select_fill};
pub use layout::{BlockLayout, layout_block};
pub use measure::{Measurer, MonospaceMeasurer};

/// Keeps the layout of every block and brings it up to date after edits.
#[derive(Debug)]
pub struct Renderer<M: Measurer = MonospaceMeasurer> {
    measurer: M,
    layouts: BTreeMap<BlockId, BlockLayout>,
}

impl Default for Renderer<MonospaceMeasurer> {
    fn default() -> Self {
        Renderer::new(MonospaceMeasurer::default())
    }
}

impl<M: Measurer> Renderer<M> {
    pub fn new(measurer: M) -> Self {
        Renderer {
            measurer,
            layouts: BTreeMap::new(),
        }
    }

    pub fn layout(&self, id: BlockId) -> Option<&BlockLayout> {
        self.layouts.get(&id)
    }

    pub fn layouts(&self) -> &BTreeMap<BlockId, BlockLayout> {
        &self.layouts
    }

    /// Lay out every tree from scratch and place all blocks and connections.
    pub fn render_all(&mut self, session: &mut EditorSession) {
        session.take_dirty();
        self.layouts.clear();
        let tops = session.top_blocks().to_vec();
        for top in &tops {
            for id in session.descendants(*top).into_iter().rev() {
                self.relayout(session, id);
            }
            self.place(session, *top);
        }
        debug!(blocks = self.layouts.len(), trees = tops.len(), "rendered workspace");
    }

    /// Re-lay out dirty blocks and every ancestor whose size depends on them.
    ///
    /// Returns the blocks that were laid out again.
    pub fn render_dirty(&mut self, session: &mut EditorSession) -> BTreeSet<BlockId> {
        let dirty = session.take_dirty();
        self.layouts.retain(|id, _| session.block(*id).is_some());

        let mut stale = BTreeSet::new();
        for id in dirty {
            let mut cur = Some(id);
            while let Some(b) = cur.filter(|b| session.block(*b).is_some()) {
                if !stale.insert(b) {
                    break;
                }
                cur = session.block(b).and_then(|block| block.parent);
            }
        }

        let tops: BTreeSet<BlockId> = stale.iter().map(|b| session.top_ancestor(*b)).collect();
        for top in &tops {
            for id in session.descendants(*top).into_iter().rev() {
                if stale.contains(&id) || !self.layouts.contains_key(&id) {
                    self.relayout(session, id);
                    stale.insert(id);
                }
            }
            self.place(session, *top);
        }
        debug!(relaid = stale.len(), trees = tops.len(), "rendered dirty blocks");
        stale
    }

    fn relayout(&mut self, session: &EditorSession, id: BlockId) {
        if let Some(layout) = layout_block(session, id, &self.measurer, &self.layouts) {
            self.layouts.insert(id, layout);
        }
    }

    /// Derive workspace positions of everything under `top` from the layouts.
    fn place(&self, session: &mut EditorSession, top: BlockId) {
        let Some(origin) = session.block(top).map(|b| (b.x, b.y)) else {
            return;
        };
        let mut stack = vec![(top, origin)];
        while let Some((id, (x, y))) = stack.pop() {
            if let Some(block) = session.block_mut(id) {
                block.x = x;
                block.y = y;
            }
            let Some(layout) = self.layouts.get(&id) else {
                continue;
            };
            for (c, dx, dy) in &layout.connectors {
                if let Some(conn) = session.connection_mut(*c) {
                    conn.x = x + dx;
                    conn.y = y + dy;
                }
            }
            for (child, dx, dy) in &layout.children {
                stack.push((*child, (x + dx, y + dy)));
            }
        }
    }
}
