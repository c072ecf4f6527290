//! Type state of blocks in the session: restoring, narrowing across value edges, and the
//! full re-synchronisation run after every structural edit.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::block::BlockId;
use crate::block::kind::InputKind;
use crate::session::{EditorError, EditorSession};
use crate::types::{Column, TypeTag, TypeVecs};
use crate::unify;

impl EditorSession {
    /// Install a new declared set on a block and restore its value tree from declared sets.
    pub fn set_type_vecs(&mut self, id: BlockId, vecs: TypeVecs) -> Result<(), EditorError> {
        let block = self.get_mut(id)?;
        let expected = block.value_slot_count();
        if vecs.slot_count() != expected {
            return Err(EditorError::SlotMismatch {
                block: id,
                expected,
                got: vecs.slot_count(),
            });
        }
        block.full_type_vecs = vecs;
        self.dirty.insert(id);
        self.restore_full_types(id);
        Ok(())
    }

    /// Reset `id` and every value descendant to its declared set.
    pub fn restore_full_types(&mut self, id: BlockId) {
        for b in self.value_tree(id) {
            if let Some(block) = self.block_mut(b) {
                block.type_vecs = block.full_type_vecs.clone();
            }
        }
    }

    /// Narrow `child` from the block it is plugged into. Returns whether anything changed.
    pub fn narrow_child(&mut self, child: BlockId) -> bool {
        let changed = self.narrow_edge(child, true);
        if changed {
            self.dirty.insert(child);
        }
        changed
    }

    /// Narrow the block `child` is plugged into from `child`. Returns whether anything changed.
    pub fn narrow_parent(&mut self, child: BlockId) -> bool {
        let changed = self.narrow_edge(child, false);
        if let (true, Some((parent, _))) = (changed, self.value_parent(child)) {
            self.dirty.insert(parent);
        }
        changed
    }

    fn narrow_edge(&mut self, child: BlockId, toward_child: bool) -> bool {
        let Some((parent, slot)) = self.value_parent(child) else {
            return false;
        };
        let (Some(c), Some(p)) = (self.block(child), self.block(parent)) else {
            return false;
        };
        let (target, narrowed) = if toward_child {
            (
                child,
                unify::narrow(&c.type_vecs, Column::Output, &p.type_vecs, Column::Slot(slot)),
            )
        } else {
            (
                parent,
                unify::narrow(&p.type_vecs, Column::Slot(slot), &c.type_vecs, Column::Output),
            )
        };
        let Some(block) = self.block_mut(target) else {
            return false;
        };
        if block.type_vecs == narrowed {
            return false;
        }
        trace!(block = %target, from = %block.type_vecs, to = %narrowed, "narrowed");
        block.type_vecs = narrowed;
        true
    }

    /// Walk from `id` to its value root, narrowing each ancestor from the child below it.
    /// Returns whether any block changed.
    pub fn unify_up(&mut self, id: BlockId) -> bool {
        let mut changed = false;
        let mut cur = id;
        while let Some((parent, _)) = self.value_parent(cur) {
            changed |= self.narrow_parent(cur);
            cur = parent;
        }
        changed
    }

    /// Narrow every value descendant of `root` from its parent, parents first. Returns
    /// whether any block changed.
    pub fn unify_down(&mut self, root: BlockId) -> bool {
        let mut changed = false;
        for b in self.value_tree(root) {
            for (_, child) in self.value_children(b) {
                changed |= self.narrow_child(child);
            }
        }
        changed
    }

    /// Recompute the admissible sets of the value tree containing `id` from scratch.
    ///
    /// Restores the whole tree, narrows every parent from its children bottom-up, then
    /// pushes the root's final state back down with `unify_down`. Skipped while markup is
    /// being loaded and when called from inside another resync.
    pub fn resync(&mut self, id: BlockId) {
        if self.deferred || self.block(id).is_none() {
            return;
        }
        if self.resyncing {
            warn!(block = %id, "skipping re-entrant type resync");
            return;
        }
        self.resyncing = true;

        let root = self.root(id);
        let order = self.value_tree(root);
        let before: BTreeMap<BlockId, (TypeVecs, bool)> = order
            .iter()
            .filter_map(|b| Some((*b, (self.block(*b)?.type_vecs.clone(), self.is_dirty(*b)))))
            .collect();

        self.restore_full_types(root);
        for b in order.iter().rev() {
            for (_, child) in self.value_children(*b) {
                self.narrow_parent(child);
            }
        }
        self.unify_down(root);

        // Only blocks whose final state differs from the one they started with are dirty.
        let mut changed = 0;
        for (b, (old, was_dirty)) in before {
            if self.block(b).is_some_and(|block| block.type_vecs != old) {
                self.dirty.insert(b);
                changed += 1;
            } else if !was_dirty {
                self.dirty.remove(&b);
            }
        }
        debug!(%root, blocks = order.len(), changed, "resynced types");
        self.resyncing = false;
    }

    /// Resync every value tree in the session.
    pub fn resync_all(&mut self) {
        let roots: Vec<BlockId> = self
            .blocks()
            .filter(|b| self.value_parent(b.id).is_none())
            .map(|b| b.id)
            .collect();
        for root in roots {
            self.resync(root);
        }
    }

    /// Suspend resyncs while a batch of edits is applied; `resume_resync` catches up.
    pub fn defer_resync(&mut self) {
        self.deferred = true;
    }

    pub fn resume_resync(&mut self) {
        self.deferred = false;
        self.resync_all();
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Distinct admissible tags of value slot `slot`.
    pub fn input_types(&self, id: BlockId, slot: usize) -> Vec<TypeTag> {
        self.block(id)
            .map(|b| b.type_vecs.input_types(slot))
            .unwrap_or_default()
    }

    /// Distinct admissible result tags; empty for an unsatisfiable block.
    pub fn output_types(&self, id: BlockId) -> Vec<TypeTag> {
        self.block(id)
            .map(|b| b.type_vecs.output_types())
            .unwrap_or_default()
    }

    /// Whether `candidate` may be dropped into a hole currently admitting `hole`.
    pub fn legal_drop(&self, candidate: BlockId, hole: &[TypeTag], requires_variable: bool) -> bool {
        let Some(block) = self.block(candidate) else {
            return false;
        };
        if !block.is_expression() {
            return false;
        }
        if requires_variable && !block.kind.is_variable_getter() {
            return false;
        }
        unify::accepts(hole, &block.type_vecs.output_types())
    }

    /// `legal_drop` against a named value input of `parent`.
    pub fn legal_drop_into(&self, candidate: BlockId, parent: BlockId, input: &str) -> bool {
        let Some(target) = self.block(parent).and_then(|p| p.input(input)) else {
            return false;
        };
        let Some(slot) = target.slot.filter(|_| target.kind == InputKind::Value) else {
            return false;
        };
        let hole = self.input_types(parent, slot);
        self.legal_drop(candidate, &hole, target.requires_variable)
    }
}
