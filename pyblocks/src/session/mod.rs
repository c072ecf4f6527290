pub mod error;
mod tree;
mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::block::catalog::Catalog;
use crate::block::kind::{InputKind, InputSpec, Shape};
use crate::block::{Block, BlockId, Input};
use crate::connection::{Connection, ConnectionId, ConnectionKind};

pub use error::EditorError;

/// Advisory (non-blocking) problems surfaced to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Narrowing left the block with no admissible type vector.
    Unsatisfiable { block: BlockId },
    /// A value hole with nothing plugged in.
    EmptyHole { block: BlockId, input: String },
}

impl Advisory {
    pub fn block(&self) -> BlockId {
        match self {
            Advisory::Unsatisfiable { block } | Advisory::EmptyHole { block, .. } => *block,
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::Unsatisfiable { block } => {
                write!(f, "block {} has no admissible type here", block)
            }
            Advisory::EmptyHole { block, input } => {
                write!(f, "input '{}' of block {} is empty", input, block)
            }
        }
    }
}

/// The editor context: an arena of blocks and connections plus UI-confined state.
///
/// Every operation that changes the tree re-synchronises the types of the value tree it
/// touched before returning.
#[derive(Debug)]
pub struct EditorSession {
    catalog: Catalog,
    blocks: Vec<Option<Block>>,
    connections: Vec<Option<Connection>>,
    top_blocks: Vec<BlockId>,
    /// Blocks whose type state or structure changed since the renderer last looked.
    dirty: BTreeSet<BlockId>,
    resyncing: bool,
    deferred: bool,
    pub dragging: Option<BlockId>,
}

impl EditorSession {
    pub fn new(catalog: Catalog) -> Self {
        EditorSession {
            catalog,
            blocks: Vec::new(),
            connections: Vec::new(),
            top_blocks: Vec::new(),
            dirty: BTreeSet::new(),
            resyncing: false,
            deferred: false,
            dragging: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub(crate) fn get(&self, id: BlockId) -> Result<&Block, EditorError> {
        self.block(id).ok_or(EditorError::UnknownBlock(id))
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> Result<&mut Block, EditorError> {
        self.block_mut(id).ok_or(EditorError::UnknownBlock(id))
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.index()).and_then(Option::as_ref)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Every live block, in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().flatten()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.blocks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks without a parent, in the order they became top-level.
    pub fn top_blocks(&self) -> &[BlockId] {
        &self.top_blocks
    }

    /// Top-level blocks sorted by workspace position, top to bottom then left to right.
    pub fn top_blocks_ordered(&self) -> Vec<BlockId> {
        let mut ids = self.top_blocks.clone();
        ids.sort_by(|a, b| {
            let pa = self.block(*a).map(|b| (b.y, b.x)).unwrap_or_default();
            let pb = self.block(*b).map(|b| (b.y, b.x)).unwrap_or_default();
            pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
        });
        ids
    }

    /// Drain the set of blocks the renderer has to revisit.
    pub fn take_dirty(&mut self) -> BTreeSet<BlockId> {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self, id: BlockId) -> bool {
        self.dirty.contains(&id)
    }

    // ---------------------------------------------------------------------
    // Creation and disposal
    // ---------------------------------------------------------------------

    /// Create an unattached block of the named kind at the workspace origin.
    pub fn create_block(&mut self, kind: &str) -> Result<BlockId, EditorError> {
        let kind = self
            .catalog
            .get(kind)
            .ok_or_else(|| EditorError::UnknownKind(kind.to_string()))?;
        let id = BlockId(self.blocks.len() as u32);

        let (output, previous, next) = match kind.shape {
            Shape::Expression => (
                Some(self.alloc_connection(id, ConnectionKind::Output, None, false)),
                None,
                None,
            ),
            Shape::Statement => (
                None,
                Some(self.alloc_connection(id, ConnectionKind::Previous, None, false)),
                Some(self.alloc_connection(id, ConnectionKind::Next, None, false)),
            ),
        };
        let inputs = self.build_inputs(id, &kind.inputs, &[]);
        let fields: BTreeMap<String, String> = kind
            .field_specs()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect();

        self.blocks.push(Some(Block {
            id,
            kind: kind.clone(),
            inputs,
            fields,
            output,
            previous,
            next,
            full_type_vecs: kind.declared.clone(),
            type_vecs: kind.declared.clone(),
            parent: None,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
        }));
        self.top_blocks.push(id);
        self.dirty.insert(id);
        debug!(block = %id, kind = %kind.name, "created block");

        kind.hooks.clone().on_create(self, id);
        Ok(id)
    }

    /// Detach a block and dispose of it together with everything below it.
    pub fn dispose_block(&mut self, id: BlockId) -> Result<(), EditorError> {
        self.detach(id)?;
        let doomed = self.descendants(id);
        for block_id in doomed.iter().rev() {
            let Some(block) = self.blocks.get_mut(block_id.index()).and_then(Option::take) else {
                continue;
            };
            for c in block.connections() {
                if let Some(slot) = self.connections.get_mut(c.index()) {
                    *slot = None;
                }
            }
            self.dirty.remove(block_id);
        }
        self.top_blocks.retain(|b| *b != id);
        debug!(block = %id, disposed = doomed.len(), "disposed block tree");
        Ok(())
    }

    fn alloc_connection(
        &mut self,
        block: BlockId,
        kind: ConnectionKind,
        input: Option<usize>,
        statement: bool,
    ) -> ConnectionId {
        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Some(Connection {
            id,
            kind,
            block,
            input,
            statement,
            x: 0.0,
            y: 0.0,
            target: None,
        }));
        id
    }

    /// Build inputs from specs, reusing connections of same-named inputs in `existing`.
    fn build_inputs(&mut self, block: BlockId, specs: &[InputSpec], existing: &[Input]) -> Vec<Input> {
        let mut inputs = Vec::with_capacity(specs.len());
        let mut slot = 0;
        for (index, spec) in specs.iter().enumerate() {
            let reused = existing
                .iter()
                .find(|i| i.name == spec.name && i.kind == spec.kind)
                .and_then(|i| i.connection);
            let connection = match spec.kind {
                InputKind::Dummy => None,
                InputKind::Value | InputKind::Statement => Some(reused.unwrap_or_else(|| {
                    self.alloc_connection(
                        block,
                        ConnectionKind::Input,
                        Some(index),
                        spec.kind == InputKind::Statement,
                    )
                })),
            };
            if let Some(c) = connection.and_then(|c| self.connection_mut(c)) {
                c.input = Some(index);
            }
            let value_slot = if spec.kind == InputKind::Value {
                slot += 1;
                Some(slot - 1)
            } else {
                None
            };
            inputs.push(Input {
                name: spec.name.clone(),
                kind: spec.kind,
                label: spec.label.clone(),
                connection,
                slot: value_slot,
                requires_variable: spec.requires_variable,
            });
        }
        inputs
    }

    // ---------------------------------------------------------------------
    // Fields, positions, mutations
    // ---------------------------------------------------------------------

    /// Edit a field, let the kind react, and re-synchronise the block's value tree.
    pub fn set_field(&mut self, id: BlockId, name: &str, value: &str) -> Result<(), EditorError> {
        let block = self.get_mut(id)?;
        if !block.kind.hooks.accepts_field(name, value) {
            return Err(EditorError::InvalidFieldValue {
                block: id,
                field: name.to_string(),
                value: value.to_string(),
            });
        }
        let Some(slot) = block.fields.get_mut(name) else {
            return Err(EditorError::UnknownField {
                block: id,
                field: name.to_string(),
            });
        };
        *slot = value.to_string();
        let hooks = block.kind.hooks.clone();
        self.dirty.insert(id);

        hooks.on_field_change(self, id, name);
        self.resync(id);
        Ok(())
    }

    /// Move a top-level block. Attached blocks get their position from the layout.
    pub fn set_position(&mut self, id: BlockId, x: f64, y: f64) -> Result<(), EditorError> {
        let block = self.get_mut(id)?;
        block.x = x;
        block.y = y;
        Ok(())
    }

    /// Reshape a block with repeated item holes, without re-synchronising.
    ///
    /// Intended for hooks. Holes that disappear must be empty.
    pub fn reshape_items(&mut self, id: BlockId, items: usize) -> Result<(), EditorError> {
        let block = self.get(id)?;
        let hooks = block.kind.hooks.clone();
        let kind_name = block.kind.name.clone();
        let (Some(specs), Some(vecs)) = (hooks.inputs_for_items(items), hooks.vectors_for_items(items))
        else {
            return Err(EditorError::NotMutable(kind_name));
        };

        let existing = block.inputs.clone();
        for input in &existing {
            let kept = specs.iter().any(|s| s.name == input.name && s.kind == input.kind);
            let occupied = input
                .connection
                .and_then(|c| self.connection(c))
                .is_some_and(Connection::is_connected);
            if !kept && occupied {
                return Err(EditorError::InputOccupied {
                    block: id,
                    input: input.name.clone(),
                });
            }
        }

        let inputs = self.build_inputs(id, &specs, &existing);
        for input in &existing {
            let dropped = input.connection.filter(|c| {
                !inputs.iter().any(|i| i.connection == Some(*c))
            });
            if let Some(c) = dropped {
                self.connections[c.index()] = None;
            }
        }
        self.get_mut(id)?.inputs = inputs;
        self.set_type_vecs(id, vecs)?;
        self.dirty.insert(id);
        Ok(())
    }

    /// Change the number of item holes and re-synchronise.
    pub fn set_item_count(&mut self, id: BlockId, items: usize) -> Result<(), EditorError> {
        self.reshape_items(id, items)?;
        self.resync(id);
        Ok(())
    }

    /// Advisory problems across the session, in block order.
    pub fn advisories(&self) -> Vec<Advisory> {
        let mut out = Vec::new();
        for block in self.blocks() {
            if block.type_vecs.is_empty() {
                out.push(Advisory::Unsatisfiable { block: block.id });
            }
            // Repeated item holes are optional; a growing list always keeps one free.
            if block.kind.hooks.inputs_for_items(0).is_some() {
                continue;
            }
            for input in block.inputs.iter().filter(|i| i.kind == InputKind::Value) {
                let empty = input
                    .connection
                    .and_then(|c| self.connection(c))
                    .is_some_and(|c| !c.is_connected());
                if empty {
                    out.push(Advisory::EmptyHole {
                        block: block.id,
                        input: input.name.clone(),
                    });
                }
            }
        }
        out
    }
}
