//! Structural edits of the block tree and the traversals built on top of it.

use tracing::{debug, trace};

use crate::block::BlockId;
use crate::block::kind::InputKind;
use crate::connection::{ConnectionId, ConnectionKind};
use crate::session::{EditorError, EditorSession};

impl EditorSession {
    // ---------------------------------------------------------------------
    // Attaching
    // ---------------------------------------------------------------------

    /// Plug an expression block into a value input of `parent`.
    ///
    /// Type compatibility is not checked here; `legal_drop` is the pre-check. If `child` is
    /// attached elsewhere it is detached first.
    pub fn attach_value(
        &mut self,
        child: BlockId,
        parent: BlockId,
        input: &str,
    ) -> Result<(), EditorError> {
        let output = self.get(child)?.output.ok_or(EditorError::NotAnExpression(child))?;
        let (index, socket) = self.socket(parent, input, InputKind::Value)?;
        let parent_block = self.get(parent)?;
        if parent_block.inputs[index].requires_variable && !self.get(child)?.kind.is_variable_getter()
        {
            return Err(EditorError::RequiresVariable {
                block: parent,
                input: input.to_string(),
            });
        }
        if self.is_linked(socket) {
            return Err(EditorError::InputOccupied {
                block: parent,
                input: input.to_string(),
            });
        }
        self.check_cycle(child, parent)?;

        self.detach(child)?;
        self.link(output, socket);
        self.adopt(parent, child);
        debug!(%child, %parent, input, "attached value");

        let hooks = self.get(parent)?.kind.hooks.clone();
        hooks.on_attach(self, parent, index);
        self.resync(child);
        Ok(())
    }

    /// Put a statement chain into a statement input of `parent`, splicing any existing chain
    /// below the incoming one.
    pub fn attach_statement(
        &mut self,
        child: BlockId,
        parent: BlockId,
        input: &str,
    ) -> Result<(), EditorError> {
        let previous = self.get(child)?.previous.ok_or(EditorError::NotAStatement(child))?;
        let (index, socket) = self.socket(parent, input, InputKind::Statement)?;
        self.check_cycle(child, parent)?;

        self.detach(child)?;
        let displaced = self.unlink_below(parent, socket);
        self.link(previous, socket);
        self.adopt(parent, child);
        self.splice(child, displaced)?;
        debug!(%child, %parent, input, "attached statement");

        let hooks = self.get(parent)?.kind.hooks.clone();
        hooks.on_attach(self, parent, index);
        self.resync(child);
        Ok(())
    }

    /// Attach the chain starting at `child` directly below `previous`.
    pub fn attach_next(&mut self, child: BlockId, previous: BlockId) -> Result<(), EditorError> {
        let top = self.get(child)?.previous.ok_or(EditorError::NotAStatement(child))?;
        let next = self.get(previous)?.next.ok_or(EditorError::NotAStatement(previous))?;
        self.check_cycle(child, previous)?;

        self.detach(child)?;
        let displaced = self.unlink_below(previous, next);
        self.link(top, next);
        self.adopt(previous, child);
        self.splice(child, displaced)?;
        debug!(%child, %previous, "attached next statement");

        self.resync(child);
        Ok(())
    }

    /// Link two connections, dispatching on their kinds to the matching attach operation.
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> Result<(), EditorError> {
        let ca = self.connection(a).ok_or(EditorError::UnknownConnection(a))?.clone();
        let cb = self.connection(b).ok_or(EditorError::UnknownConnection(b))?.clone();
        if !ca.can_pair_with(&cb) {
            return Err(EditorError::IncompatibleConnections(a, b));
        }
        let (upper, lower) = match (ca.kind, cb.kind) {
            (ConnectionKind::Input, _) | (ConnectionKind::Next, _) => (ca, cb),
            _ => (cb, ca),
        };
        match upper.kind {
            ConnectionKind::Input => {
                let name = self.input_name(upper.block, upper.input)?;
                if upper.statement {
                    self.attach_statement(lower.block, upper.block, &name)
                } else {
                    self.attach_value(lower.block, upper.block, &name)
                }
            }
            ConnectionKind::Next => self.attach_next(lower.block, upper.block),
            _ => Err(EditorError::IncompatibleConnections(a, b)),
        }
    }

    // ---------------------------------------------------------------------
    // Detaching
    // ---------------------------------------------------------------------

    /// Unplug `child` (and everything below it) from its parent, making it top-level.
    ///
    /// Both the tree it left and the tree it takes along are re-synchronised. Detaching a
    /// top-level block does nothing.
    pub fn detach(&mut self, child: BlockId) -> Result<(), EditorError> {
        let block = self.get(child)?;
        let Some(parent) = block.parent else {
            return Ok(());
        };
        let own = [block.output, block.previous]
            .into_iter()
            .flatten()
            .find(|c| self.is_linked(*c));
        let Some(own) = own else {
            return Ok(());
        };
        let socket = self.connection(own).and_then(|c| c.target);
        let input = socket.and_then(|s| self.connection(s)).and_then(|s| s.input);

        self.unlink(own);
        self.orphan(parent, child);
        debug!(%child, %parent, "detached");

        if let Some(index) = input {
            let hooks = self.get(parent)?.kind.hooks.clone();
            hooks.on_detach(self, parent, index);
        }
        self.resync(parent);
        self.resync(child);
        Ok(())
    }

    fn link(&mut self, a: ConnectionId, b: ConnectionId) {
        if let Some(c) = self.connection_mut(a) {
            c.target = Some(b);
        }
        if let Some(c) = self.connection_mut(b) {
            c.target = Some(a);
        }
    }

    fn unlink(&mut self, a: ConnectionId) {
        let target = self.connection_mut(a).and_then(|c| c.target.take());
        if let Some(c) = target.and_then(|t| self.connection_mut(t)) {
            c.target = None;
        }
    }

    fn is_linked(&self, c: ConnectionId) -> bool {
        self.connection(c).is_some_and(|c| c.is_connected())
    }

    /// Disconnect whatever hangs from `socket` of `owner` and return it as a top-level block.
    fn unlink_below(&mut self, owner: BlockId, socket: ConnectionId) -> Option<BlockId> {
        let target = self.connection(socket)?.target?;
        let displaced = self.connection(target)?.block;
        self.unlink(socket);
        self.orphan(owner, displaced);
        Some(displaced)
    }

    /// Re-attach a displaced chain below the last block of the chain starting at `head`.
    fn splice(&mut self, head: BlockId, displaced: Option<BlockId>) -> Result<(), EditorError> {
        let Some(displaced) = displaced else {
            return Ok(());
        };
        let last = self.last_in_chain(head);
        let next = self.get(last)?.next.ok_or(EditorError::NotAStatement(last))?;
        let top = self
            .get(displaced)?
            .previous
            .ok_or(EditorError::NotAStatement(displaced))?;
        self.link(top, next);
        self.adopt(last, displaced);
        trace!(%displaced, after = %last, "spliced displaced chain");
        Ok(())
    }

    fn adopt(&mut self, parent: BlockId, child: BlockId) {
        if let Some(b) = self.block_mut(child) {
            b.parent = Some(parent);
        }
        if let Some(p) = self.block_mut(parent) {
            p.children.push(child);
        }
        // Newly built blocks sit at the end, so search from there.
        if let Some(index) = self.top_blocks.iter().rposition(|b| *b == child) {
            self.top_blocks.remove(index);
        }
        self.dirty.insert(parent);
        self.dirty.insert(child);
    }

    fn orphan(&mut self, parent: BlockId, child: BlockId) {
        if let Some(p) = self.block_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(b) = self.block_mut(child) {
            b.parent = None;
        }
        if !self.top_blocks.contains(&child) {
            self.top_blocks.push(child);
        }
        self.dirty.insert(parent);
        self.dirty.insert(child);
    }

    fn socket(
        &self,
        block: BlockId,
        input: &str,
        expected: InputKind,
    ) -> Result<(usize, ConnectionId), EditorError> {
        let b = self.get(block)?;
        let index = b.input_index(input).ok_or_else(|| EditorError::UnknownInput {
            block,
            input: input.to_string(),
        })?;
        let found = &b.inputs[index];
        match found.connection {
            Some(c) if found.kind == expected => Ok((index, c)),
            _ => Err(EditorError::WrongInputKind {
                block,
                input: input.to_string(),
                expected,
            }),
        }
    }

    fn input_name(&self, block: BlockId, input: Option<usize>) -> Result<String, EditorError> {
        let b = self.get(block)?;
        input
            .and_then(|i| b.inputs.get(i))
            .map(|i| i.name.clone())
            .ok_or_else(|| EditorError::UnknownInput {
                block,
                input: format!("#{}", input.unwrap_or_default()),
            })
    }

    fn check_cycle(&self, child: BlockId, parent: BlockId) -> Result<(), EditorError> {
        let mut cur = Some(parent);
        while let Some(id) = cur {
            if id == child {
                return Err(EditorError::WouldCreateCycle { child, parent });
            }
            cur = self.block(id).and_then(|b| b.parent);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------------

    /// The block `id` is plugged into through its output, with the slot it occupies.
    pub fn value_parent(&self, id: BlockId) -> Option<(BlockId, usize)> {
        let output = self.block(id)?.output?;
        let socket = self.connection(self.connection(output)?.target?)?;
        let slot = self.block(socket.block)?.inputs.get(socket.input?)?.slot?;
        Some((socket.block, slot))
    }

    /// Value children in slot order, paired with the slot they fill.
    pub fn value_children(&self, id: BlockId) -> Vec<(usize, BlockId)> {
        let Some(block) = self.block(id) else {
            return Vec::new();
        };
        block
            .inputs
            .iter()
            .filter_map(|input| {
                let slot = input.slot?;
                let target = self.connection(input.connection?)?.target?;
                Some((slot, self.connection(target)?.block))
            })
            .collect()
    }

    /// Top of the value tree containing `id`, following output connections only.
    pub fn root(&self, id: BlockId) -> BlockId {
        let mut cur = id;
        while let Some((parent, _)) = self.value_parent(cur) {
            cur = parent;
        }
        cur
    }

    /// Top of the whole tree containing `id`, across statement chains too.
    pub fn top_ancestor(&self, id: BlockId) -> BlockId {
        let mut cur = id;
        while let Some(parent) = self.block(cur).and_then(|b| b.parent) {
            cur = parent;
        }
        cur
    }

    /// The block below `id` in its statement chain.
    pub fn next_block(&self, id: BlockId) -> Option<BlockId> {
        let next = self.block(id)?.next?;
        Some(self.connection(self.connection(next)?.target?)?.block)
    }

    /// Nearest ancestor that encloses `id` rather than merely preceding it in a chain.
    pub fn surrounding_parent(&self, id: BlockId) -> Option<BlockId> {
        let mut cur = id;
        loop {
            let parent = self.block(cur)?.parent?;
            if self.next_block(parent) != Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
    }

    pub fn last_in_chain(&self, id: BlockId) -> BlockId {
        let mut cur = id;
        while let Some(next) = self.next_block(cur) {
            cur = next;
        }
        cur
    }

    /// Direct children in layout order: inputs left to right, then the next statement.
    pub fn child_blocks(&self, id: BlockId) -> Vec<BlockId> {
        let Some(block) = self.block(id) else {
            return Vec::new();
        };
        let mut out: Vec<BlockId> = block
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .filter_map(|c| self.connection(self.connection(c)?.target?))
            .map(|c| c.block)
            .collect();
        out.extend(self.next_block(id));
        out
    }

    /// `id` and everything below it, pre-order, across value and statement links.
    pub fn descendants(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if self.block(cur).is_none() {
                continue;
            }
            out.push(cur);
            stack.extend(self.child_blocks(cur).into_iter().rev());
        }
        out
    }

    /// `id` and its value descendants, pre-order. Statement links are not followed.
    pub fn value_tree(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.value_children(cur).into_iter().rev().map(|(_, b)| b));
        }
        out
    }
}
