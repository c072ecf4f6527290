//! Block geometry. A block is laid out after its children, from their sizes.

use std::collections::BTreeMap;

use crate::block::kind::InputKind;
use crate::block::{Block, BlockId};
use crate::connection::ConnectionId;
use crate::render::measure::Measurer;
use crate::render::path;
use crate::session::EditorSession;

pub const MIN_ROW_HEIGHT: f64 = 25.0;
pub const SEP_X: f64 = 10.0;
pub const SEP_Y: f64 = 5.0;
pub const TAB_WIDTH: f64 = 8.0;
pub const TAB_HEIGHT: f64 = 20.0;
pub const NOTCH_OFFSET: f64 = 15.0;
pub const NOTCH_WIDTH: f64 = 15.0;
pub const EMPTY_HOLE_WIDTH: f64 = 22.0;
pub const EMPTY_HOLE_HEIGHT: f64 = 22.0;
pub const EMPTY_STATEMENT_HEIGHT: f64 = 24.0;
pub const BOTTOM_BAR_HEIGHT: f64 = 12.0;
pub const FIELD_PADDING: f64 = 4.0;
pub const MIN_ARM_WIDTH: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowKind {
    /// Labels, fields and value holes side by side.
    Inline,
    /// A C-shaped arm holding a statement chain, starting at `arm_x`.
    Statement { input: usize, arm_x: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub text: String,
    /// Editable field rather than a fixed label.
    pub field: bool,
}

/// A value hole, relative to the block origin. Its connection sits at `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hole {
    pub input: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub filled: bool,
}

/// Computed geometry of one block; all offsets are relative to the block origin.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub width: f64,
    pub height: f64,
    pub rows: Vec<Row>,
    pub texts: Vec<Text>,
    pub holes: Vec<Hole>,
    /// Where each directly attached child's origin goes.
    pub children: Vec<(BlockId, f64, f64)>,
    pub connectors: Vec<(ConnectionId, f64, f64)>,
    pub outline: String,
    pub hole_paths: Vec<String>,
}

impl BlockLayout {
    /// Height of this block plus everything chained below it.
    fn chain_height(session: &EditorSession, head: BlockId, layouts: &BTreeMap<BlockId, BlockLayout>) -> f64 {
        let mut total = 0.0;
        let mut cur = Some(head);
        while let Some(id) = cur {
            total += layouts.get(&id).map_or(MIN_ROW_HEIGHT, |l| l.height);
            cur = session.next_block(id);
        }
        total
    }
}

fn attached(session: &EditorSession, connection: Option<ConnectionId>) -> Option<BlockId> {
    let target = session.connection(connection?)?.target?;
    Some(session.connection(target)?.block)
}

/// Group inputs into rows: consecutive value and dummy inputs share a row, each statement
/// input gets its own.
fn group_rows(block: &Block) -> Vec<(bool, Vec<usize>)> {
    let mut groups: Vec<(bool, Vec<usize>)> = Vec::new();
    for (index, input) in block.inputs.iter().enumerate() {
        match input.kind {
            InputKind::Statement => groups.push((true, vec![index])),
            InputKind::Value | InputKind::Dummy => match groups.last_mut() {
                Some((false, members)) => members.push(index),
                _ => groups.push((false, vec![index])),
            },
        }
    }
    if groups.is_empty() {
        groups.push((false, Vec::new()));
    }
    groups
}

/// Lay out `id` from the already computed layouts of its children.
pub fn layout_block<M: Measurer + ?Sized>(
    session: &EditorSession,
    id: BlockId,
    measurer: &M,
    layouts: &BTreeMap<BlockId, BlockLayout>,
) -> Option<BlockLayout> {
    let block = session.block(id)?;
    let groups = group_rows(block);

    let arm_x = groups
        .iter()
        .filter(|(statement, _)| *statement)
        .map(|(_, members)| {
            let label = &block.inputs[members[0]].label;
            measurer.measure(label).0 + 2.0 * SEP_X
        })
        .fold(MIN_ARM_WIDTH, f64::max);

    let mut rows = Vec::new();
    let mut texts = Vec::new();
    let mut holes = Vec::new();
    let mut children = Vec::new();
    let mut connectors = Vec::new();
    let mut y = 0.0;

    for (statement, members) in &groups {
        if *statement {
            let index = members[0];
            let input = &block.inputs[index];
            let child = attached(session, input.connection);
            let height = child
                .map_or(EMPTY_STATEMENT_HEIGHT, |c| BlockLayout::chain_height(session, c, layouts))
                .max(MIN_ROW_HEIGHT);
            if !input.label.is_empty() {
                let (_, h) = measurer.measure(&input.label);
                texts.push(Text {
                    x: SEP_X,
                    y: y + (MIN_ROW_HEIGHT + h) / 2.0,
                    text: input.label.clone(),
                    field: false,
                });
            }
            if let Some(c) = input.connection {
                connectors.push((c, arm_x, y));
            }
            if let Some(child) = child {
                children.push((child, arm_x, y));
            }
            rows.push(Row {
                kind: RowKind::Statement { input: index, arm_x },
                y,
                width: arm_x,
                height,
            });
            y += height;
            continue;
        }

        let mut x = SEP_X;
        let mut height = MIN_ROW_HEIGHT;
        let mut pending: Vec<(f64, String, bool, f64)> = Vec::new();
        for &index in members {
            let input = &block.inputs[index];
            if !input.label.is_empty() {
                let (w, h) = measurer.measure(&input.label);
                pending.push((x, input.label.clone(), false, h));
                x += w + SEP_X;
            }
            let specs = block.kind.inputs.iter().find(|s| s.name == input.name);
            for field in specs.into_iter().flat_map(|s| s.fields.iter()) {
                let value = block.field(&field.name).unwrap_or_default();
                let (w, h) = measurer.measure(value);
                pending.push((x + FIELD_PADDING, value.to_string(), true, h));
                x += w + 2.0 * FIELD_PADDING + SEP_X;
            }
            if input.kind == InputKind::Value {
                x += TAB_WIDTH;
                let child = attached(session, input.connection);
                let (w, h) = child
                    .and_then(|c| layouts.get(&c))
                    .map_or((EMPTY_HOLE_WIDTH, EMPTY_HOLE_HEIGHT), |l| (l.width, l.height));
                holes.push(Hole {
                    input: index,
                    x,
                    y: y + SEP_Y,
                    width: w,
                    height: h,
                    filled: child.is_some(),
                });
                if let Some(c) = input.connection {
                    connectors.push((c, x, y + SEP_Y));
                }
                if let Some(child) = child {
                    children.push((child, x, y + SEP_Y));
                }
                height = f64::max(height, h + 2.0 * SEP_Y);
                x += w + SEP_X;
            }
        }
        for (tx, text, field, h) in pending {
            texts.push(Text {
                x: tx,
                y: y + (height + h) / 2.0 - 2.0,
                text,
                field,
            });
        }
        rows.push(Row {
            kind: RowKind::Inline,
            y,
            width: x,
            height,
        });
        y += height;
    }

    let ends_with_arm = matches!(rows.last(), Some(Row { kind: RowKind::Statement { .. }, .. }));
    if ends_with_arm {
        y += BOTTOM_BAR_HEIGHT;
    }
    let has_arm = rows.iter().any(|r| matches!(r.kind, RowKind::Statement { .. }));
    let min_width = if has_arm {
        arm_x + NOTCH_OFFSET + NOTCH_WIDTH + SEP_X
    } else {
        NOTCH_OFFSET + NOTCH_WIDTH + SEP_X
    };
    let width = rows.iter().map(|r| r.width).fold(min_width, f64::max);
    let height = y;

    if let Some(c) = block.output {
        connectors.push((c, 0.0, 0.0));
    }
    if let Some(c) = block.previous {
        connectors.push((c, 0.0, 0.0));
    }
    if let Some(c) = block.next {
        connectors.push((c, 0.0, height));
        if let Some(next) = session.next_block(id) {
            children.push((next, 0.0, height));
        }
    }

    let outline = path::outline(
        width,
        height,
        &rows,
        block.previous.is_some(),
        block.next.is_some(),
        block.output.is_some(),
    );
    let hole_paths = holes.iter().map(path::hole).collect();

    Some(BlockLayout {
        width,
        height,
        rows,
        texts,
        holes,
        children,
        connectors,
        outline,
        hole_paths,
    })
}
