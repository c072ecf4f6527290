use std::fmt::Write;

use quick_xml::escape::escape;

use crate::block::BlockId;
use crate::block::kind::InputKind;
use crate::connection::ConnectionId;
use crate::session::EditorSession;

const NAMESPACE: &str = "https://developers.google.com/blockly/xml";

/// Deeper elements are written at this indentation, so a long `<next>` chain grows the
/// output linearly.
const MAX_INDENT: usize = 8;

/// Output still to be written, innermost last.
enum Pending {
    Block { id: BlockId, depth: usize, top: bool },
    Line { depth: usize, text: String },
}

/// Serialise every top-level tree, ordered by position.
pub fn save(session: &EditorSession) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<xml xmlns=\"{}\">", NAMESPACE);
    for top in session.top_blocks_ordered() {
        write_tree(&mut out, session, top);
    }
    out.push_str("</xml>\n");
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth.min(MAX_INDENT) {
        out.push_str("  ");
    }
}

fn attached(session: &EditorSession, connection: Option<ConnectionId>) -> Option<BlockId> {
    let target = session.connection(connection?)?.target?;
    Some(session.connection(target)?.block)
}

fn write_tree(out: &mut String, session: &EditorSession, top: BlockId) {
    let mut stack = vec![Pending::Block {
        id: top,
        depth: 1,
        top: true,
    }];
    while let Some(item) = stack.pop() {
        match item {
            Pending::Line { depth, text } => {
                indent(out, depth);
                out.push_str(&text);
                out.push('\n');
            }
            Pending::Block { id, depth, top } => {
                let rest = write_block(out, session, id, depth, top);
                stack.extend(rest.into_iter().rev());
            }
        }
    }
}

/// Write the opening tag, mutation and fields of `id` and return what follows them in
/// document order.
fn write_block(out: &mut String, session: &EditorSession, id: BlockId, depth: usize, top: bool) -> Vec<Pending> {
    let Some(block) = session.block(id) else {
        return Vec::new();
    };
    indent(out, depth);
    let _ = write!(out, "<block type=\"{}\" id=\"{}\"", escape(block.kind_name()), block.id);
    if top {
        let _ = write!(out, " x=\"{}\" y=\"{}\"", block.x, block.y);
    }
    out.push_str(">\n");

    if block.kind.hooks.inputs_for_items(0).is_some() {
        indent(out, depth + 1);
        let _ = writeln!(out, "<mutation items=\"{}\"/>", block.value_slot_count());
    }
    for (name, value) in &block.fields {
        indent(out, depth + 1);
        let _ = writeln!(out, "<field name=\"{}\">{}</field>", escape(name), escape(value));
    }

    let mut rest = Vec::new();
    let mut wrap = |open: String, child: BlockId, close: &str| {
        rest.push(Pending::Line {
            depth: depth + 1,
            text: open,
        });
        rest.push(Pending::Block {
            id: child,
            depth: depth + 2,
            top: false,
        });
        rest.push(Pending::Line {
            depth: depth + 1,
            text: close.to_string(),
        });
    };
    for input in &block.inputs {
        let tag = match input.kind {
            InputKind::Value => "value",
            InputKind::Statement => "statement",
            InputKind::Dummy => continue,
        };
        if let Some(child) = attached(session, input.connection) {
            wrap(
                format!("<{} name=\"{}\">", tag, escape(&input.name)),
                child,
                &format!("</{}>", tag),
            );
        }
    }
    if let Some(next) = session.next_block(id) {
        wrap("<next>".to_string(), next, "</next>");
    }
    rest.push(Pending::Line {
        depth,
        text: "</block>".to_string(),
    });
    rest
}
