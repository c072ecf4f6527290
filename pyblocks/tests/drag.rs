use std::collections::BTreeSet;

use pyblocks::drag::{ConnectionDb, DragSession, SNAP_RADIUS};
use pyblocks::render::Renderer;
use pyblocks::{BlockId, Catalog, ConnectionId, ConnectionKind, EditorSession};

struct Workspace {
    session: EditorSession,
    renderer: Renderer,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            session: EditorSession::new(Catalog::python()),
            renderer: Renderer::default(),
        }
    }

    fn create(&mut self, kind: &str, x: f64, y: f64) -> BlockId {
        let id = self.session.create_block(kind).unwrap();
        self.session.set_position(id, x, y).unwrap();
        id
    }

    fn render(&mut self) {
        self.renderer.render_all(&mut self.session);
    }

    fn at(&self, c: ConnectionId) -> (f64, f64) {
        let c = self.session.connection(c).unwrap();
        (c.x, c.y)
    }

    fn socket(&self, block: BlockId, input: &str) -> ConnectionId {
        self.session.block(block).unwrap().input(input).unwrap().connection.unwrap()
    }

    /// Drag `block` so that its connection `own` lands `by` away from `target`.
    fn drag_onto(&mut self, block: BlockId, own: ConnectionId, target: ConnectionId, by: (f64, f64)) -> DragSession {
        let (ox, oy) = self.at(own);
        let (tx, ty) = self.at(target);
        let mut drag = DragSession::begin(&mut self.session, block).unwrap();
        drag.move_to(&self.session, tx - ox + by.0, ty - oy + by.1);
        drag
    }
}

#[test]
fn value_block_snaps_into_a_compatible_hole() {
    let mut w = Workspace::new();
    let add = w.create("math_add", 100.0, 100.0);
    let n = w.create("math_number", 300.0, 300.0);
    w.render();

    let output = w.session.block(n).unwrap().output.unwrap();
    let hole = w.socket(add, "A");
    assert_eq!(w.at(hole), (118.0, 105.0));

    let drag = w.drag_onto(n, output, hole, (3.0, 4.0));
    assert_eq!(w.session.dragging, Some(n));
    let candidate = drag.candidate().unwrap();
    assert_eq!((candidate.own, candidate.target), (output, hole));
    assert_eq!(candidate.distance, 5.0);

    drag.drop(&mut w.session).unwrap();
    assert_eq!(w.session.dragging, None);
    assert_eq!(w.session.value_children(add), vec![(0, n)]);
    assert_eq!(w.session.block(add).unwrap().type_vecs.len(), 2);
}

#[test]
fn incompatible_holes_are_not_candidates() {
    let mut w = Workspace::new();
    let add = w.create("math_add", 100.0, 100.0);
    let text = w.create("text", 300.0, 300.0);
    w.render();

    let output = w.session.block(text).unwrap().output.unwrap();
    let hole = w.socket(add, "A");
    let drag = w.drag_onto(text, output, hole, (0.0, 0.0));
    assert_eq!(drag.candidate(), None);
    assert_eq!(drag.position(), (118.0, 105.0));

    drag.drop(&mut w.session).unwrap();
    assert!(w.session.value_children(add).is_empty());
    let block = w.session.block(text).unwrap();
    assert_eq!((block.x, block.y), (118.0, 105.0));
}

#[test]
fn snapping_is_limited_to_the_radius() {
    let mut w = Workspace::new();
    let add = w.create("math_add", 100.0, 100.0);
    let n = w.create("math_number", 300.0, 300.0);
    w.render();

    let output = w.session.block(n).unwrap().output.unwrap();
    let hole = w.socket(add, "A");
    let mut drag = w.drag_onto(n, output, hole, (SNAP_RADIUS + 1.0, 0.0));
    assert_eq!(drag.candidate(), None);

    // Closer to B than to A.
    let (ox, oy) = w.at(output);
    let (bx, by) = w.at(w.socket(add, "B"));
    let found = drag.move_to(&w.session, bx - ox - 2.0, by - oy).unwrap();
    assert_eq!(found.target, w.socket(add, "B"));
}

#[test]
fn cancel_leaves_the_tree_alone() {
    let mut w = Workspace::new();
    let add = w.create("math_add", 100.0, 100.0);
    let n = w.create("math_number", 300.0, 300.0);
    w.render();

    let output = w.session.block(n).unwrap().output.unwrap();
    let hole = w.socket(add, "A");
    let drag = w.drag_onto(n, output, hole, (0.0, 0.0));
    assert!(drag.candidate().is_some());
    assert_eq!(drag.cancel(&mut w.session), (300.0, 300.0));
    assert_eq!(w.session.dragging, None);
    assert!(w.session.value_children(add).is_empty());
}

#[test]
fn dragging_out_of_a_hole_detaches() {
    let mut w = Workspace::new();
    let add = w.create("math_add", 100.0, 100.0);
    let n = w.session.create_block("math_number").unwrap();
    w.session.attach_value(n, add, "A").unwrap();
    w.render();

    let mut drag = DragSession::begin(&mut w.session, n).unwrap();
    drag.move_to(&w.session, 0.0, 200.0);
    assert_eq!(drag.candidate(), None);
    drag.drop(&mut w.session).unwrap();

    assert!(w.session.top_blocks().contains(&n));
    let block = w.session.block(n).unwrap();
    assert_eq!((block.x, block.y), (118.0, 305.0));
    assert_eq!(w.session.block(add).unwrap().type_vecs.len(), 4);
}

#[test]
fn statements_snap_below_a_chain() {
    let mut w = Workspace::new();
    let first = w.create("text_print", 0.0, 0.0);
    let second = w.create("text_print", 0.0, 200.0);
    w.render();

    let next = w.session.block(first).unwrap().next.unwrap();
    let previous = w.session.block(second).unwrap().previous.unwrap();
    let drag = w.drag_onto(second, previous, next, (3.0, 0.0));
    let candidate = drag.candidate().unwrap();
    assert_eq!(candidate.target, next);

    drag.drop(&mut w.session).unwrap();
    assert_eq!(w.session.next_block(first), Some(second));
    assert_eq!(w.session.top_blocks(), &[first]);
}

#[test]
fn connection_db_skips_excluded_and_occupied() {
    let mut w = Workspace::new();
    let add = w.create("math_add", 0.0, 0.0);
    let n = w.session.create_block("math_number").unwrap();
    w.session.attach_value(n, add, "A").unwrap();
    w.render();

    let all = ConnectionDb::build(&w.session, &BTreeSet::new());
    // add: output and B; the filled A and the number's output are taken.
    assert_eq!(all.len(), 2);

    let exclude: BTreeSet<BlockId> = [add].into_iter().collect();
    assert!(ConnectionDb::build(&w.session, &exclude).is_empty());

    let b = w.socket(add, "B");
    let (bx, by) = w.at(b);
    assert_eq!(
        all.closest(ConnectionKind::Input, bx + 3.0, by + 4.0, SNAP_RADIUS, |_| true),
        Some((b, 5.0))
    );
    assert_eq!(
        all.closest(ConnectionKind::Input, bx, by, SNAP_RADIUS, |_| false),
        None
    );
    assert_eq!(
        all.closest(ConnectionKind::Output, bx, by + 100.0, SNAP_RADIUS, |_| true),
        None
    );
}
