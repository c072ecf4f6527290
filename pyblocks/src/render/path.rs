//! SVG path strings for block outlines.

use std::fmt::Write;

use crate::render::layout::{Hole, NOTCH_OFFSET, NOTCH_WIDTH, Row, RowKind, TAB_HEIGHT};

const NOTCH_LEFT: &str = "l 6,4 3,0 6,-4";
const NOTCH_RIGHT: &str = "l -6,4 -3,0 -6,-4";
const TAB_UP: &str = "c 0,-10 -8,8 -8,-7.5 s 8,2.5 8,-7.5";

/// Clockwise outline starting at the top-left corner.
pub fn outline(
    width: f64,
    height: f64,
    rows: &[Row],
    previous: bool,
    next: bool,
    output: bool,
) -> String {
    let mut d = String::from("M 0,0 ");
    if previous {
        let _ = write!(d, "H {} {} ", NOTCH_OFFSET, NOTCH_LEFT);
    }
    let _ = write!(d, "H {} ", width);

    for row in rows {
        match row.kind {
            RowKind::Inline => {
                let _ = write!(d, "V {} ", row.y + row.height);
            }
            RowKind::Statement { arm_x, .. } => {
                let _ = write!(
                    d,
                    "H {} {} H {} V {} H {} ",
                    arm_x + NOTCH_OFFSET + NOTCH_WIDTH,
                    NOTCH_RIGHT,
                    arm_x,
                    row.y + row.height,
                    width
                );
            }
        }
    }
    let _ = write!(d, "V {} ", height);

    if next {
        let _ = write!(d, "H {} {} ", NOTCH_OFFSET + NOTCH_WIDTH, NOTCH_RIGHT);
    }
    d.push_str("H 0 ");
    if output {
        let _ = write!(d, "V {} {} ", TAB_HEIGHT, TAB_UP);
    }
    d.push('z');
    d
}

/// Cut-out for an inline value hole, with the socket for the child's output tab.
pub fn hole(hole: &Hole) -> String {
    format!(
        "M {},{} h {} v {} h {} V {} {} z",
        hole.x,
        hole.y,
        hole.width,
        hole.height,
        -hole.width,
        hole.y + TAB_HEIGHT,
        TAB_UP
    )
}
