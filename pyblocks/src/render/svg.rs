//! Standalone SVG output of a rendered workspace.

use std::collections::BTreeSet;
use std::fmt::Write;

use quick_xml::escape::escape;

use crate::block::BlockId;
use crate::render::fill::{BodyStyle, Colour, Fill, StripePattern, select_fill};
use crate::render::measure::Measurer;
use crate::render::Renderer;
use crate::session::EditorSession;

const MARGIN: f64 = 20.0;
const STRIPE_WIDTH: f64 = 6.0;

fn bounds<M: Measurer>(session: &EditorSession, renderer: &Renderer<M>) -> (f64, f64, f64, f64) {
    let mut min = (f64::MAX, f64::MAX);
    let mut max = (f64::MIN, f64::MIN);
    for block in session.blocks() {
        let Some(layout) = renderer.layout(block.id) else {
            continue;
        };
        min = (min.0.min(block.x), min.1.min(block.y));
        max = (
            max.0.max(block.x + layout.width),
            max.1.max(block.y + layout.height),
        );
    }
    if min.0 > max.0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    (min.0, min.1, max.0, max.1)
}

fn write_defs(out: &mut String, patterns: &BTreeSet<StripePattern>) {
    out.push_str("  <defs>\n");
    for pattern in patterns {
        let colours = pattern.colours();
        let size = STRIPE_WIDTH * colours.len() as f64;
        let _ = writeln!(
            out,
            "    <pattern id=\"{}\" width=\"{}\" height=\"{}\" patternUnits=\"userSpaceOnUse\" patternTransform=\"rotate(45)\">",
            pattern.id(),
            size,
            size
        );
        for (i, colour) in colours.iter().enumerate() {
            let _ = writeln!(
                out,
                "      <rect x=\"{}\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
                i as f64 * STRIPE_WIDTH,
                STRIPE_WIDTH,
                size,
                colour
            );
        }
        out.push_str("    </pattern>\n");
    }

    out.push_str("    <linearGradient id=\"rainbow\" x1=\"0\" y1=\"0\" x2=\"1\" y2=\"0\">\n");
    for step in 0..=6u16 {
        let _ = writeln!(
            out,
            "      <stop offset=\"{:.3}\" stop-color=\"{}\"/>",
            f64::from(step) / 6.0,
            Colour::from_hue(step * 60 % 360)
        );
    }
    out.push_str("    </linearGradient>\n");

    out.push_str(concat!(
        "    <pattern id=\"unsatisfiable\" width=\"8\" height=\"8\" patternUnits=\"userSpaceOnUse\">\n",
        "      <rect width=\"8\" height=\"8\" fill=\"#9e9e9e\"/>\n",
        "      <path d=\"M 0,0 L 8,8 M 8,0 L 0,8\" stroke=\"#c62828\" stroke-width=\"1.5\"/>\n",
        "    </pattern>\n",
        "  </defs>\n",
    ));
}

fn write_block<M: Measurer>(
    out: &mut String,
    session: &EditorSession,
    renderer: &Renderer<M>,
    id: BlockId,
) {
    let (Some(block), Some(layout)) = (session.block(id), renderer.layout(id)) else {
        return;
    };
    let appearance = select_fill(block);
    let _ = writeln!(
        out,
        "  <g class=\"block\" data-id=\"{}\" data-kind=\"{}\" transform=\"translate({},{})\">",
        block.id,
        escape(block.kind_name()),
        block.x,
        block.y
    );
    let _ = writeln!(
        out,
        "    <path class=\"body\" d=\"{}\" fill=\"{}\" stroke=\"#404040\"/>",
        layout.outline,
        appearance.fill.paint()
    );
    if appearance.body == BodyStyle::ListStrips {
        let third = layout.height / 3.0;
        let _ = writeln!(
            out,
            "    <path class=\"list-strips\" d=\"M 0,{} H {} M 0,{} H {}\" stroke=\"#ffffff\" stroke-width=\"2\"/>",
            third,
            layout.width,
            2.0 * third,
            layout.width
        );
    }
    for hole in layout.hole_paths.iter().zip(&layout.holes).filter(|(_, h)| !h.filled) {
        let _ = writeln!(
            out,
            "    <path class=\"hole\" d=\"{}\" fill=\"#ffffff\" fill-opacity=\"0.6\"/>",
            hole.0
        );
    }
    for text in &layout.texts {
        let class = if text.field { "field" } else { "label" };
        let _ = writeln!(
            out,
            "    <text class=\"{}\" x=\"{}\" y=\"{}\">{}</text>",
            class,
            text.x,
            text.y,
            escape(&text.text)
        );
    }
    if appearance.fill == Fill::Unsatisfiable {
        let _ = writeln!(out, "    <title>no admissible type here</title>");
    }
    out.push_str("  </g>\n");
}

/// Render the whole session, drawing parents before children.
pub fn write_document<M: Measurer>(session: &EditorSession, renderer: &Renderer<M>) -> String {
    let patterns: BTreeSet<StripePattern> = session
        .blocks()
        .filter_map(|b| match select_fill(b).fill {
            Fill::Striped(pattern) => Some(pattern),
            _ => None,
        })
        .collect();
    let (x0, y0, x1, y1) = bounds(session, renderer);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\" font-family=\"monospace\" font-size=\"12\">",
        x0 - MARGIN,
        y0 - MARGIN,
        x1 - x0 + 2.0 * MARGIN,
        y1 - y0 + 2.0 * MARGIN
    );
    write_defs(&mut out, &patterns);
    for top in session.top_blocks_ordered() {
        for id in session.descendants(top) {
            write_block(&mut out, session, renderer, id);
        }
    }
    out.push_str("</svg>\n");
    out
}
