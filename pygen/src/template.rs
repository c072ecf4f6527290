//! Per-kind code templates.
//!
//! `{NAME}` is replaced by the code of the value or statement input `NAME`, or by the value
//! of field `NAME`. `{NAME:repr}` quotes a field as a Python string literal. `{...}` joins
//! every filled value input with `, `. `{{` and `}}` stand for literal braces.

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Slot {
        name: String,
        repr: bool,
        /// Bracket nesting at the slot. Slots inside `(...)` or `[...]` never need parentheses.
        depth: usize,
        /// Whether another slot precedes this one at the same level, making it a right operand.
        right: bool,
    },
    Spread,
}

/// Split a template into text and placeholders. Returns `None` on an unterminated `{`.
pub fn parse(template: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut depth: usize = 0;
    let mut slots_at_top = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => body.push(c),
                        None => return None,
                    }
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                if body == "..." {
                    segments.push(Segment::Spread);
                    continue;
                }
                let (name, repr) = match body.strip_suffix(":repr") {
                    Some(name) => (name.to_string(), true),
                    None => (body, false),
                };
                segments.push(Segment::Slot {
                    name,
                    repr,
                    depth,
                    right: depth == 0 && slots_at_top > 0,
                });
                if depth == 0 {
                    slots_at_top += 1;
                }
            }
            '(' | '[' => {
                depth += 1;
                text.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                text.push(c);
            }
            '\n' => {
                // Statement templates: every line starts a new operand context.
                slots_at_top = 0;
                text.push(c);
            }
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Some(segments)
}
